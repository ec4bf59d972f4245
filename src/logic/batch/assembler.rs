use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use super::{Batch, FlushReason};
use crate::logic::record::Record;

pub struct BatchAssembler {
    pending: Vec<Record>,
    started_at: DateTime<Utc>,
    last_flush: Instant,
    max_records: usize,
    idle_interval: Duration,
}

impl BatchAssembler {
    /// `now` seeds the "last flush" instant so the first idle window starts at startup
    pub fn new(max_records: usize, idle_interval: Duration, now: Instant) -> Self {
        let max_records = max_records.max(1);
        Self {
            pending: Vec::with_capacity(max_records),
            started_at: Utc::now(),
            last_flush: now,
            max_records,
            idle_interval,
        }
    }

    pub fn append(&mut self, record: Record) {
        self.pending.push(record);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Count trigger only
    pub fn is_full(&self) -> bool {
        self.pending.len() >= self.max_records
    }

    /// Idle trigger only: never fires on an empty batch
    pub fn is_idle(&self, now: Instant) -> bool {
        !self.pending.is_empty() && now.saturating_duration_since(self.last_flush) >= self.idle_interval
    }

    /// Which trigger, if any, fires at `now`; `None` means keep buffering
    pub fn flush_reason(&self, now: Instant) -> Option<FlushReason> {
        if self.is_full() {
            Some(FlushReason::Size)
        } else if self.is_idle(now) {
            Some(FlushReason::Idle)
        } else {
            None
        }
    }

    /// Hand over everything pending as a new batch and start an empty one
    pub fn drain(&mut self, reason: FlushReason) -> Batch {
        let records = std::mem::replace(&mut self.pending, Vec::with_capacity(self.max_records));
        let created_at = std::mem::replace(&mut self.started_at, Utc::now());
        Batch {
            records,
            created_at,
            reason,
        }
    }

    /// Record completion of a flush; the idle window restarts here
    pub fn mark_flushed(&mut self, now: Instant) {
        self.last_flush = now;
    }
}
