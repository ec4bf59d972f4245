//! Batch Module - windowed accumulation of records
//!
//! The assembler is the only owner of pending records. A flush is triggered
//! either by size (count threshold) or by idleness (time since the last flush
//! with at least one record pending); an empty batch never flushes.

pub mod assembler;

#[cfg(test)]
mod tests;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::features::{build_matrix, FeatureMatrix};
use super::record::Record;

pub use assembler::BatchAssembler;

/// Why a batch was flushed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlushReason {
    /// Count threshold reached
    Size,
    /// Idle interval elapsed with records pending
    Idle,
    /// Final flush on shutdown
    Shutdown,
}

impl std::fmt::Display for FlushReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlushReason::Size => write!(f, "size"),
            FlushReason::Idle => write!(f, "idle"),
            FlushReason::Shutdown => write!(f, "shutdown"),
        }
    }
}

/// Records handed over by one `drain`
#[derive(Debug, Clone)]
pub struct Batch {
    pub records: Vec<Record>,
    pub created_at: DateTime<Utc>,
    pub reason: FlushReason,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Scoring input: one row per record in batch order
    pub fn feature_matrix(&self) -> FeatureMatrix {
        build_matrix(&self.records)
    }
}
