//! Processor Loop - read → buffer → flush-decision → score → classify → write
//!
//! Single thread of control: the loop owns the source cursor, the pending
//! batch and the scorer. Shutdown is only observed between polls; a flush
//! that has started always runs to completion.

pub mod stats;


use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;

use super::batch::{Batch, BatchAssembler, FlushReason};
use super::config::ProcessorConfig;
use super::lake::{AnomalyRow, LakeWriter, WriteError};
use super::model::{classify, load_scorer, ScoreError, Scorer, StatisticalScorer};
use super::source::{LogTail, ReadOutcome, RecordSource, SourceError};

pub use stats::ProcessorStats;

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("flush failed: {0}")]
    Write(#[from] WriteError),

    #[error("startup failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Loop state once the source is open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProcessorState {
    Polling,
    Flushing,
}

/// What one poll did
#[derive(Debug)]
pub enum Step {
    /// Record appended, no trigger fired
    Buffered,
    /// A trigger fired and the batch was written
    Flushed(FlushReport),
    /// Nothing new to read; caller should sleep
    Idle,
    /// Line dropped (malformed)
    Skipped,
}

/// Outcome of one flush
#[derive(Debug, Clone, Serialize)]
pub struct FlushReport {
    pub reason: FlushReason,
    pub rows: usize,
    pub anomalies: usize,
    pub cutoff: Option<f64>,
    pub scorer: &'static str,
    pub events_file: Option<PathBuf>,
    pub anomalies_file: Option<PathBuf>,
}

/// A batch with one score and one flag per record
#[derive(Debug, Clone)]
pub struct ScoredBatch {
    pub batch: Batch,
    pub scores: Vec<f64>,
    pub flags: Vec<bool>,
    pub cutoff: Option<f64>,
    pub scorer: &'static str,
}

impl ScoredBatch {
    pub fn anomaly_count(&self) -> usize {
        self.flags.iter().filter(|&&f| f).count()
    }

    /// Flagged records only, in batch order
    pub fn anomalies(&self) -> Vec<AnomalyRow<'_>> {
        self.batch
            .records
            .iter()
            .zip(self.scores.iter().zip(self.flags.iter()))
            .filter(|(_, (_, &flag))| flag)
            .map(|(record, (&score, &is_anomaly))| AnomalyRow {
                record,
                score,
                is_anomaly,
            })
            .collect()
    }
}

pub struct Processor<S: RecordSource> {
    source: S,
    assembler: BatchAssembler,
    scorer: Box<dyn Scorer>,
    fallback: StatisticalScorer,
    writer: LakeWriter,
    percentile: f64,
    poll_interval: Duration,
    flush_on_shutdown: bool,
    state: ProcessorState,
    stats: ProcessorStats,
}

impl Processor<LogTail> {
    /// `Starting` then `AwaitingSource`.
    ///
    /// Returns `Ok(None)` when shutdown is requested before the log appears.
    pub fn start(config: &ProcessorConfig, shutdown: &AtomicBool) -> Result<Option<Self>, ProcessorError> {
        log::info!("[processor] starting...");
        let scorer = load_scorer(&config.model_path, config.model_sha256.as_deref());

        fs::create_dir_all(&config.lake_events_dir)?;
        fs::create_dir_all(&config.lake_anomalies_dir)?;

        log::debug!("[processor] waiting for {}", config.events_log.display());
        let tail = LogTail::wait_for(&config.events_log, config.source_retry, || {
            shutdown.load(Ordering::SeqCst)
        })?;

        Ok(tail.map(|tail| {
            let writer = LakeWriter::from_config(config);
            Self::new(config, tail, scorer, writer)
        }))
    }
}

impl<S: RecordSource> Processor<S> {
    pub fn new(config: &ProcessorConfig, source: S, scorer: Box<dyn Scorer>, writer: LakeWriter) -> Self {
        log::info!(
            "Processor ready: scorer={}, batch_size={}, flush_interval={:?}, percentile={}",
            scorer.name(),
            config.batch_size,
            config.flush_interval,
            config.anomaly_percentile
        );

        Self {
            source,
            assembler: BatchAssembler::new(config.batch_size, config.flush_interval, Instant::now()),
            scorer,
            fallback: StatisticalScorer::new(),
            writer,
            percentile: config.anomaly_percentile,
            poll_interval: config.poll_interval,
            flush_on_shutdown: config.flush_on_shutdown,
            state: ProcessorState::Polling,
            stats: ProcessorStats::default(),
        }
    }

    pub fn state(&self) -> ProcessorState {
        self.state
    }

    pub fn stats(&self) -> &ProcessorStats {
        &self.stats
    }

    pub fn scorer_name(&self) -> &'static str {
        self.scorer.name()
    }

    /// Records waiting for the next flush
    pub fn pending(&self) -> usize {
        self.assembler.len()
    }

    /// One poll: read at most one record and flush if a trigger fires
    pub fn step(&mut self, now: Instant) -> Result<Step, ProcessorError> {
        match self.source.next_record() {
            Ok(ReadOutcome::Record(record)) => {
                self.stats.records_read += 1;
                self.assembler.append(record);
                if self.assembler.is_full() {
                    let report = self.flush(FlushReason::Size)?;
                    return Ok(Step::Flushed(report));
                }
                Ok(Step::Buffered)
            }
            Ok(ReadOutcome::EndOfStream) => match self.assembler.flush_reason(now) {
                Some(reason) => Ok(Step::Flushed(self.flush(reason)?)),
                None => Ok(Step::Idle),
            },
            Err(SourceError::Malformed { offset, reason }) => {
                self.stats.malformed_lines += 1;
                log::warn!("[warn] bad line at byte {}, skipping: {}", offset, reason);
                Ok(Step::Skipped)
            }
            Err(SourceError::Io(e)) => {
                self.stats.read_errors += 1;
                log::warn!("Reading the log failed, will retry: {}", e);
                Ok(Step::Idle)
            }
        }
    }

    /// Score with the bound scorer, falling back to z-scores for this batch only
    pub fn score_batch(&mut self, batch: Batch) -> ScoredBatch {
        let matrix = batch.feature_matrix();

        let primary = self.scorer.score(&matrix).and_then(|scores| {
            if scores.len() == batch.len() {
                Ok(scores)
            } else {
                Err(ScoreError::LengthMismatch {
                    expected: batch.len(),
                    actual: scores.len(),
                })
            }
        });

        let (scores, scorer) = match primary {
            Ok(scores) => (scores, self.scorer.name()),
            Err(e) => {
                self.stats.model_fallbacks += 1;
                log::warn!("[processor] model scoring failed, fallback: {}", e);
                (self.fallback.score_matrix(&matrix), self.fallback.name())
            }
        };

        let classification = classify(&scores, self.percentile);
        ScoredBatch {
            batch,
            scores,
            flags: classification.flags,
            cutoff: classification.cutoff,
            scorer,
        }
    }

    /// Drain, score, classify and write both destinations.
    ///
    /// The idle window restarts when the writes finish, so time spent in
    /// write retries never counts towards the next idle flush.
    pub fn flush(&mut self, reason: FlushReason) -> Result<FlushReport, ProcessorError> {
        self.state = ProcessorState::Flushing;

        let batch = self.assembler.drain(reason);
        let scored = self.score_batch(batch);
        let flushed_at = Utc::now();

        let events_file = self.writer.write_events(&scored.batch.records, flushed_at)?;
        let anomalies = scored.anomalies();
        let anomalies_file = self.writer.write_anomalies(&anomalies, flushed_at)?;

        self.assembler.mark_flushed(Instant::now());
        self.state = ProcessorState::Polling;

        let report = FlushReport {
            reason,
            rows: scored.batch.len(),
            anomalies: anomalies.len(),
            cutoff: scored.cutoff,
            scorer: scored.scorer,
            events_file,
            anomalies_file,
        };

        if report.rows > 0 {
            self.stats.flushes += 1;
            self.stats.rows_written += report.rows as u64;
            self.stats.anomalies_written += report.anomalies as u64;
        }

        log::debug!(
            "Flushed ({}) {} rows, {} anomalies via {} (cutoff {:?}); totals: {}",
            report.reason,
            report.rows,
            report.anomalies,
            report.scorer,
            report.cutoff,
            self.stats
        );

        Ok(report)
    }

    /// Poll until `shutdown` is set, then flush what is pending.
    ///
    /// Only a write failure that survived its retries ends the loop early.
    pub fn run(&mut self, shutdown: &AtomicBool) -> Result<ProcessorStats, ProcessorError> {
        log::info!("Processor loop started");

        while !shutdown.load(Ordering::SeqCst) {
            if let Step::Idle = self.step(Instant::now())? {
                thread::sleep(self.poll_interval);
            }
        }

        if self.flush_on_shutdown && !self.assembler.is_empty() {
            log::info!("Shutdown requested, flushing {} pending records", self.assembler.len());
            self.flush(FlushReason::Shutdown)?;
        } else if !self.assembler.is_empty() {
            log::warn!("Shutdown requested, dropping {} pending records", self.assembler.len());
        }

        log::info!("Processor stopped: {}", self.stats);
        Ok(self.stats.clone())
    }
}

/// Full lifecycle for the binary: start, wait for the log, poll until shutdown
pub fn run_until_shutdown(
    config: &ProcessorConfig,
    shutdown: &AtomicBool,
) -> Result<ProcessorStats, ProcessorError> {
    match Processor::start(config, shutdown)? {
        Some(mut processor) => processor.run(shutdown),
        None => {
            log::info!("Shutdown requested before {} appeared", config.events_log.display());
            Ok(ProcessorStats::default())
        }
    }
}
