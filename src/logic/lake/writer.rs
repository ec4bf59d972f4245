use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use arrow::record_batch::RecordBatch;
use chrono::{DateTime, Utc};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use super::partition::{part_file_name, partition_key, staging_name};
use super::schema::{encode_anomalies, encode_events, AnomalyRow};
use super::{Destination, WriteError};
use crate::constants::WRITE_RETRY_MAX_MS;
use crate::logic::config::ProcessorConfig;
use crate::logic::record::Record;

/// Exponential backoff for failed writes
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based)
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: crate::constants::DEFAULT_WRITE_RETRIES,
            base_delay: Duration::from_millis(crate::constants::DEFAULT_WRITE_RETRY_BASE_MS),
            max_delay: Duration::from_millis(WRITE_RETRY_MAX_MS),
        }
    }
}

pub struct LakeWriter {
    events_root: PathBuf,
    anomalies_root: PathBuf,
    retry: RetryPolicy,
}

impl LakeWriter {
    pub fn new(events_root: PathBuf, anomalies_root: PathBuf, retry: RetryPolicy) -> Self {
        Self {
            events_root,
            anomalies_root,
            retry,
        }
    }

    pub fn from_config(config: &ProcessorConfig) -> Self {
        Self::new(
            config.lake_events_dir.clone(),
            config.lake_anomalies_dir.clone(),
            RetryPolicy {
                attempts: config.write_retries.max(1),
                base_delay: config.write_retry_base,
                max_delay: Duration::from_millis(WRITE_RETRY_MAX_MS),
            },
        )
    }

    pub fn root(&self, destination: Destination) -> &Path {
        match destination {
            Destination::Events => &self.events_root,
            Destination::Anomalies => &self.anomalies_root,
        }
    }

    /// Write every record to the events lake
    pub fn write_events(
        &self,
        records: &[Record],
        flushed_at: DateTime<Utc>,
    ) -> Result<Option<PathBuf>, WriteError> {
        if records.is_empty() {
            return Ok(None);
        }
        let batch = encode_events(records)?;
        self.write(&batch, Destination::Events, flushed_at)
    }

    /// Write flagged rows to the anomalies lake
    pub fn write_anomalies(
        &self,
        rows: &[AnomalyRow<'_>],
        flushed_at: DateTime<Utc>,
    ) -> Result<Option<PathBuf>, WriteError> {
        if rows.is_empty() {
            return Ok(None);
        }
        let batch = encode_anomalies(rows)?;
        self.write(&batch, Destination::Anomalies, flushed_at)
    }

    /// Persist `batch` as a new part file of the flush-minute partition.
    ///
    /// No-op for an empty batch. Retries with backoff; the part file only
    /// becomes visible once fully written.
    pub fn write(
        &self,
        batch: &RecordBatch,
        destination: Destination,
        flushed_at: DateTime<Utc>,
    ) -> Result<Option<PathBuf>, WriteError> {
        if batch.num_rows() == 0 {
            return Ok(None);
        }

        let dir = self.root(destination).join(partition_key(flushed_at));
        let mut attempt = 1;

        loop {
            match write_atomic(&dir, batch) {
                Ok(path) => {
                    log::info!(
                        "[flush] wrote {} rows -> {}",
                        batch.num_rows(),
                        path.display()
                    );
                    return Ok(Some(path));
                }
                Err(e) if attempt < self.retry.attempts => {
                    let delay = self.retry.delay(attempt);
                    log::warn!(
                        "Write to {} failed (attempt {}/{}), retrying in {:?}: {}",
                        destination,
                        attempt,
                        self.retry.attempts,
                        delay,
                        e
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => {
                    return Err(WriteError::Exhausted {
                        destination,
                        attempts: attempt,
                        last: Box::new(e),
                    });
                }
            }
        }
    }
}

/// Write to a hidden staging file, fsync, then rename into place
fn write_atomic(dir: &Path, batch: &RecordBatch) -> Result<PathBuf, WriteError> {
    fs::create_dir_all(dir)?;

    let mut file_name = part_file_name();
    while dir.join(&file_name).exists() {
        file_name = part_file_name();
    }
    let final_path = dir.join(&file_name);
    let staging_path = dir.join(staging_name(&file_name));

    let result = encode_to(&staging_path, batch).and_then(|_| {
        fs::rename(&staging_path, &final_path)?;
        Ok(())
    });

    if let Err(e) = result {
        let _ = fs::remove_file(&staging_path);
        return Err(e);
    }

    Ok(final_path)
}

fn encode_to(path: &Path, batch: &RecordBatch) -> Result<(), WriteError> {
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))?;
    writer.write(batch)?;
    let file = writer.into_inner()?;
    file.sync_all()?;
    Ok(())
}
