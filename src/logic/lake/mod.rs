//! Lake Module - flush-minute partitioned Parquet output
//!
//! Layout under each destination root:
//!
//! ```text
//! lake/events/dt=2025-01-01T00-00/part-<uuid>.parquet
//! lake/anomalies/dt=2025-01-01T00-00/part-<uuid>.parquet
//! ```
//!
//! Partitions are keyed by the wall-clock minute of the flush, not by event
//! time. Files appear by rename only, so readers globbing `part-*.parquet`
//! never see a partial file.

pub mod partition;
pub mod schema;
pub mod writer;

#[cfg(test)]
mod tests;

use thiserror::Error;

pub use partition::partition_key;
pub use schema::AnomalyRow;
pub use writer::{LakeWriter, RetryPolicy};

/// Output destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    /// Every processed record
    Events,
    /// Flagged records plus `score` and `is_anomaly`
    Anomalies,
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Destination::Events => write!(f, "events"),
            Destination::Anomalies => write!(f, "anomalies"),
        }
    }
}

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("giving up on {destination} after {attempts} attempts: {last}")]
    Exhausted {
        destination: Destination,
        attempts: u32,
        last: Box<WriteError>,
    },
}
