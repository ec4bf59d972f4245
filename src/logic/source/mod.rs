//! Record Source - resumable, append-only input of records
//!
//! `next_record` distinguishes three outcomes the loop treats differently:
//! a record, a normal end of currently available data, and a line-scoped
//! error that never stops processing.

pub mod tail;

use thiserror::Error;

use super::record::Record;

pub use tail::LogTail;

/// Result of one read attempt
#[derive(Debug)]
pub enum ReadOutcome {
    Record(Record),
    /// No complete new line right now
    EndOfStream,
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("malformed record at byte {offset}: {reason}")]
    Malformed { offset: u64, reason: String },

    #[error("log read failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for record inputs (log tail, in-memory feeds, ...)
pub trait RecordSource {
    fn next_record(&mut self) -> Result<ReadOutcome, SourceError>;
}
