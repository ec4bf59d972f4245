//! Anomaly Stream Processor
//!
//! Tails a JSONL event log, scores records in small batches and writes the
//! results to a Parquet lake partitioned by flush minute.

pub mod constants;
pub mod logic;

pub use logic::config::{ConfigError, ProcessorConfig};
pub use logic::processor::{run_until_shutdown, Processor, ProcessorError, ProcessorStats};
