//! Logic Module - Streaming pipeline
//!
//! - `source/` - Tail of the append-only event log
//! - `batch/` - Count/idle windowing of pending records
//! - `features/` - Fixed feature layout and matrix building
//! - `model/` - ONNX scorer, z-score fallback, percentile threshold
//! - `lake/` - Partitioned Parquet output with atomic visibility
//! - `processor/` - The loop tying them together

pub mod batch;
pub mod config;
pub mod features;
pub mod lake;
pub mod model;
pub mod processor;
pub mod record;
pub mod source;

#[cfg(test)]
pub(crate) mod fixtures;
