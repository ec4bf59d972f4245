//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.
//! Environment variables in `logic::config` override these at startup.

/// Default append-only record log tailed by the processor
pub const DEFAULT_EVENTS_LOG: &str = "data/events.log";

/// Default root of the "all records" lake
pub const DEFAULT_LAKE_EVENTS_DIR: &str = "lake/events";

/// Default root of the "anomalies only" lake
pub const DEFAULT_LAKE_ANOMALIES_DIR: &str = "lake/anomalies";

/// Default ONNX model artifact
pub const DEFAULT_MODEL_PATH: &str = "artifacts/model.onnx";

/// Count trigger: flush once this many records are pending
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Idle trigger (seconds since last flush)
pub const DEFAULT_FLUSH_SECONDS: u64 = 3;

/// Sleep between polls when the log has no new data (milliseconds)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Batch-local anomaly cutoff percentile
pub const DEFAULT_ANOMALY_PERCENTILE: f64 = 98.0;

/// Upper bound of the backoff while waiting for the log to appear (milliseconds)
pub const DEFAULT_SOURCE_RETRY_MS: u64 = 1_000;

/// Initial backoff while waiting for the log to appear (milliseconds)
pub const SOURCE_RETRY_INITIAL_MS: u64 = 100;

/// Write attempts per output file before the flush fails
pub const DEFAULT_WRITE_RETRIES: u32 = 5;

/// Initial write retry backoff (milliseconds)
pub const DEFAULT_WRITE_RETRY_BASE_MS: u64 = 250;

/// Write retry backoff ceiling (milliseconds)
pub const WRITE_RETRY_MAX_MS: u64 = 5_000;

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "Anomaly Stream Processor";
