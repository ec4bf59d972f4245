//! Configuration module
//!
//! Processor settings are read from environment variables (optionally seeded
//! from a `.env` file by the binary). Unparsable values fall back to the
//! defaults in `crate::constants` with a warning; `validate` rejects values
//! that parse but make no sense.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::constants::*;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("BATCH_SIZE must be at least 1")]
    ZeroBatchSize,

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("ANOMALY_PERCENTILE must be within 0..=100, got {0}")]
    PercentileOutOfRange(f64),

    #[error("WRITE_RETRIES must be at least 1")]
    ZeroWriteRetries,

    #[error("LAKE_EVENTS_DIR and LAKE_ANOMALIES_DIR must differ ({0})")]
    SharedLakeRoot(String),
}

/// Processor configuration
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Append-only record log to tail
    pub events_log: PathBuf,

    /// Root directory of the "all records" lake
    pub lake_events_dir: PathBuf,

    /// Root directory of the "anomalies only" lake
    pub lake_anomalies_dir: PathBuf,

    /// ONNX model artifact
    pub model_path: PathBuf,

    /// Expected SHA-256 of the model artifact (hex); unchecked when absent
    pub model_sha256: Option<String>,

    /// Count trigger
    pub batch_size: usize,

    /// Idle trigger
    pub flush_interval: Duration,

    /// Sleep between polls on end of stream
    pub poll_interval: Duration,

    /// Batch-local anomaly cutoff percentile
    pub anomaly_percentile: f64,

    /// Backoff ceiling while waiting for the log to appear
    pub source_retry: Duration,

    /// Attempts per output file
    pub write_retries: u32,

    /// Initial write backoff, doubled after each failed attempt
    pub write_retry_base: Duration,

    /// Flush pending records once when shutdown is requested
    pub flush_on_shutdown: bool,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            events_log: PathBuf::from(DEFAULT_EVENTS_LOG),
            lake_events_dir: PathBuf::from(DEFAULT_LAKE_EVENTS_DIR),
            lake_anomalies_dir: PathBuf::from(DEFAULT_LAKE_ANOMALIES_DIR),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            model_sha256: None,
            batch_size: DEFAULT_BATCH_SIZE,
            flush_interval: Duration::from_secs(DEFAULT_FLUSH_SECONDS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            anomaly_percentile: DEFAULT_ANOMALY_PERCENTILE,
            source_retry: Duration::from_millis(DEFAULT_SOURCE_RETRY_MS),
            write_retries: DEFAULT_WRITE_RETRIES,
            write_retry_base: Duration::from_millis(DEFAULT_WRITE_RETRY_BASE_MS),
            flush_on_shutdown: true,
        }
    }
}

impl ProcessorConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let path = |key: &str, default: PathBuf| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(default)
        };

        Self {
            events_log: path("EVENTS_LOG", defaults.events_log),
            lake_events_dir: path("LAKE_EVENTS_DIR", defaults.lake_events_dir),
            lake_anomalies_dir: path("LAKE_ANOMALIES_DIR", defaults.lake_anomalies_dir),
            model_path: path("MODEL_PATH", defaults.model_path),
            model_sha256: lookup("MODEL_SHA256")
                .map(|v| v.trim().to_lowercase())
                .filter(|v| !v.is_empty()),
            batch_size: parse_or(&lookup, "BATCH_SIZE", defaults.batch_size),
            flush_interval: Duration::from_secs(parse_or(
                &lookup,
                "FLUSH_SECONDS",
                DEFAULT_FLUSH_SECONDS,
            )),
            poll_interval: Duration::from_millis(parse_or(
                &lookup,
                "POLL_INTERVAL_MS",
                DEFAULT_POLL_INTERVAL_MS,
            )),
            anomaly_percentile: parse_or(&lookup, "ANOMALY_PERCENTILE", defaults.anomaly_percentile),
            source_retry: Duration::from_millis(parse_or(
                &lookup,
                "SOURCE_RETRY_MS",
                DEFAULT_SOURCE_RETRY_MS,
            )),
            write_retries: parse_or(&lookup, "WRITE_RETRIES", defaults.write_retries),
            write_retry_base: Duration::from_millis(parse_or(
                &lookup,
                "WRITE_RETRY_BASE_MS",
                DEFAULT_WRITE_RETRY_BASE_MS,
            )),
            flush_on_shutdown: parse_flag(&lookup, "FLUSH_ON_SHUTDOWN", defaults.flush_on_shutdown),
        }
    }

    /// Reject settings that parse but cannot drive the processor
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.flush_interval.is_zero() {
            return Err(ConfigError::ZeroDuration("FLUSH_SECONDS"));
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::ZeroDuration("POLL_INTERVAL_MS"));
        }
        if !(0.0..=100.0).contains(&self.anomaly_percentile) {
            return Err(ConfigError::PercentileOutOfRange(self.anomaly_percentile));
        }
        if self.write_retries == 0 {
            return Err(ConfigError::ZeroWriteRetries);
        }
        if self.lake_events_dir == self.lake_anomalies_dir {
            return Err(ConfigError::SharedLakeRoot(
                self.lake_events_dir.display().to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                log::warn!("Ignoring invalid {}={:?}, using default {}", key, raw, default);
                default
            }
        },
        None => default,
    }
}

fn parse_flag<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    let raw = match lookup(key) {
        Some(raw) => raw,
        None => return default,
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => {
            log::warn!("Ignoring invalid {}={:?}, using default {}", key, raw, default);
            default
        }
    }
}
