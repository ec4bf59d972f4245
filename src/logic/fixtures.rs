//! Shared test builders

use std::path::PathBuf;

use chrono::{TimeZone, Utc};

use super::features::FEATURE_COUNT;
use super::record::Record;

pub fn record(user: &str, values: [f64; FEATURE_COUNT]) -> Record {
    Record {
        ts: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        user_id: user.to_string(),
        metric1: values[0],
        metric2: values[1],
        metric3: values[2],
        feature_a: values[3],
        feature_b: values[4],
        tag: None,
    }
}

/// The same record as one log line
pub fn json_line(user: &str, values: [f64; FEATURE_COUNT]) -> String {
    serde_json::to_string(&record(user, values)).unwrap()
}

/// Tiny ONNX graph over a `[N, 5]` float input with two outputs:
/// `scores = -sum(row)` and, declared last, `raw = sum(row)`
pub fn scores_model_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("testdata")
        .join("sum_scores.onnx")
}
