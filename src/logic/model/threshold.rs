//! Batch-local Threshold
//!
//! A record is anomalous when its score strictly exceeds the configured
//! percentile of the scores in its own batch. The cutoff is recomputed per
//! batch, so it bounds the anomaly *rate* (~2% at p98), not the severity.

use serde::Serialize;

/// Percentile with linear interpolation between closest ranks
/// (`rank = p/100 * (n - 1)`). `None` for an empty slice.
pub fn percentile(scores: &[f64], pct: f64) -> Option<f64> {
    if scores.is_empty() {
        return None;
    }

    let mut sorted = scores.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let rank = (pct.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

/// Cutoff plus per-record flags
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub cutoff: Option<f64>,
    pub flags: Vec<bool>,
}

impl Classification {
    pub fn anomaly_count(&self) -> usize {
        self.flags.iter().filter(|&&f| f).count()
    }
}

/// Flag scores strictly above the batch's `pct` percentile
pub fn classify(scores: &[f64], pct: f64) -> Classification {
    let cutoff = percentile(scores, pct);
    let flags = match cutoff {
        Some(cutoff) => scores.iter().map(|&s| s > cutoff).collect(),
        None => Vec::new(),
    };
    Classification { cutoff, flags }
}
