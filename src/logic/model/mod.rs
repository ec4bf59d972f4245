//! Model Module - Anomaly scoring
//!
//! Two scorers behind one trait: a pre-trained ONNX outlier model and a
//! statistical z-score fallback. The scorer is chosen once at startup by
//! `load_scorer`; per-batch fallback on scoring errors is decided by the
//! processor, not here.

pub mod onnx;
pub mod statistical;
pub mod threshold;

use std::path::Path;

use thiserror::Error;

use super::features::FeatureMatrix;

// Re-export common types
pub use onnx::{ModelLoadError, ModelMetadata, OnnxScorer};
pub use statistical::StatisticalScorer;
pub use threshold::{classify, percentile};

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error("model inference failed: {0}")]
    Inference(String),

    #[error("model returned {actual} scores for {expected} rows")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("model returned a non-finite score at row {0}")]
    NonFinite(usize),
}

// ============================================================================
// SCORER TRAIT
// ============================================================================

/// Per-record anomaly scores, higher = more anomalous
pub trait Scorer: Send {
    /// Short name used in logs and flush reports
    fn name(&self) -> &'static str;

    fn score(&mut self, features: &FeatureMatrix) -> Result<Vec<f64>, ScoreError>;
}

/// Bind the scorer for the whole run.
///
/// A missing artifact, a checksum mismatch or a load error all permanently
/// select the statistical scorer; the model is never retried.
pub fn load_scorer(model_path: &Path, expected_sha256: Option<&str>) -> Box<dyn Scorer> {
    if !model_path.exists() {
        log::info!(
            "No model at {} - using z-score fallback",
            model_path.display()
        );
        return Box::new(StatisticalScorer::new());
    }

    match OnnxScorer::load(model_path, expected_sha256) {
        Ok(scorer) => {
            let meta = scorer.metadata();
            log::info!(
                "Loaded model: {} (sha256 {}, output {:?})",
                meta.model_path,
                meta.sha256,
                meta.score_output
            );
            Box::new(scorer)
        }
        Err(e) => {
            log::warn!("Failed to load model, using z-score fallback: {}", e);
            Box::new(StatisticalScorer::new())
        }
    }
}
