//! Inference Engine - ONNX Runtime Integration
//!
//! Wraps a pre-trained outlier model (e.g. an IsolationForest exported with
//! skl2onnx). The model returns a per-row *normality* score; the scorer
//! negates it so that higher always means more anomalous.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;

use super::{ScoreError, Scorer};
use crate::logic::features::matrix::to_f32;
use crate::logic::features::{FeatureMatrix, FEATURE_COUNT};

/// Output name skl2onnx gives the decision scores of outlier detectors
const SCORES_OUTPUT: &str = "scores";

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Model metadata
#[derive(Debug, Clone, Serialize)]
pub struct ModelMetadata {
    pub model_path: String,
    pub sha256: String,
    pub inputs: Vec<String>,
    pub score_output: String,
    pub features: usize,
    pub loaded_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum ModelLoadError {
    #[error("cannot read model: {0}")]
    Io(#[from] std::io::Error),

    #[error("checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("failed to build session: {0}")]
    Session(String),

    #[error("model declares no outputs")]
    NoOutputs,
}

// ============================================================================
// ONNX SCORER
// ============================================================================

pub struct OnnxScorer {
    session: Session,
    metadata: ModelMetadata,
}

impl OnnxScorer {
    /// Load ONNX model from file, verifying its checksum when one is given
    pub fn load(model_path: &Path, expected_sha256: Option<&str>) -> Result<Self, ModelLoadError> {
        log::info!("Loading ONNX model from: {}", model_path.display());

        let bytes = fs::read(model_path)?;
        let digest = sha256_hex(&bytes);
        if let Some(expected) = expected_sha256 {
            if !expected.eq_ignore_ascii_case(&digest) {
                return Err(ModelLoadError::ChecksumMismatch {
                    expected: expected.to_string(),
                    actual: digest,
                });
            }
        }

        let session = Session::builder()
            .map_err(|e| ModelLoadError::Session(format!("session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| ModelLoadError::Session(format!("optimization: {}", e)))?
            .commit_from_memory(&bytes)
            .map_err(|e| ModelLoadError::Session(format!("load: {}", e)))?;

        let score_output = session
            .outputs
            .iter()
            .find(|o| o.name == SCORES_OUTPUT)
            .or_else(|| session.outputs.last())
            .map(|o| o.name.clone())
            .ok_or(ModelLoadError::NoOutputs)?;

        let metadata = ModelMetadata {
            model_path: model_path.display().to_string(),
            sha256: digest,
            inputs: session.inputs.iter().map(|i| i.name.clone()).collect(),
            score_output,
            features: FEATURE_COUNT,
            loaded_at: Utc::now(),
        };
        log::debug!("Model metadata: {:?}", metadata);

        Ok(Self { session, metadata })
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    /// Raw normality scores, one per row
    fn normality(&mut self, features: &FeatureMatrix) -> Result<Vec<f32>, ScoreError> {
        let input = Tensor::from_array(to_f32(features))
            .map_err(|e| ScoreError::Inference(format!("tensor: {}", e)))?;

        let outputs = self
            .session
            .run(ort::inputs![input])
            .map_err(|e| ScoreError::Inference(format!("run: {}", e)))?;

        let output = outputs
            .get(self.metadata.score_output.as_str())
            .ok_or_else(|| ScoreError::Inference(format!("missing output {}", self.metadata.score_output)))?;

        let (_, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| ScoreError::Inference(format!("extract: {}", e)))?;

        Ok(data.to_vec())
    }
}

impl Scorer for OnnxScorer {
    fn name(&self) -> &'static str {
        "onnx"
    }

    fn score(&mut self, features: &FeatureMatrix) -> Result<Vec<f64>, ScoreError> {
        if features.nrows() == 0 {
            return Ok(Vec::new());
        }

        let normality = self.normality(features)?;
        let scores = negate_normality(&normality, features.nrows())?;
        Ok(scores)
    }
}

/// Validate model output and flip it so higher = more anomalous
pub(crate) fn negate_normality(normality: &[f32], rows: usize) -> Result<Vec<f64>, ScoreError> {
    if normality.len() != rows {
        return Err(ScoreError::LengthMismatch {
            expected: rows,
            actual: normality.len(),
        });
    }

    normality
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            if v.is_finite() {
                Ok(-(v as f64))
            } else {
                Err(ScoreError::NonFinite(i))
            }
        })
        .collect()
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::fixtures::scores_model_path;
    use ndarray::{array, Array2};

    #[test]
    fn test_load_picks_named_scores_output() {
        let scorer = OnnxScorer::load(&scores_model_path(), None).unwrap();
        let meta = scorer.metadata();

        assert_eq!(meta.score_output, "scores");
        assert_eq!(meta.inputs, vec!["input".to_string()]);
        assert_eq!(meta.features, FEATURE_COUNT);
    }

    #[test]
    fn test_score_negates_model_output() {
        // Graph output `scores` is -sum(row), so the anomaly score is the row sum
        let mut scorer = OnnxScorer::load(&scores_model_path(), None).unwrap();
        let features = array![
            [1.0, 2.0, 3.0, 4.0, 5.0],
            [0.0, 0.0, 0.0, 0.0, 0.0],
            [-1.0, 0.5, 0.5, 0.0, 0.0],
        ];

        let scores = scorer.score(&features).unwrap();
        assert_eq!(scores, vec![15.0, 0.0, 0.0]);
    }

    #[test]
    fn test_score_empty_batch_skips_session() {
        let mut scorer = OnnxScorer::load(&scores_model_path(), None).unwrap();
        let features = Array2::<f64>::zeros((0, FEATURE_COUNT));
        assert!(scorer.score(&features).unwrap().is_empty());
    }

    #[test]
    fn test_wrong_input_width_is_score_error() {
        let mut scorer = OnnxScorer::load(&scores_model_path(), None).unwrap();
        let features = Array2::<f64>::ones((2, 3));

        let err = scorer.score(&features).unwrap_err();
        assert!(matches!(err, ScoreError::Inference(_)));
    }

    #[test]
    fn test_checksum_mismatch_rejected() {
        let err = OnnxScorer::load(&scores_model_path(), Some("deadbeef")).err().unwrap();
        assert!(matches!(err, ModelLoadError::ChecksumMismatch { .. }));
    }

    #[test]
    fn test_negate_normality() {
        let scores = negate_normality(&[0.25, -0.5], 2).unwrap();
        assert_eq!(scores, vec![-0.25, 0.5]);
    }

    #[test]
    fn test_negate_rejects_wrong_length() {
        let err = negate_normality(&[0.1, 0.2, 0.3], 2).unwrap_err();
        assert!(matches!(err, ScoreError::LengthMismatch { expected: 2, actual: 3 }));
    }

    #[test]
    fn test_negate_rejects_nan() {
        let err = negate_normality(&[0.1, f32::NAN], 2).unwrap_err();
        assert!(matches!(err, ScoreError::NonFinite(1)));
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
