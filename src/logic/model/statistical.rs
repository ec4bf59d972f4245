//! Statistical fallback scorer
//!
//! Score of a row = max |z| over its columns, with mean and population
//! standard deviation computed across the batch itself. Needs no artifact
//! and cannot fail.

use ndarray::Axis;

use super::{ScoreError, Scorer};
use crate::logic::features::FeatureMatrix;

/// Floor for the per-column standard deviation (constant columns score 0)
pub const STD_EPSILON: f64 = 1e-6;

#[derive(Debug, Default, Clone)]
pub struct StatisticalScorer;

impl StatisticalScorer {
    pub fn new() -> Self {
        Self
    }

    /// Infallible scoring, used directly for per-batch fallback
    pub fn score_matrix(&self, features: &FeatureMatrix) -> Vec<f64> {
        if features.nrows() == 0 {
            return Vec::new();
        }

        let mean = match features.mean_axis(Axis(0)) {
            Some(mean) => mean,
            None => return vec![0.0; features.nrows()],
        };
        let std = features.std_axis(Axis(0), 0.0).mapv(|s| s.max(STD_EPSILON));

        features
            .rows()
            .into_iter()
            .map(|row| {
                row.iter()
                    .zip(mean.iter().zip(std.iter()))
                    .map(|(value, (mu, sd))| ((value - mu) / sd).abs())
                    .fold(0.0, f64::max)
            })
            .collect()
    }
}

impl Scorer for StatisticalScorer {
    fn name(&self) -> &'static str {
        "zscore"
    }

    fn score(&mut self, features: &FeatureMatrix) -> Result<Vec<f64>, ScoreError> {
        Ok(self.score_matrix(features))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    #[test]
    fn test_identical_rows_score_zero() {
        let matrix = Array2::from_elem((50, 5), 1.0);
        let scores = StatisticalScorer::new().score_matrix(&matrix);

        assert_eq!(scores.len(), 50);
        assert!(scores.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_outlier_gets_highest_score() {
        let matrix = array![
            [1.0, 2.0, 3.0, 0.1, 0.2],
            [1.1, 2.1, 2.9, 0.1, 0.2],
            [0.9, 1.9, 3.1, 0.1, 0.2],
            [1.0, 2.0, 3.0, 0.1, 0.2],
            [9.0, 2.0, 3.0, 0.1, 0.2],
        ];
        let scores = StatisticalScorer::new().score_matrix(&matrix);

        let top = scores
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(top, 4);
    }

    #[test]
    fn test_max_abs_zscore_value() {
        // Column 0: values 0 and 2 -> mean 1, population std 1 -> |z| = 1
        let matrix = array![[0.0, 5.0], [2.0, 5.0]];
        let scores = StatisticalScorer::new().score_matrix(&matrix);
        assert!((scores[0] - 1.0).abs() < 1e-12);
        assert!((scores[1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_matrix() {
        let matrix = Array2::<f64>::zeros((0, 5));
        assert!(StatisticalScorer::new().score_matrix(&matrix).is_empty());
    }
}
