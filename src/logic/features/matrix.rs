//! Feature Matrix - rows = records, columns = `FEATURE_LAYOUT`

use ndarray::Array2;

use super::layout::FEATURE_COUNT;
use crate::logic::record::Record;

/// Scoring input for one batch
pub type FeatureMatrix = Array2<f64>;

/// Build the `[n, FEATURE_COUNT]` matrix for a slice of records
pub fn build_matrix(records: &[Record]) -> FeatureMatrix {
    let mut matrix = Array2::<f64>::zeros((records.len(), FEATURE_COUNT));
    for (mut row, record) in matrix.rows_mut().into_iter().zip(records) {
        for (cell, value) in row.iter_mut().zip(record.features()) {
            *cell = value;
        }
    }
    matrix
}

/// Narrow to `f32` for model runtimes that only take single precision
pub fn to_f32(matrix: &FeatureMatrix) -> Array2<f32> {
    matrix.mapv(|v| v as f32)
}
