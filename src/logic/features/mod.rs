//! Features Module - numeric view of records for scoring

pub mod layout;
pub mod matrix;

// Re-export common types
pub use layout::{FEATURE_COUNT, FEATURE_LAYOUT};
pub use matrix::{build_matrix, FeatureMatrix};
