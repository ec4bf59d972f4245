//! Feature Layout - Centralized Feature Definition
//!
//! Column order of the scoring matrix. The offline trainer fits the model on
//! exactly this order, so reordering here silently breaks model scores.

/// Feature names in exact order they appear in a matrix row
pub const FEATURE_LAYOUT: &[&str] = &[
    "metric1",   // 0
    "metric2",   // 1
    "metric3",   // 2
    "feature_a", // 3
    "feature_b", // 4
];

/// Total number of features
/// IMPORTANT: Must match FEATURE_LAYOUT.len()!
pub const FEATURE_COUNT: usize = 5;

/// Get feature index by name
pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_LAYOUT.iter().position(|&n| n == name)
}

/// Get feature name by index
pub fn feature_name(index: usize) -> Option<&'static str> {
    FEATURE_LAYOUT.get(index).copied()
}
