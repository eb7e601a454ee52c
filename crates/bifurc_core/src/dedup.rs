//! Merging of roots found from different seeds.
//!
//! Two roots are the same root when every component agrees after rounding
//! to a fixed number of decimals. Insertion order is preserved.

/// Rounds to `decimals` places. Negative zero is folded into zero.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    let scaled = value * scale;
    if !scaled.is_finite() {
        return value;
    }
    scaled.round() / scale + 0.0
}

pub fn round_vector(values: &[f64], decimals: u32) -> Vec<f64> {
    values.iter().map(|&v| round_to(v, decimals)).collect()
}

/// Appends `candidate` unless an equal value is already present.
pub(crate) fn push_distinct_scalar(set: &mut Vec<f64>, candidate: f64) -> bool {
    if set.contains(&candidate) {
        return false;
    }
    set.push(candidate);
    true
}

/// Appends the rounded `candidate` unless a rounded vector equal in every
/// component is already present.
pub(crate) fn push_distinct(set: &mut Vec<Vec<f64>>, candidate: &[f64], decimals: u32) -> bool {
    let rounded = round_vector(candidate, decimals);
    if set.iter().any(|existing| existing == &rounded) {
        return false;
    }
    set.push(rounded);
    true
}
