//! Peak detection on sampled signals and frequency estimation from the
//! spacing between peaks.

use crate::error::OscillationError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakSettings {
    /// Minimum height of a peak (inclusive).
    pub threshold: f64,
    /// Multiplies sample times before inverting the mean period, e.g. `1e-3`
    /// to report Hz for a signal sampled in milliseconds.
    pub time_scale: f64,
}

impl Default for PeakSettings {
    fn default() -> Self {
        Self {
            threshold: 0.0,
            time_scale: 1.0,
        }
    }
}

/// Indices of local maxima with height `>= threshold`.
///
/// A peak is a sample strictly greater than its left neighbour and strictly
/// greater than the first different sample to its right. Flat tops report
/// their middle index (rounded down). The first and last samples are never
/// peaks.
pub fn find_peaks(signal: &[f64], threshold: f64) -> Vec<usize> {
    let mut peaks = Vec::new();
    if signal.len() < 3 {
        return peaks;
    }
    let last = signal.len() - 1;
    let mut i = 1;
    while i < last {
        if signal[i - 1] < signal[i] {
            let mut ahead = i + 1;
            while ahead < last && signal[ahead] == signal[i] {
                ahead += 1;
            }
            if signal[ahead] < signal[i] {
                if signal[i] >= threshold {
                    peaks.push((i + ahead - 1) / 2);
                }
                i = ahead;
                continue;
            }
        }
        i += 1;
    }
    peaks
}

/// Frequency of `signal` sampled every `dt`: the inverse of the mean gap
/// between consecutive peaks.
pub fn extract_frequency(
    signal: &[f64],
    dt: f64,
    settings: PeakSettings,
) -> Result<f64, OscillationError> {
    if signal.iter().any(|v| !v.is_finite()) {
        return Err(OscillationError::NumericOverflow);
    }
    let peaks = find_peaks(signal, settings.threshold);
    if peaks.len() < 2 {
        return Err(OscillationError::NoOscillationDetected { peaks: peaks.len() });
    }
    let scale = dt * settings.time_scale;
    let gaps: Vec<f64> = peaks
        .windows(2)
        .map(|w| (w[1] - w[0]) as f64 * scale)
        .collect();
    let mean = gaps.iter().sum::<f64>() / gaps.len() as f64;
    Ok(1.0 / mean.abs())
}

/// Max and min of a signal, or `None` when it is empty or non-finite.
pub fn envelope(signal: &[f64]) -> Option<(f64, f64)> {
    if signal.is_empty() || signal.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let max = signal.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = signal.iter().copied().fold(f64::INFINITY, f64::min);
    Some((max, min))
}
