//! End-of-session summary statistics.
//!
//! Conventions match the analysis pipeline exactly:
//! - median: middle element (odd), mean of the two middle elements (even)
//! - speed S: median prime time over valid trials
//! - accuracy A: percent correct over valid trials
//! - risk Δ: mean prime time (incorrect) − mean prime time (correct)
//!
//! Every quantity collapses to 0 when its denominator set is empty.

use crate::session::TrialResult;
use serde::{Deserialize, Serialize};

/// Median with the even-count averaging convention. 0 for an empty slice.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 != 0 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Read-only artifact computed once when a session finishes.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SummaryStats {
    pub speed_median_ms: f64,
    pub accuracy_percent: f64,
    pub risk_delta_ms: f64,
}

/// Summarize a completed result set.
///
/// A trial is valid when its prime time is positive; anticipatory presses
/// (prime ≤ 0) carry no decision-time information and are excluded.
pub fn summarize(results: &[TrialResult]) -> SummaryStats {
    let valid: Vec<&TrialResult> = results.iter().filter(|r| r.prime_time_ms > 0.0).collect();

    let primes: Vec<f64> = valid.iter().map(|r| r.prime_time_ms).collect();
    let correct: Vec<f64> = valid
        .iter()
        .filter(|r| r.is_correct)
        .map(|r| r.prime_time_ms)
        .collect();
    let incorrect: Vec<f64> = valid
        .iter()
        .filter(|r| !r.is_correct)
        .map(|r| r.prime_time_ms)
        .collect();

    let accuracy_percent = if valid.is_empty() {
        0.0
    } else {
        correct.len() as f64 / valid.len() as f64 * 100.0
    };

    SummaryStats {
        speed_median_ms: median(&primes),
        accuracy_percent,
        risk_delta_ms: mean(&incorrect) - mean(&correct),
    }
}
