//! Small numeric helpers shared by the statistics and correction code.

use std::cmp::Ordering;

/// Median of the finite values in `values`, or NaN when there are none.
///
/// Even-length inputs average the two middle values.
pub fn nan_median(values: &[f64]) -> f64 {
    let mut finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return f64::NAN;
    }
    finite.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    let mid = finite.len() / 2;
    if finite.len() % 2 == 0 {
        0.5 * (finite[mid - 1] + finite[mid])
    } else {
        finite[mid]
    }
}

/// The finite sample at rank `len / 2`, or NaN when there is none.
///
/// Unlike [`nan_median`] this never averages, so it is always one of the
/// input values and a constant input returns that constant exactly.
pub(crate) fn finite_median_sample(values: impl Iterator<Item = f64>) -> f64 {
    let mut finite: Vec<f64> = values.filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return f64::NAN;
    }
    let mid = finite.len() / 2;
    let (_, pivot, _) = finite.select_nth_unstable_by(mid, f64::total_cmp);
    *pivot
}

/// Returns `1.0` for finite samples and `0.0` for NaN or infinite ones.
#[inline]
pub(crate) fn finite_indicator(value: f64) -> f64 {
    if !value.is_finite() {
        0.0
    } else {
        1.0
    }
}

/// Replaces NaN with zero so it contributes nothing to a sum.
#[inline]
pub(crate) fn zero_fill(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value
    }
}
