//! Non-paralyzable dead-time inversion.

/// Fraction of `1 / alpha` that saturated maximum-branch counts are clamped to.
pub const SATURATION_LIMIT: f64 = 0.99;

/// Theoretical coincidence-loss-corrected rate (counts/s):
/// `-ln(1 - alpha * counts) / (alpha * ft)`.
///
/// Evaluated through `ln_1p` for accuracy at small `alpha * counts`. The result
/// is `+inf` at `alpha * counts == 1` and NaN beyond it.
#[inline]
pub fn theoretical_rate(counts: f64, alpha: f64, ft: f64) -> f64 {
    -(-alpha * counts).ln_1p() / (alpha * ft)
}

/// True when `counts` would drive the logarithm out of its domain.
///
/// NaN counts are never saturated.
#[inline]
pub fn is_saturated(counts: f64, alpha: f64) -> bool {
    alpha * counts >= 1.0
}

/// Counts substituted for a saturated maximum-branch pixel: `0.99 / alpha`.
#[inline]
pub fn saturation_counts(alpha: f64) -> f64 {
    SATURATION_LIMIT / alpha
}
