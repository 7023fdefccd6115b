//! Empirical polynomial correction `f(x) = 1 + a1 x + a2 x^2 + a3 x^3 + a4 x^4`.
//!
//! `x` is the expected number of counts in the 9x9 window over one frame.
//! The polynomial absorbs the residual between the observed and the purely
//! theoretical dead-time correction; its coefficients are fixed by the
//! detector calibration.

/// Coefficients `[a1, a2, a3, a4]`.
pub const COEFFS: [f64; 4] = [0.0658568, -0.0907142, 0.0285951, 0.0308063];

/// Evaluates the polynomial with Horner's scheme.
#[inline]
pub fn polynomial(x: f64) -> f64 {
    let [a1, a2, a3, a4] = COEFFS;
    1.0 + x * (a1 + x * (a2 + x * (a3 + x * a4)))
}
