//! Box-sum kernels behind the windowed statistics.
//!
//! A box sum adds every sample of the `(2r+1) x (2r+1)` window centred on a
//! cell, treating positions outside the grid as zero. Kernels run it as three
//! passes over caller-owned buffers:
//!
//! 1. map each sample into `out` (NaN becomes `0`, or the finite indicator),
//! 2. sum each row's horizontal window from `out` into `tmp`,
//! 3. sum the vertical window of row sums from `tmp` back into `out`.
//!
//! Every backend adds in the same order (ascending column, then ascending
//! row), so results are bit-identical across backends.

use crate::grid::GridView;
use crate::util::{CoiError, CoiResult};

pub mod scalar;

#[cfg(feature = "simd")]
pub mod simd;

/// Per-sample transform applied before summing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SampleMap {
    /// The sample itself, NaN replaced by `0`.
    Value,
    /// `sample - shift`, NaN replaced by `0`.
    Deviation(f64),
    /// `(sample - shift)^2`, NaN replaced by `0`.
    SquaredDeviation(f64),
    /// `1` for finite samples, `0` otherwise.
    FiniteIndicator,
}

impl SampleMap {
    /// Applies the transform to one sample.
    #[inline]
    pub fn apply(self, value: f64) -> f64 {
        use crate::util::math::{finite_indicator, zero_fill};
        match self {
            SampleMap::Value => zero_fill(value),
            SampleMap::Deviation(shift) => zero_fill(value - shift),
            SampleMap::SquaredDeviation(shift) => {
                let v = zero_fill(value - shift);
                v * v
            }
            SampleMap::FiniteIndicator => finite_indicator(value),
        }
    }
}

/// Kernel trait for zero-filled box sums.
pub trait BoxSum {
    /// Writes the box sum of `map(src)` with the given radius into `out`.
    ///
    /// `tmp` and `out` must both hold exactly `width * height` elements.
    fn box_sum(
        src: GridView<'_>,
        radius: usize,
        map: SampleMap,
        tmp: &mut [f64],
        out: &mut [f64],
    ) -> CoiResult<()>;
}

/// Arithmetic backend used for box sums.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Backend {
    /// Portable scalar loops.
    #[default]
    Scalar,
    /// `wide`-vectorized vertical pass (requires the `simd` feature).
    Simd,
}

impl Backend {
    /// Fails when the backend was not compiled in.
    pub fn validate(self) -> CoiResult<()> {
        match self {
            Backend::Scalar => Ok(()),
            Backend::Simd if cfg!(feature = "simd") => Ok(()),
            Backend::Simd => Err(CoiError::FeatureDisabled { feature: "simd" }),
        }
    }

    /// Dispatches a box sum to the selected kernel.
    pub fn box_sum(
        self,
        src: GridView<'_>,
        radius: usize,
        map: SampleMap,
        tmp: &mut [f64],
        out: &mut [f64],
    ) -> CoiResult<()> {
        match self {
            Backend::Scalar => scalar::ScalarBoxSum::box_sum(src, radius, map, tmp, out),
            #[cfg(feature = "simd")]
            Backend::Simd => simd::SimdBoxSum::box_sum(src, radius, map, tmp, out),
            #[cfg(not(feature = "simd"))]
            Backend::Simd => Err(CoiError::FeatureDisabled { feature: "simd" }),
        }
    }
}

/// Returns the window side `2 * radius + 1`.
pub fn window_side(radius: usize) -> CoiResult<usize> {
    radius
        .checked_mul(2)
        .and_then(|v| v.checked_add(1))
        .ok_or(CoiError::InvalidRadius { radius })
}

/// Validates radius and buffer lengths shared by every kernel.
pub(crate) fn check_buffers(
    src: GridView<'_>,
    radius: usize,
    tmp: &[f64],
    out: &[f64],
) -> CoiResult<()> {
    window_side(radius)?;
    let needed = src.len();
    for got in [tmp.len(), out.len()] {
        if got < needed {
            return Err(CoiError::BufferTooSmall { needed, got });
        }
        if got > needed {
            return Err(CoiError::InvalidInput {
                reason: "buffer length does not match grid size",
            });
        }
    }
    Ok(())
}

/// Inclusive index range `[center - radius, center + radius]` clipped to `0..len`.
#[inline]
pub(crate) fn clipped_range(center: usize, radius: usize, len: usize) -> (usize, usize) {
    let lo = center.saturating_sub(radius);
    let hi = center.saturating_add(radius).min(len - 1);
    (lo, hi)
}
