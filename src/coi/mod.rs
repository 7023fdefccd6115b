//! Coincidence-loss correction for detector count-rate frames.
//!
//! Photons arriving within the detector's dead time are registered as one
//! event, so bright regions are undercounted. For every pixel the model sums
//! the count rate over the surrounding 9x9 window, converts it to expected
//! counts per frame, inverts the non-paralyzable dead-time relation and
//! applies an empirical polynomial. The same steps run on `flux -/+ N*std`
//! to bracket the result; the wider one-sided deviation becomes the
//! absolute uncertainty.
//!
//! The transform is stateless and per frame. Invalid parameters fail fast
//! with [`CoiError`]; pixels whose maximum branch leaves the logarithm's
//! domain are clamped and reported through [`SaturationNotice`] without
//! interrupting the frame.

mod counts;
pub mod deadtime;
pub mod polynomial;
mod scratch;

pub use counts::{original_counts, squared_uncertainty_counts};
pub use scratch::CoiScratch;

use crate::grid::{Grid, GridView};
use crate::kernel::Backend;
use crate::trace::{trace_event, trace_span};
use crate::util::math::nan_median;
use crate::util::{CoiError, CoiResult};
use crate::window::{sqrt_in_place, windowed_finite_count_into, windowed_variance_into};
use deadtime::{is_saturated, saturation_counts, theoretical_rate};
use polynomial::polynomial;

/// Window radius of the correction model (a 9x9 neighbourhood).
pub const WINDOW_RADIUS: usize = 4;

/// Per-frame model parameters read from the frame metadata.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoiParams {
    /// Dead-time correction factor, `0 < alpha < 1`.
    pub alpha: f64,
    /// Frame integration time in seconds, `ft > 0`.
    pub ft: f64,
}

impl CoiParams {
    /// Creates validated parameters.
    pub fn new(alpha: f64, ft: f64) -> CoiResult<Self> {
        let params = Self { alpha, ft };
        params.validate()?;
        Ok(params)
    }

    /// Checks `alpha` in `(0, 1)` and a positive finite `ft`.
    pub fn validate(&self) -> CoiResult<()> {
        if !(self.alpha > 0.0 && self.alpha < 1.0) {
            return Err(CoiError::InvalidDeadTime { alpha: self.alpha });
        }
        if !(self.ft.is_finite() && self.ft > 0.0) {
            return Err(CoiError::InvalidFrameTime { ft: self.ft });
        }
        Ok(())
    }
}

/// The three grids persisted per frame.
#[derive(Clone, Debug)]
pub struct CorrectionFrame {
    /// Coincidence-loss-corrected count rate.
    pub corrected: Grid,
    /// Multiplicative correction factor applied to each pixel.
    pub corrfactor: Grid,
    /// Relative uncertainty of the corrected value; exactly `0` wherever the
    /// absolute uncertainty is `0`.
    pub rel_uncertainty: Grid,
}

/// Non-fatal notice that the maximum-branch clamp fired.
#[derive(Clone, Debug, PartialEq)]
pub struct SaturationNotice {
    /// `(x, y)` of every clamped pixel in row-major order.
    pub pixels: Vec<(usize, usize)>,
    /// Counts substituted on the maximum branch (`0.99 / alpha`).
    pub clamped_counts: f64,
}

impl SaturationNotice {
    /// Number of clamped pixels.
    pub fn count(&self) -> usize {
        self.pixels.len()
    }
}

/// Per-frame medians for quick data-quality review.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameSummary {
    /// NaN-ignoring median of the correction factor.
    pub median_corrfactor: f64,
    /// NaN-ignoring median of the relative uncertainty.
    pub median_rel_uncertainty: f64,
    /// Pixels clamped on the maximum branch.
    pub saturated_pixels: usize,
}

/// Everything produced for one frame.
#[derive(Clone, Debug)]
pub struct CorrectionOutput {
    /// Corrected data, correction factor and relative uncertainty.
    pub frame: CorrectionFrame,
    /// Absolute uncertainty of the corrected data.
    pub abs_uncertainty: Grid,
    /// Present when at least one pixel was clamped.
    pub saturation: Option<SaturationNotice>,
    /// Medians of the output grids.
    pub summary: FrameSummary,
}

/// Corrects one frame with the scalar backend and fresh scratch memory.
pub fn correct_frame(src: GridView<'_>, params: CoiParams) -> CoiResult<CorrectionOutput> {
    let mut scratch = CoiScratch::with_len(src.len());
    correct_frame_with_scratch(src, params, Backend::Scalar, &mut scratch)
}

/// Corrects one frame, reusing `scratch` for every intermediate grid.
pub fn correct_frame_with_scratch(
    src: GridView<'_>,
    params: CoiParams,
    backend: Backend,
    scratch: &mut CoiScratch,
) -> CoiResult<CorrectionOutput> {
    params.validate()?;
    backend.validate()?;
    let _guard = trace_span!(
        "coi_correct_frame",
        width = src.width(),
        height = src.height()
    )
    .entered();

    let len = src.len();
    scratch.resize(len);
    windowed_finite_count_into(backend, src, WINDOW_RADIUS, &mut scratch.tmp, &mut scratch.count)?;
    windowed_variance_into(
        backend,
        src,
        WINDOW_RADIUS,
        &scratch.count,
        &mut scratch.tmp,
        &mut scratch.flux,
        &mut scratch.std,
    )?;
    sqrt_in_place(&mut scratch.std);

    let CoiParams { alpha, ft } = params;
    let width = src.width();
    let mut corrected = vec![0.0; len];
    let mut corrfactor = vec![0.0; len];
    let mut rel = vec![0.0; len];
    let mut unc = vec![0.0; len];
    let mut saturated = Vec::new();

    for (y, row) in src.rows().enumerate() {
        for (x, &data) in row.iter().enumerate() {
            let i = y * width + x;
            let flux = scratch.flux[i];
            let spread = scratch.count[i] * scratch.std[i];
            let flux_min = flux - spread;
            let flux_max = flux + spread;

            let counts = ft * flux;
            let counts_min = ft * flux_min;
            let mut counts_max = ft * flux_max;

            let f = polynomial(counts);
            let f_min = polynomial(counts_min);
            let f_max = polynomial(counts_max);

            if is_saturated(counts_max, alpha) {
                counts_max = saturation_counts(alpha);
                saturated.push((x, y));
            }

            let rate = theoretical_rate(counts, alpha, ft);
            let rate_min = theoretical_rate(counts_min, alpha, ft);
            let rate_max = theoretical_rate(counts_max, alpha, ft);

            let factor = rate * f / flux;
            let factor_min = rate_min * f_min / flux_min;
            let factor_max = rate_max * f_max / flux_max;

            let value = factor * data;
            let value_min = factor_min * data;
            let value_max = factor_max * data;

            let abs_unc = nan_max((value - value_min).abs(), (value_max - value).abs());

            scratch.counts[i] = counts;
            scratch.counts_min[i] = counts_min;
            scratch.counts_max[i] = counts_max;
            scratch.f[i] = f;
            scratch.f_min[i] = f_min;
            scratch.f_max[i] = f_max;
            scratch.corrfactor_min[i] = factor_min;
            scratch.corrfactor_max[i] = factor_max;
            scratch.corrected_min[i] = value_min;
            scratch.corrected_max[i] = value_max;

            corrected[i] = value;
            corrfactor[i] = factor;
            unc[i] = abs_unc;
            rel[i] = if abs_unc == 0.0 { 0.0 } else { abs_unc / value };
        }
    }

    let summary = FrameSummary {
        median_corrfactor: nan_median(&corrfactor),
        median_rel_uncertainty: nan_median(&rel),
        saturated_pixels: saturated.len(),
    };
    trace_event!(
        info,
        "coi_frame_summary",
        median_corrfactor = summary.median_corrfactor,
        median_rel_uncertainty = summary.median_rel_uncertainty,
    );

    let saturation = if saturated.is_empty() {
        None
    } else {
        trace_event!(
            warn,
            "coi_saturation",
            pixels = saturated.len(),
            clamped_counts = saturation_counts(alpha),
        );
        Some(SaturationNotice {
            pixels: saturated,
            clamped_counts: saturation_counts(alpha),
        })
    };

    let height = src.height();
    Ok(CorrectionOutput {
        frame: CorrectionFrame {
            corrected: Grid::new(corrected, width, height)?,
            corrfactor: Grid::new(corrfactor, width, height)?,
            rel_uncertainty: Grid::new(rel, width, height)?,
        },
        abs_uncertainty: Grid::new(unc, width, height)?,
        saturation,
        summary,
    })
}

/// Pairwise maximum that propagates NaN from either side.
#[inline]
fn nan_max(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else {
        a.max(b)
    }
}
