//! Post-correction conversions that prepare frames for external co-addition.
//!
//! Correction factors cannot be summed directly across frames. Dividing the
//! corrected counts by the factor recovers the uncorrected counts; summing
//! those and the corrected counts separately yields a count-weighted factor
//! for the stacked image. Uncertainties are carried as squared counts so
//! they add in quadrature.

use crate::grid::{Grid, GridView};
use crate::util::CoiResult;

/// Uncorrected counts: `primary / corrfactor`, elementwise.
///
/// `primary` must already be in counts (not counts per second).
pub fn original_counts(primary: GridView<'_>, corrfactor: GridView<'_>) -> CoiResult<Grid> {
    zip_with(primary, corrfactor, |p, f| p / f)
}

/// Squared absolute uncertainty in counts: `(primary * rel_uncertainty)^2`.
pub fn squared_uncertainty_counts(
    primary: GridView<'_>,
    rel_uncertainty: GridView<'_>,
) -> CoiResult<Grid> {
    zip_with(primary, rel_uncertainty, |p, r| {
        let unc = p * r;
        unc * unc
    })
}

fn zip_with(a: GridView<'_>, b: GridView<'_>, op: impl Fn(f64, f64) -> f64) -> CoiResult<Grid> {
    a.ensure_same_shape(&b)?;
    let mut out = Vec::with_capacity(a.len());
    for (row_a, row_b) in a.rows().zip(b.rows()) {
        out.extend(row_a.iter().zip(row_b).map(|(&x, &y)| op(x, y)));
    }
    Grid::new(out, a.width(), a.height())
}
