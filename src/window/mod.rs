//! Windowed statistics over square neighbourhoods of a sample grid.
//!
//! Every statistic is evaluated over the `(2r+1) x (2r+1)` window centred on
//! each cell. The window is truncated at the grid edges: positions outside
//! the grid contribute nothing (zero fill, no wrap or reflection).
//!
//! NaN samples contribute `0` to every window they fall in. A cell whose own
//! sample is NaN yields NaN for the sum, variance and standard deviation, so
//! a radius of zero returns the input unchanged. The finite count is always
//! defined.
//!
//! The variance uses the sum-of-squares identity
//! `(S2 - S1^2 / N) / N`, with `S1` and `S2` taken from the same zero-filled
//! samples. Both sums run on samples offset by one median sample of the
//! frame, which leaves the variance unchanged and makes a constant region
//! exactly zero. A residual negative result is clamped to zero; `N = 0`
//! still gives NaN rather than an error.
//!
//! Functions ending in `_into` write into caller buffers of `width * height`
//! elements so repeated frames can reuse memory; the others allocate.

use crate::grid::{Grid, GridView};
use crate::kernel::{Backend, SampleMap};
use crate::util::math::finite_median_sample;
use crate::util::{CoiError, CoiResult};

mod stats;

pub use stats::WindowStats;

/// Converts a signed radius from an outer interface into a window radius.
pub fn radius_from_signed(radius: i64) -> CoiResult<usize> {
    usize::try_from(radius).map_err(|_| CoiError::NegativeRadius { radius })
}

/// Windowed sum of the samples, NaN treated as `0`.
pub fn windowed_sum(src: GridView<'_>, radius: usize) -> CoiResult<Grid> {
    let mut tmp = vec![0.0; src.len()];
    let mut out = vec![0.0; src.len()];
    windowed_sum_into(Backend::Scalar, src, radius, &mut tmp, &mut out)?;
    Grid::new(out, src.width(), src.height())
}

/// Number of finite samples in each window.
pub fn windowed_finite_count(src: GridView<'_>, radius: usize) -> CoiResult<Grid> {
    let mut tmp = vec![0.0; src.len()];
    let mut out = vec![0.0; src.len()];
    windowed_finite_count_into(Backend::Scalar, src, radius, &mut tmp, &mut out)?;
    Grid::new(out, src.width(), src.height())
}

/// Windowed population variance.
///
/// `finite_count` may supply a precomputed [`windowed_finite_count`] grid; it
/// must match `src` in shape.
pub fn windowed_variance(
    src: GridView<'_>,
    radius: usize,
    finite_count: Option<GridView<'_>>,
) -> CoiResult<Grid> {
    let mut bufs = VarianceBuffers::new(src.len());
    let count = resolve_count(src, radius, finite_count, &mut bufs)?;
    windowed_variance_into(
        Backend::Scalar,
        src,
        radius,
        &count,
        &mut bufs.tmp,
        &mut bufs.sum,
        &mut bufs.out,
    )?;
    Grid::new(bufs.out, src.width(), src.height())
}

/// Windowed population standard deviation (square root of the variance).
pub fn windowed_std(
    src: GridView<'_>,
    radius: usize,
    finite_count: Option<GridView<'_>>,
) -> CoiResult<Grid> {
    let mut variance = windowed_variance(src, radius, finite_count)?.into_vec();
    sqrt_in_place(&mut variance);
    Grid::new(variance, src.width(), src.height())
}

/// Buffer form of [`windowed_sum`].
pub fn windowed_sum_into(
    backend: Backend,
    src: GridView<'_>,
    radius: usize,
    tmp: &mut [f64],
    out: &mut [f64],
) -> CoiResult<()> {
    backend.box_sum(src, radius, SampleMap::Value, tmp, out)?;
    preserve_nan(src, out);
    Ok(())
}

/// Buffer form of [`windowed_finite_count`].
pub fn windowed_finite_count_into(
    backend: Backend,
    src: GridView<'_>,
    radius: usize,
    tmp: &mut [f64],
    out: &mut [f64],
) -> CoiResult<()> {
    backend.box_sum(src, radius, SampleMap::FiniteIndicator, tmp, out)
}

/// Buffer form of [`windowed_variance`].
///
/// On return `sum` holds the unshifted windowed sum (`S1`), which callers
/// that also need the flux can reuse instead of recomputing it.
pub fn windowed_variance_into(
    backend: Backend,
    src: GridView<'_>,
    radius: usize,
    count: &[f64],
    tmp: &mut [f64],
    sum: &mut [f64],
    out: &mut [f64],
) -> CoiResult<()> {
    if count.len() != src.len() {
        return Err(CoiError::InvalidInput {
            reason: "finite-count buffer length does not match grid size",
        });
    }
    let shift = finite_median_sample(src.rows().flatten().copied());
    backend.box_sum(src, radius, SampleMap::Deviation(shift), tmp, out)?;
    backend.box_sum(src, radius, SampleMap::SquaredDeviation(shift), tmp, sum)?;
    for ((v, &s2), &n) in out.iter_mut().zip(sum.iter()).zip(count) {
        *v = shifted_variance(*v, s2, n);
    }
    preserve_nan(src, out);
    windowed_sum_into(backend, src, radius, tmp, sum)
}

/// `(S2 - S1^2 / N) / N` for shifted sums, clamping a negative residual to zero.
#[inline]
fn shifted_variance(s1: f64, s2: f64, n: f64) -> f64 {
    let var = (s2 - s1 * s1 / n) / n;
    if var < 0.0 {
        0.0
    } else {
        var
    }
}

/// Replaces every element with its square root.
pub fn sqrt_in_place(values: &mut [f64]) {
    for v in values.iter_mut() {
        *v = v.sqrt();
    }
}

/// Restores NaN at every cell whose own sample is NaN.
fn preserve_nan(src: GridView<'_>, out: &mut [f64]) {
    for (row, out_row) in src.rows().zip(out.chunks_exact_mut(src.width())) {
        for (o, &value) in out_row.iter_mut().zip(row) {
            if value.is_nan() {
                *o = f64::NAN;
            }
        }
    }
}

struct VarianceBuffers {
    tmp: Vec<f64>,
    sum: Vec<f64>,
    out: Vec<f64>,
}

impl VarianceBuffers {
    fn new(len: usize) -> Self {
        Self {
            tmp: vec![0.0; len],
            sum: vec![0.0; len],
            out: vec![0.0; len],
        }
    }
}

fn resolve_count(
    src: GridView<'_>,
    radius: usize,
    finite_count: Option<GridView<'_>>,
    bufs: &mut VarianceBuffers,
) -> CoiResult<Vec<f64>> {
    match finite_count {
        Some(count) => {
            src.ensure_same_shape(&count)?;
            Ok(count.to_vec())
        }
        None => {
            let mut count = vec![0.0; src.len()];
            windowed_finite_count_into(Backend::Scalar, src, radius, &mut bufs.tmp, &mut count)?;
            Ok(count)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        radius_from_signed, windowed_finite_count, windowed_std, windowed_sum, windowed_variance,
    };
    use crate::grid::Grid;
    use crate::util::CoiError;

    #[test]
    fn radius_from_signed_rejects_negative() {
        assert_eq!(radius_from_signed(4).unwrap(), 4);
        assert_eq!(
            radius_from_signed(-1).unwrap_err(),
            CoiError::NegativeRadius { radius: -1 }
        );
    }

    #[test]
    fn nan_center_is_preserved_but_neighbours_zero_fill() {
        let grid = Grid::from_rows(&[[1.0, f64::NAN, 2.0]]).unwrap();
        let sum = windowed_sum(grid.view(), 1).unwrap();
        assert_eq!(sum.get(0, 0), Some(1.0));
        assert!(sum.get(1, 0).unwrap().is_nan());
        assert_eq!(sum.get(2, 0), Some(2.0));

        let count = windowed_finite_count(grid.view(), 1).unwrap();
        assert_eq!(count.data(), &[1.0, 2.0, 1.0]);
    }

    #[test]
    fn variance_matches_direct_formula() {
        let grid = Grid::from_rows(&[[1.0, 2.0, 4.0], [8.0, 16.0, 32.0]]).unwrap();
        let var = windowed_variance(grid.view(), 1, None).unwrap();
        // Every window spans the whole 2x3 grid from the centre columns.
        let values = [1.0, 2.0, 4.0, 8.0, 16.0, 32.0];
        let mean = values.iter().sum::<f64>() / 6.0;
        let expected = values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / 6.0;
        let got = var.get(1, 0).unwrap();
        assert!((got - expected).abs() < 1e-9 * expected);
    }

    #[test]
    fn constant_non_dyadic_grid_has_exactly_zero_variance() {
        let grid = Grid::filled(0.1, 20, 20).unwrap();
        let var = windowed_variance(grid.view(), 4, None).unwrap();
        assert!(var.data().iter().all(|&v| v == 0.0));
        let std = windowed_std(grid.view(), 4, None).unwrap();
        assert!(std.data().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn variance_is_invariant_to_a_large_offset() {
        let base = [[0.25, 0.5, 0.75], [1.0, 1.25, 1.5]];
        let offset = base.map(|row| row.map(|v| v + 1.0e6));
        let a = windowed_variance(Grid::from_rows(&base).unwrap().view(), 1, None).unwrap();
        let b = windowed_variance(Grid::from_rows(&offset).unwrap().view(), 1, None).unwrap();
        for (x, y) in a.data().iter().zip(b.data()) {
            assert!((x - y).abs() < 1e-9, "{x} vs {y}");
        }
    }

    #[test]
    fn all_nan_window_yields_nan_not_error() {
        let grid = Grid::filled(f64::NAN, 3, 3).unwrap();
        let std = windowed_std(grid.view(), 1, None).unwrap();
        assert!(std.data().iter().all(|v| v.is_nan()));
    }

    #[test]
    fn empty_window_around_finite_cell_divides_zero_by_zero() {
        let grid = Grid::from_rows(&[[2.0]]).unwrap();
        let zero_count = Grid::filled(0.0, 1, 1).unwrap();
        let var = windowed_variance(grid.view(), 0, Some(zero_count.view())).unwrap();
        assert!(var.data()[0].is_nan());
    }

    #[test]
    fn supplied_count_must_match_shape() {
        let grid = Grid::filled(1.0, 3, 2).unwrap();
        let count = Grid::filled(1.0, 2, 3).unwrap();
        let err = windowed_variance(grid.view(), 1, Some(count.view())).unwrap_err();
        assert_eq!(
            err,
            CoiError::ShapeMismatch {
                expected_width: 3,
                expected_height: 2,
                width: 2,
                height: 3,
            }
        );
    }
}
