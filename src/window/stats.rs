//! Count, sum and standard deviation computed together.

use crate::grid::{Grid, GridView};
use crate::kernel::Backend;
use crate::util::CoiResult;
use crate::window::{sqrt_in_place, windowed_finite_count_into, windowed_variance_into};

/// The three windowed statistics the coincidence-loss model consumes.
///
/// Computing them together shares the finite-count grid and the `S1` pass
/// between the sum and the standard deviation.
#[derive(Clone, Debug)]
pub struct WindowStats {
    /// Finite samples per window (`N`).
    pub count: Grid,
    /// Zero-filled windowed sum (`S1`).
    pub sum: Grid,
    /// Windowed population standard deviation.
    pub std: Grid,
}

impl WindowStats {
    /// Computes all three statistics with the given backend.
    pub fn compute(src: GridView<'_>, radius: usize, backend: Backend) -> CoiResult<Self> {
        backend.validate()?;
        let len = src.len();
        let mut tmp = vec![0.0; len];
        let mut count = vec![0.0; len];
        let mut sum = vec![0.0; len];
        let mut std = vec![0.0; len];

        windowed_finite_count_into(backend, src, radius, &mut tmp, &mut count)?;
        windowed_variance_into(backend, src, radius, &count, &mut tmp, &mut sum, &mut std)?;
        sqrt_in_place(&mut std);

        let (width, height) = (src.width(), src.height());
        Ok(Self {
            count: Grid::new(count, width, height)?,
            sum: Grid::new(sum, width, height)?,
            std: Grid::new(std, width, height)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::WindowStats;
    use crate::grid::Grid;
    use crate::kernel::Backend;
    use crate::window::{windowed_finite_count, windowed_std, windowed_sum};

    #[test]
    fn combined_stats_match_individual_operations() {
        let data: Vec<f64> = (0..30)
            .map(|i| if i % 7 == 0 { f64::NAN } else { i as f64 })
            .collect();
        let grid = Grid::new(data, 6, 5).unwrap();
        let stats = WindowStats::compute(grid.view(), 2, Backend::Scalar).unwrap();

        let count = windowed_finite_count(grid.view(), 2).unwrap();
        let sum = windowed_sum(grid.view(), 2).unwrap();
        let std = windowed_std(grid.view(), 2, Some(count.view())).unwrap();

        assert_eq!(stats.count, count);
        for (a, b) in stats.sum.data().iter().zip(sum.data()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
        for (a, b) in stats.std.data().iter().zip(std.data()) {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }
}
