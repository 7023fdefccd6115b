//! Scalar reference kernel for zero-filled box sums.

use crate::grid::GridView;
use crate::kernel::{check_buffers, clipped_range, BoxSum, SampleMap};
use crate::util::CoiResult;

/// Portable box-sum kernel; the reference every other backend must match.
pub struct ScalarBoxSum;

impl BoxSum for ScalarBoxSum {
    fn box_sum(
        src: GridView<'_>,
        radius: usize,
        map: SampleMap,
        tmp: &mut [f64],
        out: &mut [f64],
    ) -> CoiResult<()> {
        check_buffers(src, radius, tmp, out)?;
        map_samples(src, map, out);
        horizontal_pass(out, tmp, src.width(), radius);

        let width = src.width();
        let height = src.height();
        for (y, out_row) in out.chunks_exact_mut(width).enumerate() {
            let (lo, hi) = clipped_range(y, radius, height);
            let (first, rest) = tmp[lo * width..(hi + 1) * width].split_at(width);
            out_row.copy_from_slice(first);
            for row_sums in rest.chunks_exact(width) {
                for (acc, &value) in out_row.iter_mut().zip(row_sums) {
                    *acc += value;
                }
            }
        }
        Ok(())
    }
}

/// Pass 1: writes `map(sample)` for every cell of `src` into contiguous `dst`.
pub(crate) fn map_samples(src: GridView<'_>, map: SampleMap, dst: &mut [f64]) {
    for (row, dst_row) in src.rows().zip(dst.chunks_exact_mut(src.width())) {
        for (d, &value) in dst_row.iter_mut().zip(row) {
            *d = map.apply(value);
        }
    }
}

/// Pass 2: horizontal window sums of each row of `src` into `dst`.
pub(crate) fn horizontal_pass(src: &[f64], dst: &mut [f64], width: usize, radius: usize) {
    for (row, dst_row) in src.chunks_exact(width).zip(dst.chunks_exact_mut(width)) {
        for (x, d) in dst_row.iter_mut().enumerate() {
            let (lo, hi) = clipped_range(x, radius, width);
            // Seeded from the first sample so a lone -0.0 keeps its sign.
            let mut acc = row[lo];
            for &value in &row[lo + 1..=hi] {
                acc += value;
            }
            *d = acc;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ScalarBoxSum;
    use crate::grid::GridView;
    use crate::kernel::{BoxSum, SampleMap};

    fn run(data: &[f64], width: usize, height: usize, radius: usize, map: SampleMap) -> Vec<f64> {
        let view = GridView::from_slice(data, width, height).unwrap();
        let mut tmp = vec![0.0; width * height];
        let mut out = vec![0.0; width * height];
        ScalarBoxSum::box_sum(view, radius, map, &mut tmp, &mut out).unwrap();
        out
    }

    #[test]
    fn box_sum_of_ones_counts_overlap() {
        let out = run(&[1.0; 12], 4, 3, 1, SampleMap::Value);
        assert_eq!(
            out,
            vec![4.0, 6.0, 6.0, 4.0, 6.0, 9.0, 9.0, 6.0, 4.0, 6.0, 6.0, 4.0]
        );
    }

    #[test]
    fn box_sum_respects_stride_padding() {
        let data = [1.0, 2.0, 100.0, 3.0, 4.0, 100.0];
        let view = GridView::new(&data, 2, 2, 3).unwrap();
        let mut tmp = vec![0.0; 4];
        let mut out = vec![0.0; 4];
        ScalarBoxSum::box_sum(view, 1, SampleMap::Value, &mut tmp, &mut out).unwrap();
        assert_eq!(out, vec![10.0; 4]);
    }

    #[test]
    fn squared_map_ignores_nan() {
        let out = run(&[f64::NAN, 2.0, 3.0], 3, 1, 1, SampleMap::SquaredDeviation(0.0));
        assert_eq!(out, vec![4.0, 13.0, 13.0]);
    }

    #[test]
    fn radius_zero_keeps_signed_zero() {
        let out = run(&[-0.0, 1.0, -0.0], 3, 1, 0, SampleMap::Value);
        let bits: Vec<u64> = out.iter().map(|v| v.to_bits()).collect();
        assert_eq!(bits, vec![(-0.0f64).to_bits(), 1.0f64.to_bits(), (-0.0f64).to_bits()]);
    }

    #[test]
    fn rejects_short_buffers() {
        let data = [0.0; 4];
        let view = GridView::from_slice(&data, 2, 2).unwrap();
        let mut tmp = vec![0.0; 3];
        let mut out = vec![0.0; 4];
        assert!(ScalarBoxSum::box_sum(view, 1, SampleMap::Value, &mut tmp, &mut out).is_err());
    }
}
