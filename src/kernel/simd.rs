//! SIMD-accelerated box sums using the `wide` crate.
//!
//! The vertical pass dominates the cost for the 9x9 windows the correction
//! model uses, so it is vectorized to add 4 columns at a time with `f64x4`.
//! Mapping and the horizontal pass reuse the scalar code. Lanes accumulate
//! rows in the same order as the scalar kernel, keeping results bit-identical.

use crate::grid::GridView;
use crate::kernel::scalar::{horizontal_pass, map_samples};
use crate::kernel::{check_buffers, clipped_range, BoxSum, SampleMap};
use crate::util::CoiResult;
use wide::f64x4;

const LANES: usize = 4;

/// Load 4 f64 values into f64x4.
#[inline]
fn load_f64x4(slice: &[f64]) -> f64x4 {
    f64x4::from([slice[0], slice[1], slice[2], slice[3]])
}

/// SIMD box-sum kernel.
pub struct SimdBoxSum;

impl BoxSum for SimdBoxSum {
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
        let simd_end = width / LANES * LANES;
        for (y, out_row) in out.chunks_exact_mut(width).enumerate() {
            let (lo, hi) = clipped_range(y, radius, height);
            let (first, rest) = tmp[lo * width..(hi + 1) * width].split_at(width);

            let mut x = 0;
            while x < simd_end {
                let mut acc = load_f64x4(&first[x..x + LANES]);
                for row_sums in rest.chunks_exact(width) {
                    acc += load_f64x4(&row_sums[x..x + LANES]);
                }
                out_row[x..x + LANES].copy_from_slice(&acc.to_array());
                x += LANES;
            }

            // Scalar remainder
            while x < width {
                let mut acc = first[x];
                for row_sums in rest.chunks_exact(width) {
                    acc += row_sums[x];
                }
                out_row[x] = acc;
                x += 1;
            }
        }
        Ok(())
    }
}
