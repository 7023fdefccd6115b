//! Low-level building blocks for custom reduction pipelines.
//!
//! These expose the box-sum kernels, buffer-reusing statistics and the
//! individual model stages beyond the high-level `correct_frame` and
//! `Corrector` API. Most users should prefer the top-level items.

pub use crate::coi::deadtime::{
    is_saturated, saturation_counts, theoretical_rate, SATURATION_LIMIT,
};
pub use crate::coi::polynomial::{polynomial, COEFFS};
pub use crate::coi::{
    correct_frame_with_scratch, original_counts, squared_uncertainty_counts, CoiScratch,
};
pub use crate::kernel::scalar::ScalarBoxSum;
#[cfg(feature = "simd")]
pub use crate::kernel::simd::SimdBoxSum;
pub use crate::kernel::{window_side, BoxSum, SampleMap};
pub use crate::util::math::nan_median;
pub use crate::window::{
    radius_from_signed, sqrt_in_place, windowed_finite_count_into, windowed_sum_into,
    windowed_variance_into,
};
