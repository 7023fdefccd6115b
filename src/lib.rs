//! coicorr reduces ultraviolet detector frames by correcting coincidence loss.
//!
//! The crate has two layers. The windowed statistics engine ([`window`])
//! computes sums, finite-sample counts, variances and standard deviations
//! over square neighbourhoods of an `f64` grid, tolerating NaN samples and
//! grid edges. The coincidence-loss model ([`coi`]) builds on it to
//! estimate, per pixel, the counts lost to detector dead time together with
//! a bracketed uncertainty.
//!
//! Everything is a pure grid-in, grid-out transform: no file I/O and no
//! shared state. Optional features add a SIMD box-sum backend (`simd`),
//! frame-parallel batches (`rayon`) and structured logging (`tracing`).

pub mod batch;
pub mod coi;
pub mod grid;
pub mod kernel;
pub mod lowlevel;
mod trace;
pub mod util;
pub mod window;

pub use batch::{BatchReport, Corrector, CorrectorConfig, FrameInput};
pub use coi::{
    correct_frame, CoiParams, CorrectionFrame, CorrectionOutput, FrameSummary, SaturationNotice,
    WINDOW_RADIUS,
};
pub use grid::{Grid, GridView};
pub use kernel::Backend;
pub use util::{CoiError, CoiResult};
pub use window::{
    windowed_finite_count, windowed_std, windowed_sum, windowed_variance, WindowStats,
};
