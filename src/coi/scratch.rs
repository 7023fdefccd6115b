//! Reusable per-frame working memory for the correction model.

/// Frame-size temporaries used while correcting one frame.
///
/// A scratch is resized to each frame's cell count and keeps its allocations
/// between frames, so correcting a sequence of equally sized frames allocates
/// only the returned grids. After a call the buffers hold that frame's
/// intermediate values, which is useful for inspection in tests and tools.
#[derive(Clone, Debug, Default)]
pub struct CoiScratch {
    pub(crate) tmp: Vec<f64>,
    pub(crate) count: Vec<f64>,
    pub(crate) flux: Vec<f64>,
    pub(crate) std: Vec<f64>,
    pub(crate) counts: Vec<f64>,
    pub(crate) counts_min: Vec<f64>,
    pub(crate) counts_max: Vec<f64>,
    pub(crate) f: Vec<f64>,
    pub(crate) f_min: Vec<f64>,
    pub(crate) f_max: Vec<f64>,
    pub(crate) corrfactor_min: Vec<f64>,
    pub(crate) corrfactor_max: Vec<f64>,
    pub(crate) corrected_min: Vec<f64>,
    pub(crate) corrected_max: Vec<f64>,
}

impl CoiScratch {
    /// Creates a scratch pre-sized for frames of `len` cells.
    pub fn with_len(len: usize) -> Self {
        let mut scratch = Self::default();
        scratch.resize(len);
        scratch
    }

    /// Number of cells the buffers currently hold.
    pub fn len(&self) -> usize {
        self.tmp.len()
    }

    /// True before the first frame.
    pub fn is_empty(&self) -> bool {
        self.tmp.is_empty()
    }

    /// Resizes every buffer to `len` cells.
    pub fn resize(&mut self, len: usize) {
        for buf in self.buffers_mut() {
            buf.resize(len, 0.0);
        }
    }

    /// Finite samples per window from the last frame.
    pub fn count(&self) -> &[f64] {
        &self.count
    }

    /// Windowed flux (`Craw`) from the last frame.
    pub fn flux(&self) -> &[f64] {
        &self.flux
    }

    /// Windowed standard deviation from the last frame.
    pub fn std(&self) -> &[f64] {
        &self.std
    }

    /// Nominal, minimum and maximum window counts from the last frame.
    ///
    /// The maximum branch holds the post-clamp values.
    pub fn counts(&self) -> (&[f64], &[f64], &[f64]) {
        (&self.counts, &self.counts_min, &self.counts_max)
    }

    /// Polynomial factors for the three branches from the last frame.
    pub fn polynomial(&self) -> (&[f64], &[f64], &[f64]) {
        (&self.f, &self.f_min, &self.f_max)
    }

    /// Minimum and maximum correction factors from the last frame.
    pub fn corrfactor_bounds(&self) -> (&[f64], &[f64]) {
        (&self.corrfactor_min, &self.corrfactor_max)
    }

    /// Corrected values for the minimum and maximum branches from the last frame.
    pub fn corrected_bounds(&self) -> (&[f64], &[f64]) {
        (&self.corrected_min, &self.corrected_max)
    }

    fn buffers_mut(&mut self) -> [&mut Vec<f64>; 14] {
        [
            &mut self.tmp,
            &mut self.count,
            &mut self.flux,
            &mut self.std,
            &mut self.counts,
            &mut self.counts_min,
            &mut self.counts_max,
            &mut self.f,
            &mut self.f_min,
            &mut self.f_max,
            &mut self.corrfactor_min,
            &mut self.corrfactor_max,
            &mut self.corrected_min,
            &mut self.corrected_max,
        ]
    }
}
