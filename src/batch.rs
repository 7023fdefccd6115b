//! Correcting sequences of frames with shared configuration.
//!
//! A failed frame never aborts the batch: each frame's outcome is recorded
//! independently so the caller can skip unprocessable frames and keep the
//! rest. Sequential batches reuse one [`CoiScratch`]; with the `rayon`
//! feature and `parallel = true`, frames are distributed over the thread
//! pool with one scratch per worker.

use crate::coi::{correct_frame_with_scratch, CoiParams, CoiScratch, CorrectionOutput};
use crate::grid::GridView;
use crate::kernel::Backend;
use crate::trace::{trace_event, trace_span};
use crate::util::{CoiError, CoiResult};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// One frame and the parameters read from its metadata.
#[derive(Clone, Copy, Debug)]
pub struct FrameInput<'a> {
    /// Count-rate samples, NaN for invalid pixels.
    pub view: GridView<'a>,
    /// Dead-time factor and frame time for this frame.
    pub params: CoiParams,
}

/// Execution settings for a [`Corrector`].
#[derive(Clone, Debug, Default)]
pub struct CorrectorConfig {
    /// Process frames of a batch concurrently (requires the `rayon` feature).
    pub parallel: bool,
    /// Box-sum backend.
    pub backend: Backend,
}

impl CorrectorConfig {
    /// Fails when the configuration asks for a backend that was not compiled in.
    pub fn validate(&self) -> CoiResult<()> {
        if self.parallel && !cfg!(feature = "rayon") {
            return Err(CoiError::FeatureDisabled { feature: "rayon" });
        }
        self.backend.validate()
    }
}

/// Per-frame outcomes of a batch, in input order.
#[derive(Debug)]
pub struct BatchReport {
    /// One result per input frame.
    pub outcomes: Vec<CoiResult<CorrectionOutput>>,
}

impl BatchReport {
    /// Number of frames corrected successfully.
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_ok()).count()
    }

    /// Indices and errors of frames that could not be processed.
    pub fn failed(&self) -> Vec<(usize, &CoiError)> {
        self.outcomes
            .iter()
            .enumerate()
            .filter_map(|(idx, o)| o.as_ref().err().map(|err| (idx, err)))
            .collect()
    }

    /// Indices of frames that reported saturated pixels.
    pub fn saturated_frames(&self) -> Vec<usize> {
        self.outcomes
            .iter()
            .enumerate()
            .filter_map(|(idx, o)| match o {
                Ok(out) if out.saturation.is_some() => Some(idx),
                _ => None,
            })
            .collect()
    }
}

/// Applies the coincidence-loss model to frames.
#[derive(Debug, Default)]
pub struct Corrector {
    cfg: CorrectorConfig,
    scratch: CoiScratch,
}

impl Corrector {
    /// Creates a corrector with the default (scalar, sequential) configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the configuration.
    pub fn with_config(mut self, cfg: CorrectorConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &CorrectorConfig {
        &self.cfg
    }

    /// Corrects a single frame, reusing this corrector's scratch memory.
    pub fn correct(&mut self, frame: FrameInput<'_>) -> CoiResult<CorrectionOutput> {
        self.cfg.validate()?;
        correct_frame_with_scratch(frame.view, frame.params, self.cfg.backend, &mut self.scratch)
    }

    /// Corrects every frame, recording a result per frame.
    ///
    /// Configuration errors fail the whole call; frame errors are recorded in
    /// the report.
    pub fn correct_batch(&mut self, frames: &[FrameInput<'_>]) -> CoiResult<BatchReport> {
        self.cfg.validate()?;
        let _guard = trace_span!("coi_batch", frames = frames.len()).entered();

        let outcomes = if self.cfg.parallel {
            self.correct_parallel(frames)
        } else {
            let backend = self.cfg.backend;
            let scratch = &mut self.scratch;
            frames
                .iter()
                .map(|frame| correct_frame_with_scratch(frame.view, frame.params, backend, scratch))
                .collect()
        };

        let report = BatchReport { outcomes };
        trace_event!(
            info,
            "coi_batch_done",
            succeeded = report.succeeded(),
            failed = report.outcomes.len() - report.succeeded(),
        );
        Ok(report)
    }

    #[cfg(feature = "rayon")]
    fn correct_parallel(&self, frames: &[FrameInput<'_>]) -> Vec<CoiResult<CorrectionOutput>> {
        let backend = self.cfg.backend;
        frames
            .par_iter()
            .map_init(CoiScratch::default, |scratch, frame| {
                correct_frame_with_scratch(frame.view, frame.params, backend, scratch)
            })
            .collect()
    }

    #[cfg(not(feature = "rayon"))]
    fn correct_parallel(&self, frames: &[FrameInput<'_>]) -> Vec<CoiResult<CorrectionOutput>> {
        frames
            .iter()
            .map(|_| Err(CoiError::FeatureDisabled { feature: "rayon" }))
            .collect()
    }
}
