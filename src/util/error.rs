//! Error types for coicorr.

use thiserror::Error;

/// Result alias for coicorr operations.
pub type CoiResult<T> = std::result::Result<T, CoiError>;

/// Errors that can occur when computing windowed statistics or corrections.
///
/// Every variant is a validation failure: the offending frame cannot be
/// processed and retrying with the same input cannot help. Numeric outcomes
/// such as NaN propagation through empty windows are never reported here.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum CoiError {
    /// Grid dimensions are zero or overflow `usize`.
    #[error("invalid dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// Row stride is smaller than the grid width.
    #[error("invalid stride {stride} for width {width}")]
    InvalidStride { width: usize, stride: usize },
    /// Backing buffer is shorter than the view requires.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// A sub-view does not fit inside its parent grid.
    #[error(
        "roi ({x}, {y}, {width}x{height}) out of bounds for {img_width}x{img_height} grid"
    )]
    RoiOutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
        img_width: usize,
        img_height: usize,
    },
    /// Two grids that must share a shape do not.
    #[error("shape mismatch: expected {expected_width}x{expected_height}, got {width}x{height}")]
    ShapeMismatch {
        expected_width: usize,
        expected_height: usize,
        width: usize,
        height: usize,
    },
    /// A window radius supplied as a signed integer was negative.
    #[error("window radius must be non-negative, got {radius}")]
    NegativeRadius { radius: i64 },
    /// The window side `2 * radius + 1` does not fit in `usize`.
    #[error("window radius {radius} is too large")]
    InvalidRadius { radius: usize },
    /// Dead-time factor outside the open interval (0, 1).
    #[error("dead-time factor must lie in (0, 1), got {alpha}")]
    InvalidDeadTime { alpha: f64 },
    /// Frame integration time is not a positive finite number.
    #[error("frame time must be positive, got {ft}")]
    InvalidFrameTime { ft: f64 },
    /// A configuration asks for a backend that was not compiled in.
    #[error("feature `{feature}` is not enabled")]
    FeatureDisabled { feature: &'static str },
    /// The input data or parameters are invalid.
    #[error("invalid input: {reason}")]
    InvalidInput { reason: &'static str },
}
