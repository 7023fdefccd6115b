//! Python bindings for the coicorr coincidence-loss correction library.
//!
//! Grids cross the boundary as 2D `float64` numpy arrays in C order
//! (rows x columns). Pixel coordinates returned to Python are `(row, col)`.

use numpy::{IntoPyArray, PyArray2, PyArrayMethods, PyReadonlyArray2, PyUntypedArrayMethods};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use coicorr::lowlevel::radius_from_signed;
use coicorr::{
    CoiError, CoiParams, CorrectionOutput, Corrector, CorrectorConfig, FrameInput, Grid, GridView,
};

/// Convert a CoiError to a Python exception.
fn to_py_err(err: CoiError) -> PyErr {
    PyValueError::new_err(err.to_string())
}

fn view_of<'a>(array: &'a PyReadonlyArray2<'_, f64>) -> PyResult<GridView<'a>> {
    let shape = array.shape();
    let height = shape[0];
    let width = shape[1];
    let data = array.as_slice()?;
    GridView::from_slice(data, width, height).map_err(to_py_err)
}

fn to_array(py: Python<'_>, grid: Grid) -> PyResult<Bound<'_, PyArray2<f64>>> {
    let (height, width) = grid.shape();
    grid.into_vec().into_pyarray(py).reshape([height, width])
}

/// Result of correcting one frame.
#[pyclass]
pub struct Correction {
    /// Coincidence-loss-corrected count rate.
    #[pyo3(get)]
    corrected: Py<PyArray2<f64>>,
    /// Multiplicative correction factor.
    #[pyo3(get)]
    corrfactor: Py<PyArray2<f64>>,
    /// Relative uncertainty of the corrected value.
    #[pyo3(get)]
    rel_uncertainty: Py<PyArray2<f64>>,
    /// Absolute uncertainty of the corrected value.
    #[pyo3(get)]
    abs_uncertainty: Py<PyArray2<f64>>,
    /// `(row, col)` of every pixel clamped on the maximum branch.
    #[pyo3(get)]
    saturated_pixels: Vec<(usize, usize)>,
    /// NaN-ignoring median of the correction factor.
    #[pyo3(get)]
    median_corrfactor: f64,
    /// NaN-ignoring median of the relative uncertainty.
    #[pyo3(get)]
    median_rel_uncertainty: f64,
}

impl Correction {
    fn from_output(py: Python<'_>, output: CorrectionOutput) -> PyResult<Self> {
        let saturated_pixels = output
            .saturation
            .map(|notice| notice.pixels.iter().map(|&(x, y)| (y, x)).collect())
            .unwrap_or_default();
        Ok(Self {
            corrected: to_array(py, output.frame.corrected)?.unbind(),
            corrfactor: to_array(py, output.frame.corrfactor)?.unbind(),
            rel_uncertainty: to_array(py, output.frame.rel_uncertainty)?.unbind(),
            abs_uncertainty: to_array(py, output.abs_uncertainty)?.unbind(),
            saturated_pixels,
            median_corrfactor: output.summary.median_corrfactor,
            median_rel_uncertainty: output.summary.median_rel_uncertainty,
        })
    }
}

#[pymethods]
impl Correction {
    /// The `(corrected, corrfactor, rel_uncertainty)` triple.
    #[allow(clippy::type_complexity)]
    fn as_tuple(
        &self,
        py: Python<'_>,
    ) -> (
        Py<PyArray2<f64>>,
        Py<PyArray2<f64>>,
        Py<PyArray2<f64>>,
    ) {
        (
            self.corrected.clone_ref(py),
            self.corrfactor.clone_ref(py),
            self.rel_uncertainty.clone_ref(py),
        )
    }

    fn __repr__(&self) -> String {
        format!(
            "Correction(median_corrfactor={:.6}, median_rel_uncertainty={:.6}, saturated={})",
            self.median_corrfactor,
            self.median_rel_uncertainty,
            self.saturated_pixels.len()
        )
    }
}

/// Windowed sum with NaN samples counted as zero.
///
/// Args:
///     grid: 2D float64 numpy array (height x width)
///     radius: Window radius; the window side is 2 * radius + 1
#[pyfunction]
fn windowed_sum<'py>(
    py: Python<'py>,
    grid: PyReadonlyArray2<'py, f64>,
    radius: i64,
) -> PyResult<Bound<'py, PyArray2<f64>>> {
    let radius = radius_from_signed(radius).map_err(to_py_err)?;
    let out = coicorr::windowed_sum(view_of(&grid)?, radius).map_err(to_py_err)?;
    to_array(py, out)
}

/// Number of finite samples in each window.
#[pyfunction]
fn windowed_finite_count<'py>(
    py: Python<'py>,
    grid: PyReadonlyArray2<'py, f64>,
    radius: i64,
) -> PyResult<Bound<'py, PyArray2<f64>>> {
    let radius = radius_from_signed(radius).map_err(to_py_err)?;
    let out = coicorr::windowed_finite_count(view_of(&grid)?, radius).map_err(to_py_err)?;
    to_array(py, out)
}

/// Windowed population variance, `(S2 - S1^2 / N) / N`.
///
/// Args:
///     grid: 2D float64 numpy array (height x width)
///     radius: Window radius
///     finite_count: Optional precomputed finite-count grid of the same shape
#[pyfunction]
#[pyo3(signature = (grid, radius, finite_count = None))]
fn windowed_variance<'py>(
    py: Python<'py>,
    grid: PyReadonlyArray2<'py, f64>,
    radius: i64,
    finite_count: Option<PyReadonlyArray2<'py, f64>>,
) -> PyResult<Bound<'py, PyArray2<f64>>> {
    let radius = radius_from_signed(radius).map_err(to_py_err)?;
    let count = finite_count.as_ref().map(view_of).transpose()?;
    let out = coicorr::windowed_variance(view_of(&grid)?, radius, count).map_err(to_py_err)?;
    to_array(py, out)
}

/// Windowed population standard deviation.
#[pyfunction]
#[pyo3(signature = (grid, radius, finite_count = None))]
fn windowed_std<'py>(
    py: Python<'py>,
    grid: PyReadonlyArray2<'py, f64>,
    radius: i64,
    finite_count: Option<PyReadonlyArray2<'py, f64>>,
) -> PyResult<Bound<'py, PyArray2<f64>>> {
    let radius = radius_from_signed(radius).map_err(to_py_err)?;
    let count = finite_count.as_ref().map(view_of).transpose()?;
    let out = coicorr::windowed_std(view_of(&grid)?, radius, count).map_err(to_py_err)?;
    to_array(py, out)
}

/// Correct one frame for coincidence loss.
///
/// Args:
///     grid: 2D float64 count-rate array, NaN for invalid pixels
///     alpha: Dead-time correction factor, 0 < alpha < 1
///     ft: Frame time in seconds, ft > 0
///
/// Returns:
///     Correction with the corrected, corrfactor and rel_uncertainty arrays
#[pyfunction]
fn correct_frame(
    py: Python<'_>,
    grid: PyReadonlyArray2<'_, f64>,
    alpha: f64,
    ft: f64,
) -> PyResult<Correction> {
    let params = CoiParams::new(alpha, ft).map_err(to_py_err)?;
    let output = coicorr::correct_frame(view_of(&grid)?, params).map_err(to_py_err)?;
    Correction::from_output(py, output)
}

/// Correct a sequence of frames, skipping those that fail.
///
/// Args:
///     frames: List of (grid, alpha, ft) tuples
///     parallel: Correct frames concurrently (default: False)
///
/// Returns:
///     (results, errors): one Correction or None per frame, and a list of
///     (index, message) for the frames that were skipped
#[pyfunction]
#[pyo3(signature = (frames, parallel = false))]
#[allow(clippy::type_complexity)]
fn correct_batch<'py>(
    py: Python<'py>,
    frames: Vec<(PyReadonlyArray2<'py, f64>, f64, f64)>,
    parallel: bool,
) -> PyResult<(Vec<Option<Correction>>, Vec<(usize, String)>)> {
    let inputs = frames
        .iter()
        .map(|(grid, alpha, ft)| {
            Ok(FrameInput {
                view: view_of(grid)?,
                params: CoiParams {
                    alpha: *alpha,
                    ft: *ft,
                },
            })
        })
        .collect::<PyResult<Vec<_>>>()?;

    let mut corrector = Corrector::new().with_config(CorrectorConfig {
        parallel,
        ..CorrectorConfig::default()
    });
    let report = corrector.correct_batch(&inputs).map_err(to_py_err)?;

    let mut results = Vec::with_capacity(report.outcomes.len());
    let mut errors = Vec::new();
    for (idx, outcome) in report.outcomes.into_iter().enumerate() {
        match outcome {
            Ok(output) => results.push(Some(Correction::from_output(py, output)?)),
            Err(err) => {
                errors.push((idx, err.to_string()));
                results.push(None);
            }
        }
    }
    Ok((results, errors))
}

/// Undo a correction: `primary / corrfactor`.
#[pyfunction]
fn original_counts<'py>(
    py: Python<'py>,
    primary: PyReadonlyArray2<'py, f64>,
    corrfactor: PyReadonlyArray2<'py, f64>,
) -> PyResult<Bound<'py, PyArray2<f64>>> {
    let out = coicorr::lowlevel::original_counts(view_of(&primary)?, view_of(&corrfactor)?)
        .map_err(to_py_err)?;
    to_array(py, out)
}

/// Squared absolute uncertainty in counts: `(primary * rel_uncertainty)^2`.
#[pyfunction]
fn squared_uncertainty_counts<'py>(
    py: Python<'py>,
    primary: PyReadonlyArray2<'py, f64>,
    rel_uncertainty: PyReadonlyArray2<'py, f64>,
) -> PyResult<Bound<'py, PyArray2<f64>>> {
    let out = coicorr::lowlevel::squared_uncertainty_counts(
        view_of(&primary)?,
        view_of(&rel_uncertainty)?,
    )
    .map_err(to_py_err)?;
    to_array(py, out)
}

/// Python module for coincidence-loss correction.
#[pymodule]
fn _coicorr(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<Correction>()?;
    m.add_function(wrap_pyfunction!(windowed_sum, m)?)?;
    m.add_function(wrap_pyfunction!(windowed_finite_count, m)?)?;
    m.add_function(wrap_pyfunction!(windowed_variance, m)?)?;
    m.add_function(wrap_pyfunction!(windowed_std, m)?)?;
    m.add_function(wrap_pyfunction!(correct_frame, m)?)?;
    m.add_function(wrap_pyfunction!(correct_batch, m)?)?;
    m.add_function(wrap_pyfunction!(original_counts, m)?)?;
    m.add_function(wrap_pyfunction!(squared_uncertainty_counts, m)?)?;
    m.add("WINDOW_RADIUS", coicorr::WINDOW_RADIUS)?;
    m.add("__version__", env!("CARGO_PKG_VERSION"))?;
    Ok(())
}
