//! Regression tests against reference frames.
//!
//! `fixtures/reference_frames.json` holds small frames together with the
//! corrected data, correction factor and relative uncertainty computed by an
//! independent pixel-by-pixel implementation of the model. `null` encodes NaN.

use coicorr::{correct_frame, CoiParams, Grid};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

/// Relative tolerance; summation order differs from the reference convolution.
const REL_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Deserialize)]
struct ReferenceCase {
    case_id: String,
    width: usize,
    height: usize,
    alpha: f64,
    ft: f64,
    data: Vec<Vec<Option<f64>>>,
    corrected: Vec<Vec<Option<f64>>>,
    corrfactor: Vec<Vec<Option<f64>>>,
    rel_uncertainty: Vec<Vec<Option<f64>>>,
    saturated: Vec<(usize, usize)>,
}

#[derive(Debug, Deserialize)]
struct ReferenceFile {
    cases: Vec<ReferenceCase>,
}

fn load_cases() -> Vec<ReferenceCase> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("reference_frames.json");
    let text = fs::read_to_string(&path).expect("read reference fixture");
    let file: ReferenceFile = serde_json::from_str(&text).expect("parse reference fixture");
    file.cases
}

fn to_grid(rows: &[Vec<Option<f64>>]) -> Grid {
    let rows: Vec<Vec<f64>> = rows
        .iter()
        .map(|row| row.iter().map(|v| v.unwrap_or(f64::NAN)).collect())
        .collect();
    Grid::from_rows(&rows).unwrap()
}

fn assert_grid_close(case_id: &str, label: &str, got: &Grid, expected: &[Vec<Option<f64>>]) {
    for (y, row) in expected.iter().enumerate() {
        for (x, expected) in row.iter().enumerate() {
            let value = got.get(x, y).unwrap();
            match expected {
                None => assert!(value.is_nan(), "{case_id} {label} ({x}, {y}) = {value}"),
                Some(e) => {
                    let tol = REL_TOLERANCE * e.abs().max(1e-12);
                    assert!(
                        (value - e).abs() <= tol,
                        "{case_id} {label} ({x}, {y}): {value} vs {e}"
                    );
                }
            }
        }
    }
}

#[test]
fn reference_frames_match() {
    let cases = load_cases();
    assert!(!cases.is_empty());

    for case in cases {
        let data = to_grid(&case.data);
        assert_eq!(data.shape(), (case.height, case.width));

        let params = CoiParams::new(case.alpha, case.ft).unwrap();
        let out = correct_frame(data.view(), params).unwrap();

        assert_grid_close(&case.case_id, "corrected", &out.frame.corrected, &case.corrected);
        assert_grid_close(&case.case_id, "corrfactor", &out.frame.corrfactor, &case.corrfactor);
        assert_grid_close(
            &case.case_id,
            "rel_uncertainty",
            &out.frame.rel_uncertainty,
            &case.rel_uncertainty,
        );

        let pixels = out.saturation.map(|n| n.pixels).unwrap_or_default();
        assert_eq!(pixels, case.saturated, "{}", case.case_id);
    }
}
