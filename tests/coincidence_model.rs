use coicorr::lowlevel::{correct_frame_with_scratch, polynomial, CoiScratch};
use coicorr::{correct_frame, Backend, CoiError, CoiParams, Grid};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const RADIUS: isize = 4;

/// Per-pixel reference implementation of the correction, computed directly.
///
/// Returns `(corrected, corrfactor, rel_uncertainty)` for pixel `(x, y)`.
fn reference_pixel(grid: &Grid, alpha: f64, ft: f64, x: usize, y: usize) -> (f64, f64, f64) {
    let data = grid.get(x, y).unwrap();
    if data.is_nan() {
        return (f64::NAN, f64::NAN, f64::NAN);
    }
    let mut window = Vec::new();
    for dy in -RADIUS..=RADIUS {
        for dx in -RADIUS..=RADIUS {
            let xx = x as isize + dx;
            let yy = y as isize + dy;
            if xx < 0 || yy < 0 {
                continue;
            }
            if let Some(v) = grid.get(xx as usize, yy as usize) {
                if v.is_finite() {
                    window.push(v);
                }
            }
        }
    }
    let n = window.len() as f64;
    let flux: f64 = window.iter().sum();
    let mean = flux / n;
    let std = (window.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / n).sqrt();
    let lo = flux - n * std;
    let hi = flux + n * std;

    let mut c_max = ft * hi;
    let f = polynomial(ft * flux);
    let f_min = polynomial(ft * lo);
    let f_max = polynomial(c_max);
    if alpha * c_max >= 1.0 {
        c_max = 0.99 / alpha;
    }
    let theory = |c: f64| -(1.0 - alpha * c).ln() / (alpha * ft);

    let factor = theory(ft * flux) * f / flux;
    let factor_min = theory(ft * lo) * f_min / lo;
    let factor_max = theory(c_max) * f_max / hi;
    let value = factor * data;
    let unc = (value - factor_min * data)
        .abs()
        .max((factor_max * data - value).abs());
    let rel = if unc == 0.0 { 0.0 } else { unc / value };
    (value, factor, rel)
}

fn close(a: f64, b: f64, rel_tol: f64) -> bool {
    if a.is_nan() || b.is_nan() {
        return a.is_nan() && b.is_nan();
    }
    (a - b).abs() <= rel_tol * a.abs().max(b.abs()).max(1e-12)
}

fn random_rates(rng: &mut StdRng, width: usize, height: usize) -> Grid {
    let data = (0..width * height)
        .map(|_| {
            if rng.random_bool(0.05) {
                f64::NAN
            } else {
                rng.random_range(0.01..0.2)
            }
        })
        .collect();
    Grid::new(data, width, height).unwrap()
}

#[test]
fn outputs_share_input_shape() {
    let grid = Grid::filled(0.05, 13, 7).unwrap();
    let out = correct_frame(grid.view(), CoiParams::new(0.98, 0.011).unwrap()).unwrap();
    assert_eq!(out.frame.corrected.shape(), (7, 13));
    assert_eq!(out.frame.corrfactor.shape(), (7, 13));
    assert_eq!(out.frame.rel_uncertainty.shape(), (7, 13));
    assert_eq!(out.abs_uncertainty.shape(), (7, 13));
}

#[test]
fn matches_direct_reference_on_random_frame() {
    let mut rng = StdRng::seed_from_u64(99);
    let (width, height) = (21, 17);
    let grid = random_rates(&mut rng, width, height);
    let (alpha, ft) = (0.9842, 0.0110329);
    let out = correct_frame(grid.view(), CoiParams::new(alpha, ft).unwrap()).unwrap();

    for y in 0..height {
        for x in 0..width {
            let (value, factor, rel) = reference_pixel(&grid, alpha, ft, x, y);
            assert!(close(out.frame.corrected.get(x, y).unwrap(), value, 1e-8));
            assert!(close(out.frame.corrfactor.get(x, y).unwrap(), factor, 1e-8));
            assert!(close(out.frame.rel_uncertainty.get(x, y).unwrap(), rel, 1e-6));
        }
    }
}

#[test]
fn negligible_dead_time_gives_unit_factor() {
    for rate in [0.0625, 0.05, 0.03] {
        let grid = Grid::filled(rate, 12, 12).unwrap();
        let out = correct_frame(grid.view(), CoiParams::new(0.01, 0.011).unwrap()).unwrap();

        for &factor in out.frame.corrfactor.data() {
            assert!(factor > 1.0 && factor - 1.0 < 5e-3, "rate {rate}: factor {factor}");
        }
        assert!(out.frame.rel_uncertainty.data().iter().all(|&r| r == 0.0));
        assert!(out.saturation.is_none());
        assert!(out.summary.median_rel_uncertainty == 0.0);
    }
}

#[test]
fn uniform_frames_have_zero_relative_uncertainty() {
    for rate in [0.1, 0.3, 0.7, 2.2] {
        let grid = Grid::filled(rate, 20, 20).unwrap();
        let out = correct_frame(grid.view(), CoiParams::new(0.01, 0.011).unwrap()).unwrap();

        let rel = out.frame.rel_uncertainty.data();
        assert!(rel.iter().all(|r| !r.is_nan()), "rate {rate}");
        assert!(rel.iter().all(|&r| r == 0.0), "rate {rate}");
        assert!(out.abs_uncertainty.data().iter().all(|&u| u == 0.0));
        assert!(out.frame.corrfactor.data().iter().all(|f| f.is_finite()));
    }
}

#[test]
fn zero_uncertainty_forces_zero_relative_uncertainty() {
    // The centre pixel has no flux of its own, so corrected == 0 there.
    let mut grid = Grid::filled(0.0625, 11, 11).unwrap().into_vec();
    grid[5 * 11 + 5] = 0.0;
    let grid = Grid::new(grid, 11, 11).unwrap();
    let out = correct_frame(grid.view(), CoiParams::new(0.98, 0.011).unwrap()).unwrap();

    assert_eq!(out.frame.corrected.get(5, 5), Some(0.0));
    assert_eq!(out.abs_uncertainty.get(5, 5), Some(0.0));
    assert_eq!(out.frame.rel_uncertainty.get(5, 5), Some(0.0));
    assert!(out.frame.corrfactor.get(5, 5).unwrap() > 0.0);
}

#[test]
fn zero_flux_and_nan_pixels_stay_undefined() {
    let mut data = vec![0.0; 10 * 10];
    data[3] = f64::NAN;
    let grid = Grid::new(data, 10, 10).unwrap();
    let out = correct_frame(grid.view(), CoiParams::new(0.98, 0.011).unwrap()).unwrap();

    assert!(out.frame.corrfactor.data().iter().all(|v| v.is_nan()));
    assert!(out.frame.corrected.get(3, 0).unwrap().is_nan());
    assert!(out.summary.median_corrfactor.is_nan());
}

#[test]
fn repeated_calls_are_bit_identical() {
    let mut rng = StdRng::seed_from_u64(3);
    let grid = random_rates(&mut rng, 16, 16);
    let params = CoiParams::new(0.95, 0.011).unwrap();
    let a = correct_frame(grid.view(), params).unwrap();

    let mut scratch = CoiScratch::default();
    let b = correct_frame_with_scratch(grid.view(), params, Backend::Scalar, &mut scratch).unwrap();
    let c = correct_frame_with_scratch(grid.view(), params, Backend::Scalar, &mut scratch).unwrap();

    for other in [&b, &c] {
        for (lhs, rhs) in [
            (&a.frame.corrected, &other.frame.corrected),
            (&a.frame.corrfactor, &other.frame.corrfactor),
            (&a.frame.rel_uncertainty, &other.frame.rel_uncertainty),
        ] {
            let l: Vec<u64> = lhs.data().iter().map(|v| v.to_bits()).collect();
            let r: Vec<u64> = rhs.data().iter().map(|v| v.to_bits()).collect();
            assert_eq!(l, r);
        }
    }
}

#[test]
fn saturated_pixels_are_clamped_and_reported() {
    // Alternating rows give a window spread large enough that only the
    // maximum branch crosses 1 / alpha.
    let (width, height) = (11, 11);
    let data: Vec<f64> = (0..width * height)
        .map(|i| if (i / width) % 2 == 0 { 0.5 } else { 3.0 })
        .collect();
    let grid = Grid::new(data, width, height).unwrap();
    let alpha = 0.5;
    let params = CoiParams::new(alpha, 0.011).unwrap();

    let mut scratch = CoiScratch::default();
    let out = correct_frame_with_scratch(grid.view(), params, Backend::Scalar, &mut scratch)
        .expect("saturation is not an error");
    let notice = out.saturation.as_ref().expect("clamp should fire");
    assert!(notice.count() > 0);
    assert_eq!(out.summary.saturated_pixels, notice.count());

    let (counts, _, counts_max) = scratch.counts();
    for (i, &c_max) in counts_max.iter().enumerate() {
        let pixel = (i % width, i / width);
        if notice.pixels.contains(&pixel) {
            assert_eq!(c_max, 0.99 / alpha);
        } else {
            assert!(alpha * c_max < 1.0);
        }
        assert!(alpha * counts[i] < 1.0);
    }
    assert!(out.frame.corrfactor.data().iter().all(|v| v.is_finite()));
}

#[test]
fn invalid_parameters_are_rejected() {
    let grid = Grid::filled(0.1, 9, 9).unwrap();
    for (alpha, ft) in [(0.0, 0.011), (1.0, 0.011), (-0.2, 0.011), (0.98, 0.0), (0.98, -1.0)] {
        let params = CoiParams { alpha, ft };
        let err = correct_frame(grid.view(), params).unwrap_err();
        assert!(matches!(
            err,
            CoiError::InvalidDeadTime { .. } | CoiError::InvalidFrameTime { .. }
        ));
    }
}
