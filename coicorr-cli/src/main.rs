use clap::Parser;
use coicorr::lowlevel::{nan_median, radius_from_signed};
use coicorr::{
    Backend, CoiParams, CoiResult, CorrectionOutput, Corrector, CorrectorConfig, FrameInput, Grid,
    WindowStats,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "Coincidence-loss correction CLI (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output for performance profiling.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum BackendConfig {
    #[default]
    Scalar,
    Simd,
}

impl From<BackendConfig> for Backend {
    fn from(value: BackendConfig) -> Self {
        match value {
            BackendConfig::Scalar => Backend::Scalar,
            BackendConfig::Simd => Backend::Simd,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Config {
    frames_path: String,
    output_path: Option<String>,
    parallel: bool,
    backend: BackendConfig,
    include_grids: bool,
    stats_radius: Option<i64>,
}

/// One frame as stored in the frames file; `null` samples are invalid pixels.
#[derive(Debug, Deserialize)]
struct FrameRecord {
    width: usize,
    height: usize,
    data: Vec<Option<f64>>,
    alpha: f64,
    ft: f64,
}

impl FrameRecord {
    fn to_grid(&self) -> CoiResult<Grid> {
        let data = self.data.iter().map(|v| v.unwrap_or(f64::NAN)).collect();
        Grid::new(data, self.width, self.height)
    }

    fn params(&self) -> CoiParams {
        // Unvalidated; the corrector rejects bad headers frame by frame.
        CoiParams {
            alpha: self.alpha,
            ft: self.ft,
        }
    }
}

#[derive(Debug, Serialize)]
struct SummaryRecord {
    median_corrfactor: f64,
    median_rel_uncertainty: f64,
    saturated_pixels: usize,
}

#[derive(Debug, Serialize)]
struct SaturationRecord {
    pixels: Vec<[usize; 2]>,
    clamped_counts: f64,
}

#[derive(Debug, Serialize)]
struct StatsRecord {
    radius: usize,
    median_sum: f64,
    median_std: f64,
}

#[derive(Debug, Serialize)]
struct GridsRecord {
    corrected: Vec<f64>,
    corrfactor: Vec<f64>,
    rel_uncertainty: Vec<f64>,
    abs_uncertainty: Vec<f64>,
}

#[derive(Debug, Default, Serialize)]
struct FrameReport {
    index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<SummaryRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    saturation: Option<SaturationRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    window_stats: Option<StatsRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    grids: Option<GridsRecord>,
}

impl FrameReport {
    fn failed(index: usize, error: String) -> Self {
        Self {
            index,
            error: Some(error),
            ..Self::default()
        }
    }

    fn from_output(index: usize, output: CorrectionOutput, include_grids: bool) -> Self {
        let summary = SummaryRecord {
            median_corrfactor: output.summary.median_corrfactor,
            median_rel_uncertainty: output.summary.median_rel_uncertainty,
            saturated_pixels: output.summary.saturated_pixels,
        };
        let saturation = output.saturation.map(|notice| SaturationRecord {
            pixels: notice.pixels.iter().map(|&(x, y)| [x, y]).collect(),
            clamped_counts: notice.clamped_counts,
        });
        let grids = include_grids.then(|| GridsRecord {
            corrected: output.frame.corrected.into_vec(),
            corrfactor: output.frame.corrfactor.into_vec(),
            rel_uncertainty: output.frame.rel_uncertainty.into_vec(),
            abs_uncertainty: output.abs_uncertainty.into_vec(),
        });
        Self {
            index,
            summary: Some(summary),
            saturation,
            grids,
            ..Self::default()
        }
    }
}

#[derive(Debug, Serialize)]
struct Output {
    frames: usize,
    succeeded: usize,
    failed: usize,
    saturated_frames: Vec<usize>,
    results: Vec<FrameReport>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("coicorr=info".parse()?))
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.frames_path.is_empty() {
        return Err("frames_path must be set in the config".into());
    }
    let stats_radius = config.stats_radius.map(radius_from_signed).transpose()?;
    let backend = Backend::from(config.backend);

    let frames_text = fs::read_to_string(&config.frames_path)?;
    let records: Vec<FrameRecord> = serde_json::from_str(&frames_text)?;
    let grids: Vec<CoiResult<Grid>> = records.iter().map(FrameRecord::to_grid).collect();

    // Frames whose samples do not form a grid never reach the corrector.
    let mut indices = Vec::new();
    let mut inputs = Vec::new();
    for (idx, (record, grid)) in records.iter().zip(&grids).enumerate() {
        if let Ok(grid) = grid {
            indices.push(idx);
            inputs.push(FrameInput {
                view: grid.view(),
                params: record.params(),
            });
        }
    }

    let mut corrector = Corrector::new().with_config(CorrectorConfig {
        parallel: config.parallel,
        backend,
    });
    let report = corrector.correct_batch(&inputs)?;

    let mut results: Vec<FrameReport> = grids
        .iter()
        .enumerate()
        .filter_map(|(idx, grid)| {
            grid.as_ref()
                .err()
                .map(|err| FrameReport::failed(idx, err.to_string()))
        })
        .collect();
    for (idx, outcome) in indices.iter().copied().zip(report.outcomes) {
        match outcome {
            Ok(output) => {
                let mut record = FrameReport::from_output(idx, output, config.include_grids);
                if let (Some(radius), Ok(grid)) = (stats_radius, &grids[idx]) {
                    let stats = WindowStats::compute(grid.view(), radius, backend)?;
                    record.window_stats = Some(StatsRecord {
                        radius,
                        median_sum: nan_median(stats.sum.data()),
                        median_std: nan_median(stats.std.data()),
                    });
                }
                results.push(record);
            }
            Err(err) => results.push(FrameReport::failed(idx, err.to_string())),
        }
    }
    results.sort_by_key(|r| r.index);

    for failed in results.iter().filter(|r| r.error.is_some()) {
        tracing::warn!(
            frame = failed.index,
            error = failed.error.as_deref().unwrap_or_default(),
            "frame skipped"
        );
    }

    let succeeded = results.iter().filter(|r| r.error.is_none()).count();
    let saturated_frames = results
        .iter()
        .filter(|r| r.saturation.is_some())
        .map(|r| r.index)
        .collect();
    let output = Output {
        frames: records.len(),
        succeeded,
        failed: records.len() - succeeded,
        saturated_frames,
        results,
    };
    let json = serde_json::to_string_pretty(&output)?;

    match config.output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
