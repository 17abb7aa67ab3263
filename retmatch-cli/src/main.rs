//! Command line interface for comparing two retinal photographs.

use clap::{Parser, ValueEnum};
use retmatch::io::{load_raw_image, save_gray_image};
use retmatch::{
    compare_images, keypoint_correspondences, render_correspondences, ColorMode, CompareConfig,
    EngineConfig, Enhancement, KernelShape, KeypointParams, MatchStrategy, Pipeline,
    PipelineConfig, RawImage, TemplateParams, TerminalStage,
};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Compare two retinal fundus photographs and report whether they show the
/// same eye.
#[derive(Parser, Debug)]
#[command(version)]
struct Cli {
    /// First photograph.
    image1: PathBuf,

    /// Second photograph.
    image2: PathBuf,

    /// Similarity strategy.
    #[arg(long, value_enum, default_value_t = StrategyArg::Template)]
    strategy: StrategyArg,

    /// Metric used by the template strategy.
    #[arg(long, value_enum, default_value_t = MetricArg::Correlation)]
    metric: MetricArg,

    /// Decision threshold override, interpreted on the active metric's scale.
    #[arg(long)]
    threshold: Option<f32>,

    /// Take intensity from the HSV value channel instead of BT.601 luma.
    #[arg(long)]
    hsv: bool,

    /// Equalize the intensity histogram instead of applying a linear gain.
    #[arg(long)]
    equalize: bool,

    /// Finish with a Sobel edge map instead of the morphology stage.
    #[arg(long)]
    edges: bool,

    /// Largest kernel of the ascending median sweep (odd).
    #[arg(long, default_value_t = 31)]
    median_max_kernel: usize,

    /// Neighbourhood size of the adaptive threshold (odd, at least 3).
    #[arg(long, default_value_t = 23)]
    block_size: usize,

    /// Offset subtracted from the neighbourhood mean.
    #[arg(long, default_value_t = 12)]
    offset: i32,

    /// Value assigned to foreground pixels.
    #[arg(long, default_value_t = 125)]
    foreground: u8,

    /// Structuring element shape for the morphology stage.
    #[arg(long, value_enum, default_value_t = ShapeArg::Rect)]
    kernel_shape: ShapeArg,

    /// Erosion structuring element size.
    #[arg(long, default_value_t = 5)]
    erode_size: usize,

    /// Dilation structuring element size.
    #[arg(long, default_value_t = 1)]
    dilate_size: usize,

    /// Largest admissible index distance between matched keypoints.
    #[arg(long, default_value_t = 10)]
    position_tolerance: usize,

    /// Correspondences required before the keypoint strategy declares a match.
    #[arg(long, default_value_t = 10)]
    min_matches: usize,

    /// Preprocess the two images one after the other.
    #[arg(long)]
    sequential: bool,

    /// Write every intermediate stage image into this directory.
    #[arg(long, value_name = "DIR")]
    debug_dir: Option<PathBuf>,

    /// Render matched keypoints side by side into this file.
    #[arg(long, value_name = "FILE")]
    matches_out: Option<PathBuf>,

    /// Print the result as JSON.
    #[arg(long)]
    json: bool,

    /// Enable tracing output for stage timings.
    #[arg(long)]
    trace: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StrategyArg {
    Template,
    Keypoint,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum MetricArg {
    Correlation,
    SquaredDifference,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum ShapeArg {
    Rect,
    Ellipse,
}

#[derive(Debug, Serialize)]
struct Report {
    score: f32,
    is_match: bool,
    strategy: &'static str,
}

fn build_config(cli: &Cli) -> CompareConfig {
    let mut template = match cli.metric {
        MetricArg::Correlation => TemplateParams::normed_correlation(),
        MetricArg::SquaredDifference => TemplateParams::squared_difference(),
    };
    if let Some(threshold) = cli.threshold {
        template.threshold = threshold;
    }

    let keypoint = KeypointParams {
        position_tolerance: cli.position_tolerance,
        min_correspondences: cli.min_matches,
        ..KeypointParams::default()
    };

    CompareConfig {
        pipeline: PipelineConfig {
            color_mode: if cli.hsv {
                ColorMode::HsvValue
            } else {
                ColorMode::Luma
            },
            enhancement: if cli.equalize {
                Enhancement::HistogramEqualization
            } else {
                Enhancement::default()
            },
            median_max_kernel: cli.median_max_kernel,
            threshold_block_size: cli.block_size,
            threshold_offset: cli.offset,
            threshold_value: cli.foreground,
            morph_kernel_shape: match cli.kernel_shape {
                ShapeArg::Rect => KernelShape::Rect,
                ShapeArg::Ellipse => KernelShape::Ellipse,
            },
            morph_erode_size: cli.erode_size,
            morph_dilate_size: cli.dilate_size,
            terminal: if cli.edges {
                TerminalStage::EdgeMap
            } else {
                TerminalStage::Morphology
            },
        },
        engine: EngineConfig {
            strategy: match cli.strategy {
                StrategyArg::Template => MatchStrategy::Template,
                StrategyArg::Keypoint => MatchStrategy::Keypoint,
            },
            template,
            keypoint,
        },
        parallel: !cli.sequential,
    }
}

fn write_diagnostics(
    cli: &Cli,
    config: &CompareConfig,
    raw1: &RawImage,
    raw2: &RawImage,
) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = Pipeline::new(config.pipeline)?;

    if let Some(dir) = &cli.debug_dir {
        std::fs::create_dir_all(dir)?;
        for (label, raw) in [("img1", raw1), ("img2", raw2)] {
            let (_, snapshots) = pipeline.process_stages(raw)?;
            for snapshot in &snapshots {
                let path = dir.join(format!("{label}_{}.png", snapshot.stage.name()));
                save_gray_image(&path, snapshot.image.view())?;
            }
        }
    }

    if let Some(path) = &cli.matches_out {
        let left = pipeline.process(raw1)?;
        let right = pipeline.process(raw2)?;
        let matches = keypoint_correspondences(left.view(), right.view(), &config.engine.keypoint);
        let canvas = render_correspondences(left.view(), right.view(), &matches);
        save_gray_image(path, canvas.view())?;
    }

    Ok(())
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env().add_directive("retmatch=info".parse()?))
            .with_target(false)
            .init();
    }

    let raw1 = load_raw_image(&cli.image1)?;
    let raw2 = load_raw_image(&cli.image2)?;
    let config = build_config(cli);

    if cli.debug_dir.is_some() || cli.matches_out.is_some() {
        write_diagnostics(cli, &config, &raw1, &raw2)?;
    }

    let result = compare_images(&raw1, &raw2, &config)?;

    if cli.json {
        let report = Report {
            score: result.score,
            is_match: result.is_match,
            strategy: result.strategy.name(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", result.score);
        println!("{}", u8::from(result.is_match));
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            eprintln!("run with --help for usage");
            ExitCode::FAILURE
        }
    }
}
