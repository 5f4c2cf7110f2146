use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use image::ImageReader;
use log::{debug, error, info, LevelFilter};

use whiteboard_rectify::{rectify, Cli, PrecomputedDetections, RectifyError};

fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

/// Human-readable diagnostic for pipeline failures
fn describe(err: &RectifyError) -> String {
    match err {
        RectifyError::MissingUpperLeft { id } => {
            format!("Upper Left code (the one with ID {}) is missing", id)
        }
        RectifyError::MissingBottomRight { id } => {
            format!("Bottom Right code (the one with ID {}) is missing", id)
        }
        RectifyError::BadPlacement(msg) => {
            format!("The two ARUCO codes are misplaced ({})", msg)
        }
        other => other.to_string(),
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = cli.config();

    let img = ImageReader::open(&cli.input)
        .with_context(|| format!("Failed to open input file: {:?}", cli.input))?
        .decode()
        .with_context(|| format!("Failed to decode image: {:?}", cli.input))?;
    debug!("Loaded image: {:?} ({}x{})", cli.input, img.width(), img.height());

    let detections = PrecomputedDetections::from_json_file(&cli.markers_path())?;

    let (geometry, rectified) = rectify(&img, &detections, &config)?;

    debug!("Final matrix:");
    for row in 0..3 {
        debug!(
            "  [{:10.4}, {:10.4}, {:10.4}]",
            geometry.transform[(row, 0)],
            geometry.transform[(row, 1)],
            geometry.transform[(row, 2)]
        );
    }

    let output_path = cli.output_path();
    rectified
        .save(&output_path)
        .with_context(|| format!("Failed to save output: {:?}", output_path))?;

    info!("Saved rectified whiteboard: {:?}", output_path);
    info!(
        "Dimensions: {}x{} -> {}x{}",
        img.width(),
        img.height(),
        rectified.width(),
        rectified.height()
    );

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let message = match err.downcast_ref::<RectifyError>() {
                Some(e) if e.is_missing_marker() || matches!(e, RectifyError::BadPlacement(_)) => {
                    describe(e)
                }
                _ => format!("{:#}", err),
            };
            error!("Error: {}", message);
            ExitCode::FAILURE
        }
    }
}
