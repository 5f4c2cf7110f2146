use clap::Parser;
use std::path::PathBuf;

use crate::config::{
    RectifyConfig, DEFAULT_BOTTOM_RIGHT_ID, DEFAULT_MAX_DIMENSION, DEFAULT_UPPER_LEFT_ID,
};

#[derive(Parser, Debug)]
#[command(name = "whiteboard-rectify")]
#[command(version, about = "Rectify a whiteboard photo using two fiducial markers at opposite corners")]
pub struct Cli {
    /// Input image path
    #[arg(required = true)]
    pub input: PathBuf,

    /// Output path [default: input_whiteboard.png]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Marker detections as JSON [default: input.markers.json]
    #[arg(short, long)]
    pub markers: Option<PathBuf>,

    /// Output size (longest side in pixels)
    #[arg(short = 's', long, default_value_t = DEFAULT_MAX_DIMENSION, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_dimension: u32,

    /// Skip the shear correction step
    #[arg(long)]
    pub no_shear_correction: bool,

    /// Id of the marker in the board's upper-left corner
    #[arg(long, default_value_t = DEFAULT_UPPER_LEFT_ID)]
    pub upper_left_id: u32,

    /// Id of the marker in the board's bottom-right corner
    #[arg(long, default_value_t = DEFAULT_BOTTOM_RIGHT_ID)]
    pub bottom_right_id: u32,

    /// Show geometry details
    #[arg(long)]
    pub verbose: bool,
}

impl Cli {
    pub fn output_path(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| {
            let stem = self.input.file_stem().unwrap_or_default().to_string_lossy();
            let parent = self.input.parent().unwrap_or(std::path::Path::new("."));
            parent.join(format!("{}_whiteboard.png", stem))
        })
    }

    pub fn markers_path(&self) -> PathBuf {
        self.markers.clone().unwrap_or_else(|| {
            let mut name = self.input.clone().into_os_string();
            name.push(".markers.json");
            PathBuf::from(name)
        })
    }

    pub fn config(&self) -> RectifyConfig {
        RectifyConfig::new(self.max_dimension, !self.no_shear_correction)
            .with_marker_ids(self.upper_left_id, self.bottom_right_id)
    }
}
