pub mod cli;
pub mod config;
pub mod detection;
pub mod error;
pub mod geometry;
pub mod homography;
pub mod pipeline;
pub mod shear;
pub mod transform;

pub use cli::Cli;
pub use config::RectifyConfig;
pub use detection::{
    find_reference_markers, Marker, MarkerDetector, MarkerSet, PrecomputedDetections,
    ReferenceMarkers,
};
pub use error::{RectifyError, Result};
pub use geometry::{fit_to_max_dimension, plan, OutputGeometry};
pub use homography::{estimate_homography, normalizing_homography, project, Homography};
pub use pipeline::{rectify, transformation};
pub use shear::{measure_shear, shear_matrix};
pub use transform::warp_perspective;
