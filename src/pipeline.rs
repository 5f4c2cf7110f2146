use image::{DynamicImage, RgbImage};
use log::{debug, info};

use crate::config::RectifyConfig;
use crate::detection::{find_reference_markers, MarkerDetector};
use crate::error::Result;
use crate::geometry::{plan, OutputGeometry};
use crate::transform::warp_perspective;

/// Compute the output size and transform that rectify the board in `image`
pub fn transformation<D: MarkerDetector + ?Sized>(
    image: &DynamicImage,
    detector: &D,
    config: &RectifyConfig,
) -> Result<OutputGeometry> {
    config.validate()?;

    let markers = detector.detect(image);
    debug!("Detector reported {} markers", markers.len());

    let references = find_reference_markers(&markers, config)?;
    plan(&references, config.max_dimension, config.shear_correction)
}

/// Rectify the board in `image`, returning the planned geometry and the warped raster
pub fn rectify<D: MarkerDetector + ?Sized>(
    image: &DynamicImage,
    detector: &D,
    config: &RectifyConfig,
) -> Result<(OutputGeometry, RgbImage)> {
    let geometry = transformation(image, detector, config)?;
    let rectified = warp_perspective(image, &geometry)?;
    info!(
        "Rectified {}x{} -> {}x{}",
        image.width(),
        image.height(),
        rectified.width(),
        rectified.height()
    );
    Ok((geometry, rectified))
}
