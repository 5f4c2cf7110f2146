use log::debug;
use nalgebra::{Point2, Vector2};

use crate::detection::ReferenceMarkers;
use crate::error::{RectifyError, Result};
use crate::homography::{
    estimate_homography, normalizing_homography, project, square_at, Homography,
};
use crate::shear::{measure_shear, shear_matrix};

/// Where and how large the rectified board ends up
#[derive(Debug, Clone, PartialEq)]
pub struct OutputGeometry {
    /// Output raster size in pixels (width, height)
    pub size: (u32, u32),
    /// Final transform from source image pixels to output pixels
    pub transform: Homography,
    /// Two-marker transform before any shear correction
    pub undistort: Homography,
    /// Board extent in marker widths (bottom-right corner of the bottom-right
    /// marker, seen from the upper-left marker)
    pub board_extent: Vector2<f64>,
    /// Output pixels per marker width
    pub marker_width: f64,
    /// Diagonal ratio used for shear correction, when it was applied
    pub shear_factor: Option<f64>,
}

/// Fit the longest side to `max_dimension` keeping the proportions of `extent`.
///
/// Fails when the extent shows the bottom-right marker left of or above the
/// upper-left one.
pub fn fit_to_max_dimension(max_dimension: u32, extent: &Vector2<f64>) -> Result<Vector2<f64>> {
    let max_dim = max_dimension as f64;

    if extent.x <= 0.0 {
        return Err(RectifyError::BadPlacement(
            "bottom-right code does not appear to be right of upper-left code".to_string(),
        ));
    }
    if extent.y <= 0.0 {
        return Err(RectifyError::BadPlacement(
            "bottom-right code does not appear to be lower than upper-left code".to_string(),
        ));
    }

    if extent.y / extent.x > 1.0 {
        Ok(Vector2::new(max_dim * extent.x / extent.y, max_dim))
    } else {
        Ok(Vector2::new(max_dim, max_dim * extent.y / extent.x))
    }
}

/// Transform mapping both markers onto squares of side `marker_width` in the
/// output corners: upper-left at the origin, bottom-right flush with the
/// far corner.
fn board_homography(
    markers: &ReferenceMarkers,
    image_size: &Vector2<f64>,
    marker_width: f64,
) -> Result<Homography> {
    let source: Vec<Point2<f64>> = markers
        .top_left
        .corners
        .iter()
        .chain(markers.bottom_right.corners.iter())
        .copied()
        .collect();

    let far_origin = Point2::new(image_size.x - marker_width, image_size.y - marker_width);
    let mut destination = square_at(Point2::origin(), marker_width).to_vec();
    destination.extend(square_at(far_origin, marker_width));

    estimate_homography(&source, &destination)
}

/// Plan the output raster and the source-to-output transform for a board
pub fn plan(
    markers: &ReferenceMarkers,
    max_dimension: u32,
    shear_correction: bool,
) -> Result<OutputGeometry> {
    if max_dimension == 0 {
        return Err(RectifyError::InvalidMaxDimension(max_dimension));
    }

    // Upper-left marker becomes the unit square; distances are now in marker widths
    let normalizing = normalizing_homography(&markers.top_left.corners, 1.0)?;
    let far_corner = project(&normalizing, &markers.bottom_right.corners[2]).ok_or_else(|| {
        RectifyError::degenerate("bottom-right marker corner maps to infinity")
    })?;
    let extent = far_corner.coords;
    debug!("Board extent: {:.3} x {:.3} marker widths", extent.x, extent.y);

    let image_size = fit_to_max_dimension(max_dimension, &extent)?;
    let marker_width = image_size.x / extent.x;
    debug!(
        "Output size: {:.1} x {:.1} px, marker width {:.2} px",
        image_size.x, image_size.y, marker_width
    );

    let undistort = board_homography(markers, &image_size, marker_width)?;

    let (transform, shear_factor) = if shear_correction {
        let factor = measure_shear(&markers.bottom_right.corners, &normalizing)?;
        debug!("Shear factor: {:.4}", factor);
        let shear = shear_matrix((image_size.x, image_size.y), factor);
        (shear * undistort, Some(factor))
    } else {
        (undistort, None)
    };

    let size = (
        (image_size.x.round() as u32).max(1),
        (image_size.y.round() as u32).max(1),
    );

    Ok(OutputGeometry {
        size,
        transform,
        undistort,
        board_extent: extent,
        marker_width,
        shear_factor,
    })
}
