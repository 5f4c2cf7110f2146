use image::{DynamicImage, Rgb, RgbImage};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};
use log::debug;

use crate::error::{RectifyError, Result};
use crate::geometry::OutputGeometry;
use crate::homography::Homography;

/// Fill colour for output pixels that map outside the source image
pub const BORDER_COLOR: Rgb<u8> = Rgb([0, 0, 0]);

/// Smallest determinant imageproc accepts once `H[2,2]` is scaled to 1
const MIN_DETERMINANT: f64 = 1e-10;

/// Convert a homography to the row-major `f32` form imageproc expects.
///
/// imageproc divides by `H[2,2]` before inverting, so the scaling is done
/// here in `f64` and transforms it cannot represent are rejected up front.
fn to_projection(matrix: &Homography) -> Result<Projection> {
    if matrix.iter().any(|v| !v.is_finite()) {
        return Err(RectifyError::degenerate(
            "output transform has non-finite entries",
        ));
    }

    let scale = matrix[(2, 2)];
    if scale.abs() <= f64::EPSILON * matrix.norm() {
        return Err(RectifyError::degenerate(
            "output transform maps the source origin to infinity",
        ));
    }
    let normalized = matrix / scale;
    if normalized.try_inverse().is_none() || normalized.determinant().abs() < MIN_DETERMINANT {
        return Err(RectifyError::degenerate("output transform is not invertible"));
    }

    let mut entries = [0f32; 9];
    for row in 0..3 {
        for col in 0..3 {
            entries[row * 3 + col] = normalized[(row, col)] as f32;
        }
    }
    Projection::from_matrix(entries)
        .ok_or_else(|| RectifyError::degenerate("output transform is not invertible"))
}

/// Resample `img` into a raster of `geometry.size` through `geometry.transform`.
///
/// Each output pixel is looked up through the inverse transform with bicubic
/// interpolation; pixels falling outside the source get [`BORDER_COLOR`].
pub fn warp_perspective(img: &DynamicImage, geometry: &OutputGeometry) -> Result<RgbImage> {
    let projection = to_projection(&geometry.transform)?;
    let (width, height) = geometry.size;

    debug!(
        "Warp: {}x{} -> {}x{}",
        img.width(),
        img.height(),
        width,
        height
    );

    let rgb = img.to_rgb8();
    let mut output = RgbImage::new(width, height);
    warp_into(
        &rgb,
        &projection,
        Interpolation::Bicubic,
        BORDER_COLOR,
        &mut output,
    );

    Ok(output)
}
