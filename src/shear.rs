//! Residual shear correction.
//!
//! After the two-marker fit, a square marker can still come out with
//! unequal diagonals. The ratio of the diagonals drives an affine
//! correction applied in output pixel space.

use nalgebra::{Matrix3, Point2};

use crate::error::{RectifyError, Result};
use crate::homography::{project_all, Homography};

/// Ratio of the bottom-right marker's diagonals once mapped through the
/// normalizing transform; 1.0 means no shear.
///
/// The ratio is `|c2 - c0| / |c3 - c1|` with corners clockwise from the
/// marker's top-left.
pub fn measure_shear(corners: &[Point2<f64>; 4], normalizing: &Homography) -> Result<f64> {
    let v = project_all(normalizing, corners)?;
    let main_diagonal = (v[2] - v[0]).norm();
    let anti_diagonal = (v[3] - v[1]).norm();
    if anti_diagonal < f64::EPSILON {
        return Err(RectifyError::degenerate(
            "bottom-right marker collapses to a line after normalization",
        ));
    }
    Ok(main_diagonal / anti_diagonal)
}

/// Affine correction for shear factor `n` on an output raster of `size`.
///
/// Identity at `n == 1`.
pub fn shear_matrix(size: (f64, f64), n: f64) -> Homography {
    let (w, h) = size;
    let diagonal = n / 2.0 + 0.5;
    let cross = (1.0 - n) / 2.0;
    Matrix3::new(
        diagonal, cross * h / w, 0.0, //
        cross * w / h, diagonal, 0.0, //
        0.0, 0.0, 1.0,
    )
}
