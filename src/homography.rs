//! Projective transform estimation from point correspondences.
//!
//! Uses the normalized Direct Linear Transform: both point sets are
//! translated to their centroid and scaled to a mean distance of sqrt(2),
//! `A h = 0` is solved through SVD, and the result is de-normalized.
//! Four correspondences give the exact transform; more give the algebraic
//! least-squares fit over all of them.

use log::trace;
use nalgebra::{DMatrix, Matrix3, Point2, Vector3};

use crate::error::{RectifyError, Result};

/// A 3x3 projective transform, defined up to scale
pub type Homography = Matrix3<f64>;

/// Triangle area (in normalized units) below which points count as collinear
const COLLINEAR_EPS: f64 = 1e-9;

/// Relative singular value below which the design matrix counts as rank deficient
const RANK_EPS: f64 = 1e-10;

/// Apply a homography to a point.
///
/// Returns `None` when the point maps to infinity.
pub fn project(h: &Homography, p: &Point2<f64>) -> Option<Point2<f64>> {
    let v = h * Vector3::new(p.x, p.y, 1.0);
    if v.z.abs() < f64::EPSILON {
        return None;
    }
    Some(Point2::new(v.x / v.z, v.y / v.z))
}

/// Apply a homography to every point, failing if any maps to infinity
pub fn project_all(h: &Homography, points: &[Point2<f64>]) -> Result<Vec<Point2<f64>>> {
    points
        .iter()
        .map(|p| {
            project(h, p).ok_or_else(|| {
                RectifyError::degenerate(format!("point ({}, {}) maps to infinity", p.x, p.y))
            })
        })
        .collect()
}

fn twice_triangle_area(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Hartley normalization: centroid to the origin, mean distance sqrt(2)
fn normalize_points(points: &[Point2<f64>]) -> Option<(Vec<Point2<f64>>, Matrix3<f64>)> {
    let n = points.len() as f64;
    let cx = points.iter().map(|p| p.x).sum::<f64>() / n;
    let cy = points.iter().map(|p| p.y).sum::<f64>() / n;

    let mean_dist = points
        .iter()
        .map(|p| ((p.x - cx).powi(2) + (p.y - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    if mean_dist < 1e-12 {
        return None;
    }

    let s = 2.0_f64.sqrt() / mean_dist;
    let t = Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);
    let normalized = points
        .iter()
        .map(|p| Point2::new(s * (p.x - cx), s * (p.y - cy)))
        .collect();
    Some((normalized, t))
}

/// Check that normalized points span the plane.
///
/// A minimal set of four must additionally have no three points on a line.
fn check_spread(points: &[Point2<f64>], label: &str) -> Result<()> {
    if points.len() == 4 {
        for skip in 0..4 {
            let tri: Vec<_> = (0..4).filter(|&i| i != skip).map(|i| points[i]).collect();
            if twice_triangle_area(&tri[0], &tri[1], &tri[2]).abs() < COLLINEAR_EPS {
                return Err(RectifyError::degenerate(format!(
                    "three {} points are collinear",
                    label
                )));
            }
        }
        return Ok(());
    }

    let anchor = points[0];
    let spans_plane = points.iter().enumerate().any(|(i, b)| {
        points[i + 1..]
            .iter()
            .any(|c| twice_triangle_area(&anchor, b, c).abs() >= COLLINEAR_EPS)
    });
    if !spans_plane {
        return Err(RectifyError::degenerate(format!(
            "all {} points are collinear",
            label
        )));
    }
    Ok(())
}

/// Estimate `H` such that `destination[i] ~ H * source[i]`.
///
/// The result is scaled so `H[2,2] == 1` whenever that entry is not zero.
pub fn estimate_homography(
    source: &[Point2<f64>],
    destination: &[Point2<f64>],
) -> Result<Homography> {
    let n = source.len();
    if n < 4 || destination.len() != n {
        return Err(RectifyError::InsufficientCorrespondences {
            source_len: n,
            destination_len: destination.len(),
        });
    }

    let (src, t_src) = normalize_points(source)
        .ok_or_else(|| RectifyError::degenerate("source points coincide"))?;
    let (dst, t_dst) = normalize_points(destination)
        .ok_or_else(|| RectifyError::degenerate("destination points coincide"))?;
    check_spread(&src, "source")?;
    check_spread(&dst, "destination")?;

    // Pad to at least 9 rows so the SVD exposes the full null space
    let rows = (2 * n).max(9);
    let mut a = DMatrix::<f64>::zeros(rows, 9);
    for (k, (s, d)) in src.iter().zip(dst.iter()).enumerate() {
        let (x, y, u, v) = (s.x, s.y, d.x, d.y);

        a[(2 * k, 0)] = -x;
        a[(2 * k, 1)] = -y;
        a[(2 * k, 2)] = -1.0;
        a[(2 * k, 6)] = u * x;
        a[(2 * k, 7)] = u * y;
        a[(2 * k, 8)] = u;

        a[(2 * k + 1, 3)] = -x;
        a[(2 * k + 1, 4)] = -y;
        a[(2 * k + 1, 5)] = -1.0;
        a[(2 * k + 1, 6)] = v * x;
        a[(2 * k + 1, 7)] = v * y;
        a[(2 * k + 1, 8)] = v;
    }

    let svd = a.svd(false, true);
    let v_t = svd
        .v_t
        .ok_or_else(|| RectifyError::degenerate("SVD did not converge"))?;

    let mut order: Vec<usize> = (0..svd.singular_values.len()).collect();
    order.sort_by(|&i, &j| svd.singular_values[i].total_cmp(&svd.singular_values[j]));
    let largest = svd.singular_values[order[order.len() - 1]];
    let second_smallest = svd.singular_values[order[1]];
    trace!(
        "DLT singular values: smallest {:.3e}, second {:.3e}, largest {:.3e}",
        svd.singular_values[order[0]],
        second_smallest,
        largest
    );
    if largest <= 0.0 || second_smallest / largest < RANK_EPS {
        return Err(RectifyError::degenerate(
            "correspondences do not determine a unique transform",
        ));
    }

    let h = v_t.row(order[0]);
    let hn = Matrix3::from_row_slice(&[h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]]);

    // Normalized points are O(1), so det(hn) of a unit-norm hn is a scale-free measure
    if hn.determinant().abs() < 1e-12 {
        return Err(RectifyError::degenerate("estimated transform is singular"));
    }

    let t_dst_inv = t_dst
        .try_inverse()
        .ok_or_else(|| RectifyError::degenerate("normalization is not invertible"))?;
    let mut h = t_dst_inv * hn * t_src;

    let scale = h[(2, 2)];
    if scale.abs() > f64::EPSILON {
        h /= scale;
    } else {
        h /= h.norm();
    }

    Ok(h)
}

/// Map four corners (clockwise from top-left) onto an axis-aligned square of
/// the given side anchored at the origin
pub fn normalizing_homography(corners: &[Point2<f64>; 4], side: f64) -> Result<Homography> {
    estimate_homography(corners, &square_at(Point2::origin(), side))
}

/// Corners of an axis-aligned square, clockwise from its top-left corner
pub fn square_at(origin: Point2<f64>, side: f64) -> [Point2<f64>; 4] {
    [
        origin,
        Point2::new(origin.x + side, origin.y),
        Point2::new(origin.x + side, origin.y + side),
        Point2::new(origin.x, origin.y + side),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: &Point2<f64>, b: &Point2<f64>, tol: f64) {
        assert!(
            (a.x - b.x).abs() < tol && (a.y - b.y).abs() < tol,
            "expected {:?}, got {:?}",
            b,
            a
        );
    }

    fn ground_truth() -> Homography {
        Matrix3::new(
            1.2, 0.15, 30.0, //
            -0.05, 0.9, 12.0, //
            4e-4, -2e-4, 1.0,
        )
    }

    #[test]
    fn test_four_points_exact() {
        let gt = ground_truth();
        let src = square_at(Point2::new(10.0, 20.0), 50.0);
        let dst: Vec<_> = src.iter().map(|p| project(&gt, p).unwrap()).collect();

        let h = estimate_homography(&src, &dst).unwrap();
        for (s, d) in src.iter().zip(dst.iter()) {
            assert_close(&project(&h, s).unwrap(), d, 1e-8);
        }
        assert!((h - gt).abs().max() < 1e-8);
    }

    #[test]
    fn test_eight_consistent_points_recover_transform() {
        let gt = ground_truth();
        let mut src = square_at(Point2::new(0.0, 0.0), 1.0).to_vec();
        src.extend(square_at(Point2::new(5.0, 2.0), 1.0));
        let dst: Vec<_> = src.iter().map(|p| project(&gt, p).unwrap()).collect();

        let h = estimate_homography(&src, &dst).unwrap();
        for (s, d) in src.iter().zip(dst.iter()) {
            assert_close(&project(&h, s).unwrap(), d, 1e-8);
        }
    }

    #[test]
    fn test_eight_noisy_points_best_fit() {
        let mut src = square_at(Point2::new(0.0, 0.0), 100.0).to_vec();
        src.extend(square_at(Point2::new(400.0, 300.0), 100.0));
        let noise = [0.4, -0.3, 0.2, -0.5, 0.1, 0.3, -0.2, 0.5];
        let dst: Vec<_> = src
            .iter()
            .zip(noise.iter())
            .map(|(p, n)| Point2::new(p.x + n, p.y - n))
            .collect();

        let h = estimate_homography(&src, &dst).unwrap();
        for (s, d) in src.iter().zip(dst.iter()) {
            assert_close(&project(&h, s).unwrap(), d, 2.0);
        }
    }

    #[test]
    fn test_unit_square_normalization() {
        let corners = [
            Point2::new(100.0, 100.0),
            Point2::new(160.0, 105.0),
            Point2::new(158.0, 170.0),
            Point2::new(97.0, 162.0),
        ];
        let h = normalizing_homography(&corners, 1.0).unwrap();
        for (c, u) in corners.iter().zip(square_at(Point2::origin(), 1.0).iter()) {
            assert_close(&project(&h, c).unwrap(), u, 1e-9);
        }
    }

    #[test]
    fn test_collinear_source_rejected() {
        let src = [
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(2.0, 2.0),
            Point2::new(3.0, 3.0),
        ];
        let dst = square_at(Point2::origin(), 1.0);
        assert!(matches!(
            estimate_homography(&src, &dst),
            Err(RectifyError::DegenerateConfiguration(_))
        ));
    }

    #[test]
    fn test_three_collinear_in_minimal_set_rejected() {
        let src = [
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(0.0, 1.0),
        ];
        let dst = square_at(Point2::origin(), 1.0);
        assert!(matches!(
            estimate_homography(&src, &dst),
            Err(RectifyError::DegenerateConfiguration(_))
        ));
    }

    #[test]
    fn test_coincident_points_rejected() {
        let src = [Point2::new(5.0, 5.0); 4];
        let dst = square_at(Point2::origin(), 1.0);
        assert!(matches!(
            estimate_homography(&src, &dst),
            Err(RectifyError::DegenerateConfiguration(_))
        ));
    }

    #[test]
    fn test_too_few_points() {
        let src = [Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(1.0, 1.0)];
        assert!(matches!(
            estimate_homography(&src, &src),
            Err(RectifyError::InsufficientCorrespondences {
                source_len: 3,
                destination_len: 3
            })
        ));
    }

    #[test]
    fn test_project_at_infinity() {
        let h = Matrix3::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0);
        assert!(project(&h, &Point2::new(0.0, 3.0)).is_none());
        assert!(project_all(&h, &[Point2::new(0.0, 3.0)]).is_err());
    }
}
