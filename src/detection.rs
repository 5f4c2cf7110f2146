use std::fs;
use std::path::Path;

use image::DynamicImage;
use log::{debug, warn};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::config::RectifyConfig;
use crate::error::{RectifyError, Result};

/// A fiducial marker as reported by a detector.
///
/// Corners are clockwise starting at the marker's own top-left corner, in
/// source image pixel coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub id: u32,
    pub corners: [Point2<f64>; 4],
}

impl Marker {
    pub fn new(id: u32, corners: [Point2<f64>; 4]) -> Self {
        Self { id, corners }
    }
}

/// All markers detected in one image, in detector order
pub type MarkerSet = Vec<Marker>;

/// The two markers anchoring the board geometry
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceMarkers {
    pub top_left: Marker,
    pub bottom_right: Marker,
}

/// Source of marker detections for an image.
///
/// Implementations must return each marker's corners clockwise from its own
/// top-left corner, and report each physical marker at most once.
pub trait MarkerDetector {
    fn detect(&self, image: &DynamicImage) -> MarkerSet;
}

/// Detections computed ahead of time by an external fiducial detector.
///
/// The JSON form is an array of `{"id": 203, "corners": [[x, y], ...]}`
/// objects with exactly four corners each.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrecomputedDetections {
    markers: MarkerSet,
}

impl PrecomputedDetections {
    pub fn new(markers: MarkerSet) -> Self {
        Self { markers }
    }

    pub fn from_json_str(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|e| RectifyError::detections(path, e))?;
        let detections =
            Self::from_json_str(&json).map_err(|e| RectifyError::detections(path, e))?;
        debug!(
            "Loaded {} marker detections from {:?}",
            detections.markers.len(),
            path
        );
        Ok(detections)
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }
}

impl MarkerDetector for PrecomputedDetections {
    fn detect(&self, _image: &DynamicImage) -> MarkerSet {
        self.markers.clone()
    }
}

/// First marker with the given id, in detector order
fn find_marker(markers: &[Marker], id: u32) -> Option<&Marker> {
    let mut matches = markers.iter().filter(|m| m.id == id);
    let first = matches.next()?;
    if matches.next().is_some() {
        warn!("Marker id {} detected more than once, using the first", id);
    }
    Some(first)
}

/// Pick the upper-left and bottom-right reference markers out of a detection set
pub fn find_reference_markers(
    markers: &[Marker],
    config: &RectifyConfig,
) -> Result<ReferenceMarkers> {
    let top_left = find_marker(markers, config.upper_left_id).ok_or(
        RectifyError::MissingUpperLeft {
            id: config.upper_left_id,
        },
    )?;
    let bottom_right = find_marker(markers, config.bottom_right_id).ok_or(
        RectifyError::MissingBottomRight {
            id: config.bottom_right_id,
        },
    )?;

    Ok(ReferenceMarkers {
        top_left: top_left.clone(),
        bottom_right: bottom_right.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(id: u32, x: f64, y: f64) -> Marker {
        Marker::new(
            id,
            [
                Point2::new(x, y),
                Point2::new(x + 10.0, y),
                Point2::new(x + 10.0, y + 10.0),
                Point2::new(x, y + 10.0),
            ],
        )
    }

    #[test]
    fn test_find_both_markers() {
        let markers = vec![square(7, 50.0, 50.0), square(98, 90.0, 40.0), square(203, 0.0, 0.0)];
        let refs = find_reference_markers(&markers, &RectifyConfig::default()).unwrap();
        assert_eq!(refs.top_left.id, 203);
        assert_eq!(refs.bottom_right.id, 98);
        assert_eq!(refs.bottom_right.corners[0], Point2::new(90.0, 40.0));
    }

    #[test]
    fn test_missing_upper_left_reported_first() {
        let err = find_reference_markers(&[], &RectifyConfig::default()).unwrap_err();
        assert!(matches!(err, RectifyError::MissingUpperLeft { id: 203 }));
    }

    #[test]
    fn test_missing_bottom_right() {
        let markers = vec![square(203, 0.0, 0.0), square(99, 5.0, 5.0)];
        let err = find_reference_markers(&markers, &RectifyConfig::default()).unwrap_err();
        assert!(matches!(err, RectifyError::MissingBottomRight { id: 98 }));
        assert!(err.is_missing_marker());
    }

    #[test]
    fn test_first_duplicate_wins() {
        let markers = vec![square(203, 1.0, 1.0), square(98, 30.0, 30.0), square(203, 2.0, 2.0)];
        let refs = find_reference_markers(&markers, &RectifyConfig::default()).unwrap();
        assert_eq!(refs.top_left.corners[0], Point2::new(1.0, 1.0));
    }

    #[test]
    fn test_custom_ids() {
        let markers = vec![square(11, 0.0, 0.0), square(22, 30.0, 30.0)];
        let config = RectifyConfig::default().with_marker_ids(11, 22);
        let refs = find_reference_markers(&markers, &config).unwrap();
        assert_eq!((refs.top_left.id, refs.bottom_right.id), (11, 22));
    }

    #[test]
    fn test_parse_detections_json() {
        let json = r#"[
            {"id": 203, "corners": [[10.0, 12.0], [40.0, 11.0], [41.0, 42.0], [9.5, 40.0]]},
            {"id": 98, "corners": [[300, 200], [330, 200], [330, 230], [300, 230]]}
        ]"#;
        let detections = PrecomputedDetections::from_json_str(json).unwrap();
        assert_eq!(detections.markers().len(), 2);
        assert_eq!(detections.markers()[0].corners[3], Point2::new(9.5, 40.0));
        assert_eq!(detections.markers()[1].id, 98);
    }

    #[test]
    fn test_reject_wrong_corner_count() {
        let json = r#"[{"id": 203, "corners": [[0, 0], [1, 0], [1, 1]]}]"#;
        assert!(PrecomputedDetections::from_json_str(json).is_err());
    }

    #[test]
    fn test_precomputed_detector_ignores_image() {
        let detections = PrecomputedDetections::new(vec![square(203, 0.0, 0.0)]);
        let image = DynamicImage::new_rgb8(4, 4);
        assert_eq!(detections.detect(&image), detections.markers().to_vec());
    }
}
