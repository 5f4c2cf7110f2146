use crate::error::{RectifyError, Result};

/// Marker id printed on the upper-left corner of the board
pub const DEFAULT_UPPER_LEFT_ID: u32 = 203;

/// Marker id printed on the bottom-right corner of the board
pub const DEFAULT_BOTTOM_RIGHT_ID: u32 = 98;

/// Longest side of the rectified output, in pixels
pub const DEFAULT_MAX_DIMENSION: u32 = 1000;

/// Parameters of one rectification run.
///
/// Defaults: ids 203 (upper-left) and 98 (bottom-right), a 1000 pixel longest
/// side, and no shear correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RectifyConfig {
    pub upper_left_id: u32,
    pub bottom_right_id: u32,
    pub max_dimension: u32,
    pub shear_correction: bool,
}

impl RectifyConfig {
    pub fn new(max_dimension: u32, shear_correction: bool) -> Self {
        Self {
            max_dimension,
            shear_correction,
            ..Self::default()
        }
    }

    pub fn with_marker_ids(mut self, upper_left_id: u32, bottom_right_id: u32) -> Self {
        self.upper_left_id = upper_left_id;
        self.bottom_right_id = bottom_right_id;
        self
    }

    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension;
        self
    }

    pub fn with_shear_correction(mut self, enabled: bool) -> Self {
        self.shear_correction = enabled;
        self
    }

    /// Reject values the planner cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.max_dimension == 0 {
            return Err(RectifyError::InvalidMaxDimension(self.max_dimension));
        }
        Ok(())
    }
}

impl Default for RectifyConfig {
    fn default() -> Self {
        Self {
            upper_left_id: DEFAULT_UPPER_LEFT_ID,
            bottom_right_id: DEFAULT_BOTTOM_RIGHT_ID,
            max_dimension: DEFAULT_MAX_DIMENSION,
            shear_correction: false,
        }
    }
}
