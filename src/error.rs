use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for whiteboard rectification
pub type Result<T> = std::result::Result<T, RectifyError>;

/// Everything that can stop the rectification pipeline.
///
/// Every variant aborts the pipeline; nothing is retried internally since the
/// same image and marker geometry always produce the same outcome.
#[derive(Error, Debug)]
pub enum RectifyError {
    /// The upper-left reference marker was not among the detections
    #[error("upper-left marker (id {id}) is missing")]
    MissingUpperLeft { id: u32 },

    /// The bottom-right reference marker was not among the detections
    #[error("bottom-right marker (id {id}) is missing")]
    MissingBottomRight { id: u32 },

    /// Both markers were found but their relative placement contradicts their roles
    #[error("markers are misplaced ({0})")]
    BadPlacement(String),

    /// Point correspondences do not determine a usable projective transform
    #[error("degenerate point configuration: {0}")]
    DegenerateConfiguration(String),

    /// Source and destination point lists are too short or of different length
    #[error("need at least 4 matching correspondences, got {source_len} source and {destination_len} destination points")]
    InsufficientCorrespondences {
        source_len: usize,
        destination_len: usize,
    },

    #[error("max dimension must be positive, got {0}")]
    InvalidMaxDimension(u32),

    /// Precomputed marker detections could not be read or parsed
    #[error("failed to load marker detections from {path:?}")]
    Detections {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl RectifyError {
    pub(crate) fn degenerate(message: impl Into<String>) -> Self {
        Self::DegenerateConfiguration(message.into())
    }

    pub(crate) fn detections<E>(path: impl Into<PathBuf>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Detections {
            path: path.into(),
            source: Box::new(source),
        }
    }

    /// True when the failure is about which markers were seen, as opposed to
    /// their geometry or the input files.
    pub fn is_missing_marker(&self) -> bool {
        matches!(
            self,
            RectifyError::MissingUpperLeft { .. } | RectifyError::MissingBottomRight { .. }
        )
    }
}
