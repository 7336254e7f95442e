use gauge_targets_core::{ErrorKind, RoiRect, Side};

/// Errors returned by the bowtie detector.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum BowtieError {
    #[error("template dimension {0} outside [20, 1000]")]
    InvalidTemplateDim(u32),
    #[error("template bank not initialized")]
    NotInitialized,
    #[error("image is empty")]
    EmptyImage,
    #[error("image buffer holds {len} bytes for a {width}x{height} image")]
    MalformedImage {
        width: usize,
        height: usize,
        len: usize,
    },
    #[error("image {width}x{height} is smaller than the {needed}x{needed} search window")]
    ImageTooSmall {
        width: usize,
        height: usize,
        needed: usize,
    },
    #[error("orientation index {index} outside 0..{count}")]
    InvalidOrientation { index: usize, count: usize },
    #[error("minimum score {score} outside [{min}, {max}]")]
    InvalidMinScore { score: f32, min: f32, max: f32 },
    #[error("requested {0} matches, must be in 1..=1000")]
    InvalidMatchCount(usize),
    #[error("no template match reached the minimum score")]
    NoMatches,
    #[error("found {found} candidates, grid needs {needed}")]
    TooFewCandidates { found: usize, needed: usize },
    #[error("found {found} move targets, expected 2")]
    MoveTargetCount { found: usize },
    #[error("top row of the grid has no horizontal extent")]
    DegenerateTopRow,
    #[error("{side:?} move-search region {rect:?} does not fit the image")]
    RoiOutOfBounds { side: Side, rect: RoiRect },
    #[error("peak ({x}, {y}) has no full 3x3 neighbourhood")]
    PeakOnBorder { x: usize, y: usize },
    #[error("score map buffer does not match its {width}x{height} shape")]
    MalformedScoreMap { width: usize, height: usize },
    #[error("score centroid has non-positive total weight")]
    DegenerateCentroid,
    #[error("template {index} is flat after rotation")]
    FlatTemplate { index: usize },
}

impl BowtieError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BowtieError::NoMatches
            | BowtieError::TooFewCandidates { .. }
            | BowtieError::MoveTargetCount { .. } => ErrorKind::InsufficientMatches,
            BowtieError::DegenerateCentroid | BowtieError::FlatTemplate { .. } => {
                ErrorKind::Internal
            }
            _ => ErrorKind::Validation,
        }
    }
}
