use gauge_targets_core::{ErrorKind, GridSize};

/// Errors returned by the calibration model and its file I/O.
#[derive(thiserror::Error, Debug)]
pub enum CalibError {
    #[error("pixel ({pixel}) and world ({world}) point counts differ or are empty")]
    PointCountMismatch { pixel: usize, world: usize },
    #[error("{cols}x{rows} grid does not match {points} points")]
    GridMismatch { cols: u32, rows: u32, points: usize },
    #[error("{}x{} grid is below the 2x4 minimum", .0.cols, .0.rows)]
    GridTooSmall(GridSize),
    #[error("image size must be non-zero")]
    EmptyImageSize,
    #[error("pixel point {index} ({x}, {y}) is not finite or lies outside the image")]
    PixelOutsideImage { index: usize, x: f64, y: f64 },
    #[error("world point {index} ({x}, {y}) is not finite")]
    NonFiniteWorldPoint { index: usize, x: f64, y: f64 },
    #[error("top row too narrow for a scan swath (width {0})")]
    DegenerateSwath(i32),
    #[error("homography fit failed ({0})")]
    HomographyFit(&'static str),
    #[error("point ({x}, {y}) cannot be transformed")]
    TransformFailure { x: f64, y: f64 },
    #[error("model is not calibrated")]
    Uncalibrated,
    #[error("model has no search lines")]
    MissingSearchLines,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl CalibError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CalibError::Uncalibrated => ErrorKind::Uncalibrated,
            CalibError::TransformFailure { .. } | CalibError::HomographyFit(_) => {
                ErrorKind::TransformFailure
            }
            CalibError::Io(_) => ErrorKind::Io,
            _ => ErrorKind::Validation,
        }
    }
}
