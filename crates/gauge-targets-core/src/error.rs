use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse classification shared by every error in the workspace.
///
/// Each crate keeps its own descriptive `thiserror` enum; `kind()` on those
/// enums maps the variant onto one of these buckets so callers (and the CLI
/// exit codes) can react without matching on crate-specific variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad parameters, counts or formats; rejected before any mutation.
    Validation,
    /// A conversion or region query was made before calibration.
    Uncalibrated,
    /// The projective transform could not be evaluated.
    TransformFailure,
    /// Template matching did not produce enough candidates.
    InsufficientMatches,
    /// File system or serialization failure.
    Io,
    /// Unexpected numeric failure inside an algorithm.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Uncalibrated => "uncalibrated",
            ErrorKind::TransformFailure => "transform failure",
            ErrorKind::InsufficientMatches => "insufficient matches",
            ErrorKind::Io => "io",
            ErrorKind::Internal => "internal",
        };
        f.write_str(s)
    }
}
