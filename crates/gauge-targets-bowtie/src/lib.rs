//! Bowtie fiducial detector for gauge calibration targets.
//!
//! A gauge target is a planar grid of "bowtie" markers: two dark triangles
//! whose apexes touch, printed on a light board. The detector finds every
//! marker of the grid and, later, re-finds the two top markers to check that
//! neither the camera nor the target has moved.
//!
//! Pipeline:
//! 1. Build a [`TemplateBank`]: one unrotated bowtie template plus rotated
//!    variants one degree apart on either side.
//! 2. Coarse search: ZNCC of the unrotated template over the whole image,
//!    peak picking with disk suppression.
//! 3. Refinement: each coarse candidate is re-scored in a small window with
//!    every template of the bank; the best score wins and its peak is refined
//!    to subpixel precision with a 3x3 centroid.
//! 4. Sorting: the best `rows * cols` candidates are arranged into a raster
//!    ordered [`DetectionGrid`] and the move-search windows are derived from
//!    its top row.
//!
//! ```
//! use gauge_targets_bowtie::{BowtieParams, TargetDetector};
//! use gauge_targets_core::{GrayImage, ImageSize};
//!
//! let mut detector = TargetDetector::new(BowtieParams::default());
//! detector.init_bowtie_template(32, ImageSize::new(320, 240)).unwrap();
//!
//! let blank = GrayImage::new_filled(320, 240, 224);
//! assert!(detector.find_targets(&blank.view(), 0.6).is_err());
//! ```

mod detector;
mod error;
mod params;
mod score_map;
mod sort;
mod template;
mod types;

pub use detector::{MatchScratch, TargetDetector};
pub use error::BowtieError;
pub use params::{
    BowtieParams, BOWTIE_BACKGROUND, BOWTIE_FOREGROUND, MAX_TEMPLATE_DIM, MIN_TEMPLATE_DIM,
    TEMPLATE_COUNT,
};
pub use score_map::{correlate_zncc, subpixel_point_refine, ScoreMap};
pub use sort::sort_into_grid;
pub use template::{draw_bowtie, BowtieTemplate, TemplateBank};
pub use types::{DetectionGrid, MatchCandidate, MovePoints, MoveRois};
