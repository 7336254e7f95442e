//! Pixel/world calibration for bowtie gauge targets.
//!
//! A [`CalibrationModel`] is built from the pixel positions of the target's
//! fiducial grid (as found by `gauge-targets-bowtie`) and their surveyed
//! world positions. From them it derives:
//!
//! - the pixel-to-world and world-to-pixel homographies,
//! - the two move-search regions around the top-row fiducials,
//! - the scan swath the water-edge finder walks.
//!
//! Models are persisted as JSON ([`CalibrationFile`]); only the
//! correspondences are authoritative and everything else is recomputed on
//! load.
//!
//! ```
//! use gauge_targets_calib::CalibrationModel;
//! use gauge_targets_core::{GridSize, ImageSize, Side};
//! use nalgebra::Point2;
//!
//! let mut pixel = Vec::new();
//! let mut world = Vec::new();
//! for (row, wy) in [90.0, 60.0, 30.0, 0.0].into_iter().enumerate() {
//!     for wx in [0.0, 50.0] {
//!         pixel.push(Point2::new(400.0 + 4.0 * wx, 100.0 + 160.0 * row as f64));
//!         world.push(Point2::new(wx, wy));
//!     }
//! }
//!
//! let mut model = CalibrationModel::default();
//! model
//!     .calibrate(&pixel, &world, GridSize::new(2, 4), ImageSize::new(1000, 800))
//!     .unwrap();
//! let w = model.pixel_to_world(Point2::new(500.0, 340.0)).unwrap();
//! assert!((w.x - 25.0).abs() < 1e-6 && (w.y - 45.0).abs() < 1e-6);
//! assert_eq!(model.move_ref_point(Side::Right).unwrap(), pixel[1]);
//! ```

mod error;
mod grid_lines;
mod io;
mod model;
mod params;
mod swath;

pub use error::CalibError;
pub use grid_lines::{RowLabel, WorldGridOverlay};
pub use io::{
    CalibrationFile, ModelRecord, MoveSearchRegions, PixelToWorldRecord, PointRecord,
    SearchLineRecord,
};
pub use model::{Calibration, CalibrationModel};
pub use params::CalibParams;
pub use swath::calc_search_swaths;
