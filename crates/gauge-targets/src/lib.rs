//! High-level facade crate for the `gauge-targets-*` workspace.
//!
//! This crate provides:
//! - re-exports of the detector and calibration crates,
//! - (feature `image`) helpers that run the bowtie detector on
//!   `image::GrayImage` buffers, measure target displacement against a
//!   calibration, and render debug overlays with `imageproc`,
//! - (feature `cli`) the `gauge-targets` command-line tool.
//!
//! ## Quickstart
//!
//! ```no_run
//! use gauge_targets::bowtie::{BowtieParams, TargetDetector};
//! use gauge_targets::core::ImageSize;
//! use gauge_targets::detect;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let img = image::open("gauge.png")?.to_luma8();
//! let mut detector = TargetDetector::new(BowtieParams::default());
//! detector.init_bowtie_template(56, ImageSize::new(img.width(), img.height()))?;
//!
//! let grid = detect::find_targets(&mut detector, &img, 0.6)?;
//! println!("top-left target at {:?}", grid.cells[0].point);
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `gauge_targets::core`: geometry, gray images, homographies, error kinds.
//! - `gauge_targets::bowtie`: template bank, correlation and the target detector.
//! - `gauge_targets::calib`: calibration model, scan swaths and calibration files.
//! - `gauge_targets::detect` (feature `image`): end-to-end helpers on `image` buffers.
//! - `gauge_targets::overlay` (feature `image`): debug drawings.

pub use gauge_targets_bowtie as bowtie;
pub use gauge_targets_calib as calib;
pub use gauge_targets_core as core;

pub use gauge_targets_bowtie::{BowtieError, BowtieParams, DetectionGrid, TargetDetector};
pub use gauge_targets_calib::{CalibError, CalibParams, CalibrationModel};
pub use gauge_targets_core::{ErrorKind, GridSize, ImageSize, RoiRect, SearchLine, Side};

#[cfg(feature = "image")]
pub mod detect;
#[cfg(feature = "image")]
pub mod overlay;
