//! Core types and utilities for bowtie gauge calibration.
//!
//! This crate is intentionally small and purely geometric. It knows nothing
//! about template matching or calibration files; it provides the shared
//! vocabulary the other `gauge-targets-*` crates speak:
//!
//! - grid / image sizes, ROI rectangles, scan lines and left/right sides,
//! - a borrowed and an owned 8-bit gray image with bicubic sampling and a
//!   rotation warp,
//! - least-squares homography fitting,
//! - the [`ErrorKind`] taxonomy every crate maps its errors onto,
//! - a minimal logger.

mod error;
mod geom;
mod homography;
mod image;
mod logger;

pub use error::ErrorKind;
pub use geom::{GridSize, ImageSize, RoiRect, SearchLine, Side};
pub use homography::{estimate_homography, homography_from_4pt, Homography};
pub use image::{
    rotate_about_center, sample_bicubic, GrayImage, GrayImageView, ImageBufferError,
};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
