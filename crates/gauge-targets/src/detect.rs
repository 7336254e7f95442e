use crate::{bowtie, calib, core};
use image::{GrayImage, RgbImage};
use nalgebra::Point2;
use serde::Serialize;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Errors produced by the high-level facade helpers.
#[derive(thiserror::Error, Debug)]
pub enum DetectError {
    #[error("invalid grayscale image buffer length (expected {expected} bytes, got {got})")]
    InvalidGrayBuffer { expected: usize, got: usize },

    #[error(transparent)]
    Bowtie(#[from] bowtie::BowtieError),

    #[error(transparent)]
    Calib(#[from] calib::CalibError),
}

impl DetectError {
    pub fn kind(&self) -> core::ErrorKind {
        match self {
            DetectError::InvalidGrayBuffer { .. } => core::ErrorKind::Validation,
            DetectError::Bowtie(e) => e.kind(),
            DetectError::Calib(e) => e.kind(),
        }
    }
}

/// Convert an `image::GrayImage` into the lightweight `gauge-targets-core` view type.
pub fn gray_view(img: &GrayImage) -> core::GrayImageView<'_> {
    core::GrayImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

/// Borrow a raw row-major 8-bit buffer as a gray view.
pub fn gray_view_from_raw(
    width: usize,
    height: usize,
    data: &[u8],
) -> Result<core::GrayImageView<'_>, DetectError> {
    core::GrayImageView::from_slice(width, height, data).map_err(|e| {
        DetectError::InvalidGrayBuffer {
            expected: e.width * e.height,
            got: e.got,
        }
    })
}

/// Copy a `gauge-targets-core` image into an `image::GrayImage`.
pub fn to_image_gray(img: &core::GrayImage) -> Option<GrayImage> {
    GrayImage::from_raw(img.width as u32, img.height as u32, img.data.clone())
}

/// Image size of an `image` buffer.
pub fn image_size(img: &GrayImage) -> core::ImageSize {
    core::ImageSize::new(img.width(), img.height())
}

/// Locate every fiducial of the detector's grid.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(detector, img), fields(width = img.width(), height = img.height()))
)]
pub fn find_targets(
    detector: &mut bowtie::TargetDetector,
    img: &GrayImage,
    min_score: f32,
) -> Result<bowtie::DetectionGrid, DetectError> {
    Ok(detector.find_targets(&gray_view(img), min_score)?)
}

/// [`find_targets`] plus a colour copy of the input with a cross-hair on every
/// refined candidate and, once sorted, the grid rows joined in green.
///
/// The debug image is rendered even when sorting fails, as long as candidates
/// were found.
pub fn find_targets_with_debug(
    detector: &mut bowtie::TargetDetector,
    img: &GrayImage,
    min_score: f32,
) -> (Result<bowtie::DetectionGrid, DetectError>, Option<RgbImage>) {
    let result = find_targets(detector, img, min_score);
    let debug = (!detector.candidates().is_empty()).then(|| {
        let mut canvas = crate::overlay::to_rgb(img);
        crate::overlay::draw_candidates(&mut canvas, detector.candidates());
        if let Ok(grid) = &result {
            crate::overlay::draw_targets(&mut canvas, grid);
        }
        canvas
    });
    (result, debug)
}

/// Movement of one top-row fiducial relative to its calibrated position.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TargetShift {
    pub side: core::Side,
    pub score: f32,
    /// Window the target was searched in.
    pub search_roi: core::RoiRect,
    pub reference_px: Point2<f64>,
    pub found_px: Point2<f64>,
    pub reference_world: Point2<f64>,
    pub found_world: Point2<f64>,
}

impl TargetShift {
    /// `found - reference` in pixels.
    pub fn pixel_offset(&self) -> [f64; 2] {
        [
            self.found_px.x - self.reference_px.x,
            self.found_px.y - self.reference_px.y,
        ]
    }

    /// `found - reference` in world units.
    pub fn world_offset(&self) -> [f64; 2] {
        [
            self.found_world.x - self.reference_world.x,
            self.found_world.y - self.reference_world.y,
        ]
    }

    /// Euclidean pixel distance between found and reference positions.
    pub fn pixel_distance(&self) -> f64 {
        let [dx, dy] = self.pixel_offset();
        dx.hypot(dy)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct MoveReport {
    pub left: TargetShift,
    pub right: TargetShift,
}

impl MoveReport {
    /// Largest pixel displacement of the two targets.
    pub fn max_pixel_distance(&self) -> f64 {
        self.left.pixel_distance().max(self.right.pixel_distance())
    }
}

/// Re-detect the two top fiducials inside the calibration's move-search
/// regions and compare them with the calibrated reference points.
///
/// The detector must already hold a template bank; its move regions are
/// replaced by the calibration's.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip(detector, model, img), fields(width = img.width(), height = img.height()))
)]
pub fn measure_displacement(
    detector: &mut bowtie::TargetDetector,
    model: &calib::CalibrationModel,
    img: &GrayImage,
) -> Result<MoveReport, DetectError> {
    let size = image_size(img);
    for side in core::Side::BOTH {
        detector.set_move_target_roi(size, model.move_search_roi(side)?, side)?;
    }
    let found = detector.find_move_targets(&gray_view(img))?;

    let shift = |side: core::Side| -> Result<TargetShift, DetectError> {
        let hit = found.get(side);
        let reference_px = model.move_ref_point(side)?;
        Ok(TargetShift {
            side,
            score: hit.score,
            search_roi: model.move_search_roi(side)?,
            reference_px,
            found_px: hit.point,
            reference_world: model.pixel_to_world(reference_px)?,
            found_world: model.pixel_to_world(hit.point)?,
        })
    };
    let report = MoveReport {
        left: shift(core::Side::Left)?,
        right: shift(core::Side::Right)?,
    };
    log::info!(
        "target displacement: left {:.2}px, right {:.2}px",
        report.left.pixel_distance(),
        report.right.pixel_distance()
    );
    Ok(report)
}
