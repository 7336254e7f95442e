//! Debug drawings on top of gauge images.
//!
//! Colours follow the usual convention of the gauge tooling: candidates and
//! move-search windows in red, the scan-swath outline in blue, the world grid
//! in yellow with green node markers.

use crate::{bowtie, calib, core};
use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use nalgebra::Point2;

pub const RED: Rgb<u8> = Rgb([255, 0, 0]);
pub const GREEN: Rgb<u8> = Rgb([0, 255, 0]);
pub const BLUE: Rgb<u8> = Rgb([0, 0, 255]);
pub const YELLOW: Rgb<u8> = Rgb([255, 255, 0]);

const CROSS_HALF: f32 = 5.0;

#[derive(thiserror::Error, Debug)]
pub enum OverlayError {
    #[error("{side:?} move-search region {rect:?} lies outside the image")]
    RoiOutOfBounds { side: core::Side, rect: core::RoiRect },

    #[error(transparent)]
    Calib(#[from] calib::CalibError),
}

impl OverlayError {
    pub fn kind(&self) -> core::ErrorKind {
        match self {
            OverlayError::RoiOutOfBounds { .. } => core::ErrorKind::Validation,
            OverlayError::Calib(e) => e.kind(),
        }
    }
}

/// Which layers [`draw_calibration`] renders.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OverlayOptions {
    pub calib: bool,
    pub move_rois: bool,
    pub search_roi: bool,
}

impl Default for OverlayOptions {
    fn default() -> Self {
        Self {
            calib: true,
            move_rois: true,
            search_roi: true,
        }
    }
}

/// Non-fatal findings collected while drawing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OverlayReport {
    pub warnings: Vec<String>,
}

pub fn to_rgb(img: &GrayImage) -> RgbImage {
    DynamicImage::ImageLuma8(img.clone()).to_rgb8()
}

/// Line width that stays visible on large images.
pub fn stroke_width(height: u32) -> u32 {
    ((height as f64 / 300.0).round() as u32).max(1)
}

fn node_radius(height: u32) -> i32 {
    ((height as f64 / 120.0).round() as i32).max(5)
}

fn draw_thick_segment(canvas: &mut RgbImage, a: (f32, f32), b: (f32, f32), color: Rgb<u8>, stroke: u32) {
    let steep = (b.1 - a.1).abs() > (b.0 - a.0).abs();
    let half = (stroke as i32 - 1) / 2;
    for k in -half..=(stroke as i32 - 1 - half) {
        let k = k as f32;
        let (oa, ob) = if steep {
            ((a.0 + k, a.1), (b.0 + k, b.1))
        } else {
            ((a.0, a.1 + k), (b.0, b.1 + k))
        };
        draw_line_segment_mut(canvas, oa, ob, color);
    }
}

fn draw_rect(canvas: &mut RgbImage, rect: core::RoiRect, color: Rgb<u8>, stroke: u32) {
    if rect.is_empty() {
        return;
    }
    for i in 0..stroke as i32 {
        let r = Rect::at(rect.x - i, rect.y - i)
            .of_size((rect.width + 2 * i) as u32, (rect.height + 2 * i) as u32);
        draw_hollow_rect_mut(canvas, r, color);
    }
}

fn pt(p: Point2<f64>) -> (f32, f32) {
    (p.x as f32, p.y as f32)
}

fn pti(p: Point2<i32>) -> (f32, f32) {
    (p.x as f32, p.y as f32)
}

/// Red cross-hair on every candidate.
pub fn draw_candidates(canvas: &mut RgbImage, candidates: &[bowtie::MatchCandidate]) {
    for c in candidates {
        let (x, y) = pt(c.point);
        draw_line_segment_mut(canvas, (x - CROSS_HALF, y), (x + CROSS_HALF, y), RED);
        draw_line_segment_mut(canvas, (x, y - CROSS_HALF), (x, y + CROSS_HALF), RED);
    }
}

/// Candidates of a sorted grid, with the grid rows joined in green.
pub fn draw_targets(canvas: &mut RgbImage, grid: &bowtie::DetectionGrid) {
    for row in grid.rows() {
        for pair in row.windows(2) {
            draw_line_segment_mut(canvas, pt(pair[0].point), pt(pair[1].point), GREEN);
        }
    }
    draw_candidates(canvas, &grid.cells);
}

/// Outline both move-search windows in red.
///
/// Fails without drawing if either window does not fit inside the image.
pub fn draw_move_rois(canvas: &mut RgbImage, rois: &bowtie::MoveRois) -> Result<(), OverlayError> {
    let size = core::ImageSize::new(canvas.width(), canvas.height());
    for side in core::Side::BOTH {
        let rect = rois.get(side);
        if !rect.fits_within(size) {
            return Err(OverlayError::RoiOutOfBounds { side, rect });
        }
    }
    let stroke = stroke_width(canvas.height());
    for side in core::Side::BOTH {
        draw_rect(canvas, rois.get(side), RED, stroke);
    }
    Ok(())
}

/// Blue outline of the scan swath: the first and last scan lines plus the
/// edges joining their ends. Returns `false` when there is nothing to draw.
pub fn draw_search_outline(canvas: &mut RgbImage, lines: &[core::SearchLine], stroke: u32) -> bool {
    let (Some(first), Some(last)) = (lines.first(), lines.last()) else {
        return false;
    };
    for (a, b) in [
        (first.top, first.bot),
        (last.top, last.bot),
        (first.top, last.top),
        (first.bot, last.bot),
    ] {
        draw_thick_segment(canvas, pti(a), pti(b), BLUE, stroke);
    }
    true
}

/// Yellow world grid with green node circles and a tick at each row start.
pub fn draw_world_grid(canvas: &mut RgbImage, overlay: &calib::WorldGridOverlay, stroke: u32) {
    for [a, b] in &overlay.segments {
        draw_thick_segment(canvas, pt(*a), pt(*b), YELLOW, stroke);
    }
    let radius = node_radius(canvas.height());
    for n in &overlay.nodes {
        let c = (n.x.round() as i32, n.y.round() as i32);
        for k in 0..stroke as i32 {
            draw_hollow_circle_mut(canvas, c, radius + k, GREEN);
        }
    }
    let tick = 2.0 * radius as f32;
    for label in &overlay.labels {
        let (x, y) = pt(label.anchor);
        draw_thick_segment(canvas, (x - tick, y), (x, y), YELLOW, stroke);
    }
}

/// Render the calibration layers selected by `opts` over `img`.
pub fn draw_calibration(
    model: &calib::CalibrationModel,
    img: &GrayImage,
    opts: OverlayOptions,
) -> Result<(RgbImage, OverlayReport), OverlayError> {
    let calibration = model.calibration().ok_or(calib::CalibError::Uncalibrated)?;
    let mut canvas = to_rgb(img);
    let mut report = OverlayReport::default();
    let stroke = stroke_width(canvas.height());

    if opts.calib {
        let grid = calibration.world_grid_lines()?;
        draw_world_grid(&mut canvas, &grid, stroke);
    }
    if opts.move_rois {
        let size = core::ImageSize::new(canvas.width(), canvas.height());
        for side in core::Side::BOTH {
            let rect = calibration.move_search_roi(side).clip_to(size);
            if rect.is_empty() {
                report
                    .warnings
                    .push(format!("{side:?} move-search region is outside the image"));
                continue;
            }
            draw_rect(&mut canvas, rect, RED, stroke);
        }
    }
    if opts.search_roi && !draw_search_outline(&mut canvas, &calibration.search_lines, stroke) {
        report
            .warnings
            .push("no search lines to draw the search region".to_string());
    }

    for w in &report.warnings {
        log::warn!("{w}");
    }
    Ok((canvas, report))
}
