use gauge_targets_core::{
    estimate_homography, GridSize, Homography, ImageSize, RoiRect, SearchLine, Side,
};
use nalgebra::Point2;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::error::CalibError;
use crate::params::CalibParams;
use crate::swath::calc_search_swaths;

/// A complete pixel/world calibration.
///
/// Both homographies are fit independently from the same correspondences;
/// the regions and search lines are derived from the pixel points.
#[derive(Clone, Debug, PartialEq)]
pub struct Calibration {
    pub grid: GridSize,
    pub image_size: ImageSize,
    /// Raster order: top row first, left to right.
    pub pixel_points: Vec<Point2<f64>>,
    pub world_points: Vec<Point2<f64>>,
    pub pixel_to_world: Homography,
    pub world_to_pixel: Homography,
    pub move_search_left: RoiRect,
    pub move_search_right: RoiRect,
    pub search_lines: Vec<SearchLine>,
}

impl Calibration {
    /// Validate the correspondences and derive everything from them.
    pub fn build(
        params: &CalibParams,
        pixel_points: &[Point2<f64>],
        world_points: &[Point2<f64>],
        grid: GridSize,
        image_size: ImageSize,
    ) -> Result<Self, CalibError> {
        if pixel_points.len() != world_points.len() || pixel_points.is_empty() {
            return Err(CalibError::PointCountMismatch {
                pixel: pixel_points.len(),
                world: world_points.len(),
            });
        }
        if grid.cols == 0 || grid.count() != pixel_points.len() {
            return Err(CalibError::GridMismatch {
                cols: grid.cols,
                rows: grid.rows,
                points: pixel_points.len(),
            });
        }
        if let Some(index) = world_points
            .iter()
            .position(|w| !(w.x.is_finite() && w.y.is_finite()))
        {
            return Err(CalibError::NonFiniteWorldPoint {
                index,
                x: world_points[index].x,
                y: world_points[index].y,
            });
        }

        // also rejects pixel points that are not finite or outside the image
        let search_lines = calc_search_swaths(pixel_points, grid, image_size)?;

        let pixel_to_world = estimate_homography(pixel_points, world_points)
            .ok_or(CalibError::HomographyFit("pixel to world"))?;
        let world_to_pixel = estimate_homography(world_points, pixel_points)
            .ok_or(CalibError::HomographyFit("world to pixel"))?;

        let side = 2 * params.move_search_margin as i32;
        let region = |p: Point2<f64>| {
            RoiRect::centered_square(p.x.round() as i32, p.y.round() as i32, side)
                .clip_to(image_size)
        };
        let move_search_left = region(pixel_points[0]);
        let move_search_right = region(pixel_points[grid.cols as usize - 1]);

        Ok(Self {
            grid,
            image_size,
            pixel_points: pixel_points.to_vec(),
            world_points: world_points.to_vec(),
            pixel_to_world,
            world_to_pixel,
            move_search_left,
            move_search_right,
            search_lines,
        })
    }

    pub fn move_search_roi(&self, side: Side) -> RoiRect {
        match side {
            Side::Left => self.move_search_left,
            Side::Right => self.move_search_right,
        }
    }

    /// First (left) or last (right) pixel point of the top row.
    pub fn move_ref_point(&self, side: Side) -> Result<Point2<f64>, CalibError> {
        if self.grid.count() != self.pixel_points.len() {
            return Err(CalibError::GridMismatch {
                cols: self.grid.cols,
                rows: self.grid.rows,
                points: self.pixel_points.len(),
            });
        }
        let idx = match side {
            Side::Left => 0,
            Side::Right => self.grid.cols as usize - 1,
        };
        Ok(self.pixel_points[idx])
    }

    pub fn pixel_to_world(&self, p: Point2<f64>) -> Result<Point2<f64>, CalibError> {
        self.pixel_to_world
            .apply(p)
            .ok_or(CalibError::TransformFailure { x: p.x, y: p.y })
    }

    pub fn world_to_pixel(&self, p: Point2<f64>) -> Result<Point2<f64>, CalibError> {
        self.world_to_pixel
            .apply(p)
            .ok_or(CalibError::TransformFailure { x: p.x, y: p.y })
    }
}

/// Calibration state of one camera view: uncalibrated until `calibrate` or
/// `load` succeeds.
#[derive(Clone, Debug, Default)]
pub struct CalibrationModel {
    params: CalibParams,
    state: Option<Calibration>,
}

impl CalibrationModel {
    pub fn new(params: CalibParams) -> Self {
        Self {
            params,
            state: None,
        }
    }

    pub fn params(&self) -> &CalibParams {
        &self.params
    }

    #[inline]
    pub fn is_calibrated(&self) -> bool {
        self.state.is_some()
    }

    pub fn calibration(&self) -> Option<&Calibration> {
        self.state.as_ref()
    }

    pub(crate) fn calibrated(&self) -> Result<&Calibration, CalibError> {
        self.state.as_ref().ok_or(CalibError::Uncalibrated)
    }

    /// Replace the model with one built from `pixel_points`/`world_points`.
    ///
    /// On failure the current model is left untouched.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, pixel_points, world_points), fields(points = pixel_points.len()))
    )]
    pub fn calibrate(
        &mut self,
        pixel_points: &[Point2<f64>],
        world_points: &[Point2<f64>],
        grid: GridSize,
        image_size: ImageSize,
    ) -> Result<(), CalibError> {
        let calibration =
            Calibration::build(&self.params, pixel_points, world_points, grid, image_size)?;
        log::info!(
            "calibrated {}x{} grid, {} search lines",
            grid.cols,
            grid.rows,
            calibration.search_lines.len()
        );
        self.state = Some(calibration);
        Ok(())
    }

    pub(crate) fn replace(&mut self, calibration: Calibration) {
        self.state = Some(calibration);
    }

    pub fn pixel_to_world(&self, p: Point2<f64>) -> Result<Point2<f64>, CalibError> {
        self.calibrated()?.pixel_to_world(p)
    }

    pub fn world_to_pixel(&self, p: Point2<f64>) -> Result<Point2<f64>, CalibError> {
        self.calibrated()?.world_to_pixel(p)
    }

    pub fn move_search_roi(&self, side: Side) -> Result<RoiRect, CalibError> {
        Ok(self.calibrated()?.move_search_roi(side))
    }

    pub fn move_ref_point(&self, side: Side) -> Result<Point2<f64>, CalibError> {
        self.calibrated()?.move_ref_point(side)
    }

    /// Scan lines for the water-edge finder; empty while uncalibrated.
    pub fn search_lines(&self) -> &[SearchLine] {
        self.state
            .as_ref()
            .map(|c| c.search_lines.as_slice())
            .unwrap_or_default()
    }

    pub fn grid_size(&self) -> Option<GridSize> {
        self.state.as_ref().map(|c| c.grid)
    }

    pub fn image_size(&self) -> Option<ImageSize> {
        self.state.as_ref().map(|c| c.image_size)
    }

    pub fn pixel_points(&self) -> &[Point2<f64>] {
        self.state
            .as_ref()
            .map(|c| c.pixel_points.as_slice())
            .unwrap_or_default()
    }

    pub fn world_points(&self) -> &[Point2<f64>] {
        self.state
            .as_ref()
            .map(|c| c.world_points.as_slice())
            .unwrap_or_default()
    }
}
