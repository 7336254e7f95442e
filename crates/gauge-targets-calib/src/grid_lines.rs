//! World-coordinate grid projected back into the image, for overlays.

use nalgebra::Point2;
use serde::Serialize;

use crate::error::CalibError;
use crate::model::{Calibration, CalibrationModel};

/// World row value printed next to the left end of a grid row.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct RowLabel {
    pub anchor: Point2<f64>,
    pub world_y: f64,
}

/// Pixel-space geometry of the world grid overlay.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct WorldGridOverlay {
    pub segments: Vec<[Point2<f64>; 2]>,
    /// Marker positions on alternating rows.
    pub nodes: Vec<Point2<f64>>,
    pub labels: Vec<RowLabel>,
}

impl WorldGridOverlay {
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty() && self.nodes.is_empty()
    }
}

impl Calibration {
    /// World grid spanning the calibrated points, one row step beyond them
    /// above and below.
    ///
    /// Columns are spaced `1 / cols` of the world width and rows
    /// `1 / (rows + 2)` of the world height. Vertical segments starting below
    /// the image are dropped; segments whose ends cannot be projected are
    /// skipped.
    pub fn world_grid_lines(&self) -> Result<WorldGridOverlay, CalibError> {
        let n = self.pixel_points.len();
        let top_left = self.pixel_to_world(self.pixel_points[0])?;
        let bottom_right = self.pixel_to_world(self.pixel_points[n - 1])?;

        let min_col = top_left.x.min(bottom_right.x);
        let max_col = top_left.x.max(bottom_right.x);
        let mut min_row = top_left.y.min(bottom_right.y);
        let mut max_row = top_left.y.max(bottom_right.y);
        let row_inc = (max_row - min_row) / (self.grid.rows + 2) as f64;
        let col_inc = (max_col - min_col) / self.grid.cols as f64;
        let mut out = WorldGridOverlay::default();
        if !(row_inc > 0.0 && col_inc > 0.0) {
            return Ok(out);
        }
        min_row -= row_inc;
        max_row += row_inc;

        let image_height = self.image_size.height as f64;
        let project = |x: f64, y: f64| self.world_to_pixel(Point2::new(x, y)).ok();
        let row_count = self.grid.rows as usize + 4;
        let col_count = self.grid.cols as usize;

        for k in 0..row_count {
            let row = max_row - k as f64 * row_inc;
            for c in 0..col_count {
                let col = min_col + c as f64 * col_inc;
                let Some(p1) = project(col, row) else {
                    continue;
                };
                if c == 0 {
                    out.labels.push(RowLabel {
                        anchor: p1,
                        world_y: row,
                    });
                }
                if let Some(p2) = project(col + col_inc, row) {
                    out.segments.push([p1, p2]);
                }
                if p1.y < image_height {
                    if let Some(p2) = project(col, row - row_inc) {
                        out.segments.push([p1, p2]);
                        if k % 2 == 1 && c % 2 == 0 {
                            out.nodes.push(p1);
                        }
                    }
                }
            }
            if let Some(p1) = project(max_col, row).filter(|p| p.y < image_height) {
                if let Some(p2) = project(max_col, row - row_inc) {
                    out.segments.push([p1, p2]);
                    if k % 2 == 1 {
                        out.nodes.push(p1);
                    }
                }
            }
        }

        for c in 0..col_count {
            let col = min_col + c as f64 * col_inc;
            let Some(p1) = project(col, min_row) else {
                continue;
            };
            if c == 0 {
                out.labels.push(RowLabel {
                    anchor: p1,
                    world_y: min_row,
                });
            }
            if let Some(p2) = project(col + col_inc, min_row) {
                out.segments.push([p1, p2]);
            }
        }

        Ok(out)
    }
}

impl CalibrationModel {
    /// See [`Calibration::world_grid_lines`].
    pub fn world_grid_lines(&self) -> Result<WorldGridOverlay, CalibError> {
        self.calibrated()?.world_grid_lines()
    }
}
