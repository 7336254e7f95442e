//! Calibration file format.
//!
//! ```json
//! {
//!   "imageWidth": 1000, "imageHeight": 800,
//!   "PixelToWorld": { "columns": 2, "rows": 4,
//!     "points": [ { "pixelX": 410.6, "pixelY": 101.2, "worldX": 0.0, "worldY": 90.0 } ] },
//!   "MoveSearchRegions": { "Left": { "x": 355, "y": 45, "width": 112, "height": 112 },
//!                          "Right": { "x": 551, "y": 50, "width": 112, "height": 112 } },
//!   "SearchLines": [ { "topX": 476, "topY": 63, "botX": 466, "botY": 692 } ]
//! }
//! ```
//!
//! Only the image size and the `PixelToWorld` block are authoritative. The
//! move regions and search lines are written for auditing and recomputed on
//! load.

use std::fs;
use std::path::Path;

use gauge_targets_core::{GridSize, ImageSize, RoiRect, SearchLine};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::error::CalibError;
use crate::model::{Calibration, CalibrationModel};
use crate::params::CalibParams;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointRecord {
    pub pixel_x: f64,
    pub pixel_y: f64,
    pub world_x: f64,
    pub world_y: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PixelToWorldRecord {
    pub columns: u32,
    pub rows: u32,
    pub points: Vec<PointRecord>,
}

impl PixelToWorldRecord {
    pub fn grid(&self) -> GridSize {
        GridSize::new(self.columns, self.rows)
    }

    /// Split into pixel and world point lists, raster order preserved.
    pub fn split_points(&self) -> (Vec<Point2<f64>>, Vec<Point2<f64>>) {
        self.points
            .iter()
            .map(|p| {
                (
                    Point2::new(p.pixel_x, p.pixel_y),
                    Point2::new(p.world_x, p.world_y),
                )
            })
            .unzip()
    }

    fn check_counts(&self) -> Result<(), CalibError> {
        if self.columns as usize * self.rows as usize != self.points.len() {
            return Err(CalibError::GridMismatch {
                cols: self.columns,
                rows: self.rows,
                points: self.points.len(),
            });
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MoveSearchRegions {
    pub left: RoiRect,
    pub right: RoiRect,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchLineRecord {
    pub top_x: i32,
    pub top_y: i32,
    pub bot_x: i32,
    pub bot_y: i32,
}

impl From<&SearchLine> for SearchLineRecord {
    fn from(l: &SearchLine) -> Self {
        Self {
            top_x: l.top.x,
            top_y: l.top.y,
            bot_x: l.bot.x,
            bot_y: l.bot.y,
        }
    }
}

/// Serialized model without the image size.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    #[serde(rename = "PixelToWorld")]
    pub pixel_to_world: PixelToWorldRecord,
    #[serde(rename = "MoveSearchRegions", default, skip_serializing_if = "Option::is_none")]
    pub move_search_regions: Option<MoveSearchRegions>,
    #[serde(rename = "SearchLines", default)]
    pub search_lines: Vec<SearchLineRecord>,
}

/// On-disk calibration file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationFile {
    #[serde(rename = "imageWidth")]
    pub image_width: u32,
    #[serde(rename = "imageHeight")]
    pub image_height: u32,
    #[serde(flatten)]
    pub model: ModelRecord,
}

impl CalibrationFile {
    pub fn image_size(&self) -> ImageSize {
        ImageSize::new(self.image_width, self.image_height)
    }

    pub fn read_json(path: impl AsRef<Path>) -> Result<Self, CalibError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), CalibError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Rebuild the calibration from the stored correspondences.
    pub fn to_calibration(&self, params: &CalibParams) -> Result<Calibration, CalibError> {
        let p2w = &self.model.pixel_to_world;
        p2w.check_counts()?;
        let (pixel, world) = p2w.split_points();
        let calibration = Calibration::build(params, &pixel, &world, p2w.grid(), self.image_size())?;

        if let Some(stored) = self.model.move_search_regions {
            if stored.left != calibration.move_search_left
                || stored.right != calibration.move_search_right
            {
                log::debug!("stored move-search regions differ from recomputed ones");
            }
        }
        if !self.model.search_lines.is_empty()
            && self.model.search_lines.len() != calibration.search_lines.len()
        {
            log::debug!(
                "stored {} search lines, recomputed {}",
                self.model.search_lines.len(),
                calibration.search_lines.len()
            );
        }
        Ok(calibration)
    }
}

impl Calibration {
    pub fn to_record(&self) -> ModelRecord {
        let points = self
            .pixel_points
            .iter()
            .zip(&self.world_points)
            .map(|(p, w)| PointRecord {
                pixel_x: p.x,
                pixel_y: p.y,
                world_x: w.x,
                world_y: w.y,
            })
            .collect();
        ModelRecord {
            pixel_to_world: PixelToWorldRecord {
                columns: self.grid.cols,
                rows: self.grid.rows,
                points,
            },
            move_search_regions: Some(MoveSearchRegions {
                left: self.move_search_left,
                right: self.move_search_right,
            }),
            search_lines: self.search_lines.iter().map(SearchLineRecord::from).collect(),
        }
    }

    pub fn to_file(&self) -> CalibrationFile {
        CalibrationFile {
            image_width: self.image_size.width,
            image_height: self.image_size.height,
            model: self.to_record(),
        }
    }
}

impl CalibrationModel {
    /// Load a calibration file and build a model from it.
    pub fn from_file(path: impl AsRef<Path>, params: CalibParams) -> Result<Self, CalibError> {
        let mut model = Self::new(params);
        model.load(path)?;
        Ok(model)
    }

    /// Replace the model with the calibration stored in `path`.
    ///
    /// The stored correspondences are re-calibrated; the current model is
    /// kept if reading, parsing or calibration fails.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<(), CalibError> {
        let path = path.as_ref();
        let file = CalibrationFile::read_json(path)?;
        let calibration = file.to_calibration(self.params())?;
        log::info!(
            "loaded {}x{} calibration from {}",
            calibration.grid.cols,
            calibration.grid.rows,
            path.display()
        );
        self.replace(calibration);
        Ok(())
    }

    fn complete(&self) -> Result<&Calibration, CalibError> {
        let calibration = self.calibrated()?;
        if !calibration.grid.meets_minimum() {
            return Err(CalibError::GridTooSmall(calibration.grid));
        }
        if calibration.search_lines.is_empty() {
            return Err(CalibError::MissingSearchLines);
        }
        Ok(calibration)
    }

    /// Write the model to `path` as JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CalibError> {
        let path = path.as_ref();
        self.complete()?.to_file().write_json(path)?;
        log::info!("saved calibration to {}", path.display());
        Ok(())
    }

    pub fn model_record(&self) -> Result<ModelRecord, CalibError> {
        Ok(self.complete()?.to_record())
    }

    /// Model as pretty JSON, without the image size.
    pub fn model_json_string(&self) -> Result<String, CalibError> {
        Ok(serde_json::to_string_pretty(&self.model_record()?)?)
    }
}
