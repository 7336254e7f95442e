use gauge_targets_core::{GridSize, RoiRect, Side};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// One template match: image position of the bowtie centre and its ZNCC score.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchCandidate {
    pub score: f32,
    pub point: Point2<f64>,
}

impl MatchCandidate {
    pub fn new(score: f32, point: Point2<f64>) -> Self {
        Self { score, point }
    }
}

/// Detected fiducials arranged in raster order (top row first, left to right).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectionGrid {
    pub grid: GridSize,
    pub cells: Vec<MatchCandidate>,
}

impl DetectionGrid {
    pub fn get(&self, col: u32, row: u32) -> Option<&MatchCandidate> {
        if col >= self.grid.cols || row >= self.grid.rows {
            return None;
        }
        self.cells.get(self.grid.index(col, row))
    }

    /// Cells grouped by grid row.
    pub fn rows(&self) -> impl Iterator<Item = &[MatchCandidate]> {
        self.cells.chunks(self.grid.cols.max(1) as usize)
    }

    /// Pixel positions in raster order.
    pub fn points(&self) -> Vec<Point2<f64>> {
        self.cells.iter().map(|c| c.point).collect()
    }

    pub fn top_left(&self) -> Option<&MatchCandidate> {
        self.cells.first()
    }

    pub fn top_right(&self) -> Option<&MatchCandidate> {
        self.get(self.grid.cols.saturating_sub(1), 0)
    }
}

/// The two windows in which the top-row fiducials are re-detected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRois {
    pub left: RoiRect,
    pub right: RoiRect,
}

impl Default for MoveRois {
    fn default() -> Self {
        Self {
            left: RoiRect::new(0, 0, 5, 5),
            right: RoiRect::new(10, 0, 5, 5),
        }
    }
}

impl MoveRois {
    pub fn get(&self, side: Side) -> RoiRect {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    pub fn set(&mut self, side: Side, rect: RoiRect) {
        match side {
            Side::Left => self.left = rect,
            Side::Right => self.right = rect,
        }
    }
}

/// Re-detected move targets, classified by horizontal position.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MovePoints {
    pub left: MatchCandidate,
    pub right: MatchCandidate,
}

impl MovePoints {
    pub fn get(&self, side: Side) -> &MatchCandidate {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cand(x: f64, y: f64) -> MatchCandidate {
        MatchCandidate::new(0.9, Point2::new(x, y))
    }

    #[test]
    fn grid_accessors_follow_raster_order() {
        let g = DetectionGrid {
            grid: GridSize::new(2, 2),
            cells: vec![cand(0.0, 0.0), cand(10.0, 0.0), cand(0.0, 5.0), cand(10.0, 5.0)],
        };
        assert_eq!(g.get(1, 1).map(|c| c.point.x), Some(10.0));
        assert!(g.get(2, 0).is_none());
        assert_eq!(g.top_right().map(|c| c.point.x), Some(10.0));
        assert_eq!(g.rows().count(), 2);
    }

    #[test]
    fn move_rois_by_side() {
        let mut rois = MoveRois::default();
        rois.set(Side::Right, RoiRect::new(1, 2, 3, 4));
        assert_eq!(rois.get(Side::Right), RoiRect::new(1, 2, 3, 4));
        assert_eq!(rois.get(Side::Left), RoiRect::new(0, 0, 5, 5));
    }
}
