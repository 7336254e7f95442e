use gauge_targets_core::GridSize;
use serde::{Deserialize, Serialize};

/// Number of templates in the bank: the unrotated bowtie in the middle slot
/// and five one-degree steps on either side.
pub const TEMPLATE_COUNT: usize = 11;

pub const MIN_TEMPLATE_DIM: u32 = 20;
pub const MAX_TEMPLATE_DIM: u32 = 1000;

/// Gray level of the board around the triangles.
pub const BOWTIE_BACKGROUND: u8 = 224;
/// Gray level of the two triangles.
pub const BOWTIE_FOREGROUND: u8 = 32;

/// Detector configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BowtieParams {
    /// Layout of the fiducial grid on the target.
    #[serde(default)]
    pub grid: GridSize,
    /// Radius (score-map pixels) zeroed around every accepted coarse peak.
    #[serde(default = "default_nms_radius")]
    pub nms_radius: u32,
    /// Coarse-search threshold used when re-finding the move targets.
    #[serde(default = "default_move_score")]
    pub move_min_score: f32,
    /// Refinement threshold used when re-finding the move targets.
    #[serde(default = "default_move_score")]
    pub move_refine_min_score: f32,
}

fn default_nms_radius() -> u32 {
    17
}

fn default_move_score() -> f32 {
    0.5
}

impl Default for BowtieParams {
    fn default() -> Self {
        Self {
            grid: GridSize::default(),
            nms_radius: default_nms_radius(),
            move_min_score: default_move_score(),
            move_refine_min_score: default_move_score(),
        }
    }
}

impl BowtieParams {
    pub fn for_grid(grid: GridSize) -> Self {
        Self {
            grid,
            ..Self::default()
        }
    }

    /// Number of fiducials a full detection must produce.
    #[inline]
    pub fn expected_target_count(&self) -> usize {
        self.grid.count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_fills_defaults() {
        let p: BowtieParams = serde_json::from_str(r#"{ "grid": { "cols": 3, "rows": 5 } }"#)
            .expect("params json");
        assert_eq!(p.grid, GridSize::new(3, 5));
        assert_eq!(p.nms_radius, 17);
        assert_eq!(p.expected_target_count(), 15);
    }
}
