use serde::{Deserialize, Serialize};

fn default_move_search_margin() -> u32 {
    56
}

/// Calibration configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibParams {
    /// Half-size in pixels of the square move-search regions around the two
    /// top-row reference points.
    #[serde(default = "default_move_search_margin")]
    pub move_search_margin: u32,
}

impl Default for CalibParams {
    fn default() -> Self {
        Self {
            move_search_margin: default_move_search_margin(),
        }
    }
}
