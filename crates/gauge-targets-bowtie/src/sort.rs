use gauge_targets_core::{GridSize, ImageSize, RoiRect};

use crate::error::BowtieError;
use crate::types::{DetectionGrid, MatchCandidate, MoveRois};

/// Arrange candidates into a raster-ordered grid and derive the move-search
/// windows from its top row.
///
/// The best `rows * cols` candidates by score are kept. They are split into
/// `rows` horizontal bands by y and each band is ordered by x. The move
/// windows are squares as wide as the top row, centred on its outer points
/// and clipped to `search_size`.
pub fn sort_into_grid(
    candidates: &[MatchCandidate],
    grid: GridSize,
    search_size: ImageSize,
) -> Result<(DetectionGrid, MoveRois), BowtieError> {
    if grid.cols < 2 || grid.rows == 0 {
        return Err(BowtieError::DegenerateTopRow);
    }
    let needed = grid.count();
    if candidates.len() < needed {
        return Err(BowtieError::TooFewCandidates {
            found: candidates.len(),
            needed,
        });
    }

    let mut best = candidates.to_vec();
    best.sort_by(|a, b| b.score.total_cmp(&a.score));
    best.truncate(needed);

    best.sort_by(|a, b| a.point.y.total_cmp(&b.point.y));
    for band in best.chunks_mut(grid.cols as usize) {
        band.sort_by(|a, b| a.point.x.total_cmp(&b.point.x));
    }

    let cols = grid.cols as usize;
    let (left, right) = (best[0].point, best[cols - 1].point);
    let span = (right.x - left.x).round() as i32;
    if span < 1 {
        return Err(BowtieError::DegenerateTopRow);
    }

    let square = |x: f64, y: f64| {
        RoiRect::centered_square(x.round() as i32, y.round() as i32, span).clip_to(search_size)
    };
    let rois = MoveRois {
        left: square(left.x, left.y),
        right: square(right.x, right.y),
    };

    log::debug!(
        "sorted {needed} targets into {}x{} grid, top span {span}px",
        grid.cols,
        grid.rows
    );
    Ok((DetectionGrid { grid, cells: best }, rois))
}
