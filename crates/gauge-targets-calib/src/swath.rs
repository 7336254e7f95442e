//! Scan swath between the grid columns.
//!
//! The line finder looks for the water edge along a band of vertical-ish
//! segments in the middle third of the target. The band starts a little above
//! the top row and ends a little below the bottom row, and follows the tilt of
//! the top row.

use gauge_targets_core::{GridSize, ImageSize, SearchLine};
use nalgebra::Point2;

use crate::error::CalibError;

/// Compute the search lines for a raster-ordered grid of pixel points.
///
/// One line is produced per pixel of `width_top`, a third of the top row's
/// horizontal extent, plus one.
pub fn calc_search_swaths(
    pixel_points: &[Point2<f64>],
    grid: GridSize,
    image_size: ImageSize,
) -> Result<Vec<SearchLine>, CalibError> {
    if !grid.meets_minimum() {
        return Err(CalibError::GridTooSmall(grid));
    }
    if pixel_points.len() != grid.count() {
        return Err(CalibError::GridMismatch {
            cols: grid.cols,
            rows: grid.rows,
            points: pixel_points.len(),
        });
    }
    if image_size.is_empty() {
        return Err(CalibError::EmptyImageSize);
    }
    check_pixel_points(pixel_points, image_size)?;

    let cols = grid.cols as usize;
    let tl = pixel_points[0];
    let tr = pixel_points[cols - 1];
    let bl = pixel_points[grid.index(0, grid.rows - 1)];
    let br = pixel_points[pixel_points.len() - 1];

    let width_top = ((tr.x - tl.x) / 3.0).round() as i32;
    if width_top <= 0 || width_top as u32 > image_size.width {
        return Err(CalibError::DegenerateSwath(width_top));
    }
    let width_bot = (br.x - bl.x) / 3.0;
    let height = (1.25 * (bl.y - tl.y)).round() as i32;
    let eighth = height as f64 / 8.0;
    let sixteenth = (height >> 4) as f64;

    let top = Point2::new(tl.x + width_top as f64, tl.y - eighth + sixteenth);
    let bot = Point2::new(
        bl.x + width_bot,
        (bl.y + eighth + sixteenth).min(image_size.height as f64 - 1.0),
    );
    let bot_step = width_bot / width_top as f64;
    let slope = (tr.y - tl.y) / (tr.x - tl.x);

    let lines: Vec<SearchLine> = (0..=width_top)
        .map(|i| {
            let i = i as f64;
            let dy = i * slope;
            SearchLine::new(
                Point2::new((top.x + i).round() as i32, (top.y + dy).round() as i32),
                Point2::new(
                    (bot.x + i * bot_step).round() as i32,
                    (bot.y + dy).round() as i32,
                ),
            )
        })
        .collect();

    log::debug!(
        "scan swath: {} lines, top y {:.1}, bottom y {:.1}",
        lines.len(),
        top.y,
        bot.y
    );
    Ok(lines)
}

/// Every pixel point must be finite and inside `image_size`.
fn check_pixel_points(
    pixel_points: &[Point2<f64>],
    image_size: ImageSize,
) -> Result<(), CalibError> {
    let (w, h) = (image_size.width as f64, image_size.height as f64);
    let inside = |p: &Point2<f64>| (0.0..w).contains(&p.x) && (0.0..h).contains(&p.y);
    match pixel_points.iter().position(|p| !inside(p)) {
        Some(index) => Err(CalibError::PixelOutsideImage {
            index,
            x: pixel_points[index].x,
            y: pixel_points[index].y,
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_points(xs: [f64; 2], ys: [f64; 4], tilt: f64) -> Vec<Point2<f64>> {
        let mut pts = Vec::new();
        for y in ys {
            for (i, x) in xs.iter().enumerate() {
                pts.push(Point2::new(*x, y + tilt * i as f64));
            }
        }
        pts
    }

    #[test]
    fn level_grid_swath() {
        let pts = grid_points([400.0, 600.0], [100.0, 260.0, 420.0, 580.0], 0.0);
        let lines =
            calc_search_swaths(&pts, GridSize::new(2, 4), ImageSize::new(1000, 800)).unwrap();
        // width_top = round(200 / 3) = 67
        assert_eq!(lines.len(), 68);
        // height = 600: top y = 100 - 75 + 37, bottom y = 580 + 75 + 37
        assert_eq!(lines[0], SearchLine::new(Point2::new(467, 62), Point2::new(467, 692)));
        let last = lines[67];
        assert_eq!(last.top, Point2::new(534, 62));
        assert_eq!(last.bot, Point2::new(533, 692));
    }

    #[test]
    fn tilted_top_row_tilts_the_swath() {
        let pts = grid_points([400.0, 700.0], [100.0, 260.0, 420.0, 580.0], 30.0);
        let lines =
            calc_search_swaths(&pts, GridSize::new(2, 4), ImageSize::new(1000, 800)).unwrap();
        assert_eq!(lines.len(), 101);
        let (first, last) = (lines[0], lines[100]);
        // slope 30 / 300 over 100 px
        assert_eq!(last.top.y - first.top.y, 10);
        assert_eq!(last.bot.y - first.bot.y, 10);
    }

    #[test]
    fn bottom_is_clamped_to_image() {
        let pts = grid_points([400.0, 600.0], [100.0, 260.0, 420.0, 580.0], 0.0);
        let lines =
            calc_search_swaths(&pts, GridSize::new(2, 4), ImageSize::new(1000, 650)).unwrap();
        assert!(lines.iter().all(|l| l.bot.y == 649));
    }

    #[test]
    fn rejects_small_or_degenerate_grids() {
        let pts = grid_points([400.0, 600.0], [100.0, 260.0, 420.0, 580.0], 0.0);
        let size = ImageSize::new(1000, 800);
        assert!(matches!(
            calc_search_swaths(&pts[..6], GridSize::new(2, 3), size),
            Err(CalibError::GridTooSmall(_))
        ));
        assert!(matches!(
            calc_search_swaths(&pts[..7], GridSize::new(2, 4), size),
            Err(CalibError::GridMismatch { points: 7, .. })
        ));
        let far = grid_points([400.0, 1e10], [100.0, 260.0, 420.0, 580.0], 0.0);
        assert!(matches!(
            calc_search_swaths(&far, GridSize::new(2, 4), size),
            Err(CalibError::PixelOutsideImage { index: 1, .. })
        ));
        let mut nan = pts.clone();
        nan[5].y = f64::NAN;
        assert!(matches!(
            calc_search_swaths(&nan, GridSize::new(2, 4), size),
            Err(CalibError::PixelOutsideImage { index: 5, .. })
        ));
        let narrow = grid_points([400.0, 401.0], [100.0, 260.0, 420.0, 580.0], 0.0);
        assert!(matches!(
            calc_search_swaths(&narrow, GridSize::new(2, 4), size),
            Err(CalibError::DegenerateSwath(0))
        ));
    }
}
