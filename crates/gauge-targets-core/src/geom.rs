use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Dimensions of a fiducial grid: `cols` markers per row, `rows` rows.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridSize {
    pub cols: u32,
    pub rows: u32,
}

impl GridSize {
    /// Smallest grid a gauge target can have: two columns, four rows.
    pub const MIN: GridSize = GridSize { cols: 2, rows: 4 };

    pub const fn new(cols: u32, rows: u32) -> Self {
        Self { cols, rows }
    }

    /// Number of markers in the grid (`cols * rows`).
    #[inline]
    pub fn count(&self) -> usize {
        self.cols as usize * self.rows as usize
    }

    /// `true` when both dimensions reach [`GridSize::MIN`].
    #[inline]
    pub fn meets_minimum(&self) -> bool {
        self.cols >= Self::MIN.cols && self.rows >= Self::MIN.rows
    }

    /// Raster index of `(col, row)`: row-major, top row first.
    #[inline]
    pub fn index(&self, col: u32, row: u32) -> usize {
        row as usize * self.cols as usize + col as usize
    }
}

impl Default for GridSize {
    fn default() -> Self {
        Self::MIN
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

impl ImageSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Axis-aligned integer rectangle in pixel coordinates.
///
/// `x`/`y` are the top-left corner; the rectangle covers
/// `x..x + width` by `y..y + height`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RoiRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl RoiRect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Square of side `side` whose centre pixel is `(cx, cy)`.
    pub fn centered_square(cx: i32, cy: i32, side: i32) -> Self {
        let half = side / 2;
        Self::new(cx - half, cy - half, side, side)
    }

    /// Rectangle covering a whole image.
    pub fn full(size: ImageSize) -> Self {
        Self::new(0, 0, size.width as i32, size.height as i32)
    }

    #[inline]
    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// `true` when the rectangle is non-empty and lies entirely inside `size`.
    pub fn fits_within(&self, size: ImageSize) -> bool {
        !self.is_empty()
            && self.x >= 0
            && self.y >= 0
            && self.right() <= size.width as i32
            && self.bottom() <= size.height as i32
    }

    /// Intersection with the image rectangle; may come back empty.
    pub fn clip_to(&self, size: ImageSize) -> Self {
        let x0 = self.x.max(0);
        let y0 = self.y.max(0);
        let x1 = self.right().min(size.width as i32);
        let y1 = self.bottom().min(size.height as i32);
        Self::new(x0, y0, (x1 - x0).max(0), (y1 - y0).max(0))
    }

    pub fn contains(&self, p: Point2<f64>) -> bool {
        p.x >= self.x as f64
            && p.y >= self.y as f64
            && p.x < self.right() as f64
            && p.y < self.bottom() as f64
    }
}

/// One scan segment of a swath: from a point above the expected water edge
/// to a point below it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchLine {
    pub top: Point2<i32>,
    pub bot: Point2<i32>,
}

impl SearchLine {
    pub fn new(top: Point2<i32>, bot: Point2<i32>) -> Self {
        Self { top, bot }
    }
}

/// Which of the two top-row fiducials a move-detection query refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const BOTH: [Side; 2] = [Side::Left, Side::Right];
}
