//! Correlation score maps and normalized cross-correlation.

use gauge_targets_core::{GrayImageView, ImageSize, RoiRect};
use nalgebra::Point2;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::error::BowtieError;
use crate::template::BowtieTemplate;

/// Row-major `f32` map of correlation scores. Entry `(x, y)` is the score of
/// the template placed with its top-left corner at `(x, y)` of the searched
/// window.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ScoreMap {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
}

impl ScoreMap {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width * height],
        }
    }

    /// Resize in place, reusing the allocation.
    pub fn ensure_shape(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.data.resize(width * height, 0.0);
    }

    #[inline]
    pub fn is_well_formed(&self) -> bool {
        self.width > 0 && self.height > 0 && self.data.len() == self.width * self.height
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: f32) {
        self.data[y * self.width + x] = v;
    }

    /// `true` when `(x, y)` lacks a full 3x3 neighbourhood.
    #[inline]
    pub fn is_border(&self, x: usize, y: usize) -> bool {
        x == 0 || y == 0 || x + 1 >= self.width || y + 1 >= self.height
    }

    /// Location and value of the global maximum (first one in raster order).
    pub fn max_loc(&self) -> Option<(usize, usize, f32)> {
        if self.width == 0 {
            return None;
        }
        let mut best: Option<(usize, f32)> = None;
        for (i, &v) in self.data.iter().enumerate() {
            if v.is_nan() {
                continue;
            }
            if best.is_none_or(|(_, b)| v > b) {
                best = Some((i, v));
            }
        }
        best.map(|(i, v)| (i % self.width, i / self.width, v))
    }

    /// Zero every entry within `radius` of `(cx, cy)`.
    pub fn suppress_disk(&mut self, cx: usize, cy: usize, radius: u32) {
        let r = radius as i64;
        let (cx, cy) = (cx as i64, cy as i64);
        let y0 = (cy - r).max(0);
        let y1 = (cy + r).min(self.height as i64 - 1);
        let x0 = (cx - r).max(0);
        let x1 = (cx + r).min(self.width as i64 - 1);
        for y in y0..=y1 {
            let dy = y - cy;
            for x in x0..=x1 {
                let dx = x - cx;
                if dx * dx + dy * dy <= r * r {
                    self.data[y as usize * self.width + x as usize] = 0.0;
                }
            }
        }
    }
}

/// A view must be non-empty and its buffer exactly `width * height` bytes.
pub(crate) fn check_view(image: &GrayImageView<'_>) -> Result<(), BowtieError> {
    if image.is_empty() {
        return Err(BowtieError::EmptyImage);
    }
    if image.data.len() != image.width * image.height {
        return Err(BowtieError::MalformedImage {
            width: image.width,
            height: image.height,
            len: image.data.len(),
        });
    }
    Ok(())
}

/// Zero-mean normalized cross-correlation of `template` over the `roi` window
/// of `image`.
///
/// `out` is reshaped to `(roi.width - d + 1) x (roi.height - d + 1)`. Scores
/// lie in `[-1, 1]`; windows with no intensity variation score 0.
pub fn correlate_zncc(
    image: &GrayImageView<'_>,
    roi: RoiRect,
    template: &BowtieTemplate,
    out: &mut ScoreMap,
) -> Result<(), BowtieError> {
    let d = template.dim();
    let size = ImageSize::new(image.width as u32, image.height as u32);
    check_view(image)?;
    if !roi.fits_within(size) || (roi.width as usize) < d || (roi.height as usize) < d {
        return Err(BowtieError::ImageTooSmall {
            width: roi.width.max(0) as usize,
            height: roi.height.max(0) as usize,
            needed: d,
        });
    }

    let (rx, ry) = (roi.x as usize, roi.y as usize);
    let (rw, rh) = (roi.width as usize, roi.height as usize);
    let (ow, oh) = (rw - d + 1, rh - d + 1);
    out.ensure_shape(ow, oh);

    // integral images of I and I^2 over the window, one extra leading row/col
    let iw = rw + 1;
    let mut sum = vec![0u64; iw * (rh + 1)];
    let mut sum_sq = vec![0u64; iw * (rh + 1)];
    for y in 0..rh {
        let row = &image.row(ry + y)[rx..rx + rw];
        let mut acc = 0u64;
        let mut acc_sq = 0u64;
        for (x, &v) in row.iter().enumerate() {
            let v = v as u64;
            acc += v;
            acc_sq += v * v;
            sum[(y + 1) * iw + x + 1] = sum[y * iw + x + 1] + acc;
            sum_sq[(y + 1) * iw + x + 1] = sum_sq[y * iw + x + 1] + acc_sq;
        }
    }

    let n = (d * d) as f64;
    let window = |table: &[u64], x: usize, y: usize| -> f64 {
        let a = table[y * iw + x];
        let b = table[y * iw + x + d];
        let c = table[(y + d) * iw + x];
        let e = table[(y + d) * iw + x + d];
        (e + a) as f64 - (b + c) as f64
    };

    let fill_row = |y: usize, row: &mut [f32]| {
        for (x, slot) in row.iter_mut().enumerate() {
            let s = window(&sum, x, y);
            let s2 = window(&sum_sq, x, y);
            let var = s2 - s * s / n;
            let denom = (var * template.norm_sq).sqrt();
            if denom.is_nan() || denom <= 1e-6 {
                *slot = 0.0;
                continue;
            }
            let mut num = 0.0f32;
            for ty in 0..d {
                let irow = &image.row(ry + y + ty)[rx + x..rx + x + d];
                let trow = &template.zero_mean[ty * d..(ty + 1) * d];
                num += trow
                    .iter()
                    .zip(irow)
                    .map(|(&t, &v)| t * v as f32)
                    .sum::<f32>();
            }
            *slot = (num as f64 / denom).clamp(-1.0, 1.0) as f32;
        }
    };

    #[cfg(feature = "rayon")]
    out.data
        .par_chunks_mut(ow)
        .enumerate()
        .for_each(|(y, row)| fill_row(y, row));

    #[cfg(not(feature = "rayon"))]
    out.data
        .chunks_mut(ow)
        .enumerate()
        .for_each(|(y, row)| fill_row(y, row));

    Ok(())
}

/// Subpixel peak position from the 3x3 score-weighted centroid around `peak`.
pub fn subpixel_point_refine(
    map: &ScoreMap,
    peak: (usize, usize),
) -> Result<Point2<f64>, BowtieError> {
    if !map.is_well_formed() {
        return Err(BowtieError::MalformedScoreMap {
            width: map.width,
            height: map.height,
        });
    }
    let (px, py) = peak;
    if px >= map.width || py >= map.height || map.is_border(px, py) {
        return Err(BowtieError::PeakOnBorder { x: px, y: py });
    }

    let mut total = 0.0f64;
    let mut sx = 0.0f64;
    let mut sy = 0.0f64;
    for y in py - 1..=py + 1 {
        for x in px - 1..=px + 1 {
            let w = map.get(x, y) as f64;
            total += w;
            sx += w * x as f64;
            sy += w * y as f64;
        }
    }
    if total.is_nan() || total <= 0.0 {
        return Err(BowtieError::DegenerateCentroid);
    }
    Ok(Point2::new(sx / total, sy / total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::TemplateBank;
    use crate::{draw_bowtie, BOWTIE_BACKGROUND, BOWTIE_FOREGROUND};
    use approx::assert_relative_eq;
    use gauge_targets_core::GrayImage;

    #[test]
    fn max_and_suppress() {
        let mut m = ScoreMap::new(40, 40);
        m.set(20, 20, 0.9);
        m.set(30, 20, 0.8);
        m.set(5, 5, 0.7);
        assert_eq!(m.max_loc(), Some((20, 20, 0.9)));
        m.suppress_disk(20, 20, 10);
        assert_eq!(m.get(30, 20), 0.0);
        assert_eq!(m.max_loc(), Some((5, 5, 0.7)));
    }

    #[test]
    fn centroid_of_symmetric_peak_is_centre() {
        let mut m = ScoreMap::new(5, 5);
        m.set(2, 2, 1.0);
        m.set(1, 2, 0.5);
        m.set(3, 2, 0.5);
        let p = subpixel_point_refine(&m, (2, 2)).unwrap();
        assert_relative_eq!(p.x, 2.0);
        assert_relative_eq!(p.y, 2.0);
    }

    #[test]
    fn centroid_leans_towards_heavier_side() {
        let mut m = ScoreMap::new(5, 5);
        m.set(2, 2, 1.0);
        m.set(3, 2, 1.0);
        let p = subpixel_point_refine(&m, (2, 2)).unwrap();
        assert_relative_eq!(p.x, 2.5);
    }

    #[test]
    fn centroid_failures() {
        let m = ScoreMap::new(5, 5);
        assert!(matches!(
            subpixel_point_refine(&m, (0, 2)),
            Err(BowtieError::PeakOnBorder { .. })
        ));
        assert!(matches!(
            subpixel_point_refine(&m, (2, 2)),
            Err(BowtieError::DegenerateCentroid)
        ));
        let bad = ScoreMap {
            width: 5,
            height: 5,
            data: vec![0.0; 3],
        };
        assert!(matches!(
            subpixel_point_refine(&bad, (2, 2)),
            Err(BowtieError::MalformedScoreMap { .. })
        ));
    }

    #[test]
    fn zncc_peaks_on_drawn_bowtie() {
        let bank = TemplateBank::build(20).unwrap();
        let mut img = GrayImage::new_filled(80, 60, BOWTIE_BACKGROUND);
        draw_bowtie(&mut img, 40, 30, 19, BOWTIE_FOREGROUND);

        let mut map = ScoreMap::default();
        let t = bank.get(TemplateBank::center_index()).unwrap();
        correlate_zncc(&img.view(), RoiRect::new(0, 0, 80, 60), t, &mut map).unwrap();
        assert_eq!((map.width, map.height), (61, 41));

        let (x, y, score) = map.max_loc().unwrap();
        assert_eq!((x + 10, y + 10), (40, 30));
        assert!(score > 0.99, "score {score}");
    }

    #[test]
    fn flat_window_scores_zero() {
        let bank = TemplateBank::build(20).unwrap();
        let img = GrayImage::new_filled(30, 30, 128);
        let mut map = ScoreMap::default();
        let t = bank.get(0).unwrap();
        correlate_zncc(&img.view(), RoiRect::new(0, 0, 30, 30), t, &mut map).unwrap();
        assert!(map.data.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn roi_must_fit_template() {
        let bank = TemplateBank::build(20).unwrap();
        let img = GrayImage::new_filled(30, 30, 128);
        let mut map = ScoreMap::default();
        let t = bank.get(0).unwrap();
        let err = correlate_zncc(&img.view(), RoiRect::new(15, 0, 15, 30), t, &mut map);
        assert!(matches!(err, Err(BowtieError::ImageTooSmall { .. })));
    }

    #[test]
    fn short_buffer_is_rejected() {
        let bank = TemplateBank::build(20).unwrap();
        let data = vec![128u8; 30 * 29];
        let view = GrayImageView {
            width: 30,
            height: 30,
            data: &data,
        };
        let mut map = ScoreMap::default();
        let t = bank.get(0).unwrap();
        let err = correlate_zncc(&view, RoiRect::new(0, 0, 30, 30), t, &mut map).unwrap_err();
        assert_eq!(
            err,
            BowtieError::MalformedImage {
                width: 30,
                height: 30,
                len: 870
            }
        );
        assert_eq!(err.kind(), gauge_targets_core::ErrorKind::Validation);
    }
}
