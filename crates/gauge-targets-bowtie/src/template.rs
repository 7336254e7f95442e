//! Rotated bowtie template bank.

use gauge_targets_core::{rotate_about_center, GrayImage};

use crate::error::BowtieError;
use crate::params::{
    BOWTIE_BACKGROUND, BOWTIE_FOREGROUND, MAX_TEMPLATE_DIM, MIN_TEMPLATE_DIM, TEMPLATE_COUNT,
};

/// Rasterise a bowtie centred on `(cx, cy)`.
///
/// The two triangles share their apex at the centre and open to the left and
/// right; a pixel is painted when `|dy| < |dx| <= half`. Pixels falling
/// outside the image are skipped.
pub fn draw_bowtie(img: &mut GrayImage, cx: i32, cy: i32, half: i32, value: u8) {
    for dy in -half..=half {
        let y = cy + dy;
        if y < 0 || y >= img.height as i32 {
            continue;
        }
        for dx in -half..=half {
            let x = cx + dx;
            if x < 0 || x >= img.width as i32 {
                continue;
            }
            if dy.abs() < dx.abs() {
                img.set(x as usize, y as usize, value);
            }
        }
    }
}

/// One template of the bank, with its correlation statistics precomputed.
#[derive(Clone, Debug)]
pub struct BowtieTemplate {
    pub angle_deg: f64,
    pub image: GrayImage,
    /// `T - mean(T)`, row-major.
    pub zero_mean: Vec<f32>,
    /// `sum((T - mean(T))^2)`.
    pub norm_sq: f64,
}

impl BowtieTemplate {
    fn from_image(angle_deg: f64, image: GrayImage) -> Self {
        let n = image.data.len().max(1) as f64;
        let mean = image.data.iter().map(|&v| v as f64).sum::<f64>() / n;
        let zero_mean: Vec<f32> = image.data.iter().map(|&v| (v as f64 - mean) as f32).collect();
        let norm_sq = zero_mean.iter().map(|&v| (v as f64) * (v as f64)).sum();
        Self {
            angle_deg,
            image,
            zero_mean,
            norm_sq,
        }
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.image.width
    }
}

/// `TEMPLATE_COUNT` bowtie templates; slot `i` is rotated by `i - 5` degrees.
#[derive(Clone, Debug)]
pub struct TemplateBank {
    dim: usize,
    templates: Vec<BowtieTemplate>,
}

impl TemplateBank {
    /// Build the bank for a requested template size. Odd sizes are rounded up.
    pub fn build(template_dim: u32) -> Result<Self, BowtieError> {
        if !(MIN_TEMPLATE_DIM..=MAX_TEMPLATE_DIM).contains(&template_dim) {
            return Err(BowtieError::InvalidTemplateDim(template_dim));
        }
        let dim = (template_dim + template_dim % 2) as usize;

        let canvas_dim = 2 * dim;
        let mut canvas = GrayImage::new_filled(canvas_dim, canvas_dim, BOWTIE_BACKGROUND);
        draw_bowtie(
            &mut canvas,
            dim as i32,
            dim as i32,
            dim as i32 - 1,
            BOWTIE_FOREGROUND,
        );

        let offset = dim / 2;
        let center = Self::center_index();
        let mut templates = Vec::with_capacity(TEMPLATE_COUNT);
        for index in 0..TEMPLATE_COUNT {
            let angle = index as f64 - center as f64;
            let rotated = if index == center {
                canvas.clone()
            } else {
                rotate_about_center(&canvas.view(), angle)
            };
            let Some(crop) = rotated.crop(offset, offset, dim, dim) else {
                return Err(BowtieError::InvalidTemplateDim(template_dim));
            };
            let template = BowtieTemplate::from_image(angle, crop);
            if template.norm_sq <= f64::EPSILON {
                return Err(BowtieError::FlatTemplate { index });
            }
            templates.push(template);
        }

        log::debug!("built {} bowtie templates of {dim}x{dim}", templates.len());
        Ok(Self { dim, templates })
    }

    /// Slot holding the unrotated template.
    #[inline]
    pub const fn center_index() -> usize {
        TEMPLATE_COUNT / 2
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&BowtieTemplate, BowtieError> {
        self.templates
            .get(index)
            .ok_or(BowtieError::InvalidOrientation {
                index,
                count: self.templates.len(),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &BowtieTemplate> {
        self.templates.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bank_has_all_slots_with_even_dim() {
        let bank = TemplateBank::build(25).expect("bank");
        assert_eq!(bank.len(), TEMPLATE_COUNT);
        assert_eq!(bank.dim(), 26);
        for t in bank.iter() {
            assert_eq!(t.image.width, 26);
            assert_eq!(t.image.height, 26);
            assert!(t.norm_sq > 0.0);
        }
        assert_eq!(bank.get(TemplateBank::center_index()).unwrap().angle_deg, 0.0);
        assert_eq!(bank.get(0).unwrap().angle_deg, -5.0);
        assert_eq!(bank.get(10).unwrap().angle_deg, 5.0);
    }

    #[test]
    fn dim_bounds_are_enforced() {
        assert!(matches!(
            TemplateBank::build(19),
            Err(BowtieError::InvalidTemplateDim(19))
        ));
        assert!(TemplateBank::build(1001).is_err());
        assert_eq!(TemplateBank::build(20).unwrap().dim(), 20);
    }

    #[test]
    fn orientation_out_of_range() {
        let bank = TemplateBank::build(20).unwrap();
        assert!(matches!(
            bank.get(TEMPLATE_COUNT),
            Err(BowtieError::InvalidOrientation { .. })
        ));
    }

    #[test]
    fn unrotated_template_is_a_bowtie() {
        let bank = TemplateBank::build(32).unwrap();
        let t = &bank.get(TemplateBank::center_index()).unwrap().image;
        // centre row: dark left and right, apex near the middle
        assert_eq!(t.get(2, 16), BOWTIE_FOREGROUND);
        assert_eq!(t.get(30, 16), BOWTIE_FOREGROUND);
        // above the apex is background
        assert_eq!(t.get(16, 2), BOWTIE_BACKGROUND);
    }

    #[test]
    fn draw_bowtie_clips_to_image() {
        let mut img = GrayImage::new_filled(10, 10, 200);
        draw_bowtie(&mut img, 0, 0, 6, 10);
        assert_eq!(img.get(5, 0), 10);
        assert_eq!(img.get(0, 5), 200);
    }
}
