use gauge_targets_core::{GrayImage, GrayImageView, ImageSize, RoiRect, Side};
use nalgebra::Point2;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::error::BowtieError;
use crate::params::{BowtieParams, TEMPLATE_COUNT};
use crate::score_map::{check_view, correlate_zncc, subpixel_point_refine, ScoreMap};
use crate::sort::sort_into_grid;
use crate::template::TemplateBank;
use crate::types::{DetectionGrid, MatchCandidate, MovePoints, MoveRois};

const MATCH_MIN_SCORE: f32 = 0.05;
const FIND_MIN_SCORE: f32 = 0.01;
const MAX_MATCHES: usize = 1000;

/// Score maps reused across match calls.
///
/// Every match call overwrites them; clone the scratch (or the whole
/// detector) to run searches on several threads.
#[derive(Clone, Debug, Default)]
pub struct MatchScratch {
    /// Whole-image coarse search, `(W - d + 1) x (H - d + 1)`.
    pub full: ScoreMap,
    /// Local refinement window, `(d/2 + 1) x (d/2 + 1)`.
    pub refine: ScoreMap,
}

/// Finds the bowtie grid of a gauge target and re-finds its top fiducials.
#[derive(Clone, Debug)]
pub struct TargetDetector {
    params: BowtieParams,
    bank: Option<TemplateBank>,
    scratch: MatchScratch,
    candidates: Vec<MatchCandidate>,
    grid: Option<DetectionGrid>,
    move_rois: MoveRois,
}

impl TargetDetector {
    pub fn new(params: BowtieParams) -> Self {
        Self {
            params,
            bank: None,
            scratch: MatchScratch::default(),
            candidates: Vec::new(),
            grid: None,
            move_rois: MoveRois::default(),
        }
    }

    pub fn params(&self) -> &BowtieParams {
        &self.params
    }

    /// Build the template bank and size the scratch maps for `search_size`.
    ///
    /// On failure the previous bank, if any, stays in place.
    pub fn init_bowtie_template(
        &mut self,
        template_dim: u32,
        search_size: ImageSize,
    ) -> Result<(), BowtieError> {
        if search_size.is_empty() {
            return Err(BowtieError::EmptyImage);
        }
        let bank = TemplateBank::build(template_dim)?;
        let d = bank.dim();
        let (w, h) = (search_size.width as usize, search_size.height as usize);
        if w < d || h < d {
            return Err(BowtieError::ImageTooSmall {
                width: w,
                height: h,
                needed: d,
            });
        }

        self.scratch = MatchScratch {
            full: ScoreMap::new(w - d + 1, h - d + 1),
            refine: ScoreMap::new(d / 2 + 1, d / 2 + 1),
        };
        self.bank = Some(bank);
        log::info!(
            "bowtie templates ready: dim {d}, search {}x{}",
            search_size.width,
            search_size.height
        );
        Ok(())
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        self.bank.is_some()
    }

    pub fn bank(&self) -> Option<&TemplateBank> {
        self.bank.as_ref()
    }

    /// Even template size of the current bank.
    pub fn template_dim(&self) -> Option<usize> {
        self.bank.as_ref().map(TemplateBank::dim)
    }

    pub fn scratch(&self) -> &MatchScratch {
        &self.scratch
    }

    /// Candidates of the last `find_targets` call, refined but unsorted.
    pub fn candidates(&self) -> &[MatchCandidate] {
        &self.candidates
    }

    /// Grid produced by the last successful `sort_points`.
    pub fn grid(&self) -> Option<&DetectionGrid> {
        self.grid.as_ref()
    }

    /// Found points grouped by grid row, top row first.
    pub fn found_points(&self) -> Vec<Vec<Point2<f64>>> {
        self.grid
            .as_ref()
            .map(|g| {
                g.rows()
                    .map(|row| row.iter().map(|c| c.point).collect())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn ready_bank(&self) -> Result<&TemplateBank, BowtieError> {
        self.bank.as_ref().ok_or(BowtieError::NotInitialized)
    }

    fn check_image(image: &GrayImageView<'_>, needed: usize) -> Result<(), BowtieError> {
        check_view(image)?;
        if image.width < needed || image.height < needed {
            return Err(BowtieError::ImageTooSmall {
                width: image.width,
                height: image.height,
                needed,
            });
        }
        Ok(())
    }

    fn check_score(score: f32, min: f32) -> Result<(), BowtieError> {
        if !(min..=1.0).contains(&score) {
            return Err(BowtieError::InvalidMinScore {
                score,
                min,
                max: 1.0,
            });
        }
        Ok(())
    }

    /// Coarse search of one template over the whole image.
    ///
    /// Returns up to `num_to_find` candidates in decreasing score order, each
    /// positioned at the template centre. Peaks on the border of the score map
    /// are suppressed without being reported.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, image), fields(width = image.width, height = image.height))
    )]
    pub fn match_template(
        &mut self,
        orientation: usize,
        image: &GrayImageView<'_>,
        min_score: f32,
        num_to_find: usize,
    ) -> Result<Vec<MatchCandidate>, BowtieError> {
        let bank = self.bank.as_ref().ok_or(BowtieError::NotInitialized)?;
        let template = bank.get(orientation)?;
        Self::check_score(min_score, MATCH_MIN_SCORE)?;
        if !(1..=MAX_MATCHES).contains(&num_to_find) {
            return Err(BowtieError::InvalidMatchCount(num_to_find));
        }
        let d = bank.dim();
        Self::check_image(image, d)?;

        let full = RoiRect::new(0, 0, image.width as i32, image.height as i32);
        let map = &mut self.scratch.full;
        correlate_zncc(image, full, template, map)?;

        let half = (d / 2) as f64;
        let mut found = Vec::with_capacity(num_to_find);
        while found.len() < num_to_find {
            let Some((x, y, score)) = map.max_loc() else {
                break;
            };
            if score < min_score {
                break;
            }
            map.suppress_disk(x, y, self.params.nms_radius);
            if map.is_border(x, y) {
                continue;
            }
            found.push(MatchCandidate::new(
                score,
                Point2::new(x as f64 + half, y as f64 + half),
            ));
        }

        log::debug!(
            "template {orientation}: {} matches >= {min_score}",
            found.len()
        );
        if found.is_empty() {
            return Err(BowtieError::NoMatches);
        }
        Ok(found)
    }

    /// Window of side `1.5 d` around `point`, shifted to stay inside the image.
    fn refine_roi(point: Point2<f64>, d: usize, image: &GrayImageView<'_>) -> RoiRect {
        let side = (d + d / 2) as i32;
        let offset = (d / 2 + d / 4) as i32;
        let place = |c: f64, extent: usize| {
            let start = (c.round() as i32 - offset).max(0);
            start.min(extent as i32 - side).max(0)
        };
        RoiRect::new(
            place(point.x, image.width),
            place(point.y, image.height),
            side,
            side,
        )
    }

    /// Re-score `candidate` locally with one template.
    ///
    /// When the local maximum beats both the candidate's score and
    /// `min_score`, the candidate moves to the subpixel peak and takes the new
    /// score. Returns whether the candidate changed.
    pub fn match_refine(
        &mut self,
        orientation: usize,
        image: &GrayImageView<'_>,
        min_score: f32,
        candidate: &mut MatchCandidate,
    ) -> Result<bool, BowtieError> {
        let bank = self.bank.as_ref().ok_or(BowtieError::NotInitialized)?;
        let template = bank.get(orientation)?;
        Self::check_score(min_score, MATCH_MIN_SCORE)?;
        let d = bank.dim();
        Self::check_image(image, d + d / 2)?;

        let roi = Self::refine_roi(candidate.point, d, image);
        let map = &mut self.scratch.refine;
        correlate_zncc(image, roi, template, map)?;

        let Some((x, y, score)) = map.max_loc() else {
            return Ok(false);
        };
        if score <= candidate.score || score < min_score {
            return Ok(false);
        }

        let peak = match subpixel_point_refine(map, (x, y)) {
            Ok(p) => p,
            Err(BowtieError::PeakOnBorder { .. }) => Point2::new(x as f64, y as f64),
            Err(e) => return Err(e),
        };
        let half = (d / 2) as f64;
        candidate.point = Point2::new(
            roi.x as f64 + peak.x + half,
            roi.y as f64 + peak.y + half,
        );
        candidate.score = score;
        Ok(true)
    }

    fn refine_all(
        &mut self,
        image: &GrayImageView<'_>,
        min_score: f32,
        candidates: &mut [MatchCandidate],
    ) -> Result<(), BowtieError> {
        for candidate in candidates.iter_mut() {
            for orientation in 0..TEMPLATE_COUNT {
                self.match_refine(orientation, image, min_score, candidate)?;
            }
        }
        Ok(())
    }

    /// Locate every fiducial of the configured grid.
    ///
    /// Runs the coarse search with the unrotated template for twice as many
    /// candidates as the grid holds, refines each against the whole bank and
    /// sorts the best ones into raster order.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, image), fields(width = image.width, height = image.height))
    )]
    pub fn find_targets(
        &mut self,
        image: &GrayImageView<'_>,
        min_score: f32,
    ) -> Result<DetectionGrid, BowtieError> {
        self.ready_bank()?;
        check_view(image)?;
        Self::check_score(min_score, FIND_MIN_SCORE)?;

        let search_score = min_score.max(MATCH_MIN_SCORE);
        let wanted = (2 * self.params.expected_target_count()).clamp(1, MAX_MATCHES);
        let mut candidates = self.match_template(
            TemplateBank::center_index(),
            image,
            search_score,
            wanted,
        )?;
        self.refine_all(image, search_score, &mut candidates)?;
        log::info!("{} bowtie candidates after refinement", candidates.len());

        self.candidates = candidates;
        let size = ImageSize::new(image.width as u32, image.height as u32);
        self.sort_points(size)
    }

    /// Sort the last candidates into the grid and derive the move windows.
    ///
    /// On failure the previous grid and move windows are kept.
    pub fn sort_points(&mut self, search_size: ImageSize) -> Result<DetectionGrid, BowtieError> {
        let (grid, rois) = sort_into_grid(&self.candidates, self.params.grid, search_size)?;
        self.move_rois = rois;
        self.grid = Some(grid.clone());
        Ok(grid)
    }

    /// Replace one move-search window. The rectangle must lie inside the image.
    pub fn set_move_target_roi(
        &mut self,
        image_size: ImageSize,
        rect: RoiRect,
        side: Side,
    ) -> Result<(), BowtieError> {
        if !rect.fits_within(image_size) {
            return Err(BowtieError::RoiOutOfBounds { side, rect });
        }
        self.move_rois.set(side, rect);
        Ok(())
    }

    pub fn move_target_rois(&self) -> MoveRois {
        self.move_rois
    }

    /// Re-detect the two top fiducials inside the move-search windows.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, image), fields(width = image.width, height = image.height))
    )]
    pub fn find_move_targets(&mut self, image: &GrayImageView<'_>) -> Result<MovePoints, BowtieError> {
        self.ready_bank()?;
        check_view(image)?;
        let size = ImageSize::new(image.width as u32, image.height as u32);
        for side in Side::BOTH {
            let rect = self.move_rois.get(side);
            if !rect.fits_within(size) {
                return Err(BowtieError::RoiOutOfBounds { side, rect });
            }
        }

        let masked_image = self.mask_to_move_rois(image);
        let masked = masked_image.view();

        let coarse_score = self.params.move_min_score.max(MATCH_MIN_SCORE);
        let refine_score = self.params.move_refine_min_score.max(MATCH_MIN_SCORE);
        let mut found =
            match self.match_template(TemplateBank::center_index(), &masked, coarse_score, 2) {
                Ok(found) => found,
                Err(BowtieError::NoMatches) => Vec::new(),
                Err(e) => return Err(e),
            };
        if found.len() != 2 {
            log::warn!("move search found {} targets", found.len());
            return Err(BowtieError::MoveTargetCount { found: found.len() });
        }
        self.refine_all(&masked, refine_score, &mut found)?;

        found.sort_by(|a, b| a.point.x.total_cmp(&b.point.x));
        let points = MovePoints {
            left: found[0],
            right: found[1],
        };
        log::debug!(
            "move targets at ({:.2}, {:.2}) and ({:.2}, {:.2})",
            points.left.point.x,
            points.left.point.y,
            points.right.point.x,
            points.right.point.y
        );
        Ok(points)
    }

    /// Copy of `image` with everything outside the move windows set to zero.
    fn mask_to_move_rois(&self, image: &GrayImageView<'_>) -> GrayImage {
        let mut masked = GrayImage::new_filled(image.width, image.height, 0);
        for side in Side::BOTH {
            let r = self.move_rois.get(side);
            let (x0, x1) = (r.x as usize, r.right() as usize);
            for y in r.y as usize..r.bottom() as usize {
                let start = y * image.width;
                masked.data[start + x0..start + x1]
                    .copy_from_slice(&image.data[start + x0..start + x1]);
            }
        }
        masked
    }
}
