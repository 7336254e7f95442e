#![cfg(feature = "image")]

use approx::assert_abs_diff_eq;
use gauge_targets::bowtie::{draw_bowtie, BOWTIE_BACKGROUND, BOWTIE_FOREGROUND};
use gauge_targets::core::{ErrorKind, GridSize, ImageSize, Side};
use gauge_targets::overlay::{self, OverlayOptions};
use gauge_targets::{detect, BowtieParams, CalibrationModel, TargetDetector};
use nalgebra::Point2;

const W: usize = 1000;
const H: usize = 800;
const DIM: u32 = 32;

fn scene(dx: i32, dy: i32) -> image::GrayImage {
    let mut img = gauge_targets::core::GrayImage::new_filled(W, H, BOWTIE_BACKGROUND);
    for y in [100, 260, 420, 580] {
        for x in [400, 600] {
            draw_bowtie(&mut img, x + dx, y + dy, DIM as i32 - 1, BOWTIE_FOREGROUND);
        }
    }
    detect::to_image_gray(&img).expect("buffer size")
}

fn world_points() -> Vec<Point2<f64>> {
    let mut out = Vec::new();
    for wy in [90.0, 60.0, 30.0, 0.0] {
        for wx in [0.0, 50.0] {
            out.push(Point2::new(wx, wy));
        }
    }
    out
}

fn detector(img: &image::GrayImage) -> TargetDetector {
    let mut det = TargetDetector::new(BowtieParams::for_grid(GridSize::new(2, 4)));
    det.init_bowtie_template(DIM, detect::image_size(img))
        .expect("template bank");
    det
}

fn calibrated_from_detection() -> (TargetDetector, CalibrationModel) {
    let img = scene(0, 0);
    let mut det = detector(&img);
    let grid = detect::find_targets(&mut det, &img, 0.6).expect("detection");

    let mut model = CalibrationModel::default();
    model
        .calibrate(
            &grid.points(),
            &world_points(),
            grid.grid,
            ImageSize::new(W as u32, H as u32),
        )
        .expect("calibration");
    (det, model)
}

#[test]
fn detected_grid_calibrates_to_the_world_layout() {
    let (_, model) = calibrated_from_detection();

    // 200 px per 50 units across, 160 px per 30 units down
    let w = model.pixel_to_world(Point2::new(500.0, 340.0)).unwrap();
    assert_abs_diff_eq!(w.x, 25.0, epsilon = 0.2);
    assert_abs_diff_eq!(w.y, 45.0, epsilon = 0.2);

    let p = model.world_to_pixel(Point2::new(50.0, 0.0)).unwrap();
    assert_abs_diff_eq!(p.x, 600.0, epsilon = 0.5);
    assert_abs_diff_eq!(p.y, 580.0, epsilon = 0.5);

    for side in Side::BOTH {
        let roi = model.move_search_roi(side).unwrap();
        assert_eq!((roi.width, roi.height), (112, 112));
        assert!(roi.contains(model.move_ref_point(side).unwrap()));
    }
}

#[test]
fn unmoved_targets_report_no_displacement() {
    let (mut det, model) = calibrated_from_detection();
    let report = detect::measure_displacement(&mut det, &model, &scene(0, 0)).unwrap();
    assert!(report.max_pixel_distance() < 0.5, "{report:?}");
    assert_eq!(report.left.side, Side::Left);
    assert_eq!(report.right.side, Side::Right);
}

#[test]
fn shifted_targets_report_pixel_and_world_offsets() {
    let (mut det, model) = calibrated_from_detection();
    let report = detect::measure_displacement(&mut det, &model, &scene(5, 3)).unwrap();

    for shift in [report.left, report.right] {
        let [px, py] = shift.pixel_offset();
        assert_abs_diff_eq!(px, 5.0, epsilon = 0.5);
        assert_abs_diff_eq!(py, 3.0, epsilon = 0.5);

        let [wx, wy] = shift.world_offset();
        assert_abs_diff_eq!(wx, 1.25, epsilon = 0.15);
        assert_abs_diff_eq!(wy, -0.5625, epsilon = 0.15);

        assert_eq!(shift.search_roi, model.move_search_roi(shift.side).unwrap());
        assert!(shift.search_roi.contains(shift.found_px));
    }
    assert!(report.left.found_px.x < report.right.found_px.x);
}

#[test]
fn displacement_needs_a_calibration() {
    let img = scene(0, 0);
    let mut det = detector(&img);
    let err = detect::measure_displacement(&mut det, &CalibrationModel::default(), &img)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Uncalibrated);
}

#[test]
fn debug_image_is_skipped_without_candidates() {
    let img = image::GrayImage::from_pixel(W as u32, H as u32, image::Luma([BOWTIE_BACKGROUND]));
    let mut det = detector(&img);
    let (result, debug) = detect::find_targets_with_debug(&mut det, &img, 0.6);
    assert_eq!(result.unwrap_err().kind(), ErrorKind::InsufficientMatches);
    assert!(debug.is_none());
}

#[test]
fn debug_image_marks_detected_targets() {
    let img = scene(0, 0);
    let mut det = detector(&img);
    let (result, debug) = detect::find_targets_with_debug(&mut det, &img, 0.6);
    assert_eq!(result.unwrap().cells.len(), 8);
    let debug = debug.expect("debug image");
    let red_near = (396..=398)
        .flat_map(|x| (99..=101).map(move |y| (x, y)))
        .any(|(x, y)| *debug.get_pixel(x, y) == overlay::RED);
    assert!(red_near);

    // grid rows are joined between the two columns
    for row_y in [100, 260, 420, 580] {
        let green = (row_y - 1..=row_y + 1).any(|y| *debug.get_pixel(500, y) == overlay::GREEN);
        assert!(green, "row at y = {row_y}");
    }
}

#[test]
fn debug_image_has_no_grid_when_sorting_fails() {
    let mut top_row = gauge_targets::core::GrayImage::new_filled(W, H, BOWTIE_BACKGROUND);
    for x in [400, 600] {
        draw_bowtie(&mut top_row, x, 100, DIM as i32 - 1, BOWTIE_FOREGROUND);
    }
    let img = detect::to_image_gray(&top_row).expect("buffer size");
    let mut det = detector(&img);
    let (result, debug) = detect::find_targets_with_debug(&mut det, &img, 0.6);
    assert_eq!(result.unwrap_err().kind(), ErrorKind::InsufficientMatches);
    let debug = debug.expect("candidates are still drawn");
    assert!(!debug.pixels().any(|p| *p == overlay::GREEN));
}

#[test]
fn calibration_overlay_has_no_warnings() {
    let (_, model) = calibrated_from_detection();
    let (canvas, report) =
        overlay::draw_calibration(&model, &scene(0, 0), OverlayOptions::default()).unwrap();
    assert!(report.warnings.is_empty());
    assert_eq!(canvas.dimensions(), (W as u32, H as u32));
}

#[test]
fn raw_buffers_are_checked() {
    let data = vec![0u8; 10];
    let err = detect::gray_view_from_raw(4, 4, &data).unwrap_err();
    assert!(matches!(
        err,
        detect::DetectError::InvalidGrayBuffer {
            expected: 16,
            got: 10
        }
    ));
    assert!(detect::gray_view_from_raw(5, 2, &data).is_ok());
}
