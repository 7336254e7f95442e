use approx::assert_abs_diff_eq;
use gauge_targets_calib::{CalibError, CalibParams, CalibrationFile, CalibrationModel};
use gauge_targets_core::{ErrorKind, GridSize, Homography, ImageSize, Side};
use nalgebra::Point2;
use std::fs;

const IMAGE: ImageSize = ImageSize::new(1000, 800);

fn correspondences() -> (Vec<Point2<f64>>, Vec<Point2<f64>>) {
    let h = Homography::from_array([
        [3.9, 0.15, 402.0],
        [0.08, -5.2, 578.0],
        [0.00003, 0.00015, 1.0],
    ]);
    let mut pixel = Vec::new();
    let mut world = Vec::new();
    for wy in [90.0, 60.0, 30.0, 0.0] {
        for wx in [0.0, 50.0] {
            let w = Point2::new(wx, wy);
            pixel.push(h.apply(w).expect("finite"));
            world.push(w);
        }
    }
    (pixel, world)
}

fn calibrated() -> CalibrationModel {
    let (pixel, world) = correspondences();
    let mut model = CalibrationModel::default();
    model
        .calibrate(&pixel, &world, GridSize::new(2, 4), IMAGE)
        .expect("calibrate");
    model
}

#[test]
fn two_by_four_scenario() {
    let model = calibrated();
    let (pixel, _) = correspondences();
    let width_top = ((pixel[1].x - pixel[0].x) / 3.0).round() as usize;
    assert_eq!(model.search_lines().len(), width_top + 1);
    for side in Side::BOTH {
        assert!(model.move_search_roi(side).unwrap().fits_within(IMAGE));
    }
    for line in model.search_lines() {
        assert!(line.top.y < line.bot.y);
        assert!(line.bot.y < IMAGE.height as i32);
    }
}

#[test]
fn save_then_load_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("calib.json");
    let second = dir.path().join("calib2.json");

    let model = calibrated();
    model.save(&first).unwrap();

    let mut loaded = CalibrationModel::default();
    loaded.load(&first).unwrap();
    assert_eq!(loaded.calibration(), model.calibration());

    loaded.save(&second).unwrap();
    assert_eq!(
        fs::read_to_string(&first).unwrap(),
        fs::read_to_string(&second).unwrap()
    );

    let p = Point2::new(512.0, 333.0);
    let a = model.pixel_to_world(p).unwrap();
    let b = loaded.pixel_to_world(p).unwrap();
    assert_abs_diff_eq!(a.x, b.x, epsilon = 1e-9);
    assert_abs_diff_eq!(a.y, b.y, epsilon = 1e-9);
}

#[test]
fn from_file_builds_a_model() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("calib.json");
    calibrated().save(&path).unwrap();

    let model = CalibrationModel::from_file(&path, CalibParams::default()).unwrap();
    assert!(model.is_calibrated());
    assert_eq!(model.grid_size(), Some(GridSize::new(2, 4)));
    assert_eq!(model.image_size(), Some(IMAGE));
    assert_eq!(model.world_points().len(), 8);
}

#[test]
fn load_with_count_mismatch_keeps_prior_model() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");

    let mut file = calibrated().calibration().unwrap().to_file();
    file.model.pixel_to_world.points.pop();
    file.write_json(&path).unwrap();

    let mut model = calibrated();
    let before = model.calibration().cloned();
    let err = model.load(&path).unwrap_err();
    assert!(matches!(err, CalibError::GridMismatch { points: 7, .. }));
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(model.calibration().cloned(), before);
}

#[test]
fn load_failures_are_classified() {
    let dir = tempfile::tempdir().unwrap();
    let mut model = CalibrationModel::default();

    let err = model.load(dir.path().join("missing.json")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);

    let garbage = dir.path().join("garbage.json");
    fs::write(&garbage, "{ not json").unwrap();
    let err = model.load(&garbage).unwrap_err();
    assert!(matches!(err, CalibError::Json(_)));
    assert!(!model.is_calibrated());
}

#[test]
fn save_requires_a_calibration() {
    let dir = tempfile::tempdir().unwrap();
    let err = CalibrationModel::default()
        .save(dir.path().join("never.json"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Uncalibrated);
    assert!(!dir.path().join("never.json").exists());
}

#[test]
fn model_json_matches_file_without_image_size() {
    let model = calibrated();
    let json = model.model_json_string().unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert!(value.get("imageWidth").is_none());
    assert_eq!(value["PixelToWorld"]["rows"], 4);
    assert_eq!(
        value["SearchLines"].as_array().map(Vec::len),
        Some(model.search_lines().len())
    );

    let file: CalibrationFile = calibrated().calibration().unwrap().to_file();
    assert_eq!(file.model, model.model_record().unwrap());
}

#[test]
fn load_rejects_points_far_outside_the_image() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("edited.json");

    let mut file = calibrated().calibration().unwrap().to_file();
    file.model.pixel_to_world.points[1].pixel_x = 1e10;
    file.model.move_search_regions = None;
    file.model.search_lines.clear();
    file.write_json(&path).unwrap();

    let mut model = calibrated();
    let before = model.calibration().cloned();
    let err = model.load(&path).unwrap_err();
    assert!(matches!(err, CalibError::PixelOutsideImage { index: 1, .. }));
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(model.calibration().cloned(), before);
}
