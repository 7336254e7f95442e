//! gauge-targets CLI: detect bowtie targets, build calibrations and measure
//! target movement.

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use gauge_targets::bowtie::{BowtieParams, TargetDetector};
use gauge_targets::calib::{CalibParams, CalibrationModel, PixelToWorldRecord};
use gauge_targets::core::{GridSize, ImageSize};
use gauge_targets::{detect, overlay};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "gauge-targets")]
#[command(about = "Bowtie gauge target detection and pixel/world calibration")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Locate the bowtie grid in an image.
    FindTargets(FindTargetsArgs),

    /// Build a calibration file from pixel/world correspondences.
    Calibrate(CalibrateArgs),

    /// Re-detect the top targets and report their displacement.
    FindMove(FindMoveArgs),
}

#[derive(Debug, Clone, Args)]
struct TemplateArgs {
    /// Bowtie template size in pixels (rounded up to even).
    #[arg(long)]
    template_dim: u32,

    /// Minimum correlation score of a target.
    #[arg(long, default_value = "0.6")]
    min_score: f32,

    /// Targets per grid row.
    #[arg(long, default_value = "2")]
    cols: u32,

    /// Grid rows.
    #[arg(long, default_value = "4")]
    rows: u32,

    /// Coarse score a move target must reach [default: detector setting].
    #[arg(long)]
    move_min_score: Option<f32>,

    /// Refined score a move target must reach [default: detector setting].
    #[arg(long)]
    move_refine_min_score: Option<f32>,
}

impl TemplateArgs {
    fn detector(&self, size: ImageSize) -> CliResult<TargetDetector> {
        let mut params = BowtieParams::for_grid(GridSize::new(self.cols, self.rows));
        if let Some(score) = self.move_min_score {
            params.move_min_score = score;
        }
        if let Some(score) = self.move_refine_min_score {
            params.move_refine_min_score = score;
        }
        let mut detector = TargetDetector::new(params);
        detector.init_bowtie_template(self.template_dim, size)?;
        Ok(detector)
    }
}

#[derive(Debug, Clone, Args)]
struct FindTargetsArgs {
    /// Path to the input image.
    #[arg(long)]
    image: PathBuf,

    #[command(flatten)]
    template: TemplateArgs,

    /// Write a colour copy of the image with every candidate and the sorted
    /// grid marked.
    #[arg(long)]
    debug_out: Option<PathBuf>,

    /// Print the grid as JSON instead of text.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Args)]
struct CalibrateArgs {
    /// JSON file holding a `PixelToWorld` block.
    #[arg(long)]
    points: PathBuf,

    #[arg(long)]
    image_width: u32,

    #[arg(long)]
    image_height: u32,

    /// Path to write the calibration file.
    #[arg(long)]
    out: PathBuf,

    /// Half size of the move-search regions in pixels.
    #[arg(long, default_value = "56")]
    move_search_margin: u32,

    /// Image to draw the calibration over.
    #[arg(long, requires = "overlay_out")]
    overlay_image: Option<PathBuf>,

    /// Path to write the calibration overlay.
    #[arg(long, requires = "overlay_image")]
    overlay_out: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct FindMoveArgs {
    /// Calibration file written by `calibrate`.
    #[arg(long)]
    calib: PathBuf,

    /// Path to the input image.
    #[arg(long)]
    image: PathBuf,

    #[command(flatten)]
    template: TemplateArgs,

    /// Half size of the move-search regions; use the value given to `calibrate`.
    #[arg(long, default_value = "56")]
    move_search_margin: u32,
}

fn init_logging() {
    #[cfg(feature = "tracing")]
    gauge_targets::core::init_tracing(false);

    #[cfg(not(feature = "tracing"))]
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();
}

fn main() -> CliResult<()> {
    init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::FindTargets(args) => run_find_targets(&args),
        Commands::Calibrate(args) => run_calibrate(&args),
        Commands::FindMove(args) => run_find_move(&args),
    }
}

fn open_gray(path: &Path) -> CliResult<image::GrayImage> {
    let img = image::open(path).map_err(|e| -> CliError {
        format!("failed to open image {}: {}", path.display(), e).into()
    })?;
    Ok(img.to_luma8())
}

// ── find-targets ──────────────────────────────────────────────────────

fn run_find_targets(args: &FindTargetsArgs) -> CliResult<()> {
    let gray = open_gray(&args.image)?;
    let mut detector = args.template.detector(detect::image_size(&gray))?;

    let grid = if let Some(debug_out) = &args.debug_out {
        let (result, debug) =
            detect::find_targets_with_debug(&mut detector, &gray, args.template.min_score);
        if let Some(debug) = debug {
            debug.save(debug_out)?;
            log::info!("wrote candidate overlay to {}", debug_out.display());
        }
        result?
    } else {
        detect::find_targets(&mut detector, &gray, args.template.min_score)?
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&grid)?);
        return Ok(());
    }

    println!(
        "found {}x{} targets in {}",
        grid.grid.cols,
        grid.grid.rows,
        args.image.display()
    );
    for (r, row) in grid.rows().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            println!(
                "  [{r},{c}] ({:8.2}, {:8.2})  score {:.3}",
                cell.point.x, cell.point.y, cell.score
            );
        }
    }
    let rois = detector.move_target_rois();
    println!("  move ROI left:  {:?}", rois.left);
    println!("  move ROI right: {:?}", rois.right);
    Ok(())
}

// ── calibrate ─────────────────────────────────────────────────────────

fn run_calibrate(args: &CalibrateArgs) -> CliResult<()> {
    let raw = std::fs::read_to_string(&args.points)?;
    let record: PixelToWorldRecord = serde_json::from_str(&raw)?;
    let (pixel, world) = record.split_points();

    let mut model = CalibrationModel::new(CalibParams {
        move_search_margin: args.move_search_margin,
    });
    model.calibrate(
        &pixel,
        &world,
        record.grid(),
        ImageSize::new(args.image_width, args.image_height),
    )?;
    model.save(&args.out)?;
    println!(
        "calibrated {}x{} grid, {} search lines -> {}",
        record.columns,
        record.rows,
        model.search_lines().len(),
        args.out.display()
    );

    if let (Some(input), Some(output)) = (&args.overlay_image, &args.overlay_out) {
        let gray = open_gray(input)?;
        let (canvas, report) =
            overlay::draw_calibration(&model, &gray, overlay::OverlayOptions::default())?;
        canvas.save(output)?;
        for w in &report.warnings {
            println!("warning: {w}");
        }
    }
    Ok(())
}

// ── find-move ─────────────────────────────────────────────────────────

fn run_find_move(args: &FindMoveArgs) -> CliResult<()> {
    let params = CalibParams {
        move_search_margin: args.move_search_margin,
    };
    let model = CalibrationModel::from_file(&args.calib, params)?;
    let gray = open_gray(&args.image)?;
    let mut detector = args.template.detector(detect::image_size(&gray))?;

    let report = detect::measure_displacement(&mut detector, &model, &gray)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
