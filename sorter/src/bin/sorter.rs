//! Operator CLI for the sorting arm.
//!
//! Subcommands:
//! - `run`: start a session and sort (menu, manual, once, or continuous)
//! - `predict`: show the calibration fit and travel times for a pixel
//! - `rectify`: flatten the tray in a still image
//! - `detect`: run detection offline on two still images
//! - `capture`: grab one camera frame to a file
//! - `init-config` / `show-config`: manage the rig configuration
//! - `ports`: list serial ports

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use hardware::{CaptureDevice, ImageFileCamera, LinkConnector, RecordingConnector, SerialConnector};
use sorter::console::{report, Console};
use sorter::{
    debug_image, AfterPolls, CalibrationModel, CancelFlag, ConfigStorage, Orchestrator, Session,
    SorterConfig,
};
use tracing::{info, Level};
use vision::image_proc::polygon_mask;
use vision::{build_detector, Frame, Point2D, RectifyTransform, TrayCorners};

#[derive(Parser, Debug)]
#[command(name = "sorter")]
#[command(about = "Camera-guided pick-and-place sorting arm")]
#[command(version)]
struct Args {
    /// Config file (default ~/.sorter/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Menu,
    Manual,
    Once,
    Continuous,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start a sorting session
    Run {
        #[arg(short, long, value_enum, default_value = "menu")]
        mode: Mode,

        /// Serial port, overrides the config
        #[arg(short, long)]
        port: Option<String>,

        /// Baud rate, overrides the config
        #[arg(short, long)]
        baud: Option<u32>,

        /// V4L2 device path, overrides the config
        #[arg(long)]
        camera: Option<String>,

        /// Replay still images instead of using a camera
        #[arg(long, num_args = 1..)]
        images: Vec<PathBuf>,

        /// Log commands instead of writing to the serial port
        #[arg(long)]
        dry_run: bool,

        /// Skip the empty-tray confirmation prompt
        #[arg(short, long)]
        yes: bool,

        /// Save an annotated image for every detection
        #[arg(long)]
        debug_dir: Option<PathBuf>,

        /// Stop continuous mode after this many cycles
        #[arg(long)]
        max_cycles: Option<usize>,
    },

    /// Print the calibration fit and the travel times for a pixel
    Predict {
        #[arg(short, long)]
        x: f64,

        #[arg(short, long)]
        y: f64,
    },

    /// Rectify the tray in a still image
    Rectify {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Detect an object by comparing two still images
    Detect {
        /// Empty-tray image
        #[arg(short, long)]
        reference: PathBuf,

        /// Image with the object
        #[arg(short, long)]
        live: PathBuf,

        /// Annotated output image
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Mask the full frame to the tray instead of rectifying
        #[arg(long)]
        full_frame: bool,
    },

    /// Capture one frame from the camera
    Capture {
        #[arg(short, long, default_value = "capture.png")]
        output: PathBuf,

        /// V4L2 device path, overrides the config
        #[arg(long)]
        camera: Option<String>,
    },

    /// Write the default configuration
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    ShowConfig,

    /// List serial ports
    Ports,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .with_target(false)
        .init();

    match args.command {
        Command::Run {
            mode,
            port,
            baud,
            camera,
            images,
            dry_run,
            yes,
            debug_dir,
            max_cycles,
        } => {
            let mut config = load_config(args.config.as_deref())?;
            if let Some(port) = port {
                config.link.port = port;
            }
            if let Some(baud) = baud {
                config.link.baud_rate = baud;
            }
            if let Some(camera) = camera {
                config.camera.device_path = camera;
            }
            cmd_run(config, mode, images, dry_run, yes, debug_dir, max_cycles)
        }
        Command::Predict { x, y } => cmd_predict(&load_config(args.config.as_deref())?, x, y),
        Command::Rectify { input, output } => {
            cmd_rectify(&load_config(args.config.as_deref())?, &input, &output)
        }
        Command::Detect {
            reference,
            live,
            output,
            full_frame,
        } => cmd_detect(
            &load_config(args.config.as_deref())?,
            &reference,
            &live,
            output.as_deref(),
            full_frame,
        ),
        Command::Capture { output, camera } => {
            let mut config = load_config(args.config.as_deref())?;
            if let Some(camera) = camera {
                config.camera.device_path = camera;
            }
            cmd_capture(&config, &output)
        }
        Command::InitConfig { force } => cmd_init_config(args.config, force),
        Command::ShowConfig => {
            let config = load_config(args.config.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        Command::Ports => {
            let ports = hardware::actuator::list_ports().context("Failed to enumerate serial ports")?;
            if ports.is_empty() {
                println!("No serial ports found");
            }
            for port in ports {
                println!("{port}");
            }
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<SorterConfig> {
    match path {
        Some(path) => SorterConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => {
            let storage = ConfigStorage::new()?;
            storage
                .load()
                .with_context(|| format!("Failed to load config {}", storage.config_path().display()))
        }
    }
}

fn open_camera(config: &SorterConfig, images: Vec<PathBuf>) -> Result<Box<dyn CaptureDevice>> {
    if !images.is_empty() {
        return Ok(Box::new(ImageFileCamera::open(images)?));
    }

    #[cfg(all(target_os = "linux", feature = "v4l2"))]
    {
        use hardware::camera::{V4l2Camera, V4l2Config};
        let camera = V4l2Camera::open(V4l2Config {
            device_path: config.camera.device_path.clone(),
            width: config.camera.width,
            height: config.camera.height,
            fourcc: config.camera.fourcc.clone(),
            warmup_frames: config.camera.warmup_frames,
        })?;
        return Ok(Box::new(camera));
    }

    #[cfg(not(all(target_os = "linux", feature = "v4l2")))]
    {
        bail!(
            "No camera for {}: pass --images or build with the v4l2 feature",
            config.camera.device_path
        );
    }
}

fn cmd_run(
    config: SorterConfig,
    mode: Mode,
    images: Vec<PathBuf>,
    dry_run: bool,
    yes: bool,
    debug_dir: Option<PathBuf>,
    max_cycles: Option<usize>,
) -> Result<()> {
    let cancel = CancelFlag::new();
    cancel
        .install_ctrlc_handler()
        .context("Failed to install Ctrl-C handler")?;

    let camera = open_camera(&config, images)?;
    let connector: Box<dyn LinkConnector> = if dry_run {
        info!("Dry run: commands are logged, not sent");
        Box::new(RecordingConnector::new().echoing())
    } else {
        Box::new(SerialConnector::new(
            config.link.port.clone(),
            config.link.baud_rate,
            config.link.timeout(),
        ))
    };

    let mut console = Console::new(cancel.clone()).context("Failed to open terminal")?;
    let session = Session::start(config, camera, connector, || {
        yes || console.wait_for_enter("Make sure the tray is empty.")
    })?;

    let mut orchestrator = Orchestrator::new(session);
    if let Some(dir) = debug_dir {
        orchestrator = orchestrator.with_debug_dir(dir);
    }

    match mode {
        Mode::Menu => console.run_menu(&mut orchestrator)?,
        Mode::Manual => console.run_manual(&mut orchestrator)?,
        Mode::Once => report(&orchestrator.run_one_shot()),
        Mode::Continuous => {
            let summary = match max_cycles {
                Some(n) => orchestrator.run_continuous(&(cancel, AfterPolls::new(n))),
                None => orchestrator.run_continuous(&cancel),
            };
            println!("{summary:#?}");
        }
    }
    Ok(())
}

fn cmd_predict(config: &SorterConfig, x: f64, y: f64) -> Result<()> {
    let model = CalibrationModel::fit(&config.calibration)?;
    for (name, fit) in [("X", &model.x), ("Y", &model.y)] {
        println!(
            "{name}: seconds = {:.6} * px + {:.4}  (R² {:.3}, {} points)",
            fit.slope, fit.intercept, fit.r_squared, fit.num_points
        );
    }

    let target = Point2D::new(x, y);
    let plan = model.plan(target);
    println!(
        "Target {target}: X {:.2}s (raw {:.3}), Y {:.2}s (raw {:.3})",
        plan.x_seconds,
        model.x.raw(x),
        plan.y_seconds,
        model.y.raw(y)
    );
    Ok(())
}

fn load_frame(path: &Path) -> Result<Frame> {
    let image = image::open(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(Frame::from_rgb_image(&image.to_rgb8()))
}

fn tray_transform(config: &SorterConfig) -> Result<RectifyTransform> {
    let corners = TrayCorners::new(&config.tray.corners)?;
    Ok(RectifyTransform::from_corners(&corners)?)
}

fn cmd_rectify(config: &SorterConfig, input: &Path, output: &Path) -> Result<()> {
    let transform = tray_transform(config)?;
    let rectified = transform.warp_frame(&load_frame(input)?);
    rectified
        .to_rgb_image()
        .save(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("Wrote {} ({})", output.display(), rectified.size());
    Ok(())
}

fn cmd_detect(
    config: &SorterConfig,
    reference: &Path,
    live: &Path,
    output: Option<&Path>,
    full_frame: bool,
) -> Result<()> {
    let reference = load_frame(reference)?;
    let live = load_frame(live)?;
    let transform = tray_transform(config)?;

    let (detection, annotated) = if full_frame {
        let mask = polygon_mask(reference.size(), &transform.corners().as_array());
        let detector = build_detector(&config.detector, Some(mask));
        let mut detection = detector.detect(&reference, &live)?;
        // No rectification, so both centroids are in camera pixels
        detection.centroid_full_frame = detection.centroid_rectified;
        let annotated = debug_image::annotate_tray(&live, transform.corners(), Some(&detection));
        (detection, annotated)
    } else {
        let detector = build_detector(&config.detector, None);
        let live = transform.warp_frame(&live);
        let detection = detector
            .detect(&transform.warp_frame(&reference), &live)?
            .with_full_frame(&transform);
        let annotated = debug_image::annotate_detection(&live, &detection);
        (detection, annotated)
    };

    println!(
        "Changed pixels: {:.2}%, regions: {}, largest area: {:.0}",
        detection.foreground_fraction * 100.0,
        detection.region_count,
        detection.area
    );
    match detection.centroid_full_frame {
        Some(centroid) if detection.found => {
            let plan = CalibrationModel::fit(&config.calibration)?.plan(centroid);
            println!(
                "Object at {centroid}, travel X {:.2}s Y {:.2}s",
                plan.x_seconds, plan.y_seconds
            );
        }
        _ => println!("No object detected"),
    }

    if let Some(output) = output {
        annotated
            .save(output)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        println!("Wrote {}", output.display());
    }
    Ok(())
}

fn cmd_capture(config: &SorterConfig, output: &Path) -> Result<()> {
    let mut camera = open_camera(config, Vec::new())?;
    let frame = camera.read_frame();
    camera.release();
    let frame = frame?;
    frame
        .to_rgb_image()
        .save(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("Wrote {} ({})", output.display(), frame.size());
    Ok(())
}

fn cmd_init_config(path: Option<PathBuf>, force: bool) -> Result<()> {
    let config = SorterConfig::default();
    let target = match path {
        Some(path) => path,
        None => ConfigStorage::new()?.config_path(),
    };
    if target.exists() && !force {
        bail!("{} already exists, use --force to overwrite", target.display());
    }

    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    config.save_to_file(&target)?;
    println!("Wrote default config to {}", target.display());
    Ok(())
}
