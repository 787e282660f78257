//! Expression bridge: stream face tracking to an iFacialMocap receiver.

use anyhow::{bail, Context, Result};
use clap::Parser;
use expression_bridge::{
    calibration::Calibrator,
    camera::open_camera,
    config::{CameraBackend, Config, EXAMPLE_CONFIG},
    detection_loop::{DetectionLoop, Dispatcher, ShutdownSignal},
    detector::ReplayModel,
    frame_transform::FrameTransform,
    transport::UdpTransport,
};
use log::{info, warn};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<PathBuf>,

    /// Camera index to use
    #[arg(long)]
    cam: Option<u32>,

    /// Camera backend (opencv, nokhwa, image_sequence)
    #[arg(long)]
    backend: Option<String>,

    /// Directory of images to use instead of a camera
    #[arg(long)]
    images: Option<PathBuf>,

    /// Recorded detection results (JSON lines) to replay
    #[arg(short, long)]
    replay: Option<PathBuf>,

    /// Receiver address (host:port); waits for a handshake when omitted
    #[arg(short, long)]
    target: Option<String>,

    /// Local port to listen on for the receiver handshake
    #[arg(short, long)]
    port: Option<u16>,

    /// Send each eye's blink separately instead of their average
    #[arg(long)]
    no_sync_blink: bool,

    /// Calibrate the neutral pose when tracking starts
    #[arg(long)]
    calibrate: bool,

    /// Print an example configuration file and exit
    #[arg(long)]
    example_config: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {}", path.display());
            Config::from_file(path).with_context(|| format!("Failed to load {}", path.display()))?
        }
        None => Config::default(),
    };

    if let Some(cam) = args.cam {
        config.camera.device = cam;
    }
    if let Some(backend) = &args.backend {
        config.camera.backend = Some(backend.parse()?);
    }
    if let Some(images) = &args.images {
        config.camera.backend = Some(CameraBackend::ImageSequence);
        config.camera.path = Some(images.clone());
    }
    if let Some(replay) = &args.replay {
        config.detector.replay_file = Some(replay.clone());
    }
    if let Some(target) = &args.target {
        config.transport.target = Some(target.clone());
    }
    if let Some(port) = args.port {
        config.transport.port = port;
    }
    if args.no_sync_blink {
        config.blendshapes.sync_eye_blink = false;
    }
    if args.calibrate {
        config.calibration.on_start = true;
    }

    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.example_config {
        print!("{EXAMPLE_CONFIG}");
        return Ok(());
    }

    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    info!("Expression Bridge {}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args)?;

    let Some(replay_file) = &config.detector.replay_file else {
        bail!("No landmark model configured; pass --replay or set detector.replay_file");
    };
    let model = ReplayModel::from_file(replay_file, config.detector.replay_loop)?;
    if model.is_empty() {
        warn!("Replay file {} holds no detections", replay_file.display());
    }

    let camera = open_camera(&config.camera)?;
    let transport = UdpTransport::new(&config.transport)?;

    let mut calibrator = Calibrator::new();
    if let Some(profile) = &config.calibration.profile {
        calibrator = calibrator.persist_to(profile)?;
    }
    if config.calibration.on_start {
        calibrator.begin(config.calibration.frames);
    }

    let shutdown = ShutdownSignal::new();
    shutdown.install_ctrlc_handler()?;

    let dispatcher = Dispatcher::new(
        FrameTransform::new(config.pose, &config.blendshapes),
        Box::new(calibrator),
        Box::new(transport),
    );

    // Recorded frames pair up one-to-one with recorded detections
    let recorded = config.camera.resolved_backend() == CameraBackend::ImageSequence;
    let summary = DetectionLoop::new(camera, Box::new(model), dispatcher, shutdown)?
        .wait_for_detector(recorded)
        .run();

    info!("Stopped: {:?}", summary.exit_reason);
    Ok(())
}
