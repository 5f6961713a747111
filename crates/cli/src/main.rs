use std::path::{Path, PathBuf};
use std::process;
use std::thread;

use clap::{Args, Parser, Subcommand};
use crossbeam_channel::{select, Receiver};

use acnescan_core::annotation::infrastructure::box_annotator::BoxAnnotator;
use acnescan_core::capture::infrastructure::ffmpeg_camera_source::{CameraConfig, FfmpegCameraSource};
use acnescan_core::capture::infrastructure::image_file_reader::read_image;
use acnescan_core::detection::domain::acne_detector::AcneDetector;
use acnescan_core::detection::infrastructure::model_resolver::{self, ModelRequest};
use acnescan_core::detection::infrastructure::onnx_yolo_detector::OnnxYoloDetector;
use acnescan_core::pipeline::capture_session::{
    CaptureSession, SessionConfig, SessionEvent, StartOutcome, StopOutcome,
};
use acnescan_core::pipeline::final_report_use_case::{
    DetectionSummary, FinalReportUseCase, OutputPaths,
};
use acnescan_core::pipeline::session_logger::StdoutSessionLogger;
use acnescan_core::report::infrastructure::image_file_writer::ImageFileWriter;
use acnescan_core::report::infrastructure::text_file_report_writer::TextFileReportWriter;
use acnescan_core::shared::constants::{
    DEFAULT_CAMERA_INDEX, DEFAULT_CONFIDENCE, DEFAULT_LABELS, DEFAULT_SKIP_INTERVAL,
    IMAGE_EXTENSIONS, MODEL_NAME, MODEL_URL_ENV,
};

/// Acne detection on still images and live webcam video.
#[derive(Parser)]
#[command(name = "acnescan", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    detection: DetectionArgs,
}

#[derive(Subcommand)]
enum Command {
    /// Detect acne in a single image.
    Image {
        /// Input image file.
        input: PathBuf,
    },
    /// Detect acne on a live webcam feed; press Enter to stop and save results.
    Live {
        /// Camera index (0 = default camera).
        #[arg(long, default_value_t = DEFAULT_CAMERA_INDEX)]
        camera: u32,

        /// Capture device name, overriding --camera (e.g. "video=Integrated Camera").
        #[arg(long)]
        device: Option<String>,

        /// Requested capture width (needs --height).
        #[arg(long, requires = "height")]
        width: Option<u32>,

        /// Requested capture height (needs --width).
        #[arg(long, requires = "width")]
        height: Option<u32>,

        /// Requested capture frame rate.
        #[arg(long)]
        fps: Option<u32>,

        /// Stop automatically after this many displayed frames.
        #[arg(long)]
        max_frames: Option<usize>,
    },
}

#[derive(Args)]
struct DetectionArgs {
    /// ONNX model file (defaults to the cached or bundled model).
    #[arg(long, global = true)]
    model: Option<PathBuf>,

    /// URL to download the model from when no local copy exists.
    #[arg(long, global = true)]
    model_url: Option<String>,

    /// Detection confidence threshold (0.0-1.0).
    #[arg(long, global = true, default_value_t = DEFAULT_CONFIDENCE)]
    confidence: f64,

    /// Run live detection every Nth frame (1 = every frame).
    #[arg(long, global = true, default_value_t = DEFAULT_SKIP_INTERVAL)]
    skip_frames: usize,

    /// Show frames that skip detection without the previous boxes.
    #[arg(long, global = true)]
    raw_skipped_frames: bool,

    /// Class labels in model order (comma-separated).
    #[arg(long, global = true, value_delimiter = ',')]
    labels: Option<Vec<String>>,

    /// Directory for the annotated image and the text report.
    #[arg(long, global = true, default_value = ".")]
    output_dir: PathBuf,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let mut session = build_session(&cli.detection)?;
    match cli.command {
        Command::Image { input } => run_image(&mut session, &input),
        Command::Live {
            camera,
            device,
            width,
            height,
            fps,
            max_frames,
        } => {
            let config = CameraConfig {
                index: camera,
                device,
                width,
                height,
                fps,
            };
            run_live(&mut session, config, max_frames)
        }
    }
}

fn run_image(session: &mut CaptureSession, input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let frame = read_image(input)?;
    let summary = session.detect_still(&frame)?;
    print_summary(&summary);
    Ok(())
}

fn run_live(
    session: &mut CaptureSession,
    config: CameraConfig,
    max_frames: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let events = session.events();
    match session.start(Box::new(FfmpegCameraSource::new(config)))? {
        StartOutcome::Started(info) => {
            let fps = info.fps.map(|f| format!(" @ {f:.1} fps")).unwrap_or_default();
            eprintln!(
                "Capturing {} ({}x{}{fps}). Press Enter to stop.",
                info.description, info.width, info.height
            );
        }
        StartOutcome::AlreadyRunning => {}
    }

    wait_for_stop(&spawn_enter_listener(), &events, max_frames);

    match session.stop()? {
        StopOutcome::Reported(summary) => print_summary(&summary),
        StopOutcome::NoFrameCaptured => eprintln!("No frame captured"),
        StopOutcome::NotRunning => {}
    }
    Ok(())
}

/// Blocks until Enter, `max_frames` displayed frames or the end of the source.
/// A closed `enter_rx` (stdin at EOF) is ignored.
fn wait_for_stop(
    enter_rx: &Receiver<()>,
    events: &Receiver<SessionEvent>,
    max_frames: Option<usize>,
) -> usize {
    let never = crossbeam_channel::never();
    let mut stdin_closed = false;
    let mut shown = 0usize;
    loop {
        let enter = if stdin_closed { &never } else { enter_rx };
        select! {
            recv(enter) -> msg => match msg {
                Ok(()) => break,
                Err(_) => {
                    log::debug!("stdin closed; stop with --max-frames or Ctrl-C");
                    stdin_closed = true;
                }
            },
            recv(events) -> event => match event {
                Ok(SessionEvent::Frame { frame, detections }) => {
                    shown += 1;
                    log::info!("Frame {}: {} acne(s)", frame.index(), detections.len());
                    if max_frames.is_some_and(|max| shown >= max) {
                        break;
                    }
                }
                Ok(SessionEvent::SourceEnded(error)) => {
                    if let Some(error) = error {
                        eprintln!("Capture ended: {error}");
                    }
                    break;
                }
                Err(_) => break,
            },
        }
    }
    shown
}

/// Sends once when the user presses Enter; drops the sender when stdin closes.
fn spawn_enter_listener() -> Receiver<()> {
    let (tx, rx) = crossbeam_channel::bounded(1);
    thread::spawn(move || {
        let mut line = String::new();
        if matches!(std::io::stdin().read_line(&mut line), Ok(n) if n > 0) {
            let _ = tx.send(());
        }
    });
    rx
}

fn print_summary(summary: &DetectionSummary) {
    print!("{}", summary.report.render());
    log::info!(
        "Annotated image written to {}",
        summary.paths.image_path.display()
    );
    log::info!("Report written to {}", summary.paths.report_path.display());
}

fn build_session(args: &DetectionArgs) -> Result<CaptureSession, Box<dyn std::error::Error>> {
    let detector = build_detector(args)?;
    let final_report = FinalReportUseCase::new(
        Box::new(ImageFileWriter::new()),
        Box::new(TextFileReportWriter::new()),
        OutputPaths::in_dir(&args.output_dir),
    );
    let session = CaptureSession::new(
        detector,
        Box::new(BoxAnnotator::new()),
        Box::new(StdoutSessionLogger::default()),
        final_report,
        SessionConfig {
            skip_interval: args.skip_frames,
            hold_overlays: !args.raw_skipped_frames,
            ..SessionConfig::default()
        },
    )?;
    Ok(session)
}

fn build_detector(args: &DetectionArgs) -> Result<Box<dyn AcneDetector>, Box<dyn std::error::Error>> {
    let request = ModelRequest {
        name: MODEL_NAME.to_string(),
        path: args.model.clone(),
        bundled_dir: bundled_model_dir(),
        url: args
            .model_url
            .clone()
            .or_else(|| std::env::var(MODEL_URL_ENV).ok()),
    };
    log::info!("Resolving model: {}", request.name);
    let model_path = model_resolver::resolve(&request, Some(Box::new(download_progress)))?;

    let labels = args
        .labels
        .clone()
        .unwrap_or_else(|| DEFAULT_LABELS.iter().map(|l| l.to_string()).collect());
    Ok(Box::new(OnnxYoloDetector::new(
        &model_path,
        labels,
        args.confidence,
    )?))
}

/// `models/` next to the executable.
fn bundled_model_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("models")))
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let args = &cli.detection;
    if let Command::Image { input } = &cli.command {
        if !input.exists() {
            return Err(format!("Input file not found: {}", input.display()).into());
        }
        if !is_image(input) {
            return Err(format!(
                "Unsupported image type: {} (expected one of {})",
                input.display(),
                IMAGE_EXTENSIONS.join(", ")
            )
            .into());
        }
    }
    if !(0.0..=1.0).contains(&args.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            args.confidence
        )
        .into());
    }
    if args.skip_frames == 0 {
        return Err("Skip frames must be at least 1".into());
    }
    if let Some(labels) = &args.labels {
        if labels.is_empty() || labels.iter().any(|l| l.trim().is_empty()) {
            return Err("Labels must be non-empty".into());
        }
    }
    if let Some(model) = &args.model {
        if !model.exists() {
            return Err(format!("Model file not found: {}", model.display()).into());
        }
    }
    Ok(())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading acne detection model... {pct}%");
    } else {
        eprint!("\rDownloading acne detection model... {downloaded} bytes");
    }
}
