use std::io::{self, Write};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;

use blurcam_core::blurring::infrastructure::gaussian_redactor::GaussianRedactor;
use blurcam_core::control::domain::control_surface::ControlSurface;
use blurcam_core::control::infrastructure::interrupt::InterruptFlag;
use blurcam_core::control::infrastructure::preview_window::PreviewWindow;
use blurcam_core::control::infrastructure::terminal_control::TerminalControl;
use blurcam_core::detection::infrastructure::onnx_face_locator::OnnxFaceLocator;
use blurcam_core::pipeline::pipeline_config::PipelineConfig;
use blurcam_core::pipeline::pipeline_controller::PipelineController;
use blurcam_core::pipeline::pipeline_logger::LogPipelineLogger;
use blurcam_core::shared::constants::{FACE_MODEL_NAME, FACE_MODEL_URL};
use blurcam_core::shared::model_resolver;
use blurcam_core::video::infrastructure::ffmpeg_camera_source::FfmpegCameraSource;
use blurcam_core::video::infrastructure::ffmpeg_virtual_camera::FfmpegVirtualCamera;

/// Blur faces in a webcam feed and republish it as a virtual camera.
///
/// Press B to toggle blurring and Q to quit, in the preview window or,
/// with --no-preview, by typing the key and Enter in the terminal.
#[derive(Parser, Debug)]
#[command(name = "blurcam", version)]
struct Cli {
    /// JSON config file; command-line flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Gaussian blur kernel size (even values are bumped to the next odd).
    #[arg(long, allow_negative_numbers = true)]
    strength: Option<i64>,

    /// Gaussian sigma (0 derives it from the kernel size).
    #[arg(long)]
    sigma: Option<f64>,

    /// Run without the preview window.
    #[arg(long)]
    no_preview: bool,

    /// Frame rate advertised to and paced for the virtual camera.
    #[arg(long)]
    fps: Option<f64>,

    /// Capture device: index (0), device path, or platform device name.
    #[arg(long)]
    camera: Option<String>,

    /// v4l2loopback device to publish to.
    #[arg(long)]
    virtual_device: Option<String>,

    /// Requested capture width (needs --height).
    #[arg(long)]
    width: Option<u32>,

    /// Requested capture height (needs --width).
    #[arg(long)]
    height: Option<u32>,

    /// Face model (.onnx); downloaded to the cache when omitted.
    #[arg(long)]
    model: Option<PathBuf>,
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
    let config = build_config(&cli)?;
    config.validate()?;

    let locator = Box::new(OnnxFaceLocator::new(&resolve_model(&config)?)?);

    let mut source =
        FfmpegCameraSource::new(config.camera.clone()).with_frame_rate(config.frame_rate);
    if let Some((width, height)) = config.capture_size() {
        source = source.with_capture_size(width, height);
    }
    let sink = FfmpegVirtualCamera::new(config.virtual_device.clone());

    let interrupt = InterruptFlag::install()?;
    let control: Box<dyn ControlSurface> = if config.show_preview {
        Box::new(PreviewWindow::new(interrupt))
    } else {
        log::info!("Headless mode: type b + Enter to toggle blur, q + Enter to quit");
        Box::new(TerminalControl::spawn(interrupt)?)
    };

    let mut controller = PipelineController::new(
        Box::new(source),
        Box::new(sink),
        locator,
        Box::new(GaussianRedactor::new()),
        control,
        Box::new(LogPipelineLogger::default()),
    );
    let stats = controller.run_loop(&config)?;

    log::info!(
        "Stopped after {} frames ({} with faces blurred, {} regions, {} toggles)",
        stats.frames,
        stats.redacted_frames,
        stats.redactions,
        stats.toggles
    );
    Ok(())
}

/// Defaults, then the optional JSON file, then explicit flags.
fn build_config(cli: &Cli) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };

    if let Some(strength) = cli.strength {
        config.blur_kernel_size = strength;
    }
    if let Some(sigma) = cli.sigma {
        config.blur_sigma = sigma;
    }
    if cli.no_preview {
        config.show_preview = false;
    }
    if let Some(fps) = cli.fps {
        config.frame_rate = fps;
    }
    if let Some(camera) = &cli.camera {
        config.camera = camera.clone();
    }
    if let Some(device) = &cli.virtual_device {
        config.virtual_device = device.clone();
    }
    if cli.width.is_some() {
        config.capture_width = cli.width;
    }
    if cli.height.is_some() {
        config.capture_height = cli.height;
    }
    if cli.model.is_some() {
        config.model_path = cli.model.clone();
    }
    Ok(config)
}

fn resolve_model(config: &PipelineConfig) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Some(path) = &config.model_path {
        return Ok(model_resolver::resolve_explicit(path)?);
    }
    log::info!("Resolving model: {FACE_MODEL_NAME}");
    let downloaded = Arc::new(AtomicBool::new(false));
    let progress_seen = downloaded.clone();
    let path = model_resolver::resolve(
        FACE_MODEL_NAME,
        FACE_MODEL_URL,
        None,
        Some(Box::new(move |done, total| {
            progress_seen.store(true, Ordering::Relaxed);
            download_progress(done, total);
        })),
    )?;
    finish_progress_line(&downloaded, &mut io::stderr())?;
    Ok(path)
}

/// Ends the `\r`-rewritten progress line, if one was started.
fn finish_progress_line(downloaded: &AtomicBool, out: &mut impl Write) -> io::Result<()> {
    if downloaded.load(Ordering::Relaxed) {
        writeln!(out)?;
    }
    Ok(())
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face model... {pct}%");
    } else {
        eprint!("\rDownloading face model... {downloaded} bytes");
    }
}
