use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use facewatch_core::annotation::infrastructure::box_label_annotator::BoxLabelAnnotator;
use facewatch_core::detection::domain::detection_model::DetectionModel;
use facewatch_core::detection::infrastructure::model_factory::{create_extractor, create_locator};
use facewatch_core::detection::infrastructure::model_resolver::ModelSources;
use facewatch_core::pipeline::frame_loop::FrameLoop;
use facewatch_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use facewatch_core::pipeline::recognition_config::{RecognitionConfig, SinkErrorPolicy};
use facewatch_core::pipeline::recognition_error::RecognitionError;
use facewatch_core::recognition::domain::gallery_index::GalleryIndex;
use facewatch_core::recognition::domain::gallery_store::GalleryStore;
use facewatch_core::recognition::domain::identification_engine::IdentificationEngine;
use facewatch_core::recognition::infrastructure::json_gallery_store::JsonGalleryStore;
use facewatch_core::shared::constants::WINDOW_TITLE;
use facewatch_core::video::domain::frame_source::FrameSource;
use facewatch_core::video::domain::output_sink::OutputSink;
use facewatch_core::video::infrastructure::ffmpeg_frame_source::{
    is_capture_device, FfmpegFrameSource,
};
use facewatch_core::video::infrastructure::ffmpeg_writer::FfmpegWriter;
use facewatch_core::video::infrastructure::minifb_display::MinifbDisplay;

/// Real-time face identification on a camera feed or video file.
#[derive(Parser, Debug)]
#[command(name = "facewatch")]
struct Cli {
    /// Path to the gallery of known face encodings (JSON).
    #[arg(short = 'e', long)]
    encodings: Option<PathBuf>,

    /// Path to write the annotated video to (MJPEG, e.g. out.avi).
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Whether to show frames in a window; 0 disables it.
    #[arg(short = 'y', long)]
    display: Option<i64>,

    /// Face detection model: hog (fast) or cnn (accurate).
    #[arg(short = 'd', long = "detection-method")]
    detection_method: Option<DetectionModel>,

    /// Maximum embedding distance for a match (default: the extractor's recommendation).
    #[arg(long)]
    tolerance: Option<f64>,

    /// Camera device or video file to read from.
    #[arg(long)]
    source: Option<String>,

    /// Width frames are downscaled to before face detection.
    #[arg(long)]
    working_width: Option<u32>,

    /// Frame rate of the recorded output.
    #[arg(long)]
    fps: Option<f64>,

    /// Milliseconds to let a camera settle after opening it.
    #[arg(long)]
    warmup_ms: Option<u64>,

    /// What to do when the output video cannot be written: abort or continue.
    #[arg(long)]
    on_sink_error: Option<SinkErrorPolicy>,

    /// Directory searched first for model files.
    #[arg(long)]
    model_dir: Option<PathBuf>,

    /// Base URL missing model files are downloaded from.
    #[arg(long)]
    model_base_url: Option<String>,

    /// JSON file with default options; flags override it.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        process::exit(exit_code(e.as_ref()));
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = resolve_config(cli)?;
    config.validate()?;

    let encodings_path = config.encodings_path()?;
    log::info!("Loading encodings from {}", encodings_path.display());
    let gallery = JsonGalleryStore::new()
        .load(encodings_path, None)
        .map_err(RecognitionError::from)?;

    let sources = ModelSources::new(config.model_dir.clone(), config.model_base_url.clone());
    let extractor = create_extractor(&sources, Some(Box::new(download_progress)))?;
    gallery
        .check_dimension(extractor.dimension())
        .map_err(RecognitionError::from)?;
    let tolerance = config.resolve_tolerance(extractor.default_tolerance());
    if config.tolerance.is_none() {
        log::info!("Using the embedding extractor's recommended tolerance {tolerance}");
    }
    log::info!(
        "Loaded {} reference encodings for {} identities",
        gallery.len(),
        distinct_labels(&gallery)
    );
    let engine = IdentificationEngine::new(gallery, tolerance);

    let locator = create_locator(
        config.detection_model,
        &sources,
        Some(Box::new(download_progress)),
    )?;

    log::info!("Starting video stream from {}", config.source);
    let mut source = FfmpegFrameSource::new();
    let metadata = source
        .open(&config.source)
        .map_err(|e| RecognitionError::FrameSource(format!("{}: {e}", config.source)))?;
    log::info!(
        "Source is {}x{} at {:.1} fps ({})",
        metadata.width,
        metadata.height,
        metadata.fps,
        metadata.codec
    );
    if is_capture_device(&config.source) && config.warmup_ms > 0 {
        std::thread::sleep(Duration::from_millis(config.warmup_ms));
    }

    let terminate = Arc::new(AtomicBool::new(false));
    spawn_signal_listener(terminate.clone())?;

    let mut frame_loop = FrameLoop::new(
        Box::new(source),
        locator,
        extractor,
        engine,
        Box::new(BoxLabelAnnotator::new()),
    )
    .with_working_width(config.working_width)
    .with_logger(Box::new(StdoutPipelineLogger::default()))
    .with_terminate_flag(terminate);

    if let Some(path) = &config.output_path {
        let sink = OutputSink::new(Box::new(FfmpegWriter::new()), path, config.output_fps);
        frame_loop = frame_loop.with_sink(sink, config.on_sink_error);
    }
    if config.display {
        frame_loop = frame_loop.with_display(Box::new(MinifbDisplay::new(WINDOW_TITLE)));
    }

    frame_loop.run()?;
    Ok(())
}

/// Starts from `--config` (or defaults) and applies every flag given.
fn resolve_config(cli: Cli) -> Result<RecognitionConfig, RecognitionError> {
    let mut config = match &cli.config {
        Some(path) => RecognitionConfig::from_json_file(path)?,
        None => RecognitionConfig::default(),
    };

    if let Some(path) = cli.encodings {
        config.encodings_path = Some(path);
    }
    if let Some(path) = cli.output {
        config.output_path = Some(path);
    }
    if let Some(display) = cli.display {
        config.display = display > 0;
    }
    if let Some(model) = cli.detection_method {
        config.detection_model = model;
    }
    if let Some(tolerance) = cli.tolerance {
        config.tolerance = Some(tolerance);
    }
    if let Some(source) = cli.source {
        config.source = source;
    }
    if let Some(width) = cli.working_width {
        config.working_width = width;
    }
    if let Some(fps) = cli.fps {
        config.output_fps = fps;
    }
    if let Some(ms) = cli.warmup_ms {
        config.warmup_ms = ms;
    }
    if let Some(policy) = cli.on_sink_error {
        config.on_sink_error = policy;
    }
    if let Some(dir) = cli.model_dir {
        config.model_dir = Some(dir);
    }
    if let Some(url) = cli.model_base_url {
        config.model_base_url = Some(url);
    }
    Ok(config)
}

/// Sets `terminate` on SIGINT or SIGTERM, from a dedicated thread.
fn spawn_signal_listener(terminate: Arc<AtomicBool>) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    std::thread::Builder::new()
        .name("signal-listener".to_string())
        .spawn(move || {
            runtime.block_on(shutdown_signal());
            log::info!("Termination requested, stopping after the current frame");
            terminate.store(true, Ordering::SeqCst);
        })?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::warn!("Cannot listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log::warn!("Cannot listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Process exit status for a failed run.
fn exit_code(err: &(dyn std::error::Error + 'static)) -> i32 {
    match err.downcast_ref::<RecognitionError>() {
        Some(RecognitionError::Configuration(_)) => 2,
        Some(RecognitionError::CorruptGallery(_)) => 3,
        Some(RecognitionError::FrameSource(_)) => 4,
        Some(RecognitionError::OutputSink(_)) => 5,
        Some(RecognitionError::Display(_)) => 6,
        Some(RecognitionError::AlreadyRun) | None => 1,
    }
}

fn distinct_labels(gallery: &GalleryIndex) -> usize {
    let mut labels: Vec<&str> = gallery.entries().iter().map(|e| e.label()).collect();
    labels.sort_unstable();
    labels.dedup();
    labels.len()
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading model... {pct}%");
        if downloaded >= total {
            eprintln!();
        }
    } else {
        eprint!("\rDownloading model... {downloaded} bytes");
    }
}
