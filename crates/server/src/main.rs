mod engines;
mod error;
mod routes;
mod server;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use proctor_core::analysis::domain::gaze_estimator::{
    GazeEstimator, DEFAULT_LEFT_THRESHOLD, DEFAULT_RIGHT_THRESHOLD,
};
use proctor_core::analysis::domain::verification_policy::{
    VerificationPolicy, DEFAULT_MATCH_THRESHOLD, DEFAULT_STRONG_MATCH_THRESHOLD,
};
use proctor_core::detection::infrastructure::onnx_yolo_detector::DEFAULT_CONFIDENCE;
use proctor_core::service::analysis_service::{AnalysisService, ServiceConfig};
use proctor_core::service::service_kind::ServiceKind;
use proctor_core::shared::constants::{
    DEFAULT_JOB_TIMEOUT_SECS, DEFAULT_MAX_BODY_BYTES, DEFAULT_POOL_TIMEOUT_SECS,
    MAX_DEFAULT_WORKERS,
};

use crate::engines::EngineSettings;
use crate::routes::AppState;

/// How long open requests may keep running after Ctrl-C.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Pooled frame analysis service for online proctoring.
#[derive(Parser)]
#[command(name = "proctor-server")]
struct Cli {
    /// Analysis offered by this instance: ai-detection, face-verification or gaze.
    #[arg(long, env = "PROCTOR_KIND")]
    kind: ServiceKind,

    /// Address to bind.
    #[arg(long, env = "PROCTOR_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to bind (default: 5000 gaze, 5001 ai-detection, 5002 face-verification).
    #[arg(long, env = "PROCTOR_PORT")]
    port: Option<u16>,

    /// Engine instances, one per worker (default: available cores, at most 4).
    #[arg(long, env = "PROCTOR_WORKERS")]
    workers: Option<usize>,

    /// Seconds a request may wait for a free engine.
    #[arg(long, env = "PROCTOR_POOL_TIMEOUT_SECS", default_value_t = DEFAULT_POOL_TIMEOUT_SECS)]
    pool_timeout_secs: u64,

    /// Seconds a request may wait for its analysis result.
    #[arg(long, env = "PROCTOR_JOB_TIMEOUT_SECS", default_value_t = DEFAULT_JOB_TIMEOUT_SECS)]
    job_timeout_secs: u64,

    /// Largest accepted request body in bytes.
    #[arg(long, env = "PROCTOR_MAX_BODY_BYTES", default_value_t = DEFAULT_MAX_BODY_BYTES)]
    max_body_bytes: usize,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long, env = "PROCTOR_CONFIDENCE", default_value_t = DEFAULT_CONFIDENCE)]
    confidence: f64,

    /// ONNX real/fake classifier (required for ai-detection).
    #[arg(long, env = "PROCTOR_CLASSIFIER_MODEL")]
    classifier_model: Option<PathBuf>,

    /// Directory searched for models before downloading them.
    #[arg(long, env = "PROCTOR_MODELS_DIR")]
    models_dir: Option<PathBuf>,

    /// Minimum cosine similarity for an identity match.
    #[arg(long, env = "PROCTOR_MATCH_THRESHOLD", default_value_t = DEFAULT_MATCH_THRESHOLD)]
    match_threshold: f64,

    /// Cosine similarity reported as a high-confidence match.
    #[arg(long, env = "PROCTOR_STRONG_MATCH_THRESHOLD", default_value_t = DEFAULT_STRONG_MATCH_THRESHOLD)]
    strong_match_threshold: f64,

    /// Horizontal gaze ratio at or below which the subject looks right.
    #[arg(long, env = "PROCTOR_GAZE_RIGHT_THRESHOLD", default_value_t = DEFAULT_RIGHT_THRESHOLD)]
    gaze_right_threshold: f64,

    /// Horizontal gaze ratio at or above which the subject looks left.
    #[arg(long, env = "PROCTOR_GAZE_LEFT_THRESHOLD", default_value_t = DEFAULT_LEFT_THRESHOLD)]
    gaze_left_threshold: f64,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let workers = cli.workers.unwrap_or_else(default_workers);
    let port = cli.port.unwrap_or_else(|| cli.kind.default_port());
    let addr: SocketAddr = format!("{}:{port}", cli.host)
        .parse()
        .map_err(|e| format!("Invalid bind address {}:{port}: {e}", cli.host))?;

    // Model downloads block, so everything up to the runtime runs on the main thread.
    let models = engines::resolve_models(cli.kind, cli.models_dir.clone(), cli.classifier_model.as_deref())?;
    let settings = EngineSettings {
        kind: cli.kind,
        detector_model: models.detector,
        embedding_model: models.embedding,
        classifier_model: models.classifier,
        confidence: cli.confidence,
        intra_threads: intra_threads(workers),
        policy: VerificationPolicy::new(cli.match_threshold, cli.strong_match_threshold),
        gaze: GazeEstimator::new(cli.gaze_right_threshold, cli.gaze_left_threshold),
    };

    let config = ServiceConfig {
        pool_timeout: Duration::from_secs(cli.pool_timeout_secs),
        job_timeout: Duration::from_secs(cli.job_timeout_secs),
        ..ServiceConfig::new(cli.kind, workers)
    };
    log::info!("Loading {workers} {} engines", cli.kind);
    let service = AnalysisService::start(config, |index, registry| {
        log::debug!("Building engine {index}");
        engines::build_engine(&settings, registry)
    })?;

    let state = Arc::new(AppState {
        service: Arc::new(service),
        max_body_bytes: cli.max_body_bytes,
    });

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        log::info!("{} listening on http://{addr}", cli.kind.display_name());
        server::serve(listener, state, shutdown_signal(), SHUTDOWN_GRACE).await
    })?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .clamp(1, MAX_DEFAULT_WORKERS)
}

/// Splits the machine's cores between engines.
fn intra_threads(workers: usize) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (cores / workers.max(1)).max(1)
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if cli.workers == Some(0) {
        return Err("Workers must be at least 1".into());
    }
    if cli.pool_timeout_secs == 0 {
        return Err("Pool timeout must be at least 1 second".into());
    }
    if cli.job_timeout_secs == 0 {
        return Err("Job timeout must be at least 1 second".into());
    }
    if cli.max_body_bytes == 0 {
        return Err("Max body size must be positive".into());
    }
    if !(0.0..=1.0).contains(&cli.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            cli.confidence
        )
        .into());
    }
    if !(-1.0..=1.0).contains(&cli.match_threshold) {
        return Err(format!(
            "Match threshold must be between -1.0 and 1.0, got {}",
            cli.match_threshold
        )
        .into());
    }
    if cli.strong_match_threshold < cli.match_threshold {
        return Err(format!(
            "Strong match threshold ({}) must not be below the match threshold ({})",
            cli.strong_match_threshold, cli.match_threshold
        )
        .into());
    }
    if !(0.0..1.0).contains(&cli.gaze_right_threshold)
        || !(0.0..=1.0).contains(&cli.gaze_left_threshold)
        || cli.gaze_right_threshold >= cli.gaze_left_threshold
    {
        return Err(format!(
            "Gaze thresholds must satisfy 0 <= right < left <= 1, got right {} left {}",
            cli.gaze_right_threshold, cli.gaze_left_threshold
        )
        .into());
    }
    Ok(())
}
