use std::path::{Path, PathBuf};
use std::sync::Arc;

use proctor_core::analysis::domain::gaze_estimator::GazeEstimator;
use proctor_core::analysis::domain::verification_policy::VerificationPolicy;
use proctor_core::analysis::infrastructure::ai_detection_analyzer::AiDetectionAnalyzer;
use proctor_core::analysis::infrastructure::face_verification_analyzer::FaceVerificationAnalyzer;
use proctor_core::analysis::infrastructure::gaze_analyzer::GazeAnalyzer;
use proctor_core::detection::domain::face_detector::FaceDetector;
use proctor_core::detection::infrastructure::arcface_embedder::ArcFaceEmbedder;
use proctor_core::detection::infrastructure::authenticity_classifier::AuthenticityClassifier;
use proctor_core::detection::infrastructure::onnx_yolo_detector::OnnxYoloDetector;
use proctor_core::dispatch::dispatcher::Engine;
use proctor_core::registry::student_registry::StudentRegistry;
use proctor_core::service::service_kind::ServiceKind;
use proctor_core::shared::constants::{
    EMBEDDING_MODEL_NAME, EMBEDDING_MODEL_URL, YOLO_MODEL_NAME, YOLO_MODEL_URL,
};
use proctor_core::shared::model_resolver::ModelResolver;

/// Resolved model paths and tuning shared by every engine of a service.
pub struct EngineSettings {
    pub kind: ServiceKind,
    pub detector_model: PathBuf,
    pub embedding_model: Option<PathBuf>,
    pub classifier_model: Option<PathBuf>,
    pub confidence: f64,
    pub intra_threads: usize,
    pub policy: VerificationPolicy,
    pub gaze: GazeEstimator,
}

/// Model locations for a service kind. Only the ones the kind needs are filled in.
#[derive(Debug)]
pub struct ModelPaths {
    pub detector: PathBuf,
    pub embedding: Option<PathBuf>,
    pub classifier: Option<PathBuf>,
}

/// Resolves the models `kind` needs, downloading missing ones into the cache.
///
/// Must run outside the async runtime: downloads use a blocking client.
pub fn resolve_models(
    kind: ServiceKind,
    models_dir: Option<PathBuf>,
    classifier_model: Option<&Path>,
) -> Result<ModelPaths, Box<dyn std::error::Error>> {
    let resolver = ModelResolver::with_default_cache(models_dir)?;
    log::info!("Resolving model: {YOLO_MODEL_NAME}");
    let detector = resolver.resolve(YOLO_MODEL_NAME, YOLO_MODEL_URL)?;

    let embedding = match kind {
        ServiceKind::FaceVerification => {
            log::info!("Resolving model: {EMBEDDING_MODEL_NAME}");
            Some(resolver.resolve(EMBEDDING_MODEL_NAME, EMBEDDING_MODEL_URL)?)
        }
        _ => None,
    };

    let classifier = match kind {
        ServiceKind::AiDetection => {
            let path = classifier_model
                .ok_or("--classifier-model is required for the ai-detection service")?;
            if !path.exists() {
                return Err(format!("Classifier model not found: {}", path.display()).into());
            }
            Some(path.to_path_buf())
        }
        _ => None,
    };

    Ok(ModelPaths {
        detector,
        embedding,
        classifier,
    })
}

/// Builds one engine. Called once per worker at startup.
pub fn build_engine(
    settings: &EngineSettings,
    registry: &Arc<StudentRegistry>,
) -> Result<Engine, Box<dyn std::error::Error>> {
    let detector: Box<dyn FaceDetector> = Box::new(OnnxYoloDetector::new(
        &settings.detector_model,
        settings.confidence,
        settings.intra_threads,
    )?);

    let engine: Engine = match settings.kind {
        ServiceKind::AiDetection => {
            let model = required(&settings.classifier_model, "classifier")?;
            let classifier = AuthenticityClassifier::new(model, settings.intra_threads)?;
            Box::new(AiDetectionAnalyzer::new(detector, Box::new(classifier)))
        }
        ServiceKind::FaceVerification => {
            let model = required(&settings.embedding_model, "embedding")?;
            let embedder = ArcFaceEmbedder::new(model, settings.intra_threads)?;
            Box::new(FaceVerificationAnalyzer::new(
                detector,
                Box::new(embedder),
                Arc::clone(registry),
                settings.policy,
            ))
        }
        ServiceKind::Gaze => Box::new(GazeAnalyzer::new(detector, settings.gaze)),
    };
    Ok(engine)
}

fn required<'a>(path: &'a Option<PathBuf>, what: &str) -> Result<&'a Path, Box<dyn std::error::Error>> {
    path.as_deref()
        .ok_or_else(|| format!("No {what} model configured").into())
}
