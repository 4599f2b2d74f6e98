//! Request routing and JSON handlers.
//!
//! Handlers are generic over the request body so they can be driven by
//! in-memory bodies as well as live connections.

use std::sync::Arc;

use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use hyper::{Method, Request, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use proctor_core::service::analysis_service::AnalysisService;
use proctor_core::service::report::MessageReport;

use crate::error::ApiError;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared per-process request context.
pub struct AppState {
    pub service: Arc<AnalysisService>,
    pub max_body_bytes: usize,
}

#[derive(Deserialize)]
struct AnalyzeRequest {
    #[serde(rename = "studentId")]
    student_id: Option<Value>,
    #[serde(rename = "frameData")]
    frame_data: Option<String>,
}

#[derive(Deserialize)]
struct RegisterRequest {
    #[serde(rename = "studentId")]
    student_id: Option<Value>,
    #[serde(rename = "studentName")]
    student_name: Option<String>,
    #[serde(rename = "referenceImage")]
    reference_image: Option<String>,
}

pub async fn route<B>(req: Request<B>, state: Arc<AppState>) -> Response<Full<Bytes>>
where
    B: Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    match dispatch(req, &state, &method, &path).await {
        Ok(response) => response,
        Err(error) => {
            if error.status_code().is_server_error() {
                log::error!("{method} {path} failed: {error}");
            } else {
                log::debug!("{method} {path} rejected: {error}");
            }
            error.into()
        }
    }
}

async fn dispatch<B>(
    req: Request<B>,
    state: &Arc<AppState>,
    method: &Method,
    path: &str,
) -> Result<Response<Full<Bytes>>, ApiError>
where
    B: Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    let with_registry = state.service.kind().uses_registry();
    let segments: Vec<&str> = path.trim_end_matches('/').split('/').collect();

    match (method, segments.as_slice()) {
        (&Method::POST, ["", "analyze"]) => analyze(req, state).await,
        (&Method::GET, ["", "health"]) => Ok(json_response(StatusCode::OK, &state.service.health())),
        (&Method::GET, ["", "stats"]) => Ok(json_response(StatusCode::OK, &state.service.stats())),
        (&Method::POST, ["", "register"]) if with_registry => register(req, state).await,
        (&Method::GET, ["", "students"]) if with_registry => {
            Ok(json_response(StatusCode::OK, &state.service.students()?))
        }
        (&Method::DELETE, ["", "students"]) if with_registry => {
            let removed = state.service.clear_students()?;
            Ok(message(format!("Removed {removed} students")))
        }
        (&Method::DELETE, ["", "students", student_id]) if with_registry => {
            let name = state.service.remove_student(student_id)?;
            Ok(message(format!("Student {name} removed")))
        }
        (&Method::OPTIONS, segments) if is_known_path(segments, with_registry) => Ok(preflight()),
        (_, segments) if is_known_path(segments, with_registry) => Err(ApiError::MethodNotAllowed {
            method: method.to_string(),
            path: path.to_string(),
        }),
        _ => Err(ApiError::NotFound(format!("No route for {path}"))),
    }
}

fn is_known_path(segments: &[&str], with_registry: bool) -> bool {
    match segments {
        ["", "analyze"] | ["", "health"] | ["", "stats"] => true,
        ["", "register"] | ["", "students"] | ["", "students", _] => with_registry,
        _ => false,
    }
}

async fn analyze<B>(req: Request<B>, state: &Arc<AppState>) -> Result<Response<Full<Bytes>>, ApiError>
where
    B: Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    let body: AnalyzeRequest = read_json(req, state.max_body_bytes).await?;
    let (Some(student_id), Some(frame_data)) = (student_id(body.student_id), body.frame_data) else {
        return Err(ApiError::BadRequest("Missing studentId or frameData".into()));
    };

    let service = Arc::clone(&state.service);
    let report = tokio::task::spawn_blocking(move || service.analyze(&student_id, &frame_data))
        .await
        .map_err(|e| ApiError::Internal(format!("Analysis task failed: {e}")))??;
    Ok(json_response(StatusCode::OK, &report))
}

async fn register<B>(req: Request<B>, state: &Arc<AppState>) -> Result<Response<Full<Bytes>>, ApiError>
where
    B: Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    let body: RegisterRequest = read_json(req, state.max_body_bytes).await?;
    let (Some(student_id), Some(image)) = (student_id(body.student_id), body.reference_image) else {
        return Err(ApiError::BadRequest("Missing studentId or referenceImage".into()));
    };

    let service = Arc::clone(&state.service);
    let name = body.student_name;
    let report = tokio::task::spawn_blocking(move || service.register(&student_id, name.as_deref(), &image))
        .await
        .map_err(|e| ApiError::Internal(format!("Registration task failed: {e}")))??;
    Ok(json_response(StatusCode::OK, &report))
}

/// Accepts string or numeric student ids.
fn student_id(value: Option<Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Reads and parses a JSON body no larger than `limit` bytes.
///
/// A declared Content-Length over the limit is rejected before any of the
/// body is read.
async fn read_json<B, T>(req: Request<B>, limit: usize) -> Result<T, ApiError>
where
    B: Body,
    B::Error: Into<BoxError>,
    T: DeserializeOwned,
{
    let declared = req
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    if declared.is_some_and(|len| len > limit as u64) {
        return Err(ApiError::PayloadTooLarge { limit });
    }

    let bytes = Limited::new(req.into_body(), limit)
        .collect()
        .await
        .map_err(|e| {
            if e.downcast_ref::<LengthLimitError>().is_some() {
                ApiError::PayloadTooLarge { limit }
            } else {
                ApiError::BadRequest(format!("Failed to read request body: {e}"))
            }
        })?
        .to_bytes();

    if bytes.is_empty() {
        return Err(ApiError::BadRequest("No JSON data provided".into()));
    }
    serde_json::from_slice(&bytes).map_err(|e| ApiError::BadRequest(format!("Invalid JSON: {e}")))
}

fn message(text: String) -> Response<Full<Bytes>> {
    json_response(
        StatusCode::OK,
        &MessageReport {
            success: true,
            message: text,
        },
    )
}

fn preflight() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::NO_CONTENT;
    let headers = response.headers_mut();
    headers.insert("access-control-allow-origin", HeaderValue::from_static("*"));
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static("GET, POST, DELETE, OPTIONS"),
    );
    headers.insert("access-control-allow-headers", HeaderValue::from_static("content-type"));
    response
}

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let (status, bytes) = match serde_json::to_vec(body) {
        Ok(bytes) => (status, bytes),
        Err(e) => {
            log::error!("Failed to serialize response: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                br#"{"success":false,"error":"Failed to serialize response"}"#.to_vec(),
            )
        }
    };

    let mut response = Response::new(Full::new(Bytes::from(bytes)));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert("access-control-allow-origin", HeaderValue::from_static("*"));
    response
}
