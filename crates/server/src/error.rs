//! HTTP error mapping.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use thiserror::Error;

use proctor_core::registry::student_registry::RegistryError;
use proctor_core::service::analysis_service::ServiceError;
use proctor_core::service::report::ErrorReport;

use crate::routes::json_response;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Method {method} not allowed on {path}")]
    MethodNotAllowed { method: String, path: String },
    #[error("Request body exceeds the {limit} byte limit")]
    PayloadTooLarge { limit: usize },
    #[error("{0}")]
    ServiceUnavailable(String),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(error: ServiceError) -> Self {
        let message = error.to_string();
        match error {
            ServiceError::PoolTimeout | ServiceError::AnalysisTimeout => {
                ApiError::ServiceUnavailable(message)
            }
            ServiceError::Engine(_) => ApiError::Internal(message),
            ServiceError::Registry(RegistryError::NotFound(_)) => ApiError::NotFound(message),
            ServiceError::Validation(_)
            | ServiceError::MissingField(_)
            | ServiceError::NoFaceInReference
            | ServiceError::RegistryUnsupported(_)
            | ServiceError::Registry(RegistryError::EmptyId) => ApiError::BadRequest(message),
        }
    }
}

impl From<ApiError> for Response<Full<Bytes>> {
    fn from(error: ApiError) -> Self {
        json_response(error.status_code(), &ErrorReport::new(error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proctor_core::validation::frame_validator::ValidationError;
    use rstest::rstest;

    #[rstest]
    #[case(ServiceError::PoolTimeout, StatusCode::SERVICE_UNAVAILABLE)]
    #[case(ServiceError::AnalysisTimeout, StatusCode::SERVICE_UNAVAILABLE)]
    #[case(ServiceError::Engine("boom".into()), StatusCode::INTERNAL_SERVER_ERROR)]
    #[case(ServiceError::MissingField("studentId"), StatusCode::BAD_REQUEST)]
    #[case(ServiceError::NoFaceInReference, StatusCode::BAD_REQUEST)]
    #[case(
        ServiceError::Validation(ValidationError::InvalidPadding),
        StatusCode::BAD_REQUEST
    )]
    #[case(
        ServiceError::Registry(RegistryError::NotFound("7".into())),
        StatusCode::NOT_FOUND
    )]
    fn test_service_error_status(#[case] error: ServiceError, #[case] status: StatusCode) {
        assert_eq!(ApiError::from(error).status_code(), status);
    }

    #[test]
    fn test_overload_message_mentions_overload() {
        let error = ApiError::from(ServiceError::PoolTimeout);
        assert!(error.to_string().contains("Service overloaded"));
    }
}
