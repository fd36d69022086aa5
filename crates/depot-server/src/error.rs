use axum::extract::multipart::MultipartError;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use depot_service::ServiceError;
use depot_types::ValidationError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Errors raised while configuring or starting the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store error: {0}")]
    Store(#[from] depot_store::StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

/// Errors returned from request handlers, rendered as
/// `{"error": <kind>, "message": ...}` with a matching status.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    /// Malformed JSON, query string, or multipart body.
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Invalid(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Service(ServiceError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Service(ServiceError::Conflict(_)) => StatusCode::CONFLICT,
            Self::Service(ServiceError::CreationFailed { .. }) => StatusCode::BAD_REQUEST,
            Self::Service(ServiceError::Storage(_)) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Invalid(_) => "validation_failed",
            Self::BadRequest(_) => "bad_request",
            Self::PayloadTooLarge(_) => "payload_too_large",
            Self::Service(ServiceError::NotFound(_)) => "not_found",
            Self::Service(ServiceError::Conflict(_)) => "conflict",
            Self::Service(ServiceError::CreationFailed { .. }) => "creation_failed",
            Self::Service(ServiceError::Storage(_)) | Self::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }

        let body = match &self {
            Self::Invalid(v) => json!({
                "error": self.kind(),
                "message": self.to_string(),
                "violations": v.violations,
            }),
            Self::Service(ServiceError::Storage(_)) | Self::Internal(_) => json!({
                "error": self.kind(),
                "message": "internal server error",
            }),
            _ => json!({ "error": self.kind(), "message": self.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::PayloadTooLarge(e.body_text())
        } else {
            Self::BadRequest(e.body_text())
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use depot_service::NotFound;
    use depot_store::StoreError;
    use depot_types::{FieldViolation, Version};

    use super::*;

    #[test]
    fn service_errors_map_to_statuses() {
        let not_found = ApiError::from(ServiceError::from(NotFound::package("o", "r")));
        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        assert_eq!(not_found.kind(), "not_found");

        let failed = ApiError::from(ServiceError::CreationFailed {
            version: Box::new(Version::new("o", "r", "1", "n", "f")),
            source: NotFound::package("o", "r"),
        });
        assert_eq!(failed.status(), StatusCode::BAD_REQUEST);

        let storage = ApiError::from(ServiceError::from(StoreError::LockPoisoned));
        assert_eq!(storage.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn validation_is_bad_request() {
        let err = ApiError::from(ValidationError {
            violations: vec![FieldViolation::new("name", "must not be blank")],
        });
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
