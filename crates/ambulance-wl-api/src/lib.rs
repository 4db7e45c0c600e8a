use ambulance_wl_storage::StorageError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JSON body of every error response: `{status, message, error?}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorPayload {
    pub status: u16,
    pub message: String,
    /// Underlying cause, when there is one worth reporting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ErrorPayload {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status: status.as_u16(),
            message: message.into(),
            error: None,
        }
    }
}

/// High-level API errors to be mapped to HTTP responses.
///
/// - `BadRequest`: malformed or missing input (400)
/// - `NotFound`: ambulance or entry absent (404)
/// - `Conflict`: duplicate entry id or patient (409)
/// - `Internal`: store fetch/replace failure (500)
/// - `ServiceUnavailable`: backend not reachable (503)
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Bad request: {message}")]
    BadRequest {
        message: String,
        detail: Option<String>,
    },
    #[error("Not found: {message}")]
    NotFound {
        message: String,
        detail: Option<String>,
    },
    #[error("Conflict: {message}")]
    Conflict {
        message: String,
        detail: Option<String>,
    },
    #[error("Internal server error: {message}")]
    Internal {
        message: String,
        detail: Option<String>,
    },
    #[error("Service unavailable: {message}")]
    ServiceUnavailable {
        message: String,
        detail: Option<String>,
    },
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest {
            message: msg.into(),
            detail: None,
        }
    }
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound {
            message: msg.into(),
            detail: None,
        }
    }
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict {
            message: msg.into(),
            detail: None,
        }
    }
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
            detail: None,
        }
    }
    pub fn service_unavailable(msg: impl Into<String>) -> Self {
        Self::ServiceUnavailable {
            message: msg.into(),
            detail: None,
        }
    }

    /// Attaches the underlying cause, reported as the payload's `error` field.
    #[must_use]
    pub fn with_detail(mut self, cause: impl ToString) -> Self {
        let slot = match &mut self {
            Self::BadRequest { detail, .. }
            | Self::NotFound { detail, .. }
            | Self::Conflict { detail, .. }
            | Self::Internal { detail, .. }
            | Self::ServiceUnavailable { detail, .. } => detail,
        };
        *slot = Some(cause.to_string());
        self
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest { message, .. }
            | Self::NotFound { message, .. }
            | Self::Conflict { message, .. }
            | Self::Internal { message, .. }
            | Self::ServiceUnavailable { message, .. } => message,
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::BadRequest { detail, .. }
            | Self::NotFound { detail, .. }
            | Self::Conflict { detail, .. }
            | Self::Internal { detail, .. }
            | Self::ServiceUnavailable { detail, .. } => detail.as_deref(),
        }
    }

    pub fn to_payload(&self) -> ErrorPayload {
        ErrorPayload {
            status: self.status_code().as_u16(),
            message: self.message().to_string(),
            error: self.detail().map(str::to_string),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        let api_error = match &err {
            StorageError::NotFound { .. } => ApiError::not_found("Ambulance not found"),
            StorageError::AlreadyExists { .. } => ApiError::conflict("Ambulance already exists"),
            StorageError::ConnectionError { .. } => {
                ApiError::service_unavailable("Storage backend unavailable")
            }
            StorageError::VersionConflict { .. }
            | StorageError::InvalidDocument { .. }
            | StorageError::Internal { .. } => ApiError::internal("Storage failure"),
        };
        api_error.with_detail(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.to_payload())).into_response()
    }
}
