use http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum OciLogsError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid credential for profile {profile}: {reason}")]
    InvalidCredential { profile: String, reason: String },

    #[error("Unknown environment: {0}")]
    UnknownEnvironment(String),

    #[error("Client construction failed: {0}")]
    ClientConstruction(String),

    #[error("Connectivity check failed with status {status}: {body}")]
    Connectivity { status: u16, body: String },

    #[error("Pagination truncated after {pages} pages during {operation}")]
    PaginationTruncated { operation: String, pages: usize },

    #[error("{operation} failed ({params}): {message}")]
    RemoteCall {
        operation: String,
        params: String,
        message: String,
    },

    #[error("Request cancelled during {0}")]
    Cancelled(String),

    #[error("Tenancy not found: {0}")]
    TenancyNotFound(String),

    #[error("Invalid time range: {0}")]
    InvalidTimeRange(String),

    #[error("JSON error: {0}")]
    Json(String),
}

pub type Result<T> = std::result::Result<T, OciLogsError>;

impl From<serde_json::Error> for OciLogsError {
    fn from(e: serde_json::Error) -> Self {
        OciLogsError::Json(e.to_string())
    }
}

impl OciLogsError {
    /// Wrap a failed remote call with the operation name and the key
    /// parameters it was issued with.
    pub fn remote(operation: &str, params: impl Into<String>, message: impl ToString) -> Self {
        OciLogsError::RemoteCall {
            operation: operation.to_string(),
            params: params.into(),
            message: message.to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            OciLogsError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            OciLogsError::InvalidCredential { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            OciLogsError::UnknownEnvironment(_) => StatusCode::INTERNAL_SERVER_ERROR,
            OciLogsError::ClientConstruction(_) => StatusCode::BAD_GATEWAY,
            OciLogsError::Connectivity { .. } => StatusCode::BAD_GATEWAY,
            OciLogsError::PaginationTruncated { .. } => StatusCode::OK,
            OciLogsError::RemoteCall { .. } => StatusCode::BAD_GATEWAY,
            OciLogsError::Cancelled(_) => StatusCode::REQUEST_TIMEOUT,
            OciLogsError::TenancyNotFound(_) => StatusCode::NOT_FOUND,
            OciLogsError::InvalidTimeRange(_) => StatusCode::BAD_REQUEST,
            OciLogsError::Json(_) => StatusCode::BAD_REQUEST,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            OciLogsError::Config(_) => "config_error",
            OciLogsError::InvalidCredential { .. } => "invalid_credential",
            OciLogsError::UnknownEnvironment(_) => "unknown_environment",
            OciLogsError::ClientConstruction(_) => "client_construction_error",
            OciLogsError::Connectivity { .. } => "connectivity_error",
            OciLogsError::PaginationTruncated { .. } => "pagination_truncated",
            OciLogsError::RemoteCall { .. } => "remote_call_error",
            OciLogsError::Cancelled(_) => "cancelled",
            OciLogsError::TenancyNotFound(_) => "tenancy_not_found",
            OciLogsError::InvalidTimeRange(_) => "invalid_time_range",
            OciLogsError::Json(_) => "json_error",
        }
    }
}

// Axum IntoResponse implementation (feature-gated)
#[cfg(feature = "axum-support")]
use axum::response::{IntoResponse, Json, Response};
#[cfg(feature = "axum-support")]
use serde::Serialize;

#[cfg(feature = "axum-support")]
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub request_id: String,
}

#[cfg(feature = "axum-support")]
impl IntoResponse for OciLogsError {
    fn into_response(self) -> Response {
        let error_response = ErrorResponse {
            error: self.code().to_string(),
            message: self.to_string(),
            request_id: format!("req_ol_{}", uuid::Uuid::new_v4()),
        };
        (self.status_code(), Json(error_response)).into_response()
    }
}
