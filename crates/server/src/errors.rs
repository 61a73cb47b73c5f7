use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::types::StatusBody;
use service::errors::{ErrorKind, ServiceError};
use thiserror::Error;
use tracing::{error, warn};

/// Handler failure rendered as `{"status":"error","message":...}`.
///
/// Validation, authentication and conflict errors keep HTTP 200 like every
/// other structured reply; storage faults are 500 and chat upstream faults 502.
#[derive(Debug)]
pub struct ApiError(pub ServiceError);

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        Self(e)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self.0.kind() {
            ErrorKind::Validation | ErrorKind::Authentication | ErrorKind::Conflict => StatusCode::OK,
            ErrorKind::Io => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::Upstream => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self.0.kind() {
            ErrorKind::Io | ErrorKind::Upstream => {
                let cause = std::error::Error::source(&self.0)
                    .map(|s| s.to_string())
                    .unwrap_or_default();
                error!(error = %self.0, %cause, "request failed");
            }
            ErrorKind::Authentication => warn!(error = %self.0, "request rejected"),
            _ => {}
        }
        (status, Json(StatusBody::error(self.0.message()))).into_response()
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("runtime check failed: {0}")]
    Runtime(String),
    #[error(transparent)]
    Any(#[from] anyhow::Error),
}
