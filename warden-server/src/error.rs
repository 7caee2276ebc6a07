//! Error types for the warden server.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// Errors that can occur when building a router.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// No endpoints were configured.
    #[error("No endpoints configured. Call .with_tools() or .with_activity() before .build()")]
    NoEndpoints,
}

/// Errors that can occur in the warden server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Error from the authorization core.
    #[error("Gateway error: {0}")]
    Gateway(#[from] warden_core::Error),

    /// The request did not carry a usable credential.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Invalid request from client.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    fn status(&self) -> StatusCode {
        match self {
            ServerError::Gateway(e) => match e {
                warden_core::Error::Forbidden { .. } => StatusCode::FORBIDDEN,
                warden_core::Error::NotFound { .. } => StatusCode::NOT_FOUND,
                warden_core::Error::AmbiguousInput(_) | warden_core::Error::UnknownTool(_) => {
                    StatusCode::BAD_REQUEST
                }
                warden_core::Error::StepUpDenied { .. } => StatusCode::FORBIDDEN,
                warden_core::Error::StepUpExpired | warden_core::Error::StepUpTimeout => {
                    StatusCode::GONE
                }
                warden_core::Error::ExternalApi { .. } => StatusCode::BAD_GATEWAY,
                warden_core::Error::Store(_)
                | warden_core::Error::Config(_)
                | warden_core::Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ServerError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ServerError::Gateway(e) => e.user_message(),
            ServerError::Unauthorized(e) => e.clone(),
            ServerError::InvalidRequest(e) => e.clone(),
            ServerError::Internal(e) => e.clone(),
        };

        let body = Json(serde_json::json!({
            "error": message,
            "code": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

/// Result type alias for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
