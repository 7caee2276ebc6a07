//! Error types for the identity platform SDK

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// API Error Types
// ============================================================================

/// Error body returned by the platform APIs
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiErrorBody {
    fn text(&self) -> String {
        match (&self.error, &self.message) {
            (Some(error), Some(message)) => format!("{}: {}", error, message),
            (Some(error), None) => error.clone(),
            (None, Some(message)) => message.clone(),
            (None, None) => String::new(),
        }
    }
}

// ============================================================================
// SDK Error Types
// ============================================================================

/// Errors that can occur when calling the identity platform
#[derive(Debug, Error)]
pub enum IdpError {
    /// Authentication failed (invalid or expired credential)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Rate limited by the API
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Service unavailable or overloaded
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Invalid request (bad parameters, missing tuple, etc.)
    #[error("Invalid request ({status}): {message}")]
    InvalidRequest { status: u16, message: String },

    /// Invalid response (failed to parse API response)
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Network error
    #[error("Network error: {0}")]
    Network(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error (missing base URL, bad credential format)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Other/unknown error
    #[error("HTTP {status}: {message}")]
    Api { status: u16, message: String },
}

impl IdpError {
    /// Returns true if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            IdpError::RateLimited(_) | IdpError::ServiceUnavailable(_) | IdpError::Network(_)
        )
    }

    /// Returns true if this error is retryable based on HTTP status code
    pub fn is_retryable_status(status_code: u16) -> bool {
        matches!(status_code, 408 | 409 | 429 | 500..=599)
    }

    /// The HTTP status this error carries, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            IdpError::InvalidRequest { status, .. } | IdpError::Api { status, .. } => Some(*status),
            IdpError::Authentication(_) => Some(401),
            IdpError::RateLimited(_) => Some(429),
            IdpError::ServiceUnavailable(_) => Some(503),
            _ => None,
        }
    }

    /// Classify an error response body and status into an error variant
    pub fn from_response(body: &str, status_code: u16) -> Self {
        let msg = serde_json::from_str::<ApiErrorBody>(body)
            .map(|b| b.text())
            .ok()
            .filter(|text| !text.is_empty())
            .unwrap_or_else(|| {
                if body.is_empty() {
                    format!("HTTP {}", status_code)
                } else {
                    body.to_string()
                }
            });

        match status_code {
            401 | 403 => IdpError::Authentication(msg),
            429 => IdpError::RateLimited(msg),
            500..=599 => IdpError::ServiceUnavailable(msg),
            400 | 404 | 409 | 422 => IdpError::InvalidRequest {
                status: status_code,
                message: msg,
            },
            _ => IdpError::Api {
                status: status_code,
                message: msg,
            },
        }
    }

    /// Classify an HTTP transport error into an error variant
    pub fn from_reqwest_error(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            IdpError::Network(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            IdpError::Network(format!("Connection failed: {}", err))
        } else if err.is_request() {
            IdpError::Network(format!("Request failed: {}", err))
        } else {
            IdpError::Network(err.to_string())
        }
    }
}

/// Configuration for automatic retry behavior
///
/// Exponential backoff with jitter, capped, honoring the server's
/// `Retry-After` header when present.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 2)
    pub max_retries: u32,

    /// Base delay for exponential backoff (default: 500ms)
    pub base_delay: Duration,

    /// Maximum delay between retries (default: 8s)
    pub max_delay: Duration,

    /// Jitter factor (0.0-1.0) to add randomness to delays (default: 0.25)
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            jitter: 0.25,
        }
    }
}

impl RetryConfig {
    /// Create a new retry config with the specified max retries
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Disable retries
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Calculate the delay for a given retry attempt (0-indexed)
    pub(crate) fn delay_for_attempt(&self, attempt: u32) -> Duration {
        use rand::Rng;

        let base = self.base_delay.as_secs_f64() * 2_f64.powi(attempt as i32);
        let jitter_range = base * self.jitter;
        let jitter = if jitter_range > 0.0 {
            rand::thread_rng().gen_range(-jitter_range..=jitter_range)
        } else {
            0.0
        };
        let delay_secs = (base + jitter).max(0.0);

        Duration::from_secs_f64(delay_secs).min(self.max_delay)
    }

    /// Parse a retry delay from the standard `Retry-After` header
    pub(crate) fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
        let value = headers.get(reqwest::header::RETRY_AFTER)?;
        let s = value.to_str().ok()?;
        // Seconds form only; HTTP dates are not used by these APIs
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ===== Classification Tests =====

    #[test]
    fn test_from_response_authentication() {
        let err = IdpError::from_response(r#"{"error":"invalid_token"}"#, 401);
        assert!(matches!(err, IdpError::Authentication(_)));
        assert_eq!(err.status(), Some(401));
    }

    #[test]
    fn test_from_response_rate_limited() {
        let err = IdpError::from_response(r#"{"message":"too many requests"}"#, 429);
        assert!(matches!(err, IdpError::RateLimited(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_from_response_server_error() {
        let err = IdpError::from_response("", 503);
        assert!(matches!(err, IdpError::ServiceUnavailable(_)));
        assert!(err.to_string().contains("HTTP 503"));
    }

    #[test]
    fn test_from_response_invalid_request_carries_status() {
        let err = IdpError::from_response(r#"{"error":"tuple not found"}"#, 400);
        match err {
            IdpError::InvalidRequest { status, message } => {
                assert_eq!(status, 400);
                assert!(message.contains("tuple not found"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_from_response_plain_text_body() {
        let err = IdpError::from_response("gateway exploded", 418);
        assert!(err.to_string().contains("gateway exploded"));
    }

    #[test]
    fn test_error_body_combines_fields() {
        let body: ApiErrorBody =
            serde_json::from_str(r#"{"error":"conflict","message":"already a member"}"#).unwrap();
        assert_eq!(body.text(), "conflict: already a member");
    }

    // ===== Retryability Tests =====

    #[test]
    fn test_is_retryable() {
        assert!(IdpError::RateLimited("x".into()).is_retryable());
        assert!(IdpError::ServiceUnavailable("x".into()).is_retryable());
        assert!(IdpError::Network("x".into()).is_retryable());

        assert!(!IdpError::Authentication("x".into()).is_retryable());
        assert!(!IdpError::Configuration("x".into()).is_retryable());
        assert!(!IdpError::InvalidRequest {
            status: 400,
            message: "x".into()
        }
        .is_retryable());
    }

    #[test]
    fn test_is_retryable_status() {
        assert!(IdpError::is_retryable_status(408));
        assert!(IdpError::is_retryable_status(429));
        assert!(IdpError::is_retryable_status(500));
        assert!(IdpError::is_retryable_status(503));

        assert!(!IdpError::is_retryable_status(400));
        assert!(!IdpError::is_retryable_status(401));
        assert!(!IdpError::is_retryable_status(404));
    }

    // ===== RetryConfig Tests =====

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.base_delay, Duration::from_millis(500));
    }

    #[test]
    fn test_retry_delay_exponential_without_jitter() {
        let config = RetryConfig {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            jitter: 0.0,
        };

        assert_eq!(config.delay_for_attempt(0), Duration::from_millis(500));
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(1000));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(2000));
    }

    #[test]
    fn test_retry_delay_is_capped() {
        let config = RetryConfig {
            max_retries: 10,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            jitter: 0.0,
        };
        assert_eq!(config.delay_for_attempt(6), Duration::from_secs(5));
    }

    #[test]
    fn test_parse_retry_after_seconds() {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::RETRY_AFTER,
            reqwest::header::HeaderValue::from_static("30"),
        );
        assert_eq!(
            RetryConfig::parse_retry_after(&headers),
            Some(Duration::from_secs(30))
        );
    }

    #[test]
    fn test_parse_retry_after_absent() {
        let headers = reqwest::header::HeaderMap::new();
        assert_eq!(RetryConfig::parse_retry_after(&headers), None);
    }
}
