//! Top-level error types for warden
//!
//! This module provides the flattened, user-facing error taxonomy for the
//! authorization pipeline. Authorization *decisions* never surface here -
//! a failed permission check is a denial, not an error - but everything the
//! gateway can report to its caller does.

use thiserror::Error;

use crate::gateway::DirectoryError;
use crate::rebac::{MutationError, StoreError};
use crate::stepup::{StepUpError, StepUpProviderError};
use crate::types::Permission;

/// Top-level error type for gateway operations
///
/// Categorized by how callers need to handle them:
///
/// - [`Error::Forbidden`] - the caller lacks the named capability
/// - [`Error::NotFound`] - an identifier did not resolve; nothing ran
/// - [`Error::AmbiguousInput`] - the request was underspecified; nothing ran
/// - [`Error::StepUpDenied`] / [`Error::StepUpExpired`] /
///   [`Error::StepUpTimeout`] - terminal step-up outcomes; start over with a
///   fresh challenge
/// - [`Error::ExternalApi`] - the management API rejected or failed the call
/// - [`Error::Store`] - the relationship store rejected or failed the call
/// - [`Error::Config`] - fix the component wiring
#[derive(Debug, Error)]
pub enum Error {
    /// The caller does not hold the permission required by the operation
    #[error("permission denied: missing {permission}")]
    Forbidden { permission: Permission },

    /// An identifier failed to resolve to a known user or operation
    #[error("not found: {identifier}")]
    NotFound { identifier: String },

    /// The request did not carry enough explicit information to act on
    #[error("ambiguous input: {0}")]
    AmbiguousInput(String),

    /// The tool name is not part of the gateway's fixed tool set
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// The subject declined the out-of-band approval
    #[error("approval declined{}", .reason.as_deref().map(|r| format!(": {}", r)).unwrap_or_default())]
    StepUpDenied { reason: Option<String> },

    /// The approval request expired before a decision
    #[error("approval request expired")]
    StepUpExpired,

    /// Polling ceilings were exceeded without a decision
    #[error("approval was not completed in time")]
    StepUpTimeout,

    /// The external management API failed
    #[error("external API error ({status}): {message}")]
    ExternalApi { status: u16, message: String },

    /// The relationship store failed
    #[error("relationship store error: {0}")]
    Store(String),

    /// Component wiring or configuration problem
    #[error("configuration error: {0}")]
    Config(String),

    /// Other error
    #[error("{0}")]
    Internal(String),
}

impl Error {
    /// Returns true if this is a permission denial
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Forbidden { .. })
    }

    /// Returns true if an identifier failed to resolve
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns true if the request was underspecified
    pub fn is_ambiguous_input(&self) -> bool {
        matches!(self, Self::AmbiguousInput(_))
    }

    /// Returns true for any terminal step-up failure
    ///
    /// These end the operation attempt; the caller must re-initiate with a
    /// fresh challenge rather than retry the same request id.
    pub fn is_step_up_failure(&self) -> bool {
        matches!(
            self,
            Self::StepUpDenied { .. } | Self::StepUpExpired | Self::StepUpTimeout
        )
    }

    /// Returns true if the external management API failed
    pub fn is_external_api(&self) -> bool {
        matches!(self, Self::ExternalApi { .. })
    }

    /// A message safe to show the end user.
    ///
    /// Denials name the missing capability; step-up outcomes describe the
    /// out-of-band approval without exposing provider request ids or tokens.
    pub fn user_message(&self) -> String {
        match self {
            Self::Forbidden { permission } => {
                format!(
                    "You don't have the '{}' permission required for this operation.",
                    permission
                )
            }
            Self::NotFound { identifier } => {
                format!("No user or operation matched '{}'.", identifier)
            }
            Self::AmbiguousInput(msg) => format!("The request was ambiguous: {}", msg),
            Self::UnknownTool(name) => format!("'{}' is not an available operation.", name),
            Self::StepUpDenied { .. } => {
                "The approval request was declined on your device.".to_string()
            }
            Self::StepUpExpired => {
                "The approval request expired before it was answered. Please try again.".to_string()
            }
            Self::StepUpTimeout => {
                "The approval was not completed in time. Please try again.".to_string()
            }
            Self::ExternalApi { message, .. } => {
                format!("The directory service reported an error: {}", message)
            }
            Self::Store(_) | Self::Config(_) | Self::Internal(_) => {
                "An internal error occurred while processing the request.".to_string()
            }
        }
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        Self::Store(err.to_string())
    }
}

impl From<MutationError> for Error {
    fn from(err: MutationError) -> Self {
        match err {
            MutationError::Store(e) => e.into(),
        }
    }
}

impl From<StepUpError> for Error {
    fn from(err: StepUpError) -> Self {
        match err {
            StepUpError::Denied { reason } => Self::StepUpDenied { reason },
            StepUpError::Expired => Self::StepUpExpired,
            StepUpError::Timeout => Self::StepUpTimeout,
            StepUpError::Provider(e) => e.into(),
        }
    }
}

impl From<StepUpProviderError> for Error {
    fn from(err: StepUpProviderError) -> Self {
        match err {
            StepUpProviderError::Transport(msg) => Self::Internal(msg),
            StepUpProviderError::Api { status, message } => Self::ExternalApi { status, message },
        }
    }
}

impl From<DirectoryError> for Error {
    fn from(err: DirectoryError) -> Self {
        Self::ExternalApi {
            status: err.status,
            message: err.message,
        }
    }
}

/// Result type for warden operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forbidden_names_the_capability() {
        let err = Error::Forbidden {
            permission: Permission::CanRemoveMember,
        };
        assert!(err.is_forbidden());
        assert!(err.user_message().contains("can_remove_member"));
    }

    #[test]
    fn test_step_up_failures_are_terminal_category() {
        assert!(Error::StepUpDenied { reason: None }.is_step_up_failure());
        assert!(Error::StepUpExpired.is_step_up_failure());
        assert!(Error::StepUpTimeout.is_step_up_failure());
        assert!(!Error::NotFound {
            identifier: "x".into()
        }
        .is_step_up_failure());
    }

    #[test]
    fn test_step_up_messages_hide_provider_internals() {
        let err: Error = StepUpError::Denied {
            reason: Some("req-12345 declined".to_string()),
        }
        .into();
        // The user-facing text must not echo provider request ids
        assert!(!err.user_message().contains("req-12345"));
    }

    #[test]
    fn test_from_step_up_error() {
        let err: Error = StepUpError::Expired.into();
        assert!(matches!(err, Error::StepUpExpired));

        let err: Error = StepUpError::Timeout.into();
        assert!(matches!(err, Error::StepUpTimeout));
    }

    #[test]
    fn test_from_directory_error() {
        let err: Error = DirectoryError {
            status: 409,
            message: "already a member".to_string(),
        }
        .into();
        assert!(err.is_external_api());
        assert!(err.to_string().contains("409"));
    }

    #[test]
    fn test_internal_errors_do_not_leak_details_to_users() {
        let err = Error::Store("tuple write rejected at shard 3".to_string());
        assert!(!err.user_message().contains("shard"));
    }
}
