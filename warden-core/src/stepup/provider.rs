//! Seam to the external out-of-band approval provider.

use async_trait::async_trait;
use std::time::Duration;

use crate::types::SubjectRef;

/// Errors from the step-up provider transport.
#[derive(Debug, thiserror::Error)]
pub enum StepUpProviderError {
    /// Network-level failure reaching the provider.
    #[error("Step-up transport error: {0}")]
    Transport(String),

    /// Provider rejected the request.
    #[error("Step-up provider error ({status}): {message}")]
    Api { status: u16, message: String },
}

/// Result of opening a challenge with the provider.
#[derive(Debug, Clone)]
pub struct ChallengeHandle {
    /// Provider-issued id for this challenge. Unique per initiate call.
    pub request_id: String,
    /// How long the provider will keep the challenge open.
    pub expires_in: Duration,
    /// Cadence the provider asks to be polled at.
    pub interval: Duration,
}

/// One poll outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollDecision {
    /// The subject approved out of band.
    Approved,
    /// No decision yet; poll again after the interval.
    Pending,
    /// No decision yet, and the provider wants a slower cadence.
    SlowDown,
    /// The subject explicitly declined.
    Denied { reason: Option<String> },
    /// The provider expired the challenge.
    Expired,
}

/// Trait for out-of-band approval backends.
///
/// The provider pushes a challenge to the subject's enrolled device and
/// reports the decision through polling. Challenge ids are single-use; a
/// fresh challenge is opened per sensitive operation.
#[async_trait]
pub trait StepUpProvider: Send + Sync {
    /// Open a new challenge for `subject`, displaying `binding_message`.
    async fn initiate(
        &self,
        subject: &SubjectRef,
        binding_message: &str,
    ) -> Result<ChallengeHandle, StepUpProviderError>;

    /// Ask for the current decision on a challenge.
    async fn poll(&self, request_id: &str) -> Result<PollDecision, StepUpProviderError>;
}
