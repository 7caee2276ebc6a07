//! Challenge lifecycle: initiate, bounded polling, terminal resolution.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::provider::{ChallengeHandle, PollDecision, StepUpProvider, StepUpProviderError};
use crate::types::SubjectRef;

/// Default ceiling on poll attempts.
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 30;

/// Default ceiling on total wall-clock wait.
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(300);

/// Default cadence increase applied on a provider `SlowDown` signal.
pub const DEFAULT_SLOW_DOWN_INCREMENT: Duration = Duration::from_secs(5);

/// Lifecycle states of a challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeState {
    Pending,
    Approved,
    Denied,
    Expired,
}

/// An open challenge awaiting an out-of-band decision.
#[derive(Debug, Clone)]
pub struct Challenge {
    pub request_id: String,
    pub subject: SubjectRef,
    pub binding_message: String,
    pub created_at: DateTime<Utc>,
    pub state: ChallengeState,
    pub expires_in: Duration,
    pub interval: Duration,
}

/// Terminal failures of a step-up attempt.
///
/// All of these end the attempt; the caller must start over with a fresh
/// challenge rather than re-poll the same request id.
#[derive(Debug, thiserror::Error)]
pub enum StepUpError {
    /// The subject declined the challenge.
    #[error("approval was declined")]
    Denied { reason: Option<String> },

    /// The provider expired the challenge before a decision.
    #[error("approval request expired")]
    Expired,

    /// Local attempt or wall-clock ceiling exceeded.
    #[error("approval was not completed in time")]
    Timeout,

    /// Transport or provider failure.
    #[error(transparent)]
    Provider(#[from] StepUpProviderError),
}

/// Polling bounds and backoff behavior.
#[derive(Debug, Clone)]
pub struct StepUpConfig {
    /// Maximum poll attempts before giving up.
    pub max_attempts: u32,
    /// Maximum total wall-clock time before giving up.
    pub max_wait: Duration,
    /// Added to the interval each time the provider signals `SlowDown`.
    pub slow_down_increment: Duration,
}

impl Default for StepUpConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
            max_wait: DEFAULT_MAX_WAIT,
            slow_down_increment: DEFAULT_SLOW_DOWN_INCREMENT,
        }
    }
}

/// Proof that a specific operation instance was approved out of band.
///
/// Mintable only by [`StepUpFlow::complete`] reaching the `Approved` terminal
/// state - there is no public constructor, and no wire-level field can be
/// deserialized into one. The approval is scoped to exactly one operation id
/// and is consumed when that operation executes.
#[derive(Debug)]
pub struct VerifiedApproval {
    operation_id: Uuid,
    request_id: String,
    approved_at: DateTime<Utc>,
}

impl VerifiedApproval {
    fn mint(operation_id: Uuid, request_id: String) -> Self {
        Self {
            operation_id,
            request_id,
            approved_at: Utc::now(),
        }
    }

    /// The operation instance this approval unlocks.
    pub fn operation_id(&self) -> Uuid {
        self.operation_id
    }

    /// The challenge that produced this approval.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// When the terminal approval was observed.
    pub fn approved_at(&self) -> DateTime<Utc> {
        self.approved_at
    }
}

/// Drives challenges against a [`StepUpProvider`] to a terminal state.
pub struct StepUpFlow {
    provider: Arc<dyn StepUpProvider>,
    config: StepUpConfig,
}

impl StepUpFlow {
    pub fn new(provider: Arc<dyn StepUpProvider>) -> Self {
        Self {
            provider,
            config: StepUpConfig::default(),
        }
    }

    pub fn with_config(provider: Arc<dyn StepUpProvider>, config: StepUpConfig) -> Self {
        Self { provider, config }
    }

    /// Open a fresh challenge. Never reuses a prior request id, even for the
    /// same subject and the same kind of operation.
    pub async fn initiate(
        &self,
        subject: &SubjectRef,
        binding_message: &str,
    ) -> Result<Challenge, StepUpError> {
        let ChallengeHandle {
            request_id,
            expires_in,
            interval,
        } = self.provider.initiate(subject, binding_message).await?;

        Ok(Challenge {
            request_id,
            subject: subject.clone(),
            binding_message: binding_message.to_string(),
            created_at: Utc::now(),
            state: ChallengeState::Pending,
            expires_in,
            interval,
        })
    }

    /// Poll until the challenge reaches a terminal state or a ceiling trips.
    ///
    /// Sleeps between attempts (non-blocking; the future is cancellable by
    /// dropping it) and honors `SlowDown` by widening the interval. Total
    /// wait is bounded by both `max_attempts` and `max_wait`.
    pub async fn poll_to_completion(&self, challenge: &mut Challenge) -> Result<(), StepUpError> {
        let mut interval = challenge.interval;
        let started = tokio::time::Instant::now();

        for _ in 0..self.config.max_attempts {
            tokio::time::sleep(interval).await;

            if started.elapsed() > self.config.max_wait {
                challenge.state = ChallengeState::Expired;
                return Err(StepUpError::Timeout);
            }

            match self.provider.poll(&challenge.request_id).await? {
                PollDecision::Approved => {
                    challenge.state = ChallengeState::Approved;
                    return Ok(());
                }
                PollDecision::Pending => {}
                PollDecision::SlowDown => {
                    interval += self.config.slow_down_increment;
                }
                PollDecision::Denied { reason } => {
                    challenge.state = ChallengeState::Denied;
                    return Err(StepUpError::Denied { reason });
                }
                PollDecision::Expired => {
                    challenge.state = ChallengeState::Expired;
                    return Err(StepUpError::Expired);
                }
            }
        }

        challenge.state = ChallengeState::Expired;
        Err(StepUpError::Timeout)
    }

    /// Initiate and poll in one call, minting the approval for exactly one
    /// operation instance on success.
    pub async fn complete(
        &self,
        subject: &SubjectRef,
        binding_message: &str,
        operation_id: Uuid,
    ) -> Result<VerifiedApproval, StepUpError> {
        let mut challenge = self.initiate(subject, binding_message).await?;
        self.poll_to_completion(&mut challenge).await?;
        Ok(VerifiedApproval::mint(operation_id, challenge.request_id))
    }
}
