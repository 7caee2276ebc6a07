//! Step-up verification: asynchronous challenge/response approval.
//!
//! Sensitive operations only execute after a decoupled approval completes on
//! the subject's enrolled device. The flow is initiate -> poll -> terminal
//! state; every operation instance gets a fresh challenge, and the only thing
//! that unlocks execution is a [`VerifiedApproval`] minted here on the
//! `Approved` terminal state. Wire-level "already verified" claims are
//! meaningless by construction - there is no way to deserialize one.

mod flow;
mod provider;

pub use flow::{
    Challenge, ChallengeState, StepUpConfig, StepUpError, StepUpFlow, VerifiedApproval,
    DEFAULT_MAX_POLL_ATTEMPTS, DEFAULT_MAX_WAIT, DEFAULT_SLOW_DOWN_INCREMENT,
};
pub use provider::{ChallengeHandle, PollDecision, StepUpProvider, StepUpProviderError};
