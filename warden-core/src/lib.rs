//! # Warden
//!
//! Authorization decisions and step-up verification for delegated
//! administration.
//!
//! Warden sits between an LLM tool-calling runtime (or a dashboard) and the
//! external identity systems, and guarantees two things about every member
//! operation: the caller holds the required relationship-based permission,
//! and the sensitive subset only executes after a fresh out-of-band approval
//! completes on the caller's enrolled device.
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use serde_json::json;
//! use warden_core::{MemoryRelationshipStore, OperationContext, ToolGateway};
//! use warden_core::types::{ObjectRef, SubjectRef};
//!
//! #[tokio::main]
//! async fn main() -> warden_core::Result<()> {
//!     let gateway = ToolGateway::builder()
//!         .with_store(Arc::new(MemoryRelationshipStore::new()))
//!         .with_directory(directory)
//!         .with_step_up_provider(step_up)
//!         .build()?;
//!
//!     let ctx = OperationContext {
//!         caller: SubjectRef::user("admin-1"),
//!         organization: ObjectRef::organization("org-1"),
//!         credential: session_token,
//!     };
//!
//!     // Non-sensitive calls execute after the permission check
//!     let outcome = gateway.dispatch_raw("list_members", json!({}), &ctx).await;
//!
//!     // Sensitive calls park and return an operation id instead
//!     let parked = gateway
//!         .dispatch_raw("remove_member", json!({"member": "jo@example.com"}), &ctx)
//!         .await;
//!     if parked.requires_step_up {
//!         // Drives the approval on the caller's device, then executes once
//!         let done = gateway
//!             .approve_and_execute(parked.operation_id.unwrap())
//!             .await;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Design
//!
//! - **Fail-closed checks**: a relationship store outage denies; it can
//!   never grant. Every check, write, and delete lands in the
//!   [`ActivityLog`] with its outcome.
//! - **Read-diff-write-verify**: role updates read current state, write only
//!   the difference, and verify afterward, so the store never sees a delete
//!   for a tuple it does not hold.
//! - **Server-minted approval**: nothing on the wire can mark a call as
//!   verified. A [`stepup::VerifiedApproval`] is only minted by the step-up
//!   flow reaching its approved terminal state, scoped to one operation
//!   instance, and consumed on execution.
//!
//! ## Feature Flags
//!
//! - `idp` - HTTP backends over `warden-idp-sdk` for all three seams
//! - `test-utils` - in-memory test doubles for downstream crates

pub mod activity;
pub mod error;
pub mod events;
pub mod gateway;
pub mod provider;
pub mod rebac;
pub mod stepup;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use activity::{ActivityKind, ActivityLog, ActivityRecord, ACTIVITY_CAPACITY};
pub use error::{Error, Result};
pub use events::{GatewayEvent, GatewayHook, HookId};
pub use gateway::{
    DirectoryApi, DirectoryError, DirectoryUser, GatewayBuilder, OperationContext, ToolCall,
    ToolGateway, ToolOutcome, ToolSpec, DEFAULT_PENDING_TTL,
};
pub use rebac::{
    MemoryRelationshipStore, MutationError, PermissionEvaluator, RelationshipMutator,
    RelationshipStore, RoleSyncReport, StoreError,
};
pub use stepup::{
    Challenge, ChallengeState, PollDecision, StepUpConfig, StepUpError, StepUpFlow,
    StepUpProvider, VerifiedApproval,
};
pub use types::{ObjectRef, Permission, Relation, Role, RoleAssignment, SubjectRef};

// Backend implementations - feature-gated
#[cfg(feature = "idp")]
pub use provider::{IdpDirectory, IdpRelationshipStore, IdpStepUpProvider};
