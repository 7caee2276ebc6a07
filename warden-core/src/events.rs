use uuid::Uuid;

use crate::types::{Permission, SubjectRef};

/// Events emitted during gateway dispatch
///
/// These events let observers (UI refresh, logging, tests) track tool
/// lifecycle, permission outcomes, and step-up progress in real time.
/// Registration is explicit via [`GatewayHook`]; there is no ambient bus.
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    // ===== Tool Lifecycle =====
    /// A tool call entered the gateway
    ToolRequested {
        /// Tool name
        name: String,
        /// Calling subject
        caller: SubjectRef,
    },

    /// A tool call finished (success or failure)
    ToolCompleted {
        /// Tool name
        name: String,
        /// Whether the operation executed successfully
        success: bool,
    },

    // ===== Permission Outcomes =====
    /// A permission check gated a tool call
    PermissionChecked {
        /// The permission that was required
        permission: Permission,
        /// Whether the caller held it
        allowed: bool,
    },

    // ===== Step-Up Lifecycle =====
    /// A sensitive operation was parked pending out-of-band approval
    StepUpRequired {
        /// Operation instance id the caller must approve
        operation_id: Uuid,
        /// Tool name
        name: String,
    },

    /// A parked operation's step-up flow reached a terminal state
    StepUpResolved {
        /// Operation instance id
        operation_id: Uuid,
        /// Whether the subject approved
        approved: bool,
    },

    // ===== Store Synchronization =====
    /// The relationship store could not be synchronized after an external
    /// mutation succeeded, or post-write verification found a mismatch
    StoreSyncIssue {
        /// Operator-facing description
        message: String,
    },
}

/// Hook for observing gateway events
///
/// Implement this trait to receive notifications about gateway dispatch.
///
/// # Example
/// ```
/// use warden_core::events::{GatewayEvent, GatewayHook};
///
/// struct Logger;
///
/// impl GatewayHook for Logger {
///     fn on_event(&self, event: &GatewayEvent) {
///         if let GatewayEvent::StepUpRequired { name, .. } = event {
///             println!("waiting on approval for {}", name);
///         }
///     }
/// }
/// ```
pub trait GatewayHook: Send + Sync {
    /// Called when an event occurs
    fn on_event(&self, event: &GatewayEvent);
}

/// Blanket implementation for closures
impl<F> GatewayHook for F
where
    F: Fn(&GatewayEvent) + Send + Sync,
{
    fn on_event(&self, event: &GatewayEvent) {
        self(event)
    }
}

/// Unique identifier for a registered hook.
///
/// Used to remove hooks via [`crate::gateway::ToolGateway::remove_hook`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(pub(crate) u64);
