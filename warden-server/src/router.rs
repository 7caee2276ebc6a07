//! Router builder for warden HTTP endpoints.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use warden_core::ToolGateway;

use crate::error::BuildError;
use crate::handlers::{activity_feed, approve_operation, clear_activity, invoke_tool};
use crate::state::AppState;

/// Builder for configuring warden HTTP endpoints.
///
/// # Example
///
/// ```rust,no_run
/// use warden_server::WardenRouter;
/// use warden_core::ToolGateway;
///
/// # fn example(gateway: ToolGateway) -> Result<(), Box<dyn std::error::Error>> {
/// let app = WardenRouter::new(gateway)
///     .with_tools("/api/tools")
///     .with_activity("/api/activity")
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct WardenRouter {
    gateway: Arc<ToolGateway>,
    tools_path: Option<String>,
    operations_path: Option<String>,
    activity_path: Option<String>,
}

impl WardenRouter {
    /// Create a new router builder with the given gateway.
    ///
    /// The gateway will be wrapped in an `Arc` for sharing across handlers.
    pub fn new(gateway: ToolGateway) -> Self {
        Self::from_arc(Arc::new(gateway))
    }

    /// Create a new router builder from an existing `Arc<ToolGateway>`.
    ///
    /// Use this when you need to share the gateway with other parts of your
    /// application (e.g. a chat loop registering event hooks).
    pub fn from_arc(gateway: Arc<ToolGateway>) -> Self {
        Self {
            gateway,
            tools_path: None,
            operations_path: None,
            activity_path: None,
        }
    }

    /// Enable tool dispatch at `{path}/:name`.
    ///
    /// This also enables the approval endpoint at
    /// `{path}/operations/:id/approve` for driving parked sensitive
    /// operations. Use [`operations_path`](Self::operations_path) to place
    /// it elsewhere.
    pub fn with_tools(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.operations_path = Some(format!("{}/operations", path));
        self.tools_path = Some(path);
        self
    }

    /// Set a custom base path for the approval endpoint.
    ///
    /// The endpoint is registered at `{path}/:id/approve`.
    pub fn operations_path(mut self, path: impl Into<String>) -> Self {
        self.operations_path = Some(path.into());
        self
    }

    /// Enable the activity feed at `path` (GET to read, DELETE to clear).
    pub fn with_activity(mut self, path: impl Into<String>) -> Self {
        self.activity_path = Some(path.into());
        self
    }

    /// Build the router with all configured endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::NoEndpoints`] if no endpoints were configured.
    pub fn build(self) -> Result<Router, BuildError> {
        if self.tools_path.is_none() && self.activity_path.is_none() {
            return Err(BuildError::NoEndpoints);
        }

        let state = AppState::from_arc(self.gateway);
        let mut router = Router::new();

        if let Some(tools_path) = self.tools_path {
            router = router.route(&format!("{}/:name", tools_path), post(invoke_tool));

            if let Some(operations_path) = self.operations_path {
                router = router.route(
                    &format!("{}/:id/approve", operations_path),
                    post(approve_operation),
                );
            }
        }

        if let Some(activity_path) = self.activity_path {
            router = router.route(
                &activity_path,
                get(activity_feed).delete(clear_activity),
            );
        }

        Ok(router.with_state(state))
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
