//! Application state for the warden server.

use std::sync::Arc;

use warden_core::ToolGateway;

/// Shared application state containing the gateway.
///
/// This state is cloned for each request handler and provides
/// access to the shared gateway instance.
#[derive(Clone)]
pub struct AppState {
    /// The shared gateway instance.
    pub gateway: Arc<ToolGateway>,
}

impl AppState {
    /// Create new application state from an Arc<ToolGateway>.
    pub fn from_arc(gateway: Arc<ToolGateway>) -> Self {
        Self { gateway }
    }
}
