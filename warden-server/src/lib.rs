//! # warden-server
//!
//! HTTP surface for the warden delegated-administration gateway.
//!
//! This crate owns the trust boundary between clients (the chat UI, the
//! dashboard) and the authorization core. Three endpoint groups are
//! provided:
//!
//! - **Tools** (`POST {tools}/:name`): dispatches one tool call through the
//!   gateway. Any client-supplied `verified` / `operationId` field in the
//!   arguments is discarded before dispatch - verification state only exists
//!   server-side.
//! - **Approvals** (`POST {tools}/operations/:id/approve`): drives the
//!   step-up flow for a parked sensitive operation and executes it exactly
//!   once on approval.
//! - **Activity** (`GET`/`DELETE {activity}`): the capped, newest-first feed
//!   of relationship-store traffic.
//!
//! ## Example
//!
//! ```rust,no_run
//! use warden_server::WardenRouter;
//! use warden_core::ToolGateway;
//!
//! # async fn example(gateway: ToolGateway) -> Result<(), Box<dyn std::error::Error>> {
//! let app = WardenRouter::new(gateway)
//!     .with_tools("/api/tools")
//!     .with_activity("/api/activity")
//!     .build()?;
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod handlers;
mod router;
mod state;

pub use error::{BuildError, ServerError, ServerResult};
pub use handlers::ToolInvocation;
pub use router::WardenRouter;
pub use state::AppState;
