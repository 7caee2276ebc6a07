//! # warden-idp-sdk
//!
//! Typed HTTP client for the identity platform APIs that back the warden
//! authorization pipeline: the relationship store (check/read/write), the
//! directory/management API (users, org membership, roles, MFA), and the
//! step-up approval API (decoupled challenge initiate/poll).
//!
//! All surfaces are JSON-over-HTTP behind a machine-to-machine bearer token
//! obtained via the client-credentials grant and cached with an expiry
//! buffer. Requests retry transparently on 408/409/429/5xx and network
//! failures, with exponential backoff, jitter, and `Retry-After` support.
//!
//! ## Quick Start
//!
//! ```ignore
//! use warden_idp_sdk::{CheckRequest, IdpClient, TupleKey};
//!
//! # async fn example() -> Result<(), warden_idp_sdk::IdpError> {
//! let client = IdpClient::builder()
//!     .api_base("https://tenant.example.com")
//!     .store_base("https://store.example.com")
//!     .client_id(std::env::var("IDP_CLIENT_ID").unwrap())
//!     .client_secret(std::env::var("IDP_CLIENT_SECRET").unwrap())
//!     .build()?;
//!
//! let response = client
//!     .relationships()
//!     .check(CheckRequest {
//!         tuple_key: TupleKey::new("user:u1", "can_view", "organization:o1"),
//!     })
//!     .await?;
//! assert!(response.allowed);
//! # Ok(())
//! # }
//! ```

mod client;
mod directory;
mod error;
mod relationships;
mod stepup;
mod tokens;

pub use client::{IdpClient, IdpClientBuilder};
pub use directory::{ApiUser, Directory};
pub use error::{IdpError, RetryConfig};
pub use relationships::{
    CheckRequest, CheckResponse, ReadRequest, ReadResponse, Relationships, TupleKey, TupleRecord,
    WriteRequest,
};
pub use stepup::{InitiateRequest, InitiateResponse, PollResponse, PollStatus, StepUp};
pub use tokens::{TokenCache, TokenResponse, TOKEN_EXPIRY_BUFFER_SECS};
