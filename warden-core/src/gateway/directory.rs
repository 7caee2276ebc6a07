//! Seam to the external directory/management API.
//!
//! The directory is the system of record for users and org membership. It is
//! consumed as a black box; errors surface as the provider's `{status,
//! message}` pair and are never interpreted beyond that.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::Role;

/// Error reported by the directory service.
#[derive(Debug, Clone, thiserror::Error)]
#[error("directory error ({status}): {message}")]
pub struct DirectoryError {
    pub status: u16,
    pub message: String,
}

impl DirectoryError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

/// A user as known to the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryUser {
    /// Canonical directory id (the id half of a `user:` subject).
    pub user_id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Trait for directory/management API backends.
#[async_trait]
pub trait DirectoryApi: Send + Sync {
    /// Resolve a human-supplied identifier (email or canonical id) to a
    /// directory user. Exact matches only - never fuzzy.
    async fn resolve_subject(&self, identifier: &str)
        -> Result<Option<DirectoryUser>, DirectoryError>;

    /// List the members of an organization.
    async fn list_members(&self, org_id: &str) -> Result<Vec<DirectoryUser>, DirectoryError>;

    /// Send an invitation email for an organization.
    async fn invite_member(&self, org_id: &str, email: &str) -> Result<(), DirectoryError>;

    /// Add an existing user to an organization.
    async fn add_member(&self, org_id: &str, user_id: &str) -> Result<(), DirectoryError>;

    /// Replace a member's directory-side role list.
    async fn set_member_roles(
        &self,
        org_id: &str,
        user_id: &str,
        roles: &[Role],
    ) -> Result<(), DirectoryError>;

    /// Remove a user from an organization.
    async fn remove_member(&self, org_id: &str, user_id: &str) -> Result<(), DirectoryError>;

    /// Delete the user account entirely.
    async fn delete_user(&self, user_id: &str) -> Result<(), DirectoryError>;

    /// Clear the user's MFA enrollments so they re-enroll at next login.
    async fn reset_mfa(&self, user_id: &str) -> Result<(), DirectoryError>;
}
