//! Identity platform implementations of the core seams.
//!
//! Adapters over [`warden_idp_sdk::IdpClient`] for the relationship store,
//! the directory API, and the step-up provider. Enabled with the `idp`
//! feature.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use warden_idp_sdk::{
    CheckRequest, IdpClient, IdpError, InitiateRequest, PollStatus, ReadRequest, TupleKey,
    WriteRequest,
};

use crate::gateway::{DirectoryApi, DirectoryError, DirectoryUser};
use crate::rebac::{RelationshipStore, StoreError};
use crate::stepup::{ChallengeHandle, PollDecision, StepUpProvider, StepUpProviderError};
use crate::types::{ObjectRef, Relation, Role, RoleAssignment, SubjectRef};

/// Relationship store backed by the platform's relationship service.
pub struct IdpRelationshipStore {
    client: Arc<IdpClient>,
}

impl IdpRelationshipStore {
    pub fn new(client: Arc<IdpClient>) -> Self {
        Self { client }
    }
}

fn store_error(err: IdpError, writing: bool) -> StoreError {
    match err {
        IdpError::Network(msg) => StoreError::Transport(msg),
        other if writing => StoreError::Write(other.to_string()),
        other => StoreError::Read(other.to_string()),
    }
}

#[async_trait]
impl RelationshipStore for IdpRelationshipStore {
    async fn check(
        &self,
        subject: &SubjectRef,
        relation: Relation,
        object: &ObjectRef,
    ) -> Result<bool, StoreError> {
        let response = self
            .client
            .relationships()
            .check(CheckRequest {
                tuple_key: TupleKey::new(subject.as_str(), relation.as_str(), object.as_str()),
            })
            .await
            .map_err(|e| store_error(e, false))?;
        Ok(response.allowed)
    }

    async fn read_roles(
        &self,
        subject: &SubjectRef,
        object: &ObjectRef,
    ) -> Result<Vec<Role>, StoreError> {
        let response = self
            .client
            .relationships()
            .read(ReadRequest {
                user: subject.as_str().to_string(),
                relation: None,
                object: object.as_str().to_string(),
            })
            .await
            .map_err(|e| store_error(e, false))?;

        // Stored tuples are role relations only; anything else is skipped
        Ok(response
            .tuples
            .iter()
            .filter_map(|tuple| tuple.key.relation.parse::<Role>().ok())
            .collect())
    }

    async fn write(
        &self,
        writes: &[RoleAssignment],
        deletes: &[RoleAssignment],
    ) -> Result<(), StoreError> {
        let to_key = |a: &RoleAssignment| {
            TupleKey::new(a.subject.as_str(), a.role.as_relation(), a.object.as_str())
        };
        self.client
            .relationships()
            .write(WriteRequest {
                writes: writes.iter().map(to_key).collect(),
                deletes: deletes.iter().map(to_key).collect(),
            })
            .await
            .map_err(|e| store_error(e, true))
    }
}

/// Directory API backed by the platform's management API.
pub struct IdpDirectory {
    client: Arc<IdpClient>,
}

impl IdpDirectory {
    pub fn new(client: Arc<IdpClient>) -> Self {
        Self { client }
    }
}

fn directory_error(err: IdpError) -> DirectoryError {
    DirectoryError::new(err.status().unwrap_or(502), err.to_string())
}

#[async_trait]
impl DirectoryApi for IdpDirectory {
    async fn resolve_subject(
        &self,
        identifier: &str,
    ) -> Result<Option<DirectoryUser>, DirectoryError> {
        if identifier.contains('@') {
            let users = self
                .client
                .directory()
                .users_by_email(identifier)
                .await
                .map_err(directory_error)?;
            return Ok(users
                .into_iter()
                .find(|user| user.email == identifier)
                .map(|user| DirectoryUser {
                    user_id: user.user_id,
                    email: user.email,
                    name: user.name,
                }));
        }

        match self.client.directory().get_user(identifier).await {
            Ok(user) => Ok(Some(DirectoryUser {
                user_id: user.user_id,
                email: user.email,
                name: user.name,
            })),
            Err(e) if e.status() == Some(404) => Ok(None),
            Err(e) => Err(directory_error(e)),
        }
    }

    async fn list_members(&self, org_id: &str) -> Result<Vec<DirectoryUser>, DirectoryError> {
        let members = self
            .client
            .directory()
            .list_members(org_id)
            .await
            .map_err(directory_error)?;
        Ok(members
            .into_iter()
            .map(|user| DirectoryUser {
                user_id: user.user_id,
                email: user.email,
                name: user.name,
            })
            .collect())
    }

    async fn invite_member(&self, org_id: &str, email: &str) -> Result<(), DirectoryError> {
        self.client
            .directory()
            .create_invitation(org_id, email)
            .await
            .map_err(directory_error)
    }

    async fn add_member(&self, org_id: &str, user_id: &str) -> Result<(), DirectoryError> {
        self.client
            .directory()
            .add_member(org_id, user_id)
            .await
            .map_err(directory_error)
    }

    async fn set_member_roles(
        &self,
        org_id: &str,
        user_id: &str,
        roles: &[Role],
    ) -> Result<(), DirectoryError> {
        let names: Vec<String> = roles.iter().map(|r| r.as_relation().to_string()).collect();
        self.client
            .directory()
            .set_member_roles(org_id, user_id, &names)
            .await
            .map_err(directory_error)
    }

    async fn remove_member(&self, org_id: &str, user_id: &str) -> Result<(), DirectoryError> {
        self.client
            .directory()
            .remove_member(org_id, user_id)
            .await
            .map_err(directory_error)
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), DirectoryError> {
        self.client
            .directory()
            .delete_user(user_id)
            .await
            .map_err(directory_error)
    }

    async fn reset_mfa(&self, user_id: &str) -> Result<(), DirectoryError> {
        self.client
            .directory()
            .reset_mfa(user_id)
            .await
            .map_err(directory_error)
    }
}

/// Step-up provider backed by the platform's approval API.
pub struct IdpStepUpProvider {
    client: Arc<IdpClient>,
}

impl IdpStepUpProvider {
    pub fn new(client: Arc<IdpClient>) -> Self {
        Self { client }
    }
}

fn stepup_error(err: IdpError) -> StepUpProviderError {
    match err {
        IdpError::Network(msg) => StepUpProviderError::Transport(msg),
        other => StepUpProviderError::Api {
            status: other.status().unwrap_or(502),
            message: other.to_string(),
        },
    }
}

#[async_trait]
impl StepUpProvider for IdpStepUpProvider {
    async fn initiate(
        &self,
        subject: &SubjectRef,
        binding_message: &str,
    ) -> Result<ChallengeHandle, StepUpProviderError> {
        let response = self
            .client
            .step_up()
            .initiate(InitiateRequest {
                subject: subject.as_str().to_string(),
                binding_message: binding_message.to_string(),
            })
            .await
            .map_err(stepup_error)?;

        Ok(ChallengeHandle {
            request_id: response.auth_req_id,
            expires_in: Duration::from_secs(response.expires_in),
            interval: Duration::from_secs(response.interval),
        })
    }

    async fn poll(&self, request_id: &str) -> Result<PollDecision, StepUpProviderError> {
        let response = self
            .client
            .step_up()
            .poll(request_id)
            .await
            .map_err(stepup_error)?;

        Ok(match response.status {
            PollStatus::Approved => PollDecision::Approved,
            PollStatus::Pending => PollDecision::Pending,
            PollStatus::SlowDown => PollDecision::SlowDown,
            PollStatus::Denied => PollDecision::Denied {
                reason: response.reason,
            },
            PollStatus::Expired => PollDecision::Expired,
        })
    }
}
