//! Test doubles for the gateway's external collaborators.
//!
//! Available to downstream crates via the `test-utils` feature.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::gateway::{DirectoryApi, DirectoryError, DirectoryUser};
use crate::stepup::{ChallengeHandle, PollDecision, StepUpProvider, StepUpProviderError};
use crate::types::{Role, SubjectRef};

/// In-memory directory with a mutation call log and failure injection.
///
/// `resolve_subject` matches on exact email or exact user id. Mutating calls
/// are appended to [`StaticDirectory::calls`] so tests can assert on exactly
/// which external mutations ran.
pub struct StaticDirectory {
    users: Mutex<HashMap<String, DirectoryUser>>,
    calls: Mutex<Vec<String>>,
    resolves: AtomicUsize,
    fail_next: Mutex<Option<DirectoryError>>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            resolves: AtomicUsize::new(0),
            fail_next: Mutex::new(None),
        }
    }

    /// Register a user, addressable by email and by user id.
    pub fn add_user(&self, user: DirectoryUser) {
        let mut users = self.users.lock().unwrap();
        users.insert(user.email.clone(), user.clone());
        users.insert(user.user_id.clone(), user);
    }

    /// Make the next mutating call fail with `error`.
    pub fn fail_next(&self, error: DirectoryError) {
        *self.fail_next.lock().unwrap() = Some(error);
    }

    /// Mutating calls seen so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// How many resolve_subject calls have been made.
    pub fn resolve_count(&self) -> usize {
        self.resolves.load(Ordering::SeqCst)
    }

    fn mutate(&self, call: String) -> Result<(), DirectoryError> {
        if let Some(error) = self.fail_next.lock().unwrap().take() {
            return Err(error);
        }
        self.calls.lock().unwrap().push(call);
        Ok(())
    }
}

impl Default for StaticDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DirectoryApi for StaticDirectory {
    async fn resolve_subject(
        &self,
        identifier: &str,
    ) -> Result<Option<DirectoryUser>, DirectoryError> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        Ok(self.users.lock().unwrap().get(identifier).cloned())
    }

    async fn list_members(&self, _org_id: &str) -> Result<Vec<DirectoryUser>, DirectoryError> {
        let users = self.users.lock().unwrap();
        let mut members: Vec<DirectoryUser> = users.values().cloned().collect();
        members.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        members.dedup_by(|a, b| a.user_id == b.user_id);
        Ok(members)
    }

    async fn invite_member(&self, org_id: &str, email: &str) -> Result<(), DirectoryError> {
        self.mutate(format!("invite_member({}, {})", org_id, email))
    }

    async fn add_member(&self, org_id: &str, user_id: &str) -> Result<(), DirectoryError> {
        self.mutate(format!("add_member({}, {})", org_id, user_id))
    }

    async fn set_member_roles(
        &self,
        org_id: &str,
        user_id: &str,
        roles: &[Role],
    ) -> Result<(), DirectoryError> {
        let names: Vec<&str> = roles.iter().map(|r| r.as_relation()).collect();
        self.mutate(format!(
            "set_member_roles({}, {}, [{}])",
            org_id,
            user_id,
            names.join(", ")
        ))
    }

    async fn remove_member(&self, org_id: &str, user_id: &str) -> Result<(), DirectoryError> {
        self.mutate(format!("remove_member({}, {})", org_id, user_id))
    }

    async fn delete_user(&self, user_id: &str) -> Result<(), DirectoryError> {
        self.mutate(format!("delete_user({})", user_id))
    }

    async fn reset_mfa(&self, user_id: &str) -> Result<(), DirectoryError> {
        self.mutate(format!("reset_mfa({})", user_id))
    }
}

/// Step-up provider that approves on the first poll.
pub struct AutoApproveStepUp {
    initiated: AtomicUsize,
}

impl AutoApproveStepUp {
    pub fn new() -> Self {
        Self {
            initiated: AtomicUsize::new(0),
        }
    }

    /// How many challenges have been opened.
    pub fn initiate_count(&self) -> usize {
        self.initiated.load(Ordering::SeqCst)
    }
}

impl Default for AutoApproveStepUp {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StepUpProvider for AutoApproveStepUp {
    async fn initiate(
        &self,
        _subject: &SubjectRef,
        _binding_message: &str,
    ) -> Result<ChallengeHandle, StepUpProviderError> {
        let n = self.initiated.fetch_add(1, Ordering::SeqCst);
        Ok(ChallengeHandle {
            request_id: format!("challenge-{}", n),
            expires_in: Duration::from_secs(300),
            interval: Duration::from_millis(10),
        })
    }

    async fn poll(&self, _request_id: &str) -> Result<PollDecision, StepUpProviderError> {
        Ok(PollDecision::Approved)
    }
}

/// Step-up provider that denies on the first poll.
pub struct AutoDenyStepUp;

#[async_trait]
impl StepUpProvider for AutoDenyStepUp {
    async fn initiate(
        &self,
        _subject: &SubjectRef,
        _binding_message: &str,
    ) -> Result<ChallengeHandle, StepUpProviderError> {
        Ok(ChallengeHandle {
            request_id: "challenge-deny".to_string(),
            expires_in: Duration::from_secs(300),
            interval: Duration::from_millis(10),
        })
    }

    async fn poll(&self, _request_id: &str) -> Result<PollDecision, StepUpProviderError> {
        Ok(PollDecision::Denied {
            reason: Some("declined on device".to_string()),
        })
    }
}
