//! Role grant/revoke writes against the relationship store.
//!
//! The store errors on deletes of tuples it does not hold, so every
//! subtractive path here reads current state first and only deletes what
//! actually exists. [`RelationshipMutator::set_roles`] is the primary entry
//! point: read, diff against the desired set, write one batch, re-read to
//! verify. Store call count stays proportional to the actual change.

use std::collections::HashSet;
use std::sync::Arc;

use super::store::{RelationshipStore, StoreError};
use crate::activity::ActivityLog;
use crate::types::{ObjectRef, Role, RoleAssignment, SubjectRef};

/// Errors surfaced by mutation operations.
///
/// Failures are never retried here: a batched write may have partially
/// applied, and replaying it could double-apply.
#[derive(Debug, thiserror::Error)]
pub enum MutationError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of a [`RelationshipMutator::set_roles`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSyncReport {
    /// Roles written by this call.
    pub added: Vec<Role>,
    /// Roles deleted by this call.
    pub removed: Vec<Role>,
    /// Whether the post-write read matched the desired set.
    ///
    /// `false` indicates store-level eventual consistency or a concurrent
    /// writer; the condition is logged for operator follow-up, not raised.
    pub verified: bool,
}

impl RoleSyncReport {
    /// Whether the call changed anything.
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Performs role-relationship writes with read-before-delete discipline.
pub struct RelationshipMutator {
    store: Arc<dyn RelationshipStore>,
    activity: Arc<ActivityLog>,
}

impl RelationshipMutator {
    pub fn new(store: Arc<dyn RelationshipStore>, activity: Arc<ActivityLog>) -> Self {
        Self { store, activity }
    }

    /// Grant one role. A duplicate grant is not an error.
    pub async fn grant(
        &self,
        subject: &SubjectRef,
        object: &ObjectRef,
        role: Role,
    ) -> Result<(), MutationError> {
        let write = RoleAssignment::new(subject.clone(), role, object.clone());
        match self.store.write(std::slice::from_ref(&write), &[]).await {
            Ok(()) => {
                self.activity
                    .record_write(subject, role.as_relation(), object, Ok(true));
                Ok(())
            }
            Err(e) => {
                let message = e.to_string();
                log::warn!("grant failed for {}: {}", write, message);
                self.activity
                    .record_write(subject, role.as_relation(), object, Err(&message));
                Err(e.into())
            }
        }
    }

    /// Revoke one role. Revoking a role the subject does not hold is a no-op.
    pub async fn revoke(
        &self,
        subject: &SubjectRef,
        object: &ObjectRef,
        role: Role,
    ) -> Result<(), MutationError> {
        let current = self.store.read_roles(subject, object).await?;
        if !current.contains(&role) {
            return Ok(());
        }

        let delete = RoleAssignment::new(subject.clone(), role, object.clone());
        match self.store.write(&[], std::slice::from_ref(&delete)).await {
            Ok(()) => {
                self.activity
                    .record_delete(subject, role.as_relation(), object, Ok(true));
                Ok(())
            }
            Err(e) => {
                let message = e.to_string();
                log::warn!("revoke failed for {}: {}", delete, message);
                self.activity
                    .record_delete(subject, role.as_relation(), object, Err(&message));
                Err(e.into())
            }
        }
    }

    /// Reconcile the subject's roles on `object` to exactly `desired`.
    ///
    /// Reads current roles, writes only the difference in one batch, then
    /// re-reads and compares. A second call with the same desired set
    /// performs zero writes and zero deletes.
    pub async fn set_roles(
        &self,
        subject: &SubjectRef,
        object: &ObjectRef,
        desired: &HashSet<Role>,
    ) -> Result<RoleSyncReport, MutationError> {
        let current: HashSet<Role> = self
            .store
            .read_roles(subject, object)
            .await?
            .into_iter()
            .collect();

        let to_add: Vec<Role> = ordered(desired.difference(&current));
        let to_remove: Vec<Role> = ordered(current.difference(desired));

        if to_add.is_empty() && to_remove.is_empty() {
            return Ok(RoleSyncReport {
                added: vec![],
                removed: vec![],
                verified: true,
            });
        }

        let writes: Vec<RoleAssignment> = to_add
            .iter()
            .map(|&role| RoleAssignment::new(subject.clone(), role, object.clone()))
            .collect();
        let deletes: Vec<RoleAssignment> = to_remove
            .iter()
            .map(|&role| RoleAssignment::new(subject.clone(), role, object.clone()))
            .collect();

        if let Err(e) = self.store.write(&writes, &deletes).await {
            let message = e.to_string();
            log::warn!(
                "role sync failed for ({}, {}): {}",
                subject,
                object,
                message
            );
            for write in &writes {
                self.activity
                    .record_write(subject, write.role.as_relation(), object, Err(&message));
            }
            for delete in &deletes {
                self.activity
                    .record_delete(subject, delete.role.as_relation(), object, Err(&message));
            }
            return Err(e.into());
        }

        for write in &writes {
            self.activity
                .record_write(subject, write.role.as_relation(), object, Ok(true));
        }
        for delete in &deletes {
            self.activity
                .record_delete(subject, delete.role.as_relation(), object, Ok(true));
        }

        let after: HashSet<Role> = self
            .store
            .read_roles(subject, object)
            .await?
            .into_iter()
            .collect();
        let verified = &after == desired;
        if !verified {
            // Eventual consistency or a concurrent writer; surface, don't fail
            log::warn!(
                "role sync verification mismatch for ({}, {}): wanted {:?}, store has {:?}",
                subject,
                object,
                ordered(desired.iter()),
                ordered(after.iter())
            );
        }

        Ok(RoleSyncReport {
            added: to_add,
            removed: to_remove,
            verified,
        })
    }

    /// Remove every role the subject holds on `object`.
    ///
    /// Zero current roles is a successful no-op, never an error.
    pub async fn revoke_all(
        &self,
        subject: &SubjectRef,
        object: &ObjectRef,
    ) -> Result<Vec<Role>, MutationError> {
        let report = self.set_roles(subject, object, &HashSet::new()).await?;
        Ok(report.removed)
    }
}

/// Precedence-ordered copy of a role set, for stable diffs and log lines.
fn ordered<'a>(roles: impl Iterator<Item = &'a Role>) -> Vec<Role> {
    let held: HashSet<Role> = roles.copied().collect();
    Role::PRECEDENCE
        .into_iter()
        .filter(|role| held.contains(role))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rebac::store::MemoryRelationshipStore;

    fn fixture() -> (Arc<MemoryRelationshipStore>, RelationshipMutator) {
        let store = Arc::new(MemoryRelationshipStore::new());
        let mutator =
            RelationshipMutator::new(store.clone(), Arc::new(ActivityLog::new()));
        (store, mutator)
    }

    fn subject() -> SubjectRef {
        SubjectRef::user("u1")
    }

    fn object() -> ObjectRef {
        ObjectRef::organization("o1")
    }

    fn roles(list: &[Role]) -> HashSet<Role> {
        list.iter().copied().collect()
    }

    #[tokio::test]
    async fn test_set_roles_from_empty_writes_only() {
        let (store, mutator) = fixture();

        let report = mutator
            .set_roles(&subject(), &object(), &roles(&[Role::Admin, Role::Support]))
            .await
            .unwrap();

        assert_eq!(report.added, vec![Role::Admin, Role::Support]);
        assert!(report.removed.is_empty());
        assert!(report.verified);

        let after = store.read_roles(&subject(), &object()).await.unwrap();
        assert_eq!(after, vec![Role::Admin, Role::Support]);
    }

    #[tokio::test]
    async fn test_set_roles_narrowing_deletes_only_held_roles() {
        let (store, mutator) = fixture();
        store.seed(subject(), Role::Admin, object());
        store.seed(subject(), Role::Support, object());

        let report = mutator
            .set_roles(&subject(), &object(), &roles(&[Role::Support]))
            .await
            .unwrap();

        assert!(report.added.is_empty());
        assert_eq!(report.removed, vec![Role::Admin]);

        let after = store.read_roles(&subject(), &object()).await.unwrap();
        assert_eq!(after, vec![Role::Support]);
    }

    #[tokio::test]
    async fn test_set_roles_is_idempotent() {
        let (_, mutator) = fixture();
        let desired = roles(&[Role::Admin, Role::Member]);

        let first = mutator.set_roles(&subject(), &object(), &desired).await.unwrap();
        assert!(!first.is_noop());

        let second = mutator.set_roles(&subject(), &object(), &desired).await.unwrap();
        assert!(second.is_noop());
        assert!(second.verified);
    }

    #[tokio::test]
    async fn test_set_roles_to_empty_never_deletes_missing() {
        let (store, mutator) = fixture();
        store.seed(subject(), Role::Admin, object());

        // Only the held admin tuple may be deleted; a delete of any other
        // role would error in the memory store and fail the call.
        let report = mutator
            .set_roles(&subject(), &object(), &HashSet::new())
            .await
            .unwrap();

        assert_eq!(report.removed, vec![Role::Admin]);
        assert!(store.read_roles(&subject(), &object()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_revoke_absent_role_is_noop() {
        let (_, mutator) = fixture();
        mutator.revoke(&subject(), &object(), Role::Admin).await.unwrap();
    }

    #[tokio::test]
    async fn test_revoke_all_on_empty_subject_succeeds() {
        let (_, mutator) = fixture();
        let removed = mutator.revoke_all(&subject(), &object()).await.unwrap();
        assert!(removed.is_empty());
    }

    #[tokio::test]
    async fn test_revoke_all_removes_exactly_held_roles() {
        let (store, mutator) = fixture();
        store.seed(subject(), Role::SuperAdmin, object());
        store.seed(subject(), Role::Member, object());

        let removed = mutator.revoke_all(&subject(), &object()).await.unwrap();
        assert_eq!(removed, vec![Role::SuperAdmin, Role::Member]);
        assert!(store.read_roles(&subject(), &object()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_grant_records_activity() {
        let store = Arc::new(MemoryRelationshipStore::new());
        let activity = Arc::new(ActivityLog::new());
        let mutator = RelationshipMutator::new(store, activity.clone());

        mutator.grant(&subject(), &object(), Role::Member).await.unwrap();

        let records = activity.snapshot();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].relation, "member");
        assert_eq!(records[0].result, Some(true));
    }

    #[tokio::test]
    async fn test_end_to_end_widen_then_narrow() {
        let (store, mutator) = fixture();

        // u1 starts with no roles; widen to {admin, support}
        let widen = mutator
            .set_roles(&subject(), &object(), &roles(&[Role::Admin, Role::Support]))
            .await
            .unwrap();
        assert_eq!(widen.added, vec![Role::Admin, Role::Support]);
        assert!(widen.removed.is_empty());
        assert_eq!(
            store.read_roles(&subject(), &object()).await.unwrap(),
            vec![Role::Admin, Role::Support]
        );

        // Narrow to {support}: delete admin only, write nothing
        let narrow = mutator
            .set_roles(&subject(), &object(), &roles(&[Role::Support]))
            .await
            .unwrap();
        assert!(narrow.added.is_empty());
        assert_eq!(narrow.removed, vec![Role::Admin]);
        assert_eq!(
            store.read_roles(&subject(), &object()).await.unwrap(),
            vec![Role::Support]
        );
    }
}
