//! Permission evaluation against the relationship store.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;

use super::store::RelationshipStore;
use crate::activity::ActivityLog;
use crate::types::{ObjectRef, Permission, Relation, Role, SubjectRef};

/// Evaluates business permissions as relationship checks.
///
/// Authorization callers get a plain `bool` back, never an error: a store
/// failure is indistinguishable from a denial, so a provider outage can only
/// withhold access, never grant it. The failure itself is still visible - it
/// lands in the [`ActivityLog`] with its error text and in the process log.
pub struct PermissionEvaluator {
    store: Arc<dyn RelationshipStore>,
    activity: Arc<ActivityLog>,
}

impl PermissionEvaluator {
    pub fn new(store: Arc<dyn RelationshipStore>, activity: Arc<ActivityLog>) -> Self {
        Self { store, activity }
    }

    /// Does `subject` hold `permission` on `object`? Fail-closed.
    pub async fn check(
        &self,
        subject: &SubjectRef,
        object: &ObjectRef,
        permission: Permission,
    ) -> bool {
        self.check_relation(subject, object, permission.into()).await
    }

    /// Evaluate a batch of permissions concurrently.
    ///
    /// Each check is independent; one store failure only denies that entry.
    pub async fn check_all(
        &self,
        subject: &SubjectRef,
        object: &ObjectRef,
        permissions: &[Permission],
    ) -> HashMap<Permission, bool> {
        let checks = permissions
            .iter()
            .map(|&permission| async move {
                (permission, self.check(subject, object, permission).await)
            })
            .collect::<Vec<_>>();

        join_all(checks).await.into_iter().collect()
    }

    /// The highest-precedence role `subject` holds on `object`, if any.
    ///
    /// Display only - up to four sequential checks in the worst case, which
    /// is acceptable because nothing is gated on the result.
    pub async fn primary_role(&self, subject: &SubjectRef, object: &ObjectRef) -> Option<Role> {
        for role in Role::PRECEDENCE {
            if self.check_relation(subject, object, role.into()).await {
                return Some(role);
            }
        }
        None
    }

    async fn check_relation(
        &self,
        subject: &SubjectRef,
        object: &ObjectRef,
        relation: Relation,
    ) -> bool {
        match self.store.check(subject, relation, object).await {
            Ok(allowed) => {
                self.activity
                    .record_check(subject, relation.as_str(), object, Ok(allowed));
                allowed
            }
            Err(e) => {
                let message = e.to_string();
                log::warn!(
                    "relationship check failed for ({}, {}, {}): {}",
                    subject,
                    relation,
                    object,
                    message
                );
                self.activity
                    .record_check(subject, relation.as_str(), object, Err(&message));
                false
            }
        }
    }
}
