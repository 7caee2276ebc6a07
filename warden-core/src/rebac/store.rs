//! Relationship store trait and in-memory implementation.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use crate::types::{ObjectRef, Relation, Role, RoleAssignment, SubjectRef};

/// Errors that can occur in relationship store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store rejected a check or read.
    #[error("Failed to read relationships: {0}")]
    Read(String),

    /// The store rejected a write batch.
    #[error("Failed to write relationships: {0}")]
    Write(String),

    /// A delete targeted a tuple the store does not hold.
    #[error("Cannot delete missing tuple {0}")]
    MissingTuple(RoleAssignment),

    /// Transport-level failure reaching the store.
    #[error("Store transport error: {0}")]
    Transport(String),
}

/// Trait for relationship store backends.
///
/// The store holds `(subject, relation, object)` tuples and answers membership
/// checks. Only role relations are ever written; permission relations are
/// computed by the store from its role tuples. Implementations mirror the
/// external service's contract: deleting a tuple that does not exist is an
/// error, so callers read before deleting (see
/// [`RelationshipMutator`](crate::rebac::RelationshipMutator)).
#[async_trait]
pub trait RelationshipStore: Send + Sync {
    /// Does `subject` hold `relation` on `object`?
    async fn check(
        &self,
        subject: &SubjectRef,
        relation: Relation,
        object: &ObjectRef,
    ) -> Result<bool, StoreError>;

    /// All role relations `subject` holds on `object`.
    async fn read_roles(
        &self,
        subject: &SubjectRef,
        object: &ObjectRef,
    ) -> Result<Vec<Role>, StoreError>;

    /// Apply one batch of writes and deletes.
    ///
    /// The batch is not transactional across backends; callers must not retry
    /// a failed batch blindly, since part of it may already have applied.
    async fn write(
        &self,
        writes: &[RoleAssignment],
        deletes: &[RoleAssignment],
    ) -> Result<(), StoreError>;
}

/// In-memory relationship store.
///
/// Used by tests and local development. Matches the external service's
/// semantics: permission checks resolve through the role unions, duplicate
/// writes are tolerated, and deletes of missing tuples error.
pub struct MemoryRelationshipStore {
    tuples: RwLock<HashMap<(SubjectRef, ObjectRef), HashSet<Role>>>,
}

impl MemoryRelationshipStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            tuples: RwLock::new(HashMap::new()),
        }
    }

    /// Seed a role directly, bypassing the mutator. Test convenience.
    pub fn seed(&self, subject: SubjectRef, role: Role, object: ObjectRef) {
        let mut tuples = self.tuples.write().expect("RwLock poisoned");
        tuples.entry((subject, object)).or_default().insert(role);
    }
}

impl Default for MemoryRelationshipStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RelationshipStore for MemoryRelationshipStore {
    async fn check(
        &self,
        subject: &SubjectRef,
        relation: Relation,
        object: &ObjectRef,
    ) -> Result<bool, StoreError> {
        let tuples = self.tuples.read().expect("RwLock poisoned");
        let held = tuples
            .get(&(subject.clone(), object.clone()))
            .cloned()
            .unwrap_or_default();

        Ok(match relation {
            Relation::Role(role) => held.contains(&role),
            Relation::Permission(permission) => permission
                .granting_roles()
                .iter()
                .any(|role| held.contains(role)),
        })
    }

    async fn read_roles(
        &self,
        subject: &SubjectRef,
        object: &ObjectRef,
    ) -> Result<Vec<Role>, StoreError> {
        let tuples = self.tuples.read().expect("RwLock poisoned");
        let held = tuples
            .get(&(subject.clone(), object.clone()))
            .cloned()
            .unwrap_or_default();

        // Stable order for callers that display or diff the result
        Ok(Role::PRECEDENCE
            .into_iter()
            .filter(|role| held.contains(role))
            .collect())
    }

    async fn write(
        &self,
        writes: &[RoleAssignment],
        deletes: &[RoleAssignment],
    ) -> Result<(), StoreError> {
        let mut tuples = self.tuples.write().expect("RwLock poisoned");

        // Validate deletes up front so a bad batch does not half-apply here
        for delete in deletes {
            let present = tuples
                .get(&(delete.subject.clone(), delete.object.clone()))
                .map(|roles| roles.contains(&delete.role))
                .unwrap_or(false);
            if !present {
                return Err(StoreError::MissingTuple(delete.clone()));
            }
        }

        for write in writes {
            tuples
                .entry((write.subject.clone(), write.object.clone()))
                .or_default()
                .insert(write.role);
        }

        for delete in deletes {
            if let Some(roles) = tuples.get_mut(&(delete.subject.clone(), delete.object.clone())) {
                roles.remove(&delete.role);
                if roles.is_empty() {
                    tuples.remove(&(delete.subject.clone(), delete.object.clone()));
                }
            }
        }

        Ok(())
    }
}
