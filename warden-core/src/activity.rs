//! In-process activity feed for relationship-store traffic.
//!
//! Every check, write, and delete lands here with its outcome so operators can
//! see what the authorization layer actually did. The feed is a capped ring:
//! newest first, truncated at [`ACTIVITY_CAPACITY`], cleared on demand. It is
//! a diagnostic aid, not an audit-of-record - nothing is persisted beyond the
//! process lifetime.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{ObjectRef, SubjectRef};

/// Maximum number of records retained.
pub const ACTIVITY_CAPACITY: usize = 100;

/// The kind of store operation a record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Check,
    Write,
    Delete,
}

/// One immutable record of a store operation and its outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub kind: ActivityKind,
    pub subject: SubjectRef,
    pub relation: String,
    pub object: ObjectRef,
    /// Check outcome, or write/delete success. Absent when the call errored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<bool>,
    /// Error text when the underlying call failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Capped, newest-first feed of [`ActivityRecord`]s.
pub struct ActivityLog {
    records: RwLock<VecDeque<ActivityRecord>>,
}

impl ActivityLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(VecDeque::with_capacity(ACTIVITY_CAPACITY)),
        }
    }

    /// Record a permission check and its outcome (or error).
    pub fn record_check(
        &self,
        subject: &SubjectRef,
        relation: &str,
        object: &ObjectRef,
        result: Result<bool, &str>,
    ) {
        self.push(ActivityKind::Check, subject, relation, object, result);
    }

    /// Record a tuple write.
    pub fn record_write(
        &self,
        subject: &SubjectRef,
        relation: &str,
        object: &ObjectRef,
        result: Result<bool, &str>,
    ) {
        self.push(ActivityKind::Write, subject, relation, object, result);
    }

    /// Record a tuple delete.
    pub fn record_delete(
        &self,
        subject: &SubjectRef,
        relation: &str,
        object: &ObjectRef,
        result: Result<bool, &str>,
    ) {
        self.push(ActivityKind::Delete, subject, relation, object, result);
    }

    fn push(
        &self,
        kind: ActivityKind,
        subject: &SubjectRef,
        relation: &str,
        object: &ObjectRef,
        result: Result<bool, &str>,
    ) {
        let (result, error) = match result {
            Ok(outcome) => (Some(outcome), None),
            Err(message) => (None, Some(message.to_string())),
        };

        let record = ActivityRecord {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            kind,
            subject: subject.clone(),
            relation: relation.to_string(),
            object: object.clone(),
            result,
            error,
        };

        let mut records = self.records.write();
        records.push_front(record);
        records.truncate(ACTIVITY_CAPACITY);
    }

    /// All retained records, newest first.
    pub fn snapshot(&self) -> Vec<ActivityRecord> {
        self.records.read().iter().cloned().collect()
    }

    /// Number of retained records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether the feed is empty.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Drop every record.
    pub fn clear(&self) {
        self.records.write().clear();
    }
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject() -> SubjectRef {
        SubjectRef::user("u1")
    }

    fn object() -> ObjectRef {
        ObjectRef::organization("o1")
    }

    #[test]
    fn test_records_are_newest_first() {
        let log = ActivityLog::new();
        log.record_check(&subject(), "can_view", &object(), Ok(true));
        log.record_write(&subject(), "admin", &object(), Ok(true));

        let records = log.snapshot();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].kind, ActivityKind::Write);
        assert_eq!(records[1].kind, ActivityKind::Check);
    }

    #[test]
    fn test_error_outcome_sets_error_field() {
        let log = ActivityLog::new();
        log.record_check(&subject(), "can_view", &object(), Err("connection refused"));

        let records = log.snapshot();
        assert_eq!(records[0].result, None);
        assert_eq!(records[0].error.as_deref(), Some("connection refused"));
    }

    #[test]
    fn test_capacity_is_enforced() {
        let log = ActivityLog::new();
        for i in 0..ACTIVITY_CAPACITY + 25 {
            log.record_check(&subject(), "can_view", &object(), Ok(i % 2 == 0));
        }
        assert_eq!(log.len(), ACTIVITY_CAPACITY);
    }

    #[test]
    fn test_clear_empties_the_feed() {
        let log = ActivityLog::new();
        log.record_delete(&subject(), "member", &object(), Ok(true));
        assert!(!log.is_empty());

        log.clear();
        assert!(log.is_empty());
        assert!(log.snapshot().is_empty());
    }
}
