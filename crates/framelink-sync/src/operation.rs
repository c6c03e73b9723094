//! Queued sync operations and run statistics.

use chrono::{DateTime, Utc};
use framelink_types::{AnnotationData, OperationId};
use serde::{Deserialize, Serialize};

/// What a queued operation does at the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    /// Create a new annotation.
    Create,
    /// Update an existing annotation.
    Update,
    /// Delete an annotation.
    Delete,
}

/// Where an operation is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpStatus {
    /// Waiting for the next flush pass.
    Pending,
    /// A push is in flight.
    Syncing,
    /// Accepted by the remote store.
    Completed,
    /// Retry budget exhausted; only a network recovery resets this.
    Failed,
}

/// One queued write against the remote store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncOperation {
    /// Operation id, stable across persistence round-trips.
    pub id: OperationId,
    /// What the operation does.
    pub kind: OpKind,
    /// The annotation state to push.
    pub data: AnnotationData,
    /// When the operation was enqueued.
    pub timestamp: DateTime<Utc>,
    /// Transient failures so far.
    pub retry_count: u32,
    /// Lifecycle status.
    pub status: OpStatus,
}

impl SyncOperation {
    /// Enqueues `data` as a pending operation stamped now.
    #[must_use]
    pub fn new(kind: OpKind, data: AnnotationData) -> Self {
        Self {
            id: OperationId::new(),
            kind,
            data,
            timestamp: Utc::now(),
            retry_count: 0,
            status: OpStatus::Pending,
        }
    }
}

/// Counters accumulated across sync passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SyncStats {
    /// Operations accepted by the remote store.
    pub completed: u64,
    /// Operations that exhausted their retry budget.
    pub failed: u64,
    /// Conflicts detected (resolved or not).
    pub conflicts: u64,
    /// When the last successful pass finished.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_operation_is_pending() {
        let op = SyncOperation::new(
            OpKind::Create,
            AnnotationData::new("a1", "t1", "u1", json!({})),
        );
        assert_eq!(op.status, OpStatus::Pending);
        assert_eq!(op.retry_count, 0);
    }

    #[test]
    fn serde_roundtrip() {
        let op = SyncOperation::new(
            OpKind::Update,
            AnnotationData::new("a1", "t1", "u1", json!({"label": "car"})),
        );
        let text = serde_json::to_string(&op).unwrap();
        let parsed: SyncOperation = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, op);
        assert_eq!(parsed.id, op.id);
    }
}
