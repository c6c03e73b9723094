//! Annotation records exchanged with the remote store.

use crate::AnnotationId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Review status of an annotation record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationStatus {
    /// Work in progress, not yet submitted.
    #[default]
    Draft,
    /// Submitted for review.
    Submitted,
    /// Approved by a reviewer.
    Approved,
    /// Rejected by a reviewer.
    Rejected,
}

/// One annotation record.
///
/// `version` increases monotonically on every accepted write and is
/// the conflict-detection key: a cached local version differing from
/// the remote version for the same id is a conflict.
///
/// # Example
///
/// ```
/// use framelink_types::AnnotationData;
/// use serde_json::json;
///
/// let ann = AnnotationData::new("a-1", "t-1", "u-1", json!({"label": "car"}));
/// assert_eq!(ann.version, 1);
///
/// let next = ann.bump_version();
/// assert_eq!(next.version, 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationData {
    /// Record identifier (caller- or store-assigned).
    pub id: AnnotationId,
    /// Task this annotation belongs to.
    pub task_id: String,
    /// User who produced it.
    pub user_id: String,
    /// The annotation payload itself (tool-specific; opaque here).
    pub data: Value,
    /// Last modification time.
    pub timestamp: DateTime<Utc>,
    /// Monotonic version, the conflict-detection key.
    pub version: u64,
    /// Review status.
    #[serde(default)]
    pub status: AnnotationStatus,
    /// Optional extra fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl AnnotationData {
    /// Creates a draft record at version 1, stamped now.
    #[must_use]
    pub fn new(
        id: impl Into<AnnotationId>,
        task_id: impl Into<String>,
        user_id: impl Into<String>,
        data: Value,
    ) -> Self {
        Self {
            id: id.into(),
            task_id: task_id.into(),
            user_id: user_id.into(),
            data,
            timestamp: Utc::now(),
            version: 1,
            status: AnnotationStatus::Draft,
            metadata: None,
        }
    }

    /// Returns a copy with the version incremented and a fresh stamp.
    #[must_use]
    pub fn bump_version(&self) -> Self {
        Self {
            version: self.version + 1,
            timestamp: Utc::now(),
            ..self.clone()
        }
    }

    /// Returns a copy with a new payload, bumped version, fresh stamp.
    #[must_use]
    pub fn with_data(&self, data: Value) -> Self {
        Self {
            data,
            version: self.version + 1,
            timestamp: Utc::now(),
            ..self.clone()
        }
    }
}

impl From<String> for AnnotationId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_record_defaults() {
        let ann = AnnotationData::new("a-1", "t-1", "u-1", json!({"label": "car"}));
        assert_eq!(ann.version, 1);
        assert_eq!(ann.status, AnnotationStatus::Draft);
        assert!(ann.metadata.is_none());
    }

    #[test]
    fn bump_version_is_monotonic() {
        let ann = AnnotationData::new("a-1", "t-1", "u-1", json!(null));
        let v2 = ann.bump_version();
        let v3 = v2.bump_version();
        assert_eq!(v2.version, 2);
        assert_eq!(v3.version, 3);
        assert_eq!(v3.id, ann.id);
    }

    #[test]
    fn with_data_replaces_payload() {
        let ann = AnnotationData::new("a-1", "t-1", "u-1", json!({"label": "car"}));
        let updated = ann.with_data(json!({"label": "truck"}));
        assert_eq!(updated.data, json!({"label": "truck"}));
        assert_eq!(updated.version, 2);
    }

    #[test]
    fn status_serializes_snake_case() {
        let json = serde_json::to_string(&AnnotationStatus::Submitted).expect("serialize");
        assert_eq!(json, "\"submitted\"");
    }

    #[test]
    fn serde_roundtrip() {
        let ann = AnnotationData::new("a-1", "t-1", "u-1", json!({"boxes": [1, 2]}));
        let json = serde_json::to_string(&ann).expect("serialize");
        let parsed: AnnotationData = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, ann);
    }
}
