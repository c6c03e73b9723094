//! The session context shared with the embedded tool.
//!
//! [`AnnotationContext`] is the single snapshot of "who is working on
//! what" that crosses the frame boundary. It is wholesale-replaced on
//! every update — the only sanctioned partial mutation is a
//! permissions swap, which still produces a new value.

use crate::{Permission, SessionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// The user half of a context snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    /// Stable user identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Optional contact address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Role names used by the permission engine's hierarchy lookup.
    #[serde(default)]
    pub roles: Vec<String>,
    /// Free-form attributes for rule conditions.
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl UserRef {
    /// Creates a user reference with no roles or attributes.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: None,
            roles: Vec::new(),
            attributes: Map::new(),
        }
    }

    /// Adds a role.
    #[must_use]
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }
}

/// The project half of a context snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRef {
    /// Stable project identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Free-form attributes for rule conditions.
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl ProjectRef {
    /// Creates a project reference.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            attributes: Map::new(),
        }
    }
}

/// The optional task half of a context snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRef {
    /// Stable task identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Free-form attributes for rule conditions.
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl TaskRef {
    /// Creates a task reference.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            attributes: Map::new(),
        }
    }
}

/// The session context snapshot.
///
/// Exactly one is active per [`ContextManager`] at a time. A context
/// older than the configured session timeout is treated as absent by
/// every reader.
///
/// # Immutability
///
/// Methods that "change" a context ([`with_permissions`]) return a new
/// value with a fresh timestamp. This keeps sharing across tasks safe
/// and makes the replace-don't-patch rule hard to violate.
///
/// [`ContextManager`]: https://docs.rs/framelink-context
/// [`with_permissions`]: Self::with_permissions
///
/// # Example
///
/// ```
/// use framelink_types::{AnnotationContext, Permission, ProjectRef, UserRef};
///
/// let ctx = AnnotationContext::new(
///     UserRef::new("u1", "Ada"),
///     ProjectRef::new("p1", "Street scenes"),
/// )
/// .with_permissions(vec![Permission::allow("edit", "annotation")]);
///
/// assert!(ctx.session_id.as_str().starts_with("session_"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationContext {
    /// Who is annotating.
    pub user: UserRef,
    /// Which project the work belongs to.
    pub project: ProjectRef,
    /// The specific task, when one is selected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task: Option<TaskRef>,
    /// Permission list evaluated by both sides of the boundary.
    #[serde(default)]
    pub permissions: Vec<Permission>,
    /// When this snapshot was (re)stamped.
    pub timestamp: DateTime<Utc>,
    /// Session this snapshot belongs to.
    pub session_id: SessionId,
    /// Extra key/value payload forwarded to the frame (after
    /// sensitive-key redaction).
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl AnnotationContext {
    /// Creates a context stamped now, with a generated session id.
    #[must_use]
    pub fn new(user: UserRef, project: ProjectRef) -> Self {
        Self {
            user,
            project,
            task: None,
            permissions: Vec::new(),
            timestamp: Utc::now(),
            session_id: SessionId::generate(),
            metadata: Map::new(),
        }
    }

    /// Sets the task.
    #[must_use]
    pub fn with_task(mut self, task: TaskRef) -> Self {
        self.task = Some(task);
        self
    }

    /// Replaces the permission list, re-stamping the timestamp.
    ///
    /// This is the only sanctioned partial update; everything else is
    /// a wholesale context replacement.
    #[must_use]
    pub fn with_permissions(mut self, permissions: Vec<Permission>) -> Self {
        self.permissions = permissions;
        self.timestamp = Utc::now();
        self
    }

    /// Sets an explicit session id (otherwise one is generated).
    #[must_use]
    pub fn with_session_id(mut self, id: SessionId) -> Self {
        self.session_id = id;
        self
    }

    /// Adds a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Age of this snapshot relative to now.
    ///
    /// Clock skew backwards yields zero, never a negative duration.
    #[must_use]
    pub fn age(&self) -> Duration {
        (Utc::now() - self.timestamp)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    /// Returns `true` if the snapshot is older than `timeout`.
    #[must_use]
    pub fn is_expired(&self, timeout: Duration) -> bool {
        self.age() > timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> AnnotationContext {
        AnnotationContext::new(UserRef::new("u1", "Ada"), ProjectRef::new("p1", "Scenes"))
    }

    #[test]
    fn new_context_has_generated_session() {
        let c = ctx();
        assert!(c.session_id.as_str().starts_with("session_"));
        assert!(c.task.is_none());
        assert!(c.permissions.is_empty());
    }

    #[test]
    fn fresh_context_is_not_expired() {
        let c = ctx();
        assert!(!c.is_expired(Duration::from_secs(60)));
    }

    #[test]
    fn old_context_is_expired() {
        let mut c = ctx();
        c.timestamp = Utc::now() - chrono::Duration::seconds(120);
        assert!(c.is_expired(Duration::from_secs(60)));
        assert!(c.age() >= Duration::from_secs(119));
    }

    #[test]
    fn with_permissions_restamps() {
        let c = ctx();
        let before = c.timestamp;
        std::thread::sleep(Duration::from_millis(5));
        let updated = c.with_permissions(vec![Permission::allow("edit", "annotation")]);
        assert!(updated.timestamp > before);
        assert_eq!(updated.permissions.len(), 1);
    }

    #[test]
    fn explicit_session_id_kept() {
        let c = ctx().with_session_id(SessionId::new("session_1_abc"));
        assert_eq!(c.session_id.as_str(), "session_1_abc");
    }

    #[test]
    fn serde_roundtrip() {
        let c = ctx()
            .with_task(TaskRef::new("t1", "frame 12"))
            .with_metadata("source", Value::String("test".into()));
        let json = serde_json::to_string(&c).expect("serialize");
        let parsed: AnnotationContext = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed, c);
    }
}
