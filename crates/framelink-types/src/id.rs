//! Identifier types for framelink.
//!
//! Message and operation identifiers are UUID-based so they stay
//! unique across the host/frame boundary and across process restarts.
//! Session and annotation identifiers are string-based because they
//! originate outside this layer (the host session or the remote store).

use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier for a message envelope crossing the frame boundary.
///
/// The id is assigned by the sender and **stays stable across
/// retries** — the receiving side deduplicates by it. Each logical
/// message therefore has exactly one `MessageId` no matter how many
/// times it is re-posted.
///
/// # Example
///
/// ```
/// use framelink_types::MessageId;
///
/// let a = MessageId::new();
/// let b = MessageId::new();
/// assert_ne!(a, b);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub Uuid);

#[allow(clippy::new_without_default)] // Default intentionally not implemented - ids are minted per logical message
impl MessageId {
    /// Creates a new [`MessageId`] with a random UUID v4.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "msg:{}", self.0)
    }
}

/// Identifier for a queued sync operation.
///
/// Minted when the operation is enqueued; survives persistence
/// round-trips so a restored queue keeps the same operation ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationId(pub Uuid);

#[allow(clippy::new_without_default)] // Generated internally by SyncManager::add_operation
impl OperationId {
    /// Creates a new [`OperationId`] with a random UUID v4.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID.
    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl std::fmt::Display for OperationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "op:{}", self.0)
    }
}

/// Identifier for an annotation record.
///
/// Assigned by the caller or the remote store, not by this layer, so
/// it is an opaque string rather than a UUID. It is the key for
/// conflict detection: one unresolved conflict per `AnnotationId`
/// blocks later operations on the same id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AnnotationId(pub String);

impl AnnotationId {
    /// Wraps a raw annotation id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the raw id string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AnnotationId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl std::fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ann:{}", self.0)
    }
}

/// Identifier for a context session.
///
/// Generated as `session_<epoch_ms>_<random>` when the host does not
/// supply one, matching the wire format the embedded tool expects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    /// Wraps an externally supplied session id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh `session_<epoch_ms>_<random>` id.
    ///
    /// # Example
    ///
    /// ```
    /// use framelink_types::SessionId;
    ///
    /// let id = SessionId::generate();
    /// assert!(id.as_str().starts_with("session_"));
    /// ```
    #[must_use]
    pub fn generate() -> Self {
        let epoch_ms = chrono::Utc::now().timestamp_millis();
        let suffix: u32 = rand::thread_rng().gen();
        Self(format!("session_{epoch_ms}_{suffix:08x}"))
    }

    /// Returns the raw id string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
