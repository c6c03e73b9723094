//! Conflict detection and resolution strategies.
//!
//! A conflict exists when the local cached version of an annotation
//! differs from the remote version for the same id. Classification
//! looks at timestamps:
//!
//! - local is newer than remote → [`ConflictKind::Concurrent`]
//!   (both sides edited since the common ancestor)
//! - otherwise → [`ConflictKind::Version`]
//!   (the local copy is simply behind)
//!
//! Resolution is a [`ConflictStrategy`]: an automatic policy applied
//! at detection time, or [`Manual`], which leaves every conflict for
//! [`SyncManager::resolve_conflict_manually`](crate::SyncManager::resolve_conflict_manually).

use chrono::{DateTime, Utc};
use framelink_types::{AnnotationData, AnnotationId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Why the two sides disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// The local copy is behind the remote version.
    Version,
    /// Both sides changed since the last common version.
    Concurrent,
}

/// One detected conflict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConflict {
    /// The contested annotation.
    pub id: AnnotationId,
    /// Our side.
    pub local: AnnotationData,
    /// Their side.
    pub remote: AnnotationData,
    /// Classification.
    pub kind: ConflictKind,
    /// When the conflict was detected.
    pub timestamp: DateTime<Utc>,
    /// Set once a resolution has been applied.
    pub resolved: bool,
}

impl SyncConflict {
    /// Records a conflict between `local` and `remote`, classified by
    /// their timestamps.
    #[must_use]
    pub fn detect(local: AnnotationData, remote: AnnotationData) -> Self {
        let kind = if local.timestamp > remote.timestamp {
            ConflictKind::Concurrent
        } else {
            ConflictKind::Version
        };
        Self {
            id: local.id.clone(),
            local,
            remote,
            kind,
            timestamp: Utc::now(),
            resolved: false,
        }
    }
}

/// How to settle a conflict.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Keep the local copy; it is re-pushed above the remote version.
    UseLocal,
    /// Adopt the remote copy; pending local writes for the id are
    /// dropped.
    UseRemote,
    /// Push a hand-merged payload above both versions.
    Merge(Value),
}

/// Automatic conflict policy consulted at detection time.
///
/// Returning `None` leaves the conflict unresolved; operations on the
/// same annotation id stay blocked until a manual resolution.
pub trait ConflictStrategy: Send + Sync {
    /// Decides a resolution for `conflict`, or declines.
    fn resolve(&self, conflict: &SyncConflict) -> Option<Resolution>;

    /// Human-readable strategy name, for logs.
    fn name(&self) -> &'static str;
}

/// Always keeps the local copy.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalWins;

impl ConflictStrategy for LocalWins {
    fn resolve(&self, _conflict: &SyncConflict) -> Option<Resolution> {
        Some(Resolution::UseLocal)
    }

    fn name(&self) -> &'static str {
        "local-wins"
    }
}

/// Always adopts the remote copy.
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoteWins;

impl ConflictStrategy for RemoteWins {
    fn resolve(&self, _conflict: &SyncConflict) -> Option<Resolution> {
        Some(Resolution::UseRemote)
    }

    fn name(&self) -> &'static str {
        "remote-wins"
    }
}

/// Resolves nothing automatically.
#[derive(Debug, Clone, Copy, Default)]
pub struct Manual;

impl ConflictStrategy for Manual {
    fn resolve(&self, _conflict: &SyncConflict) -> Option<Resolution> {
        None
    }

    fn name(&self) -> &'static str {
        "manual"
    }
}
