//! Sync state persistence.
//!
//! The whole engine state — queue, annotation cache, conflicts,
//! stats — is written as one JSON document so a page reload or
//! process restart can resume where it left off. Writes go to a
//! sibling temp file first and are renamed into place, so a crash
//! mid-write never corrupts the previous snapshot. Snapshots older
//! than [`STATE_MAX_AGE`] or with a foreign version are discarded on
//! load.

use crate::{SyncConflict, SyncError, SyncOperation, SyncStats};
use chrono::{DateTime, Utc};
use framelink_types::AnnotationData;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Format version of the persisted document.
pub const STATE_VERSION: u32 = 1;

/// Snapshots older than this are stale enough to discard.
pub const STATE_MAX_AGE: chrono::Duration = chrono::Duration::hours(24);

/// The persisted engine state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    /// Format version; snapshots from other versions are discarded.
    pub version: u32,
    /// The operation queue, FIFO order preserved.
    pub operations: Vec<SyncOperation>,
    /// Cached annotation records.
    pub cache: Vec<AnnotationData>,
    /// Detected conflicts, resolved and not.
    pub conflicts: Vec<SyncConflict>,
    /// Accumulated counters.
    pub stats: SyncStats,
    /// When the snapshot was written.
    pub timestamp: DateTime<Utc>,
}

impl PersistedState {
    /// Wraps engine state in a snapshot stamped now.
    #[must_use]
    pub fn new(
        operations: Vec<SyncOperation>,
        cache: Vec<AnnotationData>,
        conflicts: Vec<SyncConflict>,
        stats: SyncStats,
    ) -> Self {
        Self {
            version: STATE_VERSION,
            operations,
            cache,
            conflicts,
            stats,
            timestamp: Utc::now(),
        }
    }
}

/// JSON state file with atomic replacement.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    /// Stores state at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the state file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes a snapshot, replacing the previous one atomically.
    ///
    /// # Errors
    ///
    /// [`SyncError::Persist`] on serialization or filesystem failure.
    pub async fn save(&self, state: &PersistedState) -> Result<(), SyncError> {
        let bytes = serde_json::to_vec_pretty(state).map_err(|e| SyncError::Persist {
            detail: format!("serialize failed: {e}"),
        })?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| SyncError::Persist {
                detail: format!("write {} failed: {e}", tmp.display()),
            })?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| SyncError::Persist {
                detail: format!("rename into {} failed: {e}", self.path.display()),
            })?;

        debug!(path = %self.path.display(), operations = state.operations.len(), "state persisted");
        Ok(())
    }

    /// Loads the previous snapshot, if a usable one exists.
    ///
    /// Missing files, unreadable JSON, foreign versions, and
    /// snapshots past [`STATE_MAX_AGE`] all yield `Ok(None)` — a
    /// stale or broken snapshot is discarded, never an error.
    pub async fn load(&self) -> Result<Option<PersistedState>, SyncError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(SyncError::Persist {
                    detail: format!("read {} failed: {e}", self.path.display()),
                })
            }
        };

        let state: PersistedState = match serde_json::from_slice(&bytes) {
            Ok(state) => state,
            Err(e) => {
                warn!(path = %self.path.display(), "discarding unreadable state: {e}");
                return Ok(None);
            }
        };

        if state.version != STATE_VERSION {
            warn!(
                found = state.version,
                expected = STATE_VERSION,
                "discarding state with foreign version"
            );
            return Ok(None);
        }
        if Utc::now() - state.timestamp > STATE_MAX_AGE {
            warn!(path = %self.path.display(), "discarding expired state");
            return Ok(None);
        }

        Ok(Some(state))
    }

    /// Removes the state file. Missing files are fine.
    pub async fn clear(&self) -> Result<(), SyncError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SyncError::Persist {
                detail: format!("remove {} failed: {e}", self.path.display()),
            }),
        }
    }
}
