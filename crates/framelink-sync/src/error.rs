//! Sync engine errors.
//!
//! # Error Codes
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`SyncError::Network`] | `SYNC_NETWORK` | Yes |
//! | [`SyncError::Remote`] | `SYNC_REMOTE` | Yes |
//! | [`SyncError::UnknownConflict`] | `SYNC_UNKNOWN_CONFLICT` | No |
//! | [`SyncError::Persist`] | `SYNC_PERSIST` | No |

use framelink_types::{AnnotationId, ErrorCode};
use thiserror::Error;

/// Sync engine error.
///
/// Transient transport failures (`Network`, `Remote`) feed the
/// per-operation retry budget and are never surfaced to
/// `add_operation` callers.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The request never produced an HTTP response.
    #[error("network failure: {detail}")]
    Network {
        /// Transport-level description.
        detail: String,
    },

    /// The remote store answered with a non-success, non-conflict
    /// status.
    #[error("remote store rejected the request ({status}): {detail}")]
    Remote {
        /// HTTP status code.
        status: u16,
        /// Response body or status text.
        detail: String,
    },

    /// Manual resolution referenced a conflict that does not exist or
    /// is already resolved.
    #[error("no unresolved conflict for {id}")]
    UnknownConflict {
        /// The annotation id named by the caller.
        id: AnnotationId,
    },

    /// Reading or writing the persisted state file failed.
    #[error("state persistence failed: {detail}")]
    Persist {
        /// What went wrong.
        detail: String,
    },
}

impl ErrorCode for SyncError {
    fn code(&self) -> &'static str {
        match self {
            Self::Network { .. } => "SYNC_NETWORK",
            Self::Remote { .. } => "SYNC_REMOTE",
            Self::UnknownConflict { .. } => "SYNC_UNKNOWN_CONFLICT",
            Self::Persist { .. } => "SYNC_PERSIST",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Remote { .. })
    }
}
