//! Host facade errors.
//!
//! [`HostError`] wraps the component errors so callers of the facade
//! handle one type; `code()` and `is_recoverable()` delegate to the
//! wrapped error, keeping the component-level error codes visible.
//!
//! # Error Codes
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`HostError::Frame`] | delegated (`FRAME_*`) | delegated |
//! | [`HostError::Bridge`] | delegated (`BRIDGE_*`) | delegated |
//! | [`HostError::Context`] | delegated (`CONTEXT_*`) | delegated |
//! | [`HostError::Auth`] | delegated (`AUTH_*`) | delegated |
//! | [`HostError::Sync`] | delegated (`SYNC_*`) | delegated |
//! | [`HostError::PermissionDenied`] | `HOST_PERMISSION_DENIED` | No |

use framelink_auth::AuthError;
use framelink_bridge::BridgeError;
use framelink_context::ContextError;
use framelink_frame::FrameError;
use framelink_sync::SyncError;
use framelink_types::ErrorCode;
use thiserror::Error;

/// Any failure surfaced by the host facade.
#[derive(Debug, Error)]
pub enum HostError {
    /// Frame lifecycle failure.
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// Messaging failure.
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// Context lifecycle failure.
    #[error(transparent)]
    Context(#[from] ContextError),

    /// Permission rule/engine failure.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Sync engine failure.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// The active context does not permit the attempted action.
    #[error("permission denied: {action} on {resource}")]
    PermissionDenied {
        /// Attempted action.
        action: String,
        /// Target resource.
        resource: String,
    },
}

impl ErrorCode for HostError {
    fn code(&self) -> &'static str {
        match self {
            Self::Frame(e) => e.code(),
            Self::Bridge(e) => e.code(),
            Self::Context(e) => e.code(),
            Self::Auth(e) => e.code(),
            Self::Sync(e) => e.code(),
            Self::PermissionDenied { .. } => "HOST_PERMISSION_DENIED",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::Frame(e) => e.is_recoverable(),
            Self::Bridge(e) => e.is_recoverable(),
            Self::Context(e) => e.is_recoverable(),
            Self::Auth(e) => e.is_recoverable(),
            Self::Sync(e) => e.is_recoverable(),
            Self::PermissionDenied { .. } => false,
        }
    }
}
