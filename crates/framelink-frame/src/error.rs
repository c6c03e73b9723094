//! Frame lifecycle errors.
//!
//! # Error Codes
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`FrameError::AlreadyExists`] | `FRAME_ALREADY_EXISTS` | No |
//! | [`FrameError::NotFound`] | `FRAME_NOT_FOUND` | Yes |
//! | [`FrameError::Blocked`] | `FRAME_BLOCKED` | No |
//! | [`FrameError::LoadFailed`] | `FRAME_LOAD_FAILED` | Yes |
//! | [`FrameError::Bridge`] | `FRAME_BRIDGE` | inner |

use framelink_bridge::BridgeError;
use framelink_security::SecurityError;
use framelink_types::ErrorCode;
use thiserror::Error;

/// Frame lifecycle error.
#[derive(Debug, Clone, Error)]
pub enum FrameError {
    /// `create` was called while a frame is live.
    #[error("a frame already exists; destroy it first")]
    AlreadyExists,

    /// The operation needs a live frame and there is none.
    #[error("no live frame")]
    NotFound,

    /// The security policy rejected the frame URL.
    #[error("frame creation blocked")]
    Blocked {
        /// The policy decision.
        #[source]
        source: SecurityError,
    },

    /// The surface failed to load or manipulate the frame.
    #[error("frame load failed: {reason}")]
    LoadFailed {
        /// What the surface reported.
        reason: String,
    },

    /// A bridge operation issued on behalf of the frame failed.
    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

impl ErrorCode for FrameError {
    fn code(&self) -> &'static str {
        match self {
            Self::AlreadyExists => "FRAME_ALREADY_EXISTS",
            Self::NotFound => "FRAME_NOT_FOUND",
            Self::Blocked { .. } => "FRAME_BLOCKED",
            Self::LoadFailed { .. } => "FRAME_LOAD_FAILED",
            Self::Bridge(_) => "FRAME_BRIDGE",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::NotFound | Self::LoadFailed { .. } => true,
            Self::Bridge(inner) => inner.is_recoverable(),
            Self::AlreadyExists | Self::Blocked { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use framelink_types::assert_error_codes;

    #[test]
    fn all_error_codes_valid() {
        assert_error_codes(
            &[
                FrameError::AlreadyExists,
                FrameError::NotFound,
                FrameError::Blocked {
                    source: SecurityError::NotInitialized,
                },
                FrameError::LoadFailed { reason: "x".into() },
                FrameError::Bridge(BridgeError::TornDown),
            ],
            "FRAME_",
        );
    }
}
