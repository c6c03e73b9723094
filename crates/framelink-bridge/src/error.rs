//! Bridge errors.
//!
//! # Error Codes
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`BridgeError::InvalidEnvelope`] | `BRIDGE_INVALID_ENVELOPE` | No |
//! | [`BridgeError::Timeout`] | `BRIDGE_TIMEOUT` | Yes |
//! | [`BridgeError::PortClosed`] | `BRIDGE_PORT_CLOSED` | No |
//! | [`BridgeError::TornDown`] | `BRIDGE_TORN_DOWN` | No |

use framelink_types::{ErrorCode, MessageId};
use thiserror::Error;

/// Message bridge error.
#[derive(Debug, Clone, Error)]
pub enum BridgeError {
    /// An outbound envelope failed payload validation.
    #[error("invalid envelope: {reason}")]
    InvalidEnvelope {
        /// What was wrong with the envelope.
        reason: String,
    },

    /// No correlated reply arrived within the configured timeout,
    /// across all retry attempts.
    #[error("message {id} timed out after {attempts} attempt(s)")]
    Timeout {
        /// Id of the unanswered message.
        id: MessageId,
        /// Total attempts made (initial send plus retries).
        attempts: u32,
    },

    /// The underlying port rejected a post (other side gone).
    #[error("message port closed")]
    PortClosed,

    /// The bridge was cleaned up; no further sends are possible.
    #[error("bridge torn down")]
    TornDown,
}

impl ErrorCode for BridgeError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidEnvelope { .. } => "BRIDGE_INVALID_ENVELOPE",
            Self::Timeout { .. } => "BRIDGE_TIMEOUT",
            Self::PortClosed => "BRIDGE_PORT_CLOSED",
            Self::TornDown => "BRIDGE_TORN_DOWN",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::Timeout { .. })
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
                BridgeError::InvalidEnvelope { reason: "x".into() },
                BridgeError::Timeout {
                    id: MessageId::new(),
                    attempts: 3,
                },
                BridgeError::PortClosed,
                BridgeError::TornDown,
            ],
            "BRIDGE_",
        );
    }

    #[test]
    fn only_timeout_is_recoverable() {
        assert!(BridgeError::Timeout {
            id: MessageId::new(),
            attempts: 1,
        }
        .is_recoverable());
        assert!(!BridgeError::TornDown.is_recoverable());
    }
}
