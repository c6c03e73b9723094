//! Context management errors.
//!
//! # Error Codes
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`ContextError::InvalidContext`] | `CONTEXT_INVALID_CONTEXT` | No |
//! | [`ContextError::NoActiveContext`] | `CONTEXT_NO_ACTIVE` | Yes |
//! | [`ContextError::InvalidSealedContext`] | `CONTEXT_INVALID_SEALED` | No |

use framelink_types::ErrorCode;
use thiserror::Error;

/// Context management error.
#[derive(Debug, Clone, Error)]
pub enum ContextError {
    /// A context failed shape validation. Raised before any state is
    /// mutated, so the previously active context (if any) survives.
    #[error("invalid context: {reason}")]
    InvalidContext {
        /// What was wrong with the snapshot.
        reason: String,
    },

    /// An operation needs a live, unexpired context and none is set.
    #[error("no active context")]
    NoActiveContext,

    /// Sealed context data could not be decoded.
    #[error("invalid sealed context: {reason}")]
    InvalidSealedContext {
        /// Why decoding failed.
        reason: String,
    },
}

impl ErrorCode for ContextError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidContext { .. } => "CONTEXT_INVALID_CONTEXT",
            Self::NoActiveContext => "CONTEXT_NO_ACTIVE",
            Self::InvalidSealedContext { .. } => "CONTEXT_INVALID_SEALED",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::NoActiveContext)
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
                ContextError::InvalidContext { reason: "x".into() },
                ContextError::NoActiveContext,
                ContextError::InvalidSealedContext { reason: "x".into() },
            ],
            "CONTEXT_",
        );
    }

    #[test]
    fn only_missing_context_is_recoverable() {
        assert!(ContextError::NoActiveContext.is_recoverable());
        assert!(!ContextError::InvalidContext { reason: "x".into() }.is_recoverable());
    }
}
