//! Permission engine errors.
//!
//! # Error Codes
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`AuthError::InvalidRule`] | `AUTH_INVALID_RULE` | No |
//! | [`AuthError::DuplicateRule`] | `AUTH_DUPLICATE_RULE` | No |
//! | [`AuthError::InvalidRegex`] | `AUTH_INVALID_REGEX` | No |

use framelink_types::ErrorCode;
use thiserror::Error;

/// Permission engine error.
///
/// All variants are validation failures: they are raised before any
/// state is mutated, and retrying the same input cannot succeed.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// A rule failed shape validation (empty id, no actions, ...).
    #[error("invalid permission rule: {reason}")]
    InvalidRule {
        /// What was wrong with the rule.
        reason: String,
    },

    /// A rule with this id is already registered.
    #[error("duplicate rule id: {id}")]
    DuplicateRule {
        /// The conflicting rule id.
        id: String,
    },

    /// A regex condition carries an uncompilable pattern.
    #[error("invalid regex in rule condition: {pattern}")]
    InvalidRegex {
        /// The offending pattern.
        pattern: String,
    },
}

impl ErrorCode for AuthError {
    fn code(&self) -> &'static str {
        match self {
            Self::InvalidRule { .. } => "AUTH_INVALID_RULE",
            Self::DuplicateRule { .. } => "AUTH_DUPLICATE_RULE",
            Self::InvalidRegex { .. } => "AUTH_INVALID_REGEX",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}
