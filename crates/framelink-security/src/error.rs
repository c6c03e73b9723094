//! Security layer errors.
//!
//! # Error Codes
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`SecurityError::NotInitialized`] | `SECURITY_NOT_INITIALIZED` | Yes |
//! | [`SecurityError::InsecureUrl`] | `SECURITY_INSECURE_URL` | No |
//! | [`SecurityError::UntrustedDomain`] | `SECURITY_UNTRUSTED_DOMAIN` | No |
//! | [`SecurityError::MissingHost`] | `SECURITY_MISSING_HOST` | No |

use framelink_types::ErrorCode;
use thiserror::Error;

/// Security policy error.
#[derive(Debug, Clone, Error)]
pub enum SecurityError {
    /// The policy was queried before [`initialize`] was called.
    ///
    /// [`initialize`]: crate::SecurityPolicyManager::initialize
    #[error("security policy not initialized")]
    NotInitialized,

    /// HTTPS is enforced and the URL uses another scheme.
    #[error("insecure frame URL (https required): {url}")]
    InsecureUrl {
        /// The offending URL.
        url: String,
    },

    /// The URL's hostname is not on the trusted-domain list.
    #[error("untrusted frame domain: {host}")]
    UntrustedDomain {
        /// The offending hostname.
        host: String,
    },

    /// The URL carries no hostname to validate.
    #[error("frame URL has no host: {url}")]
    MissingHost {
        /// The offending URL.
        url: String,
    },
}

impl ErrorCode for SecurityError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotInitialized => "SECURITY_NOT_INITIALIZED",
            Self::InsecureUrl { .. } => "SECURITY_INSECURE_URL",
            Self::UntrustedDomain { .. } => "SECURITY_UNTRUSTED_DOMAIN",
            Self::MissingHost { .. } => "SECURITY_MISSING_HOST",
        }
    }

    fn is_recoverable(&self) -> bool {
        // Only the ordering error can be fixed by the caller.
        matches!(self, Self::NotInitialized)
    }
}
