//! Unified error interface for framelink.
//!
//! Every error enum in the workspace implements [`ErrorCode`] so the
//! host can branch on a machine-readable code instead of matching on
//! concrete error types, and so retry logic can ask "is this worth
//! retrying" uniformly.
//!
//! # Example
//!
//! ```
//! use framelink_types::ErrorCode;
//!
//! #[derive(Debug)]
//! enum MyError {
//!     NotFound,
//!     Timeout,
//! }
//!
//! impl ErrorCode for MyError {
//!     fn code(&self) -> &'static str {
//!         match self {
//!             Self::NotFound => "MY_NOT_FOUND",
//!             Self::Timeout => "MY_TIMEOUT",
//!         }
//!     }
//!
//!     fn is_recoverable(&self) -> bool {
//!         matches!(self, Self::Timeout)
//!     }
//! }
//! ```

/// Machine-readable error code interface.
///
/// # Code Format
///
/// - UPPER_SNAKE_CASE, prefixed with the owning layer
///   (e.g. `"FRAME_"`, `"SYNC_"`, `"SECURITY_"`)
/// - Stable once defined — changing a code is a breaking change
///
/// # Recoverability
///
/// An error is recoverable when retrying may succeed or the host can
/// take corrective action (timeouts, transient network failures).
/// Validation and permission errors are not — retrying the same input
/// cannot change the outcome.
pub trait ErrorCode {
    /// Returns the machine-readable error code.
    fn code(&self) -> &'static str;

    /// Returns whether retrying or corrective action may help.
    fn is_recoverable(&self) -> bool;
}

/// Validates that an error code follows framelink conventions.
///
/// # Panics
///
/// Panics with a descriptive message if the code is empty, not
/// UPPER_SNAKE_CASE, or missing the expected prefix.
pub fn assert_error_code<E: ErrorCode>(err: &E, expected_prefix: &str) {
    let code = err.code();

    assert!(!code.is_empty(), "error code must not be empty");
    assert!(
        code.starts_with(expected_prefix),
        "error code '{}' must start with prefix '{}'",
        code,
        expected_prefix
    );
    assert!(
        is_upper_snake_case(code),
        "error code '{}' must be UPPER_SNAKE_CASE",
        code
    );
}

/// Validates every variant of an error enum at once.
pub fn assert_error_codes<E: ErrorCode>(errors: &[E], expected_prefix: &str) {
    for err in errors {
        assert_error_code(err, expected_prefix);
    }
}

/// Checks if a string is UPPER_SNAKE_CASE.
fn is_upper_snake_case(s: &str) -> bool {
    if s.is_empty() || s.starts_with('_') || s.ends_with('_') || s.contains("__") {
        return false;
    }
    s.chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    enum TestError {
        Transient,
        Permanent,
    }

    impl ErrorCode for TestError {
        fn code(&self) -> &'static str {
            match self {
                Self::Transient => "TEST_TRANSIENT",
                Self::Permanent => "TEST_PERMANENT",
            }
        }

        fn is_recoverable(&self) -> bool {
            matches!(self, Self::Transient)
        }
    }

    #[test]
    fn error_code_trait() {
        assert_eq!(TestError::Transient.code(), "TEST_TRANSIENT");
        assert!(TestError::Transient.is_recoverable());
        assert!(!TestError::Permanent.is_recoverable());
    }

    #[test]
    fn assert_error_codes_all_variants() {
        assert_error_codes(&[TestError::Transient, TestError::Permanent], "TEST_");
    }

    #[test]
    #[should_panic(expected = "must start with prefix")]
    fn wrong_prefix_panics() {
        assert_error_code(&TestError::Transient, "WRONG_");
    }

    #[test]
    fn upper_snake_case_rules() {
        assert!(is_upper_snake_case("SYNC_TIMEOUT"));
        assert!(is_upper_snake_case("A_1"));
        assert!(!is_upper_snake_case(""));
        assert!(!is_upper_snake_case("lower"));
        assert!(!is_upper_snake_case("_LEAD"));
        assert!(!is_upper_snake_case("TRAIL_"));
        assert!(!is_upper_snake_case("DOUBLE__UNDER"));
    }
}
