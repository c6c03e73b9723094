//! Security violation records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which policy a violation breached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// A Content-Security-Policy directive was violated.
    Csp,
    /// A message arrived from an origin outside the allow-list.
    Cors,
    /// A non-HTTPS URL was used where HTTPS is enforced.
    Https,
    /// A frame URL pointed at an untrusted domain.
    Domain,
}

/// How serious a violation is.
///
/// CSP violations are classified by directive:
///
/// | Directive | Severity |
/// |-----------|----------|
/// | `script-src`, `object-src`, `base-uri` | High |
/// | `style-src`, `img-src`, `font-src` | Medium |
/// | anything else | Low |
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Cosmetic or informational.
    Low,
    /// Resource-loading directives.
    Medium,
    /// Code-execution or trust-boundary directives.
    High,
}

/// Classifies a CSP directive into a [`Severity`].
#[must_use]
pub fn classify_csp_directive(directive: &str) -> Severity {
    match directive {
        "script-src" | "object-src" | "base-uri" => Severity::High,
        "style-src" | "img-src" | "font-src" => Severity::Medium,
        _ => Severity::Low,
    }
}

/// One recorded breach of the configured security policy.
///
/// Violations are append-only; the manager keeps them in a bounded
/// ring buffer and forwards each one to subscribers as it is recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityViolation {
    /// Which policy was breached.
    pub kind: ViolationKind,
    /// Human-readable description.
    pub message: String,
    /// Where the offending input came from (URL, origin, directive).
    pub source: String,
    /// When the violation was recorded.
    pub timestamp: DateTime<Utc>,
    /// How serious it is.
    pub severity: Severity,
    /// Whether the offending action was blocked (vs. report-only).
    pub blocked: bool,
}

impl SecurityViolation {
    /// Creates a violation stamped now.
    #[must_use]
    pub fn new(
        kind: ViolationKind,
        message: impl Into<String>,
        source: impl Into<String>,
        severity: Severity,
        blocked: bool,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: source.into(),
            timestamp: Utc::now(),
            severity,
            blocked,
        }
    }
}
