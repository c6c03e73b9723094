//! The security policy manager.
//!
//! [`SecurityPolicyManager`] is the single authority every other
//! component consults before trusting boundary-crossing input:
//!
//! - [`validate_frame_url`](SecurityPolicyManager::validate_frame_url)
//!   gates frame creation
//! - [`is_origin_allowed`](SecurityPolicyManager::is_origin_allowed)
//!   gates every inbound message
//! - [`report_csp_violation`](SecurityPolicyManager::report_csp_violation)
//!   classifies browser-reported CSP violations and forwards them
//!
//! The manager holds no session state — only the immutable policy,
//! the bounded violation log, and the subscriber list.

use crate::{classify_csp_directive, SecurityError, SecurityPolicy, SecurityViolation, Severity, ViolationKind};
use framelink_event::Emitter;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};
use url::Url;

/// Hard cap on the violation log.
const VIOLATION_LOG_CAP: usize = 1000;
/// Size the log is trimmed to once the cap is hit.
const VIOLATION_LOG_TRIM: usize = 500;

/// Owns the security policy and the violation log.
///
/// # Example
///
/// ```
/// use framelink_security::{SecurityPolicy, SecurityPolicyManager};
/// use url::Url;
///
/// let manager = SecurityPolicyManager::new(
///     SecurityPolicy::new().trust_domain("trusted.com"),
/// );
/// manager.initialize();
///
/// let ok = Url::parse("https://trusted.com/tool").unwrap();
/// assert!(manager.validate_frame_url(&ok).is_ok());
///
/// let bad = Url::parse("https://untrusted.com/tool").unwrap();
/// assert!(manager.validate_frame_url(&bad).is_err());
/// assert_eq!(manager.violation_count(), 1);
/// ```
#[derive(Debug)]
pub struct SecurityPolicyManager {
    policy: SecurityPolicy,
    initialized: AtomicBool,
    violations: Mutex<VecDeque<SecurityViolation>>,
    emitter: Emitter<SecurityViolation>,
}

impl SecurityPolicyManager {
    /// Creates a manager with the given policy (not yet applied).
    #[must_use]
    pub fn new(policy: SecurityPolicy) -> Self {
        Self {
            policy,
            initialized: AtomicBool::new(false),
            violations: Mutex::new(VecDeque::new()),
            emitter: Emitter::new(),
        }
    }

    /// Applies the policy. Idempotent; returns `true` on first call.
    pub fn initialize(&self) -> bool {
        let first = !self.initialized.swap(true, Ordering::SeqCst);
        if first {
            debug!(
                trusted_domains = self.policy.trusted_domains.len(),
                allowed_origins = self.policy.allowed_origins.len(),
                enforce_https = self.policy.enforce_https,
                "security policy applied"
            );
        }
        first
    }

    /// Returns the configured policy.
    #[must_use]
    pub fn policy(&self) -> &SecurityPolicy {
        &self.policy
    }

    /// Validates a frame URL against the HTTPS and trusted-domain rules.
    ///
    /// A rejection records a high-severity, blocked violation before
    /// returning the error.
    ///
    /// # Errors
    ///
    /// - [`SecurityError::NotInitialized`] before [`initialize`](Self::initialize)
    /// - [`SecurityError::InsecureUrl`] when HTTPS is enforced and absent
    /// - [`SecurityError::MissingHost`] for hostless URLs
    /// - [`SecurityError::UntrustedDomain`] when the host fails the list
    pub fn validate_frame_url(&self, url: &Url) -> Result<(), SecurityError> {
        if !self.initialized.load(Ordering::SeqCst) {
            return Err(SecurityError::NotInitialized);
        }

        if self.policy.enforce_https && url.scheme() != "https" {
            self.record(SecurityViolation::new(
                ViolationKind::Https,
                format!("frame URL must use https: {url}"),
                url.as_str(),
                Severity::High,
                true,
            ));
            return Err(SecurityError::InsecureUrl {
                url: url.to_string(),
            });
        }

        let Some(host) = url.host_str() else {
            self.record(SecurityViolation::new(
                ViolationKind::Domain,
                format!("frame URL has no host: {url}"),
                url.as_str(),
                Severity::High,
                true,
            ));
            return Err(SecurityError::MissingHost {
                url: url.to_string(),
            });
        };

        if !self.policy.is_trusted_domain(host) {
            self.record(SecurityViolation::new(
                ViolationKind::Domain,
                format!("frame domain not in trusted list: {host}"),
                url.as_str(),
                Severity::High,
                true,
            ));
            return Err(SecurityError::UntrustedDomain {
                host: host.to_string(),
            });
        }

        Ok(())
    }

    /// Returns `true` if an inbound message from `origin` may be trusted.
    ///
    /// Same-origin always passes; otherwise the origin must match the
    /// CORS allow-list (exact, `*.suffix`, or `*`). A rejection records
    /// a blocked CORS violation.
    pub fn is_origin_allowed(&self, origin: &str) -> bool {
        if !self.initialized.load(Ordering::SeqCst) {
            warn!(origin, "origin check before policy initialization, denying");
            return false;
        }

        if self
            .policy
            .own_origin
            .as_deref()
            .is_some_and(|own| own == origin)
        {
            return true;
        }

        if self.policy.origin_in_allow_list(origin) {
            return true;
        }

        self.record(SecurityViolation::new(
            ViolationKind::Cors,
            format!("message origin not allowed: {origin}"),
            origin,
            Severity::High,
            true,
        ));
        false
    }

    /// Records a browser-reported CSP violation.
    ///
    /// The directive decides the severity (see
    /// [`classify_csp_directive`]); the violation is logged and
    /// forwarded to subscribers. Returns the assigned severity.
    pub fn report_csp_violation(
        &self,
        directive: &str,
        blocked_uri: &str,
        source_document: &str,
    ) -> Severity {
        let severity = classify_csp_directive(directive);
        self.record(SecurityViolation::new(
            ViolationKind::Csp,
            format!("CSP violation on {directive}: blocked {blocked_uri}"),
            source_document,
            severity,
            true,
        ));
        severity
    }

    /// Records a rejected inbound message (malformed envelope, unknown
    /// message kind, or bad signature).
    ///
    /// Origin-level rejections are recorded by
    /// [`is_origin_allowed`](Self::is_origin_allowed) instead; this
    /// covers messages from an *allowed* origin that fail envelope
    /// validation.
    pub fn report_message_violation(&self, origin: &str, detail: &str) {
        self.record(SecurityViolation::new(
            ViolationKind::Cors,
            format!("inbound message rejected: {detail}"),
            origin,
            Severity::Medium,
            true,
        ));
    }

    /// Returns a clone of the violation emitter for subscription.
    #[must_use]
    pub fn events(&self) -> Emitter<SecurityViolation> {
        self.emitter.clone()
    }

    /// Snapshot of the violation log, oldest first.
    #[must_use]
    pub fn violations(&self) -> Vec<SecurityViolation> {
        self.violations.lock().iter().cloned().collect()
    }

    /// Number of retained violations.
    #[must_use]
    pub fn violation_count(&self) -> usize {
        self.violations.lock().len()
    }

    /// Drops all retained violations (the log, not the subscribers).
    pub fn clear_violations(&self) {
        self.violations.lock().clear();
    }

    /// Appends to the capped log and notifies subscribers.
    fn record(&self, violation: SecurityViolation) {
        warn!(
            kind = ?violation.kind,
            severity = ?violation.severity,
            source = %violation.source,
            "security violation: {}",
            violation.message
        );
        {
            let mut log = self.violations.lock();
            log.push_back(violation.clone());
            if log.len() > VIOLATION_LOG_CAP {
                // Keep the most recent half of the trim target.
                while log.len() > VIOLATION_LOG_TRIM {
                    log.pop_front();
                }
            }
        }
        self.emitter.emit(&violation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    fn manager() -> SecurityPolicyManager {
        let m = SecurityPolicyManager::new(
            SecurityPolicy::new()
                .trust_domain("trusted.com")
                .trust_domain("*.wild.com")
                .allow_origin("https://tool.example.com")
                .with_own_origin("https://host.app"),
        );
        m.initialize();
        m
    }

    #[test]
    fn initialize_is_idempotent() {
        let m = SecurityPolicyManager::new(SecurityPolicy::new());
        assert!(m.initialize());
        assert!(!m.initialize());
    }

    #[test]
    fn validate_before_initialize_fails() {
        let m = SecurityPolicyManager::new(SecurityPolicy::new().trust_domain("trusted.com"));
        let url = Url::parse("https://trusted.com/").unwrap();
        assert!(matches!(
            m.validate_frame_url(&url),
            Err(SecurityError::NotInitialized)
        ));
    }

    #[test]
    fn http_rejected_under_https_enforcement() {
        let m = manager();
        let url = Url::parse("http://trusted.com/tool").unwrap();
        let err = m.validate_frame_url(&url).unwrap_err();
        assert!(matches!(err, SecurityError::InsecureUrl { .. }));

        let violations = m.violations();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, ViolationKind::Https);
        assert_eq!(violations[0].severity, Severity::High);
        assert!(violations[0].blocked);
    }

    #[test]
    fn untrusted_domain_rejected_even_over_https() {
        let m = manager();
        let url = Url::parse("https://untrusted.com/tool").unwrap();
        let err = m.validate_frame_url(&url).unwrap_err();
        assert!(matches!(err, SecurityError::UntrustedDomain { .. }));
        assert_eq!(m.violations()[0].kind, ViolationKind::Domain);
    }

    #[test]
    fn trusted_exact_and_wildcard_pass() {
        let m = manager();
        for url in [
            "https://trusted.com/tool",
            "https://wild.com/tool",
            "https://deep.sub.wild.com/tool",
        ] {
            assert!(m.validate_frame_url(&Url::parse(url).unwrap()).is_ok(), "{url}");
        }
        assert_eq!(m.violation_count(), 0);
    }

    #[test]
    fn http_allowed_when_enforcement_disabled() {
        let m = SecurityPolicyManager::new(
            SecurityPolicy::new()
                .without_https_enforcement()
                .trust_domain("trusted.com"),
        );
        m.initialize();
        let url = Url::parse("http://trusted.com/").unwrap();
        assert!(m.validate_frame_url(&url).is_ok());
    }

    #[test]
    fn same_origin_always_allowed() {
        let m = manager();
        assert!(m.is_origin_allowed("https://host.app"));
        assert_eq!(m.violation_count(), 0);
    }

    #[test]
    fn allow_listed_origin_passes() {
        let m = manager();
        assert!(m.is_origin_allowed("https://tool.example.com"));
    }

    #[test]
    fn unknown_origin_denied_and_logged() {
        let m = manager();
        assert!(!m.is_origin_allowed("https://evil.example.org"));
        let violations = m.violations();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, ViolationKind::Cors);
        assert!(violations[0].blocked);
    }

    #[test]
    fn csp_violation_classified_and_forwarded() {
        let m = manager();
        let seen = Arc::new(AtomicUsize::new(0));
        let seen2 = Arc::clone(&seen);
        m.events().subscribe(move |v: &SecurityViolation| {
            assert_eq!(v.kind, ViolationKind::Csp);
            seen2.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(
            m.report_csp_violation("script-src", "https://evil.org/x.js", "https://host.app"),
            Severity::High
        );
        assert_eq!(
            m.report_csp_violation("img-src", "https://evil.org/x.png", "https://host.app"),
            Severity::Medium
        );
        assert_eq!(
            m.report_csp_violation("connect-src", "wss://evil.org", "https://host.app"),
            Severity::Low
        );
        assert_eq!(seen.load(Ordering::SeqCst), 3);
        assert_eq!(m.violation_count(), 3);
    }

    #[test]
    fn violation_log_is_trimmed_at_cap() {
        let m = manager();
        for i in 0..=VIOLATION_LOG_CAP {
            m.report_csp_violation("connect-src", &format!("https://x{i}.org"), "doc");
        }
        // One over the cap triggers a trim down to the target size.
        assert_eq!(m.violation_count(), VIOLATION_LOG_TRIM);
        // Oldest entries were dropped, newest kept.
        let last = m.violations().pop().unwrap();
        assert!(last.message.contains(&format!("x{VIOLATION_LOG_CAP}")));
    }

    #[test]
    fn clear_violations_empties_log() {
        let m = manager();
        m.report_csp_violation("script-src", "x", "doc");
        m.clear_violations();
        assert_eq!(m.violation_count(), 0);
    }
}
