//! Declarative security policy.
//!
//! [`SecurityPolicy`] is the single source of truth for what the
//! integration layer will trust: CSP directives, the CORS origin
//! allow-list, HTTPS enforcement, and the trusted-domain list for
//! frame URLs. It is applied once by
//! [`SecurityPolicyManager::initialize`](crate::SecurityPolicyManager::initialize)
//! and never mutated afterwards.
//!
//! # Matching rules
//!
//! Domain entries come in two forms:
//!
//! - `example.com` — exact hostname match
//! - `*.example.com` — the apex and any subdomain
//!
//! Origin entries additionally accept a bare `*` meaning "any".

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Immutable security policy for one embedded-tool session.
///
/// # Example
///
/// ```
/// use framelink_security::SecurityPolicy;
///
/// let policy = SecurityPolicy::new()
///     .trust_domain("*.annotator.example.com")
///     .allow_origin("https://annotator.example.com")
///     .with_csp_directive("script-src", ["'self'", "https://annotator.example.com"]);
///
/// assert!(policy.enforce_https);
/// assert!(policy.is_trusted_domain("tool.annotator.example.com"));
/// assert!(!policy.is_trusted_domain("evil.example.org"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityPolicy {
    /// CSP directives, keyed by directive name.
    ///
    /// Rendered into a meta-tag value by [`csp_meta_content`]
    /// (`Self::csp_meta_content`). HSTS, X-Frame-Options and friends
    /// are server-side headers and cannot be set from this layer.
    pub csp_directives: BTreeMap<String, Vec<String>>,
    /// Origins allowed to message the host (exact, `*.suffix`, or `*`).
    pub allowed_origins: Vec<String>,
    /// Reject non-HTTPS frame URLs.
    pub enforce_https: bool,
    /// Hostnames frames may be loaded from (exact or `*.suffix`).
    pub trusted_domains: Vec<String>,
    /// The host document's own origin; messages from it always pass.
    pub own_origin: Option<String>,
}

impl Default for SecurityPolicy {
    fn default() -> Self {
        let mut csp = BTreeMap::new();
        csp.insert("default-src".to_string(), vec!["'self'".to_string()]);
        csp.insert("object-src".to_string(), vec!["'none'".to_string()]);
        csp.insert("base-uri".to_string(), vec!["'self'".to_string()]);
        Self {
            csp_directives: csp,
            allowed_origins: Vec::new(),
            enforce_https: true,
            trusted_domains: Vec::new(),
            own_origin: None,
        }
    }
}

impl SecurityPolicy {
    /// Creates the default policy: HTTPS enforced, empty allow-lists.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a trusted frame domain (exact or `*.suffix` form).
    #[must_use]
    pub fn trust_domain(mut self, domain: impl Into<String>) -> Self {
        self.trusted_domains.push(domain.into());
        self
    }

    /// Adds an allowed message origin.
    #[must_use]
    pub fn allow_origin(mut self, origin: impl Into<String>) -> Self {
        self.allowed_origins.push(origin.into());
        self
    }

    /// Sets the host document's own origin.
    #[must_use]
    pub fn with_own_origin(mut self, origin: impl Into<String>) -> Self {
        self.own_origin = Some(origin.into());
        self
    }

    /// Disables HTTPS enforcement (development setups only).
    #[must_use]
    pub fn without_https_enforcement(mut self) -> Self {
        self.enforce_https = false;
        self
    }

    /// Sets one CSP directive, replacing any previous sources.
    #[must_use]
    pub fn with_csp_directive<I, S>(mut self, directive: impl Into<String>, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.csp_directives
            .insert(directive.into(), sources.into_iter().map(Into::into).collect());
        self
    }

    /// Returns `true` if `host` matches the trusted-domain list.
    #[must_use]
    pub fn is_trusted_domain(&self, host: &str) -> bool {
        self.trusted_domains
            .iter()
            .any(|entry| domain_matches(entry, host))
    }

    /// Returns `true` if `origin` matches the CORS allow-list.
    ///
    /// This is the raw list check; same-origin short-circuiting lives
    /// in [`SecurityPolicyManager::is_origin_allowed`]
    /// (crate::SecurityPolicyManager::is_origin_allowed).
    #[must_use]
    pub fn origin_in_allow_list(&self, origin: &str) -> bool {
        self.allowed_origins.iter().any(|entry| {
            entry == "*" || entry == origin || origin_suffix_matches(entry, origin)
        })
    }

    /// Renders the CSP directives as a meta-tag `content` value.
    ///
    /// # Example
    ///
    /// ```
    /// use framelink_security::SecurityPolicy;
    ///
    /// let content = SecurityPolicy::new().csp_meta_content();
    /// assert!(content.contains("default-src 'self'"));
    /// ```
    #[must_use]
    pub fn csp_meta_content(&self) -> String {
        self.csp_directives
            .iter()
            .map(|(directive, sources)| format!("{} {}", directive, sources.join(" ")))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Exact or `*.suffix` hostname match.
fn domain_matches(entry: &str, host: &str) -> bool {
    if let Some(base) = entry.strip_prefix("*.") {
        host == base || host.ends_with(&format!(".{base}"))
    } else {
        entry == host
    }
}

/// `*.suffix` match on the host part of an origin entry.
///
/// Entry `https://*.example.com` matches `https://a.example.com` and
/// `https://example.com`; the scheme must agree.
fn origin_suffix_matches(entry: &str, origin: &str) -> bool {
    let Some((entry_scheme, entry_host)) = entry.split_once("://") else {
        return false;
    };
    let Some((origin_scheme, origin_host)) = origin.split_once("://") else {
        return false;
    };
    entry_scheme == origin_scheme && domain_matches(entry_host, origin_host)
}
