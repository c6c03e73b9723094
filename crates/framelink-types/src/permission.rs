//! Permission entries and wildcard matching.
//!
//! A [`Permission`] is keyed by `(action, resource)`; `"*"` wildcards
//! either field. The same matching rule is used on both sides of the
//! frame boundary so the host and the embedded tool agree on what a
//! permission list means.
//!
//! # Specificity
//!
//! When several entries match a query, the **most specific** one wins:
//! an exact `(action, resource)` pair beats a single-wildcard entry,
//! which beats `(*, *)`. Among equally specific entries the first one
//! in the list wins.

use serde::{Deserialize, Serialize};

/// Wildcard token accepted in either permission field.
pub const WILDCARD: &str = "*";

/// A single permission entry.
///
/// # Example
///
/// ```
/// use framelink_types::Permission;
///
/// let p = Permission::allow("edit", "annotation");
/// assert!(p.matches("edit", "annotation"));
/// assert!(!p.matches("delete", "annotation"));
///
/// let any = Permission::allow("*", "annotation");
/// assert!(any.matches("delete", "annotation"));
/// assert!(!any.matches("delete", "project"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    /// Action being permitted or denied (e.g. `"edit"`, `"*"`).
    pub action: String,
    /// Resource the action applies to (e.g. `"annotation"`, `"*"`).
    pub resource: String,
    /// Whether the action is allowed.
    pub allowed: bool,
}

impl Permission {
    /// Creates an allowing entry.
    #[must_use]
    pub fn allow(action: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            resource: resource.into(),
            allowed: true,
        }
    }

    /// Creates a denying entry.
    #[must_use]
    pub fn deny(action: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            resource: resource.into(),
            allowed: false,
        }
    }

    /// Returns `true` if this entry matches the query, honoring `"*"`.
    #[must_use]
    pub fn matches(&self, action: &str, resource: &str) -> bool {
        (self.action == WILDCARD || self.action == action)
            && (self.resource == WILDCARD || self.resource == resource)
    }

    /// Number of non-wildcard fields (0-2). Higher is more specific.
    #[must_use]
    pub fn specificity(&self) -> u8 {
        u8::from(self.action != WILDCARD) + u8::from(self.resource != WILDCARD)
    }

    /// Returns `true` if the `(action, resource)` key equals `other`'s.
    ///
    /// Used for first-seen deduplication when merging direct and
    /// inherited permission lists.
    #[must_use]
    pub fn same_key(&self, other: &Self) -> bool {
        self.action == other.action && self.resource == other.resource
    }
}

/// Evaluates a permission list against a query.
///
/// Returns `Some(allowed)` from the most specific matching entry, or
/// `None` when nothing matches (the caller decides the default).
///
/// # Example
///
/// ```
/// use framelink_types::{evaluate, Permission};
///
/// let perms = vec![
///     Permission::allow("*", "annotation"),
///     Permission::deny("delete", "annotation"),
/// ];
///
/// // Exact deny beats the wildcard allow.
/// assert_eq!(evaluate(&perms, "delete", "annotation"), Some(false));
/// assert_eq!(evaluate(&perms, "edit", "annotation"), Some(true));
/// assert_eq!(evaluate(&perms, "edit", "project"), None);
/// ```
#[must_use]
pub fn evaluate(permissions: &[Permission], action: &str, resource: &str) -> Option<bool> {
    permissions
        .iter()
        .filter(|p| p.matches(action, resource))
        // max_by_key returns the *last* maximum; reverse index keeps
        // first-seen precedence on ties.
        .enumerate()
        .max_by_key(|(idx, p)| (p.specificity(), std::cmp::Reverse(*idx)))
        .map(|(_, p)| p.allowed)
}
