//! Role hierarchy and per-role permission grants.
//!
//! Roles may inherit from other roles; a user's effective permission
//! list is their direct context permissions followed by the
//! permissions of every role reachable through the hierarchy.
//! First-seen entries win on duplicate `(action, resource)` keys, so
//! a direct permission always shadows an inherited one.

use framelink_types::Permission;
use std::collections::{HashMap, HashSet};

/// Role inheritance graph plus per-role permission grants.
///
/// # Example
///
/// ```
/// use framelink_auth::RoleHierarchy;
/// use framelink_types::Permission;
///
/// let mut roles = RoleHierarchy::new();
/// roles.set_role_permissions("viewer", vec![Permission::allow("view", "annotation")]);
/// roles.set_role_permissions("editor", vec![Permission::allow("edit", "annotation")]);
/// roles.set_parents("editor", ["viewer"]);
///
/// let perms = roles.permissions_for(&["editor".to_string()]);
/// assert_eq!(perms.len(), 2); // edit + inherited view
/// ```
#[derive(Debug, Clone, Default)]
pub struct RoleHierarchy {
    /// role → roles it inherits from.
    parents: HashMap<String, Vec<String>>,
    /// role → permissions granted by holding it.
    grants: HashMap<String, Vec<Permission>>,
}

impl RoleHierarchy {
    /// Creates an empty hierarchy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the permissions granted by `role`.
    pub fn set_role_permissions(
        &mut self,
        role: impl Into<String>,
        permissions: Vec<Permission>,
    ) {
        self.grants.insert(role.into(), permissions);
    }

    /// Replaces the roles `role` inherits from.
    pub fn set_parents<I, S>(&mut self, role: impl Into<String>, parents: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parents
            .insert(role.into(), parents.into_iter().map(Into::into).collect());
    }

    /// Collects the permissions reachable from `roles`.
    ///
    /// Walks the inheritance graph breadth-first, cycle-safe, and
    /// deduplicates on `(action, resource)` with first-seen
    /// precedence — a role's own grants shadow its ancestors'.
    #[must_use]
    pub fn permissions_for(&self, roles: &[String]) -> Vec<Permission> {
        let mut out: Vec<Permission> = Vec::new();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut queue: Vec<&str> = roles.iter().map(String::as_str).collect();

        while let Some(role) = queue.pop() {
            if !visited.insert(role) {
                continue;
            }
            if let Some(grants) = self.grants.get(role) {
                for perm in grants {
                    if !out.iter().any(|p| p.same_key(perm)) {
                        out.push(perm.clone());
                    }
                }
            }
            if let Some(parents) = self.parents.get(role) {
                queue.extend(parents.iter().map(String::as_str));
            }
        }

        out
    }

    /// Returns `true` if no roles are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parents.is_empty() && self.grants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn empty_hierarchy_grants_nothing() {
        let h = RoleHierarchy::new();
        assert!(h.permissions_for(&roles(&["admin"])).is_empty());
        assert!(h.is_empty());
    }

    #[test]
    fn direct_role_grants() {
        let mut h = RoleHierarchy::new();
        h.set_role_permissions("viewer", vec![Permission::allow("view", "annotation")]);
        let perms = h.permissions_for(&roles(&["viewer"]));
        assert_eq!(perms, vec![Permission::allow("view", "annotation")]);
    }

    #[test]
    fn transitive_inheritance() {
        let mut h = RoleHierarchy::new();
        h.set_role_permissions("viewer", vec![Permission::allow("view", "annotation")]);
        h.set_role_permissions("editor", vec![Permission::allow("edit", "annotation")]);
        h.set_role_permissions("admin", vec![Permission::allow("*", "*")]);
        h.set_parents("editor", ["viewer"]);
        h.set_parents("admin", ["editor"]);

        let perms = h.permissions_for(&roles(&["admin"]));
        assert_eq!(perms.len(), 3);
    }

    #[test]
    fn first_seen_shadows_inherited() {
        let mut h = RoleHierarchy::new();
        h.set_role_permissions("viewer", vec![Permission::allow("edit", "annotation")]);
        h.set_role_permissions("restricted", vec![Permission::deny("edit", "annotation")]);
        h.set_parents("restricted", ["viewer"]);

        let perms = h.permissions_for(&roles(&["restricted"]));
        assert_eq!(perms.len(), 1);
        assert!(!perms[0].allowed); // the child's deny shadows the parent's allow
    }

    #[test]
    fn cycles_terminate() {
        let mut h = RoleHierarchy::new();
        h.set_role_permissions("a", vec![Permission::allow("x", "y")]);
        h.set_parents("a", ["b"]);
        h.set_parents("b", ["a"]);

        let perms = h.permissions_for(&roles(&["a"]));
        assert_eq!(perms.len(), 1);
    }

    #[test]
    fn multiple_roles_merge() {
        let mut h = RoleHierarchy::new();
        h.set_role_permissions("viewer", vec![Permission::allow("view", "annotation")]);
        h.set_role_permissions("exporter", vec![Permission::allow("export", "annotation")]);

        let perms = h.permissions_for(&roles(&["viewer", "exporter"]));
        assert_eq!(perms.len(), 2);
    }
}
