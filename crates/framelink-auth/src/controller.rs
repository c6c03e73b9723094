//! The permission controller.
//!
//! Decision pipeline for `check_permission(ctx, action, resource)`:
//!
//! ```text
//! cache hit? ──────────────────────────────► answer
//!     │ miss
//!     ▼
//! effective permissions =
//!     ctx.permissions ∪ role-hierarchy grants   (first-seen wins)
//!     │
//!     ▼ most-specific direct match? ───────────► answer
//!     │ none
//!     ▼
//! enabled rules, highest priority first:
//!     applies to (action, resource)
//!     AND every condition holds ───────────────► grant
//!     │ no rule fired
//!     ▼
//! default = !strict_mode
//! ```
//!
//! Decisions are pure functions of (context, action, resource) given
//! the current rule/hierarchy configuration; the cache is a
//! memoization and is invalidated whenever any of those inputs change.

use crate::{AuthError, CacheKey, PermissionCache, PermissionRule, RoleHierarchy};
use framelink_types::{evaluate, AnnotationContext, Permission};
use parking_lot::{Mutex, RwLock};
use std::time::Duration;
use tracing::debug;

/// Controller configuration.
#[derive(Debug, Clone, Copy)]
pub struct ControllerConfig {
    /// When `true`, unresolved queries are denied; when `false`,
    /// they are allowed. Default: strict (deny).
    pub strict_mode: bool,
    /// Decision cache TTL. Default: 5 minutes.
    pub cache_ttl: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            strict_mode: true,
            cache_ttl: PermissionCache::DEFAULT_TTL,
        }
    }
}

/// Rule-based authorization engine evaluated against the context.
///
/// # Example
///
/// ```
/// use framelink_auth::{ControllerConfig, PermissionController};
/// use framelink_types::{AnnotationContext, Permission, ProjectRef, UserRef};
///
/// let controller = PermissionController::new(ControllerConfig::default());
/// let ctx = AnnotationContext::new(
///     UserRef::new("u1", "Ada"),
///     ProjectRef::new("p1", "Scenes"),
/// )
/// .with_permissions(vec![Permission::allow("edit", "annotation")]);
///
/// assert!(controller.check_permission(&ctx, "edit", "annotation"));
/// assert!(!controller.check_permission(&ctx, "delete", "annotation"));
/// ```
#[derive(Debug)]
pub struct PermissionController {
    config: ControllerConfig,
    /// Kept sorted by descending priority.
    rules: RwLock<Vec<PermissionRule>>,
    hierarchy: RwLock<RoleHierarchy>,
    cache: Mutex<PermissionCache>,
}

impl PermissionController {
    /// Creates a controller with no rules or role hierarchy.
    #[must_use]
    pub fn new(config: ControllerConfig) -> Self {
        Self {
            config,
            rules: RwLock::new(Vec::new()),
            hierarchy: RwLock::new(RoleHierarchy::new()),
            cache: Mutex::new(PermissionCache::new(config.cache_ttl)),
        }
    }

    /// Checks whether `ctx` permits `action` on `resource`.
    ///
    /// Consults the per-(user, action, resource) cache first; misses
    /// run the full pipeline documented at module level.
    pub fn check_permission(&self, ctx: &AnnotationContext, action: &str, resource: &str) -> bool {
        let key = CacheKey::new(&ctx.user.id, action, resource);
        if let Some(cached) = self.cache.lock().get(&key) {
            return cached;
        }

        let allowed = self.compute(ctx, action, resource);
        self.cache.lock().insert(key, allowed);
        allowed
    }

    fn compute(&self, ctx: &AnnotationContext, action: &str, resource: &str) -> bool {
        // Direct ∪ inherited, first-seen precedence on duplicates.
        let effective = self.effective_permissions(ctx);
        if let Some(direct) = evaluate(&effective, action, resource) {
            return direct;
        }

        // Rule engine, highest priority first.
        let rules = self.rules.read();
        for rule in rules.iter() {
            if !rule.enabled || !rule.applies_to(action, resource) {
                continue;
            }
            if rule.matches(ctx) {
                debug!(rule = %rule.id, action, resource, "rule granted access");
                return true;
            }
        }

        !self.config.strict_mode
    }

    /// Returns the context's direct permissions merged with the
    /// role-hierarchy grants for the user's roles.
    #[must_use]
    pub fn effective_permissions(&self, ctx: &AnnotationContext) -> Vec<Permission> {
        let mut out = ctx.permissions.clone();
        let inherited = self.hierarchy.read().permissions_for(&ctx.user.roles);
        for perm in inherited {
            if !out.iter().any(|p| p.same_key(&perm)) {
                out.push(perm);
            }
        }
        out
    }

    /// Registers a rule, keeping the list sorted by priority.
    ///
    /// Invalidates the whole decision cache — a rule can affect any
    /// user.
    ///
    /// # Errors
    ///
    /// - [`AuthError::InvalidRule`] for empty id/name or empty
    ///   action/resource lists
    /// - [`AuthError::InvalidRegex`] if a regex condition fails to
    ///   compile
    /// - [`AuthError::DuplicateRule`] if the id is already registered
    pub fn add_rule(&self, rule: PermissionRule) -> Result<(), AuthError> {
        validate_rule(&rule)?;

        let mut rules = self.rules.write();
        if rules.iter().any(|r| r.id == rule.id) {
            return Err(AuthError::DuplicateRule { id: rule.id });
        }
        rules.push(rule);
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        drop(rules);

        self.cache.lock().invalidate_all();
        Ok(())
    }

    /// Removes a rule by id. Returns `false` if it was unknown.
    pub fn remove_rule(&self, id: &str) -> bool {
        let mut rules = self.rules.write();
        let before = rules.len();
        rules.retain(|r| r.id != id);
        let removed = rules.len() != before;
        drop(rules);

        if removed {
            self.cache.lock().invalidate_all();
        }
        removed
    }

    /// Replaces the permissions granted by holding `role`.
    pub fn set_role_permissions(&self, role: impl Into<String>, permissions: Vec<Permission>) {
        self.hierarchy.write().set_role_permissions(role, permissions);
        self.cache.lock().invalidate_all();
    }

    /// Replaces the parents `role` inherits from.
    pub fn set_role_parents<I, S>(&self, role: impl Into<String>, parents: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hierarchy.write().set_parents(role, parents);
        self.cache.lock().invalidate_all();
    }

    /// Returns a new context with replaced permissions and a fresh
    /// timestamp, clearing the user's cache entries.
    ///
    /// The caller must re-store the returned context (typically via
    /// the context manager) — the input is not mutated.
    #[must_use]
    pub fn update_user_permissions(
        &self,
        ctx: &AnnotationContext,
        permissions: Vec<Permission>,
    ) -> AnnotationContext {
        self.cache.lock().invalidate_user(&ctx.user.id);
        ctx.clone().with_permissions(permissions)
    }

    /// Number of registered rules.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rules.read().len()
    }

    /// Number of live cache entries.
    #[must_use]
    pub fn cached_decisions(&self) -> usize {
        self.cache.lock().len()
    }
}

fn validate_rule(rule: &PermissionRule) -> Result<(), AuthError> {
    if rule.id.trim().is_empty() {
        return Err(AuthError::InvalidRule {
            reason: "rule id must not be empty".into(),
        });
    }
    if rule.name.trim().is_empty() {
        return Err(AuthError::InvalidRule {
            reason: "rule name must not be empty".into(),
        });
    }
    if rule.actions.is_empty() {
        return Err(AuthError::InvalidRule {
            reason: "rule must list at least one action".into(),
        });
    }
    if rule.resources.is_empty() {
        return Err(AuthError::InvalidRule {
            reason: "rule must list at least one resource".into(),
        });
    }
    for condition in &rule.conditions {
        if condition.op == crate::ConditionOp::Regex {
            let pattern = condition.value.as_str().ok_or_else(|| AuthError::InvalidRule {
                reason: "regex condition value must be a string".into(),
            })?;
            regex::Regex::new(pattern).map_err(|_| AuthError::InvalidRegex {
                pattern: pattern.to_string(),
            })?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConditionOp, ConditionTarget, RuleCondition};
    use framelink_types::{ProjectRef, UserRef};
    use serde_json::json;

    fn ctx_with(perms: Vec<Permission>) -> AnnotationContext {
        AnnotationContext::new(
            UserRef::new("u1", "Ada").with_role("annotator"),
            ProjectRef::new("p1", "Scenes"),
        )
        .with_permissions(perms)
    }

    fn permissive() -> PermissionController {
        PermissionController::new(ControllerConfig {
            strict_mode: false,
            ..Default::default()
        })
    }

    #[test]
    fn exact_permission_grants_and_removal_revokes() {
        let controller = PermissionController::new(ControllerConfig::default());
        let ctx = ctx_with(vec![Permission::allow("edit", "annotation")]);
        assert!(controller.check_permission(&ctx, "edit", "annotation"));

        let revoked = controller.update_user_permissions(&ctx, vec![]);
        assert!(!controller.check_permission(&revoked, "edit", "annotation"));
    }

    #[test]
    fn wildcard_action_grants_everything_on_resource_only() {
        let controller = PermissionController::new(ControllerConfig::default());
        let ctx = ctx_with(vec![Permission::allow("*", "annotation")]);

        assert!(controller.check_permission(&ctx, "edit", "annotation"));
        assert!(controller.check_permission(&ctx, "delete", "annotation"));
        assert!(!controller.check_permission(&ctx, "edit", "project"));
    }

    #[test]
    fn strict_mode_denies_unresolved_queries() {
        let strict = PermissionController::new(ControllerConfig::default());
        let lax = permissive();
        let ctx = ctx_with(vec![]);

        assert!(!strict.check_permission(&ctx, "edit", "annotation"));
        assert!(lax.check_permission(&ctx, "edit", "annotation"));
    }

    #[test]
    fn rules_tried_highest_priority_first() {
        let controller = PermissionController::new(ControllerConfig::default());
        let ctx = ctx_with(vec![]);

        // Low-priority rule that would not match (wrong role).
        controller
            .add_rule(
                PermissionRule::new("low", "admins only")
                    .with_action("edit")
                    .with_resource("annotation")
                    .with_condition(RuleCondition::new(
                        ConditionTarget::Role,
                        ConditionOp::Equals,
                        json!("admin"),
                    ))
                    .with_priority(1),
            )
            .unwrap();

        // High-priority rule matching the annotator role.
        controller
            .add_rule(
                PermissionRule::new("high", "annotators may edit")
                    .with_action("edit")
                    .with_resource("annotation")
                    .with_condition(RuleCondition::new(
                        ConditionTarget::Role,
                        ConditionOp::Equals,
                        json!("annotator"),
                    ))
                    .with_priority(10),
            )
            .unwrap();

        assert!(controller.check_permission(&ctx, "edit", "annotation"));
    }

    #[test]
    fn disabled_rules_are_skipped() {
        let controller = PermissionController::new(ControllerConfig::default());
        let ctx = ctx_with(vec![]);

        controller
            .add_rule(
                PermissionRule::new("r1", "would grant")
                    .with_action("edit")
                    .with_resource("annotation")
                    .disabled(),
            )
            .unwrap();

        assert!(!controller.check_permission(&ctx, "edit", "annotation"));
    }

    #[test]
    fn direct_permission_beats_rules() {
        let controller = PermissionController::new(ControllerConfig::default());
        let ctx = ctx_with(vec![Permission::deny("edit", "annotation")]);

        controller
            .add_rule(
                PermissionRule::new("r1", "grant all edits")
                    .with_action("edit")
                    .with_resource("annotation"),
            )
            .unwrap();

        // The explicit deny resolves the query before rules run.
        assert!(!controller.check_permission(&ctx, "edit", "annotation"));
    }

    #[test]
    fn role_hierarchy_contributes_permissions() {
        let controller = PermissionController::new(ControllerConfig::default());
        controller.set_role_permissions("viewer", vec![Permission::allow("view", "annotation")]);
        controller.set_role_parents("annotator", ["viewer"]);

        let ctx = ctx_with(vec![]);
        assert!(controller.check_permission(&ctx, "view", "annotation"));
    }

    #[test]
    fn direct_permission_shadows_inherited() {
        let controller = PermissionController::new(ControllerConfig::default());
        controller.set_role_permissions("annotator", vec![Permission::allow("edit", "annotation")]);

        let ctx = ctx_with(vec![Permission::deny("edit", "annotation")]);
        assert!(!controller.check_permission(&ctx, "edit", "annotation"));
    }

    #[test]
    fn decisions_are_cached_and_invalidated_on_rule_change() {
        let controller = PermissionController::new(ControllerConfig::default());
        let ctx = ctx_with(vec![]);

        assert!(!controller.check_permission(&ctx, "edit", "annotation"));
        assert_eq!(controller.cached_decisions(), 1);

        controller
            .add_rule(
                PermissionRule::new("r1", "grant")
                    .with_action("edit")
                    .with_resource("annotation"),
            )
            .unwrap();

        // Cache was cleared; the new rule takes effect immediately.
        assert_eq!(controller.cached_decisions(), 0);
        assert!(controller.check_permission(&ctx, "edit", "annotation"));
    }

    #[test]
    fn update_user_permissions_clears_only_that_user() {
        let controller = PermissionController::new(ControllerConfig::default());
        let ctx1 = ctx_with(vec![Permission::allow("edit", "annotation")]);
        let mut ctx2 = ctx_with(vec![Permission::allow("edit", "annotation")]);
        ctx2.user.id = "u2".into();

        controller.check_permission(&ctx1, "edit", "annotation");
        controller.check_permission(&ctx2, "edit", "annotation");
        assert_eq!(controller.cached_decisions(), 2);

        let _updated = controller.update_user_permissions(&ctx1, vec![]);
        assert_eq!(controller.cached_decisions(), 1);
    }

    #[test]
    fn add_rule_validation() {
        let controller = PermissionController::new(ControllerConfig::default());

        let no_actions = PermissionRule::new("r1", "n").with_resource("annotation");
        assert!(matches!(
            controller.add_rule(no_actions),
            Err(AuthError::InvalidRule { .. })
        ));

        let bad_regex = PermissionRule::new("r2", "n")
            .with_action("edit")
            .with_resource("annotation")
            .with_condition(RuleCondition::new(
                ConditionTarget::UserField("id".into()),
                ConditionOp::Regex,
                json!("[broken"),
            ));
        assert!(matches!(
            controller.add_rule(bad_regex),
            Err(AuthError::InvalidRegex { .. })
        ));

        let ok = PermissionRule::new("r3", "n")
            .with_action("edit")
            .with_resource("annotation");
        controller.add_rule(ok.clone()).unwrap();
        assert!(matches!(
            controller.add_rule(ok),
            Err(AuthError::DuplicateRule { .. })
        ));
    }

    #[test]
    fn remove_rule_revokes_grant() {
        let controller = PermissionController::new(ControllerConfig::default());
        let ctx = ctx_with(vec![]);

        controller
            .add_rule(
                PermissionRule::new("r1", "grant")
                    .with_action("edit")
                    .with_resource("annotation"),
            )
            .unwrap();
        assert!(controller.check_permission(&ctx, "edit", "annotation"));

        assert!(controller.remove_rule("r1"));
        assert!(!controller.remove_rule("r1"));
        assert!(!controller.check_permission(&ctx, "edit", "annotation"));
    }
}
