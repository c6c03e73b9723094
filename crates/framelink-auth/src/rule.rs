//! Permission rules and their condition language.
//!
//! A [`PermissionRule`] grants access to `(action, resource)` pairs
//! when **every** one of its conditions holds against the current
//! context. Rules are tried highest-priority-first by the controller;
//! the first rule that applies *and* matches wins.
//!
//! # Condition targets
//!
//! Condition fields are an explicit enum with typed accessors — there
//! is no string-keyed reflection into context structs:
//!
//! | Target | Resolves to |
//! |--------|-------------|
//! | `Role` | the user's role list |
//! | `UserField(f)` | `id`/`name`/`email` or a user attribute |
//! | `ProjectField(f)` | `id`/`name` or a project attribute |
//! | `TaskField(f)` | `id`/`name` or a task attribute (absent task ⇒ no value) |
//! | `Time` | the current UTC hour of day (0–23) |
//! | `Custom(k)` | context metadata entry `k` |
//!
//! A condition whose target resolves to nothing evaluates to `false`.

use chrono::{Timelike, Utc};
use framelink_types::AnnotationContext;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Which part of the context a condition inspects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "field")]
pub enum ConditionTarget {
    /// The user's role list.
    Role,
    /// A user field or attribute.
    UserField(String),
    /// A project field or attribute.
    ProjectField(String),
    /// A task field or attribute.
    TaskField(String),
    /// The current UTC hour of day (0–23).
    Time,
    /// A context metadata entry.
    Custom(String),
}

impl ConditionTarget {
    /// Resolves this target against a context.
    ///
    /// Returns `None` when the addressed field does not exist (for
    /// example `TaskField` with no task selected).
    #[must_use]
    pub fn resolve(&self, ctx: &AnnotationContext) -> Option<Value> {
        match self {
            Self::Role => Some(Value::Array(
                ctx.user
                    .roles
                    .iter()
                    .map(|r| Value::String(r.clone()))
                    .collect(),
            )),
            Self::UserField(field) => match field.as_str() {
                "id" => Some(Value::String(ctx.user.id.clone())),
                "name" => Some(Value::String(ctx.user.name.clone())),
                "email" => ctx.user.email.clone().map(Value::String),
                other => ctx.user.attributes.get(other).cloned(),
            },
            Self::ProjectField(field) => match field.as_str() {
                "id" => Some(Value::String(ctx.project.id.clone())),
                "name" => Some(Value::String(ctx.project.name.clone())),
                other => ctx.project.attributes.get(other).cloned(),
            },
            Self::TaskField(field) => {
                let task = ctx.task.as_ref()?;
                match field.as_str() {
                    "id" => Some(Value::String(task.id.clone())),
                    "name" => Some(Value::String(task.name.clone())),
                    other => task.attributes.get(other).cloned(),
                }
            }
            Self::Time => Some(Value::Number(Utc::now().hour().into())),
            Self::Custom(key) => ctx.metadata.get(key).cloned(),
        }
    }
}

/// How a resolved value is compared against the condition value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOp {
    /// Resolved value (or any element of a resolved list) equals.
    Equals,
    /// Substring for strings, membership for lists.
    Contains,
    /// String prefix.
    StartsWith,
    /// String suffix.
    EndsWith,
    /// Regex match on the string form.
    Regex,
    /// Resolved value is one of the listed values.
    In,
    /// Resolved value is none of the listed values.
    NotIn,
}

/// One condition of a [`PermissionRule`]. Conditions are AND'd.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleCondition {
    /// What to inspect.
    pub target: ConditionTarget,
    /// How to compare.
    pub op: ConditionOp,
    /// What to compare against.
    pub value: Value,
}

impl RuleCondition {
    /// Creates a condition.
    #[must_use]
    pub fn new(target: ConditionTarget, op: ConditionOp, value: Value) -> Self {
        Self { target, op, value }
    }

    /// Evaluates the condition against a context.
    ///
    /// An unresolvable target or an uncompilable regex evaluates to
    /// `false` — a broken condition never widens access.
    #[must_use]
    pub fn holds(&self, ctx: &AnnotationContext) -> bool {
        let Some(resolved) = self.target.resolve(ctx) else {
            return false;
        };
        compare(&resolved, self.op, &self.value)
    }
}

/// Applies `op` between a resolved value and the condition value.
fn compare(resolved: &Value, op: ConditionOp, expected: &Value) -> bool {
    match op {
        ConditionOp::Equals => match resolved {
            Value::Array(items) => items.iter().any(|i| i == expected),
            other => other == expected,
        },
        ConditionOp::Contains => match resolved {
            Value::Array(items) => items.iter().any(|i| i == expected),
            Value::String(s) => expected.as_str().is_some_and(|e| s.contains(e)),
            _ => false,
        },
        ConditionOp::StartsWith => string_op(resolved, expected, |s, e| s.starts_with(e)),
        ConditionOp::EndsWith => string_op(resolved, expected, |s, e| s.ends_with(e)),
        ConditionOp::Regex => {
            let Some(pattern) = expected.as_str() else {
                return false;
            };
            match regex::Regex::new(pattern) {
                Ok(re) => match resolved {
                    Value::Array(items) => items
                        .iter()
                        .filter_map(Value::as_str)
                        .any(|s| re.is_match(s)),
                    Value::String(s) => re.is_match(s),
                    other => re.is_match(&other.to_string()),
                },
                Err(_) => {
                    warn!(pattern, "uncompilable regex in rule condition, treating as no-match");
                    false
                }
            }
        }
        ConditionOp::In => match expected {
            Value::Array(allowed) => match resolved {
                Value::Array(items) => items.iter().any(|i| allowed.contains(i)),
                other => allowed.contains(other),
            },
            _ => false,
        },
        ConditionOp::NotIn => match expected {
            Value::Array(denied) => match resolved {
                Value::Array(items) => items.iter().all(|i| !denied.contains(i)),
                other => !denied.contains(other),
            },
            _ => false,
        },
    }
}

fn string_op(resolved: &Value, expected: &Value, op: fn(&str, &str) -> bool) -> bool {
    let Some(e) = expected.as_str() else {
        return false;
    };
    match resolved {
        Value::Array(items) => items.iter().filter_map(Value::as_str).any(|s| op(s, e)),
        Value::String(s) => op(s, e),
        _ => false,
    }
}

/// A granting rule evaluated by the controller.
///
/// A rule *applies* to a query when its action and resource lists
/// both intersect the query (either list may contain `"*"`). An
/// applying rule *grants* access only if every condition holds.
///
/// # Example
///
/// ```
/// use framelink_auth::{ConditionOp, ConditionTarget, PermissionRule, RuleCondition};
/// use serde_json::json;
///
/// let rule = PermissionRule::new("r1", "reviewers may approve")
///     .with_action("approve")
///     .with_resource("annotation")
///     .with_condition(RuleCondition::new(
///         ConditionTarget::Role,
///         ConditionOp::Equals,
///         json!("reviewer"),
///     ))
///     .with_priority(10);
///
/// assert!(rule.applies_to("approve", "annotation"));
/// assert!(!rule.applies_to("approve", "project"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionRule {
    /// Unique rule id.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Conditions, all of which must hold (AND).
    #[serde(default)]
    pub conditions: Vec<RuleCondition>,
    /// Actions this rule can grant (`"*"` = any).
    pub actions: Vec<String>,
    /// Resources this rule can grant (`"*"` = any).
    pub resources: Vec<String>,
    /// Evaluation priority; higher is tried first.
    #[serde(default)]
    pub priority: i32,
    /// Disabled rules are skipped entirely.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl PermissionRule {
    /// Creates an enabled rule with no actions/resources/conditions.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            conditions: Vec::new(),
            actions: Vec::new(),
            resources: Vec::new(),
            priority: 0,
            enabled: true,
        }
    }

    /// Adds an action.
    #[must_use]
    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.actions.push(action.into());
        self
    }

    /// Adds a resource.
    #[must_use]
    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resources.push(resource.into());
        self
    }

    /// Adds a condition.
    #[must_use]
    pub fn with_condition(mut self, condition: RuleCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Sets the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Disables the rule.
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Returns `true` if the rule's lists intersect the query.
    #[must_use]
    pub fn applies_to(&self, action: &str, resource: &str) -> bool {
        let action_hit = self.actions.iter().any(|a| a == "*" || a == action);
        let resource_hit = self.resources.iter().any(|r| r == "*" || r == resource);
        action_hit && resource_hit
    }

    /// Returns `true` if every condition holds against `ctx`.
    #[must_use]
    pub fn matches(&self, ctx: &AnnotationContext) -> bool {
        self.conditions.iter().all(|c| c.holds(ctx))
    }
}
