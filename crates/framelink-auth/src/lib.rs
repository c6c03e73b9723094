//! Rule-based permission engine.
//!
//! Decides whether a user context permits an action on a resource,
//! combining three sources in order of precedence:
//!
//! ```text
//! ┌────────────────────┐
//! │ direct permissions │  context-carried, most specific match wins
//! └─────────┬──────────┘
//!           │ unioned with (direct shadows inherited)
//! ┌─────────▼──────────┐
//! │   RoleHierarchy    │  per-role grants, BFS over inheritance
//! └─────────┬──────────┘
//!           │ unresolved queries fall through to
//! ┌─────────▼──────────┐
//! │  PermissionRule    │  conditional grants, priority-ordered
//! └─────────┬──────────┘
//!           │ nothing fired
//!           ▼
//!      !strict_mode
//! ```
//!
//! Decisions are memoized per (user, action, resource) in a
//! TTL-bounded [`PermissionCache`]; any rule or hierarchy change
//! invalidates it.

#![warn(missing_docs)]

mod cache;
mod controller;
mod error;
mod hierarchy;
mod rule;

pub use cache::{CacheKey, PermissionCache};
pub use controller::{ControllerConfig, PermissionController};
pub use error::AuthError;
pub use hierarchy::RoleHierarchy;
pub use rule::{ConditionOp, ConditionTarget, PermissionRule, RuleCondition};
