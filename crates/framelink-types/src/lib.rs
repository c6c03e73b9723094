//! Core types for framelink.
//!
//! This crate provides the shared identifier types, the data model,
//! and the [`ErrorCode`] interface for the framelink embedded-tool
//! integration layer.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Shared Layer                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  framelink-types    : ids, data model, ErrorCode  ◄── HERE   │
//! │  framelink-event    : typed Emitter pub/sub hub              │
//! └─────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Manager Layer                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  framelink-security : origin/URL/CSP policy gate             │
//! │  framelink-auth     : rule-based permission engine           │
//! │  framelink-context  : session snapshot + sealing             │
//! │  framelink-bridge   : reliable cross-boundary messaging      │
//! │  framelink-frame    : frame lifecycle + UI coordination      │
//! │  framelink-sync     : mutation queue, conflicts, offline     │
//! └─────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │  framelink          : host facade wiring it all together    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Data Model
//!
//! - [`AnnotationContext`] — the single user/project/task/permission
//!   snapshot shared with the embedded tool
//! - [`Permission`] — `(action, resource)`-keyed entry with `"*"`
//!   wildcards, evaluated by [`evaluate`]
//! - [`AnnotationData`] — a versioned annotation record; `version`
//!   is the conflict-detection key
//!
//! # Example
//!
//! ```
//! use framelink_types::{AnnotationContext, Permission, ProjectRef, UserRef};
//!
//! let ctx = AnnotationContext::new(
//!     UserRef::new("u1", "Ada").with_role("annotator"),
//!     ProjectRef::new("p1", "Street scenes"),
//! )
//! .with_permissions(vec![Permission::allow("edit", "annotation")]);
//!
//! assert_eq!(ctx.user.roles, vec!["annotator".to_string()]);
//! ```

#![warn(missing_docs)]

mod annotation;
mod context;
mod error;
mod id;
mod permission;

pub use annotation::{AnnotationData, AnnotationStatus};
pub use context::{AnnotationContext, ProjectRef, TaskRef, UserRef};
pub use error::{assert_error_code, assert_error_codes, ErrorCode};
pub use id::{AnnotationId, MessageId, OperationId, SessionId};
pub use permission::{evaluate, Permission, WILDCARD};
