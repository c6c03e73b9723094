//! Session context management.
//!
//! The host application is the source of truth for "who is annotating
//! what"; this crate holds that truth as a single active
//! [`AnnotationContext`](framelink_types::AnnotationContext) snapshot
//! and controls how it leaves the process:
//!
//! - [`ContextManager`] — validated replace-don't-patch updates,
//!   dual-mechanism session expiry (timer + read-time), listener
//!   notifications, lightweight permission checks.
//! - [`seal`] — the transport codec: sensitive-metadata redaction,
//!   optional keyed sealing, base64 framing.

#![warn(missing_docs)]

mod error;
mod manager;
pub mod seal;

pub use error::ContextError;
pub use manager::{ContextConfig, ContextEvent, ContextManager};
