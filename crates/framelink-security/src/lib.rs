//! Security policy gate for framelink.
//!
//! This crate owns the trust decisions of the integration layer:
//! which URLs the embedded frame may be loaded from, which origins may
//! message the host, and how browser-reported CSP violations are
//! classified and surfaced.
//!
//! ```text
//! ┌──────────────┐ validate_frame_url ┌────────────────────────┐
//! │ FrameManager │ ─────────────────► │ SecurityPolicyManager  │
//! └──────────────┘                    │  - SecurityPolicy      │
//! ┌──────────────┐ is_origin_allowed  │  - violation ring log  │
//! │ Bridge       │ ─────────────────► │  - violation emitter   │
//! └──────────────┘                    └────────────────────────┘
//! ```
//!
//! The manager is stateless apart from the immutable policy and the
//! bounded violation log; it is safe to share behind an `Arc` across
//! every component that needs a trust decision.

#![warn(missing_docs)]

mod error;
mod manager;
mod policy;
mod violation;

pub use error::SecurityError;
pub use manager::SecurityPolicyManager;
pub use policy::SecurityPolicy;
pub use violation::{classify_csp_directive, SecurityViolation, Severity, ViolationKind};
