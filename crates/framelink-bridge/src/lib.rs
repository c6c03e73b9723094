//! Reliable messaging across the host/frame boundary.
//!
//! - [`MessageEnvelope`]/[`MessageKind`] — the wire format: a closed
//!   kind set with per-kind payload shape checks and an optional
//!   keyed signature.
//! - [`MessagePort`] — the transport seam; [`memory_pair`] builds a
//!   connected in-process pair for tests.
//! - [`MessageBridge`] — correlation, timeouts, same-id retries,
//!   receiver-side dedupe, and origin checking against the security
//!   manager. Traffic that fails any check is dropped and reported,
//!   never dispatched.

#![warn(missing_docs)]

mod bridge;
mod envelope;
mod error;
mod port;

pub use bridge::{BridgeConfig, MessageBridge};
pub use envelope::{MessageEnvelope, MessageKind};
pub use error::BridgeError;
pub use port::{memory_pair, InboundMessage, MemoryPort, MessagePort};
