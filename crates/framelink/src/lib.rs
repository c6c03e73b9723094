//! Secure integration layer for an embedded third-party annotation
//! tool.
//!
//! The host application embeds the tool in a sandboxed frame and talks
//! to it over a validated message channel. This crate is the facade
//! over the component crates:
//!
//! | Crate | Responsibility |
//! |-------|----------------|
//! | [`framelink_security`] | policy, URL/origin validation, violation log |
//! | [`framelink_frame`] | frame lifecycle and UI coordination |
//! | [`framelink_bridge`] | reliable, origin-checked messaging |
//! | [`framelink_context`] | session context, expiry, sealed transport |
//! | [`framelink_auth`] | rule-based permission engine |
//! | [`framelink_sync`] | offline-tolerant annotation sync |
//!
//! [`EmbedHost`] wires them into one session: policy check, frame
//! creation, sealed context push, permission-gated writes, inbound
//! edits into the sync queue, and UI mirroring.
//!
//! # Example
//!
//! ```no_run
//! use framelink::{EmbedHost, HostConfig};
//! use framelink_bridge::memory_pair;
//! use framelink_frame::{FrameConfig, ScriptedSurface};
//! use framelink_security::SecurityPolicy;
//! use framelink_sync::{Manual, MemoryStore};
//! use framelink_types::{AnnotationContext, ProjectRef, UserRef};
//! use url::Url;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), framelink::HostError> {
//! let config = HostConfig::new(
//!     FrameConfig::new(
//!         Url::parse("https://tool.example.com/embed").unwrap(),
//!         "p1",
//!         "u1",
//!         "tok",
//!     ),
//!     SecurityPolicy::new()
//!         .trust_domain("tool.example.com")
//!         .allow_origin("https://tool.example.com"),
//! );
//!
//! let ((port, inbound), _frame_side) = memory_pair("https://host.app", "https://tool.example.com");
//! let host = EmbedHost::new(
//!     config,
//!     ScriptedSurface::always_ready(),
//!     port,
//!     inbound,
//!     MemoryStore::new(),
//!     Box::new(Manual),
//! );
//!
//! let ctx = AnnotationContext::new(UserRef::new("u1", "Ada"), ProjectRef::new("p1", "Scenes"));
//! host.open(ctx).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod host;

pub use config::HostConfig;
pub use error::HostError;
pub use host::EmbedHost;

pub use framelink_auth;
pub use framelink_bridge;
pub use framelink_context;
pub use framelink_event;
pub use framelink_frame;
pub use framelink_security;
pub use framelink_sync;
pub use framelink_types;
