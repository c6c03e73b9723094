//! Typed publish/subscribe hub for framelink.
//!
//! Every manager in the integration layer (frame lifecycle, security,
//! context, sync, UI) reports its state changes through an
//! [`Emitter`] of its own event type. The host subscribes to the
//! emitters it cares about; nothing here forces an event loop or a
//! runtime on the caller.
//!
//! ```text
//! ┌─────────────┐  emit(&E)  ┌──────────────┐
//! │   Manager   │ ─────────► │  Subscriber  │
//! │ (Emitter<E>)│            │  callbacks   │
//! └─────────────┘            └──────────────┘
//! ```
//!
//! Delivery is synchronous and ordered; see [`Emitter`] for the exact
//! semantics around re-entrant subscription changes.

#![warn(missing_docs)]

mod emitter;

pub use emitter::{Emitter, SubscriberId};
