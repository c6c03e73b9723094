//! Offline-tolerant annotation synchronization.
//!
//! A local-first write queue between the host application and the
//! annotation backend:
//!
//! ```text
//!   add_operation          SyncManager                RemoteStore
//!  ─────────────►  queue ──────────────► push ──────► backend
//!                    │    flush passes     │
//!                    │  (periodic/manual)  ├─ accepted → dequeued
//!  FileStateStore ◄──┘                     ├─ conflict → ConflictStrategy
//!  (JSON snapshot,                         └─ error    → bounded retries
//!   24h expiry)
//! ```
//!
//! Writes are enqueued without touching the network and flushed in
//! FIFO order, either periodically or on demand. Version conflicts
//! are detected against the remote record and settled by a pluggable
//! [`ConflictStrategy`] or manually. Network loss parks the engine in
//! [`SyncStatus::Offline`]; recovery revives permanently failed
//! operations and replays the queue. The whole engine state survives
//! restarts through an atomically replaced JSON snapshot.
//!
//! # Example
//!
//! ```
//! use framelink_sync::{Manual, MemoryStore, OpKind, SyncConfig, SyncManager};
//! use framelink_types::AnnotationData;
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let manager = SyncManager::new(
//!     MemoryStore::new(),
//!     Box::new(Manual),
//!     SyncConfig::default(),
//!     None,
//! );
//!
//! let data = AnnotationData::new("a1", "task-1", "user-1", json!({"label": "car"}));
//! manager.add_operation(OpKind::Create, data);
//! manager.sync_incremental().await;
//!
//! assert_eq!(manager.stats().completed, 1);
//! # }
//! ```
//!
//! # Error codes
//!
//! | Code | Meaning | Recoverable |
//! |------|---------|-------------|
//! | `SYNC_NETWORK` | transport failure reaching the backend | yes |
//! | `SYNC_REMOTE` | backend answered with a non-success status | yes |
//! | `SYNC_UNKNOWN_CONFLICT` | no unresolved conflict for the given id | no |
//! | `SYNC_PERSIST` | state snapshot could not be written or read | no |

#![warn(missing_docs)]

mod conflict;
mod error;
mod manager;
mod operation;
mod persist;
mod remote;

pub use conflict::{ConflictKind, ConflictStrategy, LocalWins, Manual, RemoteWins, Resolution, SyncConflict};
pub use error::SyncError;
pub use manager::{SyncConfig, SyncEvent, SyncManager, SyncStatus};
pub use operation::{OpKind, OpStatus, SyncOperation, SyncStats};
pub use persist::{FileStateStore, PersistedState, STATE_MAX_AGE, STATE_VERSION};
pub use remote::{HttpRemoteStore, MemoryStore, PushOutcome, RemoteStore};
