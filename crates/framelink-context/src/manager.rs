//! The context manager.
//!
//! Holds at most one active [`AnnotationContext`] and owns its
//! lifetime:
//!
//! ```text
//! set_context ──► validate ──► stamp ──► store ──► arm timer ──► notify
//!                                          │
//!              session_timeout elapses ────┤ (timer clear)
//!              get_context past timeout ───┘ (read-time expiry)
//! ```
//!
//! Expiry is enforced twice on purpose: the timer clears the stored
//! snapshot and notifies listeners, while every read independently
//! treats an over-age snapshot as absent. Readers therefore never see
//! a stale context even if the timer task is delayed.

use crate::{seal, ContextError};
use framelink_event::Emitter;
use framelink_types::{evaluate, AnnotationContext, SessionId};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Context manager configuration.
#[derive(Debug, Clone)]
pub struct ContextConfig {
    /// How long a context stays valid after its last (re)stamp.
    pub session_timeout: Duration,
    /// Key for the transport seal; `None` exports plain base64 JSON.
    pub seal_key: Option<String>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            session_timeout: Duration::from_secs(30 * 60),
            seal_key: None,
        }
    }
}

/// Context lifecycle notification.
#[derive(Debug, Clone)]
pub enum ContextEvent {
    /// A new snapshot became active.
    Updated(AnnotationContext),
    /// The active snapshot was cleared (timeout or explicit).
    Cleared,
}

struct Shared {
    current: RwLock<Option<AnnotationContext>>,
    emitter: Emitter<ContextEvent>,
    /// Bumped on every (re)arm; a timer only fires for its own epoch.
    epoch: AtomicU64,
    alive: AtomicBool,
}

/// Owns the active session context.
///
/// Cheap to share: every method takes `&self` and the manager is
/// `Send + Sync`. Must live inside a tokio runtime — `set_context`
/// spawns the session timer task.
pub struct ContextManager {
    config: ContextConfig,
    shared: Arc<Shared>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl ContextManager {
    /// Creates a manager with no active context.
    #[must_use]
    pub fn new(config: ContextConfig) -> Self {
        Self {
            config,
            shared: Arc::new(Shared {
                current: RwLock::new(None),
                emitter: Emitter::new(),
                epoch: AtomicU64::new(0),
                alive: AtomicBool::new(true),
            }),
            timer: Mutex::new(None),
        }
    }

    /// Replaces the active context.
    ///
    /// Validates first and mutates nothing on failure. On success the
    /// snapshot is re-stamped, a session id is generated if the
    /// supplied one is empty, the session timer is (re)armed, and
    /// listeners receive [`ContextEvent::Updated`].
    ///
    /// # Errors
    ///
    /// [`ContextError::InvalidContext`] if the snapshot fails shape
    /// validation.
    pub fn set_context(&self, mut ctx: AnnotationContext) -> Result<(), ContextError> {
        validate(&ctx)?;

        ctx.timestamp = chrono::Utc::now();
        if ctx.session_id.as_str().is_empty() {
            ctx.session_id = SessionId::generate();
        }
        info!(session = %ctx.session_id, user = %ctx.user.id, "context updated");

        *self.shared.current.write() = Some(ctx.clone());
        self.arm_timer();
        self.shared.emitter.emit(&ContextEvent::Updated(ctx));
        Ok(())
    }

    /// Returns a copy of the active context, or `None` when unset or
    /// past the session timeout.
    #[must_use]
    pub fn get_context(&self) -> Option<AnnotationContext> {
        let guard = self.shared.current.read();
        let ctx = guard.as_ref()?;
        if ctx.is_expired(self.config.session_timeout) {
            return None;
        }
        Some(ctx.clone())
    }

    /// Checks `action` on `resource` against the stored permission
    /// list only — exact and wildcard matches, no rules or roles.
    ///
    /// `false` without a live context.
    #[must_use]
    pub fn check_permission(&self, action: &str, resource: &str) -> bool {
        match self.get_context() {
            Some(ctx) => evaluate(&ctx.permissions, action, resource).unwrap_or(false),
            None => false,
        }
    }

    /// Re-stamps the active context and re-arms the timer.
    ///
    /// Returns `false` when there is no live context to refresh.
    pub fn refresh_context(&self) -> bool {
        let mut guard = self.shared.current.write();
        let Some(ctx) = guard.as_mut() else {
            return false;
        };
        ctx.timestamp = chrono::Utc::now();
        debug!(session = %ctx.session_id, "context refreshed");
        drop(guard);

        self.arm_timer();
        true
    }

    /// Extends an unexpired session without notifying listeners.
    ///
    /// An already-expired context is cleared instead, and listeners
    /// receive [`ContextEvent::Cleared`]. Returns `true` iff the
    /// session was extended.
    pub fn auto_refresh(&self) -> bool {
        let expired = {
            let guard = self.shared.current.read();
            match guard.as_ref() {
                Some(ctx) => ctx.is_expired(self.config.session_timeout),
                None => return false,
            }
        };

        if expired {
            self.clear_context();
            return false;
        }

        let mut guard = self.shared.current.write();
        if let Some(ctx) = guard.as_mut() {
            ctx.timestamp = chrono::Utc::now();
        }
        drop(guard);
        self.arm_timer();
        true
    }

    /// Clears the active context and notifies listeners.
    pub fn clear_context(&self) {
        let had = self.shared.current.write().take().is_some();
        self.shared.epoch.fetch_add(1, Ordering::SeqCst);
        if had {
            info!("context cleared");
            self.shared.emitter.emit(&ContextEvent::Cleared);
        }
    }

    /// Encodes the active context for transport across the frame
    /// boundary (redacted, optionally sealed, base64).
    ///
    /// # Errors
    ///
    /// [`ContextError::NoActiveContext`] without a live context.
    pub fn sealed(&self) -> Result<String, ContextError> {
        let ctx = self.get_context().ok_or(ContextError::NoActiveContext)?;
        seal::seal(&ctx, self.config.seal_key.as_deref())
    }

    /// Decodes transport data produced by [`sealed`](Self::sealed)
    /// with this manager's key. Does not install the result.
    ///
    /// # Errors
    ///
    /// [`ContextError::InvalidSealedContext`] on malformed data.
    pub fn from_sealed(&self, data: &str) -> Result<AnnotationContext, ContextError> {
        seal::unseal(data, self.config.seal_key.as_deref())
    }

    /// Events hub for [`ContextEvent`] subscriptions.
    #[must_use]
    pub fn events(&self) -> &Emitter<ContextEvent> {
        &self.shared.emitter
    }

    /// Tears the manager down: cancels the timer and drops the
    /// context without notifying listeners.
    pub fn destroy(&self) {
        self.shared.alive.store(false, Ordering::SeqCst);
        self.shared.epoch.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = self.timer.lock().take() {
            handle.abort();
        }
        *self.shared.current.write() = None;
        self.shared.emitter.clear();
    }

    /// Spawns (or replaces) the session timer for the current epoch.
    fn arm_timer(&self) {
        let epoch = self.shared.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let shared = Arc::clone(&self.shared);
        let timeout = self.config.session_timeout;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if !shared.alive.load(Ordering::SeqCst)
                || shared.epoch.load(Ordering::SeqCst) != epoch
            {
                return;
            }
            let had = shared.current.write().take().is_some();
            if had {
                info!("session timed out");
                shared.emitter.emit(&ContextEvent::Cleared);
            }
        });

        if let Some(previous) = self.timer.lock().replace(handle) {
            previous.abort();
        }
    }
}

impl Drop for ContextManager {
    fn drop(&mut self) {
        self.shared.alive.store(false, Ordering::SeqCst);
        if let Some(handle) = self.timer.lock().take() {
            handle.abort();
        }
    }
}

fn validate(ctx: &AnnotationContext) -> Result<(), ContextError> {
    if ctx.user.id.trim().is_empty() {
        return Err(ContextError::InvalidContext {
            reason: "user id must not be empty".into(),
        });
    }
    if ctx.user.name.trim().is_empty() {
        return Err(ContextError::InvalidContext {
            reason: "user name must not be empty".into(),
        });
    }
    if ctx.project.id.trim().is_empty() {
        return Err(ContextError::InvalidContext {
            reason: "project id must not be empty".into(),
        });
    }
    if let Some(task) = &ctx.task {
        if task.id.trim().is_empty() {
            return Err(ContextError::InvalidContext {
                reason: "task id must not be empty".into(),
            });
        }
    }
    for perm in &ctx.permissions {
        if perm.action.is_empty() || perm.resource.is_empty() {
            return Err(ContextError::InvalidContext {
                reason: "permission action/resource must not be empty".into(),
            });
        }
    }
    Ok(())
}
