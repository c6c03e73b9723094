//! The frame lifecycle manager.
//!
//! One live frame at a time, driven through a small state machine:
//!
//! ```text
//!          create (policy-checked)
//!               │
//!               ▼
//!           LOADING ──load ok──► READY
//!               │                   │
//!        fail/timeout               │ refresh
//!               ▼                   ▼
//!            ERROR ──auto-reload──► LOADING   (≤ retry_attempts,
//!               │                              spaced by timeout)
//!        budget exhausted
//!               │ stays ERROR until refresh()/destroy()
//!               ▼
//!           DESTROYED (terminal for this frame)
//! ```
//!
//! The reload loop runs on a spawned task tied to an epoch counter;
//! `destroy` and `refresh` bump the epoch, so a stale loader can
//! never touch state belonging to a newer frame.

use crate::{FrameConfig, FrameError, FrameSurface, LoadState, LoadStatus};
use framelink_event::Emitter;
use framelink_security::SecurityPolicyManager;
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Frame lifecycle notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameEvent {
    /// A load attempt started (`1` is the initial load).
    Loading {
        /// Attempt number, starting at 1.
        attempt: u32,
    },
    /// The frame is loaded and interactive.
    Ready,
    /// A load attempt failed.
    Error {
        /// Attempt number that failed.
        attempt: u32,
        /// Failure description.
        message: String,
    },
    /// The frame was torn down.
    Destroyed,
}

struct Session {
    config: FrameConfig,
    load: LoadState,
}

struct Shared {
    session: RwLock<Option<Session>>,
    emitter: Emitter<FrameEvent>,
    /// Bumped by create/refresh/destroy; loaders check it before
    /// every state write.
    epoch: AtomicU64,
}

impl Shared {
    fn stale(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) != epoch
    }

    fn set_load(&self, load: LoadState) {
        if let Some(session) = self.session.write().as_mut() {
            session.load = load;
        }
    }
}

/// Owns the frame lifecycle for one embedding slot.
pub struct FrameManager<S: FrameSurface> {
    surface: Arc<S>,
    security: Arc<SecurityPolicyManager>,
    shared: Arc<Shared>,
    loader: Mutex<Option<JoinHandle<()>>>,
}

impl<S: FrameSurface> FrameManager<S> {
    /// Creates a manager over `surface`, gated by `security`.
    #[must_use]
    pub fn new(surface: Arc<S>, security: Arc<SecurityPolicyManager>) -> Self {
        Self {
            surface,
            security,
            shared: Arc::new(Shared {
                session: RwLock::new(None),
                emitter: Emitter::new(),
                epoch: AtomicU64::new(0),
            }),
            loader: Mutex::new(None),
        }
    }

    /// Creates the frame and starts the initial load.
    ///
    /// Returns as soon as the load is underway; subscribe to
    /// [`events`](Self::events) or poll [`load_state`](Self::load_state)
    /// to observe the outcome.
    ///
    /// # Errors
    ///
    /// - [`FrameError::AlreadyExists`] while a frame is live
    /// - [`FrameError::Blocked`] when the policy rejects the URL
    pub fn create(&self, config: FrameConfig) -> Result<(), FrameError> {
        {
            let mut session = self.shared.session.write();
            if session.is_some() {
                return Err(FrameError::AlreadyExists);
            }
            self.security
                .validate_frame_url(&config.url)
                .map_err(|source| FrameError::Blocked { source })?;

            info!(url = %config.url, project = %config.project_id, "frame created");
            *session = Some(Session {
                config: config.clone(),
                load: LoadState::loading(),
            });
        }

        self.spawn_loader(config);
        Ok(())
    }

    /// Reloads the live frame, resetting the retry budget.
    ///
    /// # Errors
    ///
    /// [`FrameError::NotFound`] without a live frame.
    pub fn refresh(&self) -> Result<(), FrameError> {
        let config = {
            let mut session = self.shared.session.write();
            let Some(session) = session.as_mut() else {
                return Err(FrameError::NotFound);
            };
            session.load = LoadState::loading();
            session.config.clone()
        };

        debug!(url = %config.url, "frame refresh");
        self.spawn_loader(config);
        Ok(())
    }

    /// Tears the frame down. Idempotent.
    ///
    /// Cancels any in-flight load/retry, detaches the surface, and
    /// emits [`FrameEvent::Destroyed`] exactly once per live frame.
    pub async fn destroy(&self) {
        self.shared.epoch.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = self.loader.lock().take() {
            handle.abort();
        }

        let had = self.shared.session.write().take().is_some();
        if had {
            self.surface.detach().await;
            info!("frame destroyed");
            self.shared.emitter.emit(&FrameEvent::Destroyed);
        }
    }

    /// Snapshot of the live frame's load state.
    #[must_use]
    pub fn load_state(&self) -> Option<LoadState> {
        self.shared
            .session
            .read()
            .as_ref()
            .map(|s| s.load.clone())
    }

    /// Configuration of the live frame.
    #[must_use]
    pub fn config(&self) -> Option<FrameConfig> {
        self.shared
            .session
            .read()
            .as_ref()
            .map(|s| s.config.clone())
    }

    /// `true` when a frame is live and READY.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.load_state()
            .is_some_and(|s| s.status == LoadStatus::Ready)
    }

    /// Hub for [`FrameEvent`] subscriptions.
    #[must_use]
    pub fn events(&self) -> &Emitter<FrameEvent> {
        &self.shared.emitter
    }

    /// Borrow of the underlying surface.
    #[must_use]
    pub fn surface(&self) -> &Arc<S> {
        &self.surface
    }

    /// Starts a load loop for the current epoch, replacing any
    /// previous loader.
    fn spawn_loader(&self, config: FrameConfig) {
        let epoch = self.shared.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let shared = Arc::clone(&self.shared);
        let surface = Arc::clone(&self.surface);

        let handle = tokio::spawn(async move {
            let attempts = config.retry_attempts + 1;
            for attempt in 1..=attempts {
                if shared.stale(epoch) {
                    return;
                }
                shared.set_load(LoadState::loading());
                shared.emitter.emit(&FrameEvent::Loading { attempt });

                let outcome =
                    tokio::time::timeout(config.timeout, surface.navigate(&config.url)).await;
                if shared.stale(epoch) {
                    return;
                }

                let message = match outcome {
                    Ok(Ok(())) => {
                        shared.set_load(LoadState::ready());
                        shared.emitter.emit(&FrameEvent::Ready);
                        info!(url = %config.url, attempt, "frame ready");
                        return;
                    }
                    Ok(Err(err)) => err.to_string(),
                    Err(_) => format!("load timed out after {:?}", config.timeout),
                };

                warn!(url = %config.url, attempt, attempts, %message, "frame load failed");
                shared.set_load(LoadState::error(&message));
                shared.emitter.emit(&FrameEvent::Error { attempt, message });

                if attempt < attempts {
                    tokio::time::sleep(config.timeout).await;
                }
            }
            // Budget exhausted; the frame stays in ERROR until
            // refresh() or destroy().
        });

        if let Some(previous) = self.loader.lock().replace(handle) {
            previous.abort();
        }
    }
}

impl<S: FrameSurface> Drop for FrameManager<S> {
    fn drop(&mut self) {
        if let Some(handle) = self.loader.lock().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LoadScript, ScriptedSurface};
    use framelink_security::SecurityPolicy;
    use std::time::Duration;
    use url::Url;

    fn security() -> Arc<SecurityPolicyManager> {
        let m = SecurityPolicyManager::new(SecurityPolicy::new().trust_domain("tool.example.com"));
        m.initialize();
        Arc::new(m)
    }

    fn config(timeout_ms: u64, retries: u32) -> FrameConfig {
        FrameConfig::new(
            Url::parse("https://tool.example.com/embed").unwrap(),
            "p1",
            "u1",
            "tok",
        )
        .with_timeout(Duration::from_millis(timeout_ms))
        .with_retry_attempts(retries)
    }

    async fn wait_for<F: Fn() -> bool>(cond: F) {
        for _ in 0..100 {
            if cond() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached in time");
    }

    #[tokio::test]
    async fn create_loads_to_ready() {
        let surface = ScriptedSurface::always_ready();
        let mgr = FrameManager::new(Arc::clone(&surface), security());

        let events = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&events);
        mgr.events().subscribe(move |e: &FrameEvent| {
            seen.lock().push(e.clone());
        });

        mgr.create(config(100, 3)).unwrap();
        wait_for(|| mgr.is_ready()).await;

        assert_eq!(mgr.load_state().unwrap().progress, 100);
        assert_eq!(
            *events.lock(),
            vec![FrameEvent::Loading { attempt: 1 }, FrameEvent::Ready]
        );
    }

    #[tokio::test]
    async fn second_create_is_rejected() {
        let mgr = FrameManager::new(ScriptedSurface::always_ready(), security());
        mgr.create(config(100, 3)).unwrap();
        assert!(matches!(
            mgr.create(config(100, 3)),
            Err(FrameError::AlreadyExists)
        ));
    }

    #[tokio::test]
    async fn blocked_url_creates_nothing() {
        let mgr = FrameManager::new(ScriptedSurface::always_ready(), security());
        let mut cfg = config(100, 3);
        cfg.url = Url::parse("https://untrusted.example.org/embed").unwrap();

        assert!(matches!(mgr.create(cfg), Err(FrameError::Blocked { .. })));
        assert!(mgr.load_state().is_none());
    }

    #[tokio::test]
    async fn failed_loads_auto_reload_until_success() {
        let surface = ScriptedSurface::scripted(vec![
            LoadScript::Fail("first".into()),
            LoadScript::Fail("second".into()),
            LoadScript::Succeed,
        ]);
        let mgr = FrameManager::new(Arc::clone(&surface), security());

        mgr.create(config(20, 2)).unwrap();
        wait_for(|| mgr.is_ready()).await;
        assert_eq!(surface.navigation_count(), 3);
    }

    #[tokio::test]
    async fn retry_budget_exhaustion_leaves_error() {
        // Every attempt hangs past the 30ms timeout; with 2 retries
        // that is exactly 3 attempts before giving up.
        let surface = ScriptedSurface::scripted(vec![
            LoadScript::Hang,
            LoadScript::Hang,
            LoadScript::Hang,
        ]);
        let mgr = FrameManager::new(Arc::clone(&surface), security());

        mgr.create(config(30, 2)).unwrap();
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(surface.navigation_count(), 3);
        let state = mgr.load_state().unwrap();
        assert_eq!(state.status, LoadStatus::Error);
        assert!(state.error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn refresh_after_exhaustion_recovers() {
        let surface = ScriptedSurface::scripted(vec![LoadScript::Fail("boom".into())]);
        let mgr = FrameManager::new(Arc::clone(&surface), security());

        mgr.create(config(20, 0)).unwrap();
        wait_for(|| {
            mgr.load_state()
                .is_some_and(|s| s.status == LoadStatus::Error)
        })
        .await;

        mgr.refresh().unwrap();
        wait_for(|| mgr.is_ready()).await;
    }

    #[tokio::test]
    async fn refresh_without_frame_is_not_found() {
        let mgr = FrameManager::new(ScriptedSurface::always_ready(), security());
        assert!(matches!(mgr.refresh(), Err(FrameError::NotFound)));
    }

    #[tokio::test]
    async fn destroy_cancels_retries_and_is_idempotent() {
        let surface = ScriptedSurface::scripted(vec![LoadScript::Hang, LoadScript::Hang]);
        let mgr = FrameManager::new(Arc::clone(&surface), security());

        let destroyed = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let seen = Arc::clone(&destroyed);
        mgr.events().subscribe(move |e: &FrameEvent| {
            if *e == FrameEvent::Destroyed {
                seen.fetch_add(1, Ordering::SeqCst);
            }
        });

        mgr.create(config(30, 5)).unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        mgr.destroy().await;

        let attempts_at_destroy = surface.navigation_count();
        tokio::time::sleep(Duration::from_millis(150)).await;
        // No further attempts after destroy.
        assert_eq!(surface.navigation_count(), attempts_at_destroy);
        assert_eq!(surface.detach_count(), 1);
        assert!(mgr.load_state().is_none());

        mgr.destroy().await;
        assert_eq!(destroyed.load(Ordering::SeqCst), 1);
        assert_eq!(surface.detach_count(), 1);
    }

    #[tokio::test]
    async fn create_after_destroy_works() {
        let mgr = FrameManager::new(ScriptedSurface::always_ready(), security());
        mgr.create(config(50, 1)).unwrap();
        wait_for(|| mgr.is_ready()).await;
        mgr.destroy().await;
        mgr.create(config(50, 1)).unwrap();
        wait_for(|| mgr.is_ready()).await;
    }
}
