//! The frame surface abstraction.
//!
//! Everything the host environment must provide to embed the tool:
//! navigation, teardown, geometry, and focus. The load state machine
//! in [`FrameManager`](crate::FrameManager) is written entirely
//! against this trait, so it runs identically under a real embedding
//! host and under the scripted [`ScriptedSurface`] used in tests.

use crate::FrameError;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use url::Url;

/// Host-side frame primitive.
pub trait FrameSurface: Send + Sync + 'static {
    /// Starts loading `url`; resolves when the load settles.
    ///
    /// The caller enforces the attempt timeout, so implementations
    /// may block for as long as the underlying load takes.
    fn navigate(&self, url: &Url) -> impl Future<Output = Result<(), FrameError>> + Send;

    /// Removes the frame from the host. Must be safe to call twice.
    fn detach(&self) -> impl Future<Output = ()> + Send;

    /// Resizes the frame.
    fn set_bounds(&self, width: u32, height: u32)
        -> impl Future<Output = Result<(), FrameError>> + Send;

    /// Enters or leaves fullscreen.
    fn set_fullscreen(&self, enabled: bool) -> impl Future<Output = Result<(), FrameError>> + Send;

    /// Moves input focus into the frame.
    fn focus(&self) -> impl Future<Output = Result<(), FrameError>> + Send;
}

/// What one scripted navigation attempt should do.
#[derive(Debug, Clone)]
pub enum LoadScript {
    /// Resolve successfully.
    Succeed,
    /// Resolve with a load failure.
    Fail(String),
    /// Never resolve (the caller's timeout fires).
    Hang,
}

/// In-memory surface driven by a per-attempt script.
///
/// Attempt `n` follows the `n`-th script entry; attempts beyond the
/// script succeed. Counters expose how often each operation ran.
#[derive(Debug, Default)]
pub struct ScriptedSurface {
    script: Mutex<Vec<LoadScript>>,
    navigations: AtomicUsize,
    detaches: AtomicUsize,
    last_bounds: Mutex<Option<(u32, u32)>>,
    fullscreen: Mutex<Option<bool>>,
    focuses: AtomicUsize,
}

impl ScriptedSurface {
    /// Surface where every navigation succeeds.
    #[must_use]
    pub fn always_ready() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Surface following `script`, then succeeding.
    #[must_use]
    pub fn scripted(script: Vec<LoadScript>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script),
            ..Self::default()
        })
    }

    /// Number of navigation attempts observed.
    #[must_use]
    pub fn navigation_count(&self) -> usize {
        self.navigations.load(Ordering::SeqCst)
    }

    /// Number of detach calls observed.
    #[must_use]
    pub fn detach_count(&self) -> usize {
        self.detaches.load(Ordering::SeqCst)
    }

    /// Last bounds applied via `set_bounds`.
    #[must_use]
    pub fn last_bounds(&self) -> Option<(u32, u32)> {
        *self.last_bounds.lock()
    }

    /// Last fullscreen value applied.
    #[must_use]
    pub fn fullscreen_state(&self) -> Option<bool> {
        *self.fullscreen.lock()
    }

    /// Number of focus calls observed.
    #[must_use]
    pub fn focus_count(&self) -> usize {
        self.focuses.load(Ordering::SeqCst)
    }
}

impl FrameSurface for ScriptedSurface {
    async fn navigate(&self, _url: &Url) -> Result<(), FrameError> {
        let attempt = self.navigations.fetch_add(1, Ordering::SeqCst);
        let step = self.script.lock().get(attempt).cloned();
        match step {
            Some(LoadScript::Fail(reason)) => Err(FrameError::LoadFailed { reason }),
            Some(LoadScript::Hang) => {
                std::future::pending::<()>().await;
                unreachable!()
            }
            Some(LoadScript::Succeed) | None => Ok(()),
        }
    }

    async fn detach(&self) {
        self.detaches.fetch_add(1, Ordering::SeqCst);
    }

    async fn set_bounds(&self, width: u32, height: u32) -> Result<(), FrameError> {
        *self.last_bounds.lock() = Some((width, height));
        Ok(())
    }

    async fn set_fullscreen(&self, enabled: bool) -> Result<(), FrameError> {
        *self.fullscreen.lock() = Some(enabled);
        Ok(())
    }

    async fn focus(&self) -> Result<(), FrameError> {
        self.focuses.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn script_steps_then_success() {
        let surface = ScriptedSurface::scripted(vec![LoadScript::Fail("boom".into())]);
        let url = Url::parse("https://tool.example.com/").unwrap();

        assert!(surface.navigate(&url).await.is_err());
        assert!(surface.navigate(&url).await.is_ok());
        assert_eq!(surface.navigation_count(), 2);
    }

    #[tokio::test]
    async fn counters_track_operations() {
        let surface = ScriptedSurface::always_ready();
        surface.set_bounds(800, 600).await.unwrap();
        surface.set_fullscreen(true).await.unwrap();
        surface.focus().await.unwrap();
        surface.detach().await;

        assert_eq!(surface.last_bounds(), Some((800, 600)));
        assert_eq!(surface.fullscreen_state(), Some(true));
        assert_eq!(surface.focus_count(), 1);
        assert_eq!(surface.detach_count(), 1);
    }
}
