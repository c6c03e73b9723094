//! UI coordination between the host chrome and the frame.

use crate::{FrameError, FrameSurface};
use framelink_bridge::{MessageBridge, MessageEnvelope, MessageKind, MessagePort};
use framelink_event::Emitter;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

/// A keyboard event forwarded into the frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyboardInput {
    /// Key value (`"Escape"`, `"s"`, ...).
    pub key: String,
    /// Ctrl/Cmd held.
    #[serde(default)]
    pub ctrl: bool,
    /// Shift held.
    #[serde(default)]
    pub shift: bool,
    /// Alt held.
    #[serde(default)]
    pub alt: bool,
}

impl KeyboardInput {
    /// A bare key press without modifiers.
    #[must_use]
    pub fn key(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ctrl: false,
            shift: false,
            alt: false,
        }
    }
}

/// Read-only snapshot of the host-side UI state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UiState {
    /// Fullscreen active.
    pub fullscreen: bool,
    /// Current frame width in px (0 before the first resize).
    pub width: u32,
    /// Current frame height in px.
    pub height: u32,
    /// Host loading indicator visible.
    pub loading: bool,
    /// Input focus is inside the frame.
    pub focused: bool,
}

/// UI change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// Fullscreen toggled.
    FullscreenChanged(bool),
    /// Frame resized.
    Resized {
        /// New width in px.
        width: u32,
        /// New height in px.
        height: u32,
    },
    /// Loading indicator toggled.
    LoadingChanged(bool),
    /// Focus moved into the frame.
    FrameFocused,
    /// A keyboard event was forwarded into the frame.
    KeyForwarded(KeyboardInput),
}

/// Mirrors host UI intent onto the frame surface and the bridge.
///
/// Surface manipulation (geometry, fullscreen, focus) goes through
/// the [`FrameSurface`]; keyboard input crosses the boundary as
/// [`MessageKind::KeyboardEvent`] envelopes. State changes are
/// observable via [`events`](Self::events) and
/// [`ui_state`](Self::ui_state).
pub struct UiCoordinator<S: FrameSurface, P: MessagePort> {
    surface: Arc<S>,
    bridge: Arc<MessageBridge<P>>,
    state: RwLock<UiState>,
    emitter: Emitter<UiEvent>,
}

impl<S: FrameSurface, P: MessagePort> UiCoordinator<S, P> {
    /// Binds a surface and a bridge.
    #[must_use]
    pub fn new(surface: Arc<S>, bridge: Arc<MessageBridge<P>>) -> Self {
        Self {
            surface,
            bridge,
            state: RwLock::new(UiState::default()),
            emitter: Emitter::new(),
        }
    }

    /// Enters or leaves fullscreen.
    pub async fn set_fullscreen(&self, enabled: bool) -> Result<(), FrameError> {
        self.surface.set_fullscreen(enabled).await?;
        self.state.write().fullscreen = enabled;
        debug!(enabled, "fullscreen toggled");
        self.emitter.emit(&UiEvent::FullscreenChanged(enabled));
        Ok(())
    }

    /// Resizes the frame.
    pub async fn resize(&self, width: u32, height: u32) -> Result<(), FrameError> {
        self.surface.set_bounds(width, height).await?;
        {
            let mut state = self.state.write();
            state.width = width;
            state.height = height;
        }
        self.emitter.emit(&UiEvent::Resized { width, height });
        Ok(())
    }

    /// Toggles the host-side loading indicator.
    pub fn set_loading(&self, loading: bool) {
        self.state.write().loading = loading;
        self.emitter.emit(&UiEvent::LoadingChanged(loading));
    }

    /// Moves input focus into the frame.
    pub async fn focus_frame(&self) -> Result<(), FrameError> {
        self.surface.focus().await?;
        self.state.write().focused = true;
        self.emitter.emit(&UiEvent::FrameFocused);
        Ok(())
    }

    /// Forwards a host keyboard event into the frame.
    pub async fn forward_key(&self, input: KeyboardInput) -> Result<(), FrameError> {
        let envelope = MessageEnvelope::new(
            MessageKind::KeyboardEvent,
            json!({
                "key": input.key,
                "ctrl": input.ctrl,
                "shift": input.shift,
                "alt": input.alt,
            }),
        );
        self.bridge.notify(envelope).await?;
        self.emitter.emit(&UiEvent::KeyForwarded(input));
        Ok(())
    }

    /// Snapshot of the current UI state.
    #[must_use]
    pub fn ui_state(&self) -> UiState {
        *self.state.read()
    }

    /// Hub for [`UiEvent`] subscriptions.
    #[must_use]
    pub fn events(&self) -> &Emitter<UiEvent> {
        &self.emitter
    }
}
