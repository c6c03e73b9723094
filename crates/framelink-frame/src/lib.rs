//! Frame lifecycle and UI coordination.
//!
//! The embedding host is abstracted behind [`FrameSurface`];
//! [`FrameManager`] drives the LOADING → READY / ERROR state machine
//! over it (policy-gated creation, timeout-spaced auto-reloads,
//! deterministic teardown), and [`UiCoordinator`] mirrors host UI
//! intent — geometry, fullscreen, focus, keyboard forwarding — onto
//! the surface and the message bridge.
//!
//! [`ScriptedSurface`] is the in-memory surface used across the test
//! suites.

#![warn(missing_docs)]

mod config;
mod error;
mod manager;
mod surface;
mod ui;

pub use config::{FrameConfig, LoadState, LoadStatus};
pub use error::FrameError;
pub use manager::{FrameEvent, FrameManager};
pub use surface::{FrameSurface, LoadScript, ScriptedSurface};
pub use ui::{KeyboardInput, UiCoordinator, UiEvent, UiState};
