//! Frame configuration and load state.

use framelink_types::Permission;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Immutable per-session frame configuration.
///
/// Built once before `create` and never mutated afterwards; changing
/// anything means destroying the frame and creating a new one.
///
/// # Example
///
/// ```
/// use framelink_frame::FrameConfig;
/// use url::Url;
///
/// let config = FrameConfig::new(
///     Url::parse("https://tool.example.com/embed").unwrap(),
///     "p1",
///     "u1",
///     "tok",
/// )
/// .with_task("t1")
/// .with_theme("dark");
///
/// assert_eq!(config.retry_attempts, 3);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameConfig {
    /// Where the embedded tool lives.
    pub url: Url,
    /// Project the session is scoped to.
    pub project_id: String,
    /// Optional task within the project.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    /// User the session belongs to.
    pub user_id: String,
    /// Auth token handed to the embedded tool.
    pub token: String,
    /// Initial permission list pushed into the frame.
    #[serde(default)]
    pub permissions: Vec<Permission>,
    /// Theme hint for the embedded tool.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    /// Start in fullscreen.
    #[serde(default)]
    pub fullscreen: bool,
    /// Per-attempt load timeout; also the spacing between retries.
    #[serde(default = "default_timeout", with = "duration_millis")]
    pub timeout: Duration,
    /// Automatic reload attempts after a failed load.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
}

fn default_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_retry_attempts() -> u32 {
    3
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

impl FrameConfig {
    /// Creates a config with the default timeout and retry budget.
    #[must_use]
    pub fn new(
        url: Url,
        project_id: impl Into<String>,
        user_id: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            url,
            project_id: project_id.into(),
            task_id: None,
            user_id: user_id.into(),
            token: token.into(),
            permissions: Vec::new(),
            theme: None,
            fullscreen: false,
            timeout: default_timeout(),
            retry_attempts: default_retry_attempts(),
        }
    }

    /// Scopes the session to a task.
    #[must_use]
    pub fn with_task(mut self, task_id: impl Into<String>) -> Self {
        self.task_id = Some(task_id.into());
        self
    }

    /// Sets the initial permission list.
    #[must_use]
    pub fn with_permissions(mut self, permissions: Vec<Permission>) -> Self {
        self.permissions = permissions;
        self
    }

    /// Sets the theme hint.
    #[must_use]
    pub fn with_theme(mut self, theme: impl Into<String>) -> Self {
        self.theme = Some(theme.into());
        self
    }

    /// Sets the per-attempt load timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the automatic reload budget.
    #[must_use]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }
}

/// Where the frame is in its load lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStatus {
    /// A load attempt is in flight.
    Loading,
    /// The frame loaded and is interactive.
    Ready,
    /// The last attempt failed; retries may still be scheduled.
    Error,
    /// The frame was torn down.
    Destroyed,
}

/// Snapshot of the frame's load state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadState {
    /// Lifecycle phase.
    pub status: LoadStatus,
    /// `true` while an attempt is in flight.
    pub is_loading: bool,
    /// Coarse progress, 0–100.
    pub progress: u8,
    /// Last load error, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LoadState {
    /// State at the start of a load attempt.
    #[must_use]
    pub fn loading() -> Self {
        Self {
            status: LoadStatus::Loading,
            is_loading: true,
            progress: 0,
            error: None,
        }
    }

    /// State after a successful load.
    #[must_use]
    pub fn ready() -> Self {
        Self {
            status: LoadStatus::Ready,
            is_loading: false,
            progress: 100,
            error: None,
        }
    }

    /// State after a failed attempt.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: LoadStatus::Error,
            is_loading: false,
            progress: 0,
            error: Some(message.into()),
        }
    }
}
