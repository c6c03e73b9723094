//! Host configuration.

use framelink_bridge::BridgeConfig;
use framelink_frame::FrameConfig;
use framelink_security::SecurityPolicy;
use std::path::PathBuf;
use std::time::Duration;

/// Everything the host needs for one embedded-tool session.
///
/// # Example
///
/// ```
/// use framelink::HostConfig;
/// use framelink_frame::FrameConfig;
/// use framelink_security::SecurityPolicy;
/// use url::Url;
///
/// let config = HostConfig::new(
///     FrameConfig::new(
///         Url::parse("https://tool.example.com/embed").unwrap(),
///         "p1",
///         "u1",
///         "tok",
///     ),
///     SecurityPolicy::new()
///         .trust_domain("tool.example.com")
///         .allow_origin("https://tool.example.com"),
/// );
/// assert!(config.strict_mode);
/// ```
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Frame creation parameters.
    pub frame: FrameConfig,
    /// Security policy applied before anything else runs.
    pub policy: SecurityPolicy,
    /// Session context lifetime.
    pub session_timeout: Duration,
    /// Key for sealing context snapshots crossing the boundary.
    pub seal_key: Option<String>,
    /// Bridge timeout/retry/signing settings.
    pub bridge: BridgeConfig,
    /// Spacing between periodic sync passes.
    pub sync_interval: Duration,
    /// Per-operation sync retry budget.
    pub sync_max_retries: u32,
    /// Deny permission checks that no permission or rule decides.
    pub strict_mode: bool,
    /// Sync state file; `None` disables persistence.
    pub state_path: Option<PathBuf>,
}

impl HostConfig {
    /// Creates a config with the component defaults.
    #[must_use]
    pub fn new(frame: FrameConfig, policy: SecurityPolicy) -> Self {
        Self {
            frame,
            policy,
            session_timeout: Duration::from_secs(30 * 60),
            seal_key: None,
            bridge: BridgeConfig::default(),
            sync_interval: Duration::from_secs(30),
            sync_max_retries: 3,
            strict_mode: true,
            state_path: None,
        }
    }

    /// Sets the session context lifetime.
    #[must_use]
    pub fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = timeout;
        self
    }

    /// Enables context sealing with `key`.
    #[must_use]
    pub fn with_seal_key(mut self, key: impl Into<String>) -> Self {
        self.seal_key = Some(key.into());
        self
    }

    /// Replaces the bridge settings.
    #[must_use]
    pub fn with_bridge(mut self, bridge: BridgeConfig) -> Self {
        self.bridge = bridge;
        self
    }

    /// Sets the periodic sync spacing and retry budget.
    #[must_use]
    pub fn with_sync(mut self, interval: Duration, max_retries: u32) -> Self {
        self.sync_interval = interval;
        self.sync_max_retries = max_retries;
        self
    }

    /// Makes undecided permission checks pass instead of failing.
    #[must_use]
    pub fn permissive(mut self) -> Self {
        self.strict_mode = false;
        self
    }

    /// Enables sync state persistence at `path`.
    #[must_use]
    pub fn with_state_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_path = Some(path.into());
        self
    }
}
