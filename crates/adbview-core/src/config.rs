//! Centralized configuration for adbview.
//!
//! Timing constants for the adb subprocesses and the device monitor, plus the
//! runtime [`ControllerConfig`] built from them.

use std::path::PathBuf;
use std::time::Duration;

/// Application-level configuration.
pub struct AppConfig;

impl AppConfig {
    pub const DEFAULT_LOG_EXTENSION: &'static str = "txt";
}

/// adb invocation constants.
pub struct AdbConfig;

impl AdbConfig {
    pub const TOOL_NAME: &'static str = "adb";
    pub const VERSION_ARG: &'static str = "version";

    // Subprocess timeouts
    pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
    pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);
    pub const STOP_GRACE: Duration = Duration::from_secs(2);

    /// Exit code reported when logcat is torn down because every device went away.
    pub const DISCONNECT_EXIT_CODE: i32 = -1;

    // Device properties queried for `get-device-info`
    pub const PROP_MODEL: &'static str = "ro.product.model";
    pub const PROP_MANUFACTURER: &'static str = "ro.product.manufacturer";
    pub const PROP_ANDROID_VERSION: &'static str = "ro.build.version.release";
}

/// Device monitor timing.
pub struct MonitorConfig;

impl MonitorConfig {
    pub const POLL_INTERVAL: Duration = Duration::from_secs(3);
    pub const POLL_TIMEOUT: Duration = Duration::from_secs(3);
}

/// Event bus sizing.
pub struct EventConfig;

impl EventConfig {
    /// Events buffered per subscriber before it starts lagging.
    pub const CHANNEL_CAPACITY: usize = 1024;
    /// Bytes read from a logcat pipe per `logcat-data` chunk.
    pub const READ_CHUNK_SIZE: usize = 8192;
}

/// Runtime settings for one controller instance.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Executable tried before every candidate in `search_paths`.
    pub adb_override: Option<PathBuf>,
    /// Ordered locations probed by executable discovery.
    pub search_paths: Vec<PathBuf>,
    pub probe_timeout: Duration,
    pub command_timeout: Duration,
    pub poll_timeout: Duration,
    pub stop_grace: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            adb_override: None,
            search_paths: crate::platform::adb_candidates(),
            probe_timeout: AdbConfig::PROBE_TIMEOUT,
            command_timeout: AdbConfig::COMMAND_TIMEOUT,
            poll_timeout: MonitorConfig::POLL_TIMEOUT,
            stop_grace: AdbConfig::STOP_GRACE,
        }
    }
}

impl ControllerConfig {
    /// Put an explicit executable at the front of the discovery list.
    pub fn with_adb_override(mut self, path: impl Into<PathBuf>) -> Self {
        self.adb_override = Some(path.into());
        self
    }

    /// Replace the candidate locations probed by discovery.
    pub fn with_search_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.search_paths = paths;
        self
    }

    /// Candidates in probe order: the override, then the search paths.
    pub fn discovery_candidates(&self) -> Vec<PathBuf> {
        self.adb_override
            .iter()
            .cloned()
            .chain(
                self.search_paths
                    .iter()
                    .filter(|p| Some(*p) != self.adb_override.as_ref())
                    .cloned(),
            )
            .collect()
    }

    /// Set the bound used by `execute-adb-command` and `check-devices`.
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Set the SIGTERM → SIGKILL grace window.
    pub fn with_stop_grace(mut self, grace: Duration) -> Self {
        self.stop_grace = grace;
        self
    }
}
