//! Global configuration parsing and validation.
//!
//! Every field has a default, so a missing config file yields a working
//! setup. Components receive the section they need at construction time.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::{AppError, Result};

fn default_host() -> String {
    "127.0.0.1".into()
}

fn default_bridge_port() -> u16 {
    25897
}

fn default_console_port() -> u16 {
    25898
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_log_dir() -> PathBuf {
    std::env::temp_dir().join("game-bridge-logs")
}

fn default_max_files() -> usize {
    5
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_launch_timeout_ms() -> u64 {
    60_000
}

fn default_restart_timeout_ms() -> u64 {
    10_000
}

fn default_capture_window_ms() -> u64 {
    1_000
}

fn default_stop_grace_ms() -> u64 {
    1_000
}

/// TCP endpoint of the host bridge server.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct BridgeConfig {
    /// Listen / connect address.
    #[serde(default = "default_host")]
    pub host: String,
    /// Listen / connect port; 0 picks an ephemeral port.
    #[serde(default = "default_bridge_port")]
    pub port: u16,
    /// Per-request reply deadline.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl BridgeConfig {
    /// `host:port` string suitable for `TcpListener::bind`.
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Request deadline as a [`Duration`].
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_bridge_port(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// Listener where game clients connect.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ConsoleConfig {
    /// Listen address.
    #[serde(default = "default_host")]
    pub host: String,
    /// Listen port; 0 picks an ephemeral port.
    #[serde(default = "default_console_port")]
    pub port: u16,
}

impl ConsoleConfig {
    /// `host:port` string suitable for `TcpListener::bind`.
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_console_port(),
        }
    }
}

/// Session log storage.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct LogConfig {
    /// Directory holding one log file per session.
    #[serde(default = "default_log_dir")]
    pub dir: PathBuf,
    /// Number of session log files retained.
    #[serde(default = "default_max_files")]
    pub max_files: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            max_files: default_max_files(),
        }
    }
}

/// Timings of the session state machine.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SessionConfig {
    /// Connection monitor tick and attach-wait sampling period.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// How long `launch` waits for a client to attach.
    #[serde(default = "default_launch_timeout_ms")]
    pub launch_timeout_ms: u64,
    /// How long `quick_restart` waits for the session to run again.
    #[serde(default = "default_restart_timeout_ms")]
    pub restart_timeout_ms: u64,
    /// Output capture window after sending a command.
    #[serde(default = "default_capture_window_ms")]
    pub capture_window_ms: u64,
    /// Pause between the forced-quit command and releasing the client.
    #[serde(default = "default_stop_grace_ms")]
    pub stop_grace_ms: u64,
}

impl SessionConfig {
    /// Monitor tick period.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Attach deadline for `launch`.
    #[must_use]
    pub fn launch_timeout(&self) -> Duration {
        Duration::from_millis(self.launch_timeout_ms)
    }

    /// Reconnect deadline for `quick_restart`.
    #[must_use]
    pub fn restart_timeout(&self) -> Duration {
        Duration::from_millis(self.restart_timeout_ms)
    }

    /// Output capture window.
    #[must_use]
    pub fn capture_window(&self) -> Duration {
        Duration::from_millis(self.capture_window_ms)
    }

    /// Forced-quit grace period.
    #[must_use]
    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            launch_timeout_ms: default_launch_timeout_ms(),
            restart_timeout_ms: default_restart_timeout_ms(),
            capture_window_ms: default_capture_window_ms(),
            stop_grace_ms: default_stop_grace_ms(),
        }
    }
}

/// Game executable started by `launch_game`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct LauncherConfig {
    /// Executable path; empty means launching is not configured.
    #[serde(default)]
    pub program: String,
    /// Arguments passed before the per-launch flags.
    #[serde(default)]
    pub args: Vec<String>,
    /// Map project directory that must exist before launching.
    #[serde(default)]
    pub map_dir: Option<PathBuf>,
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GlobalConfig {
    /// Host bridge endpoint.
    #[serde(default)]
    pub bridge: BridgeConfig,
    /// Game client listener.
    #[serde(default)]
    pub console: ConsoleConfig,
    /// Session log storage.
    #[serde(default)]
    pub logs: LogConfig,
    /// State machine timings.
    #[serde(default)]
    pub session: SessionConfig,
    /// Game executable.
    #[serde(default)]
    pub launcher: LauncherConfig,
}

impl GlobalConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when given, otherwise fall back to defaults.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the given file is unreadable or invalid.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Ok(Self::default()),
        }
    }

    /// Check cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.session.poll_interval_ms == 0 {
            return Err(AppError::Config(
                "session.poll_interval_ms must be greater than zero".into(),
            ));
        }

        if self.logs.max_files == 0 {
            return Err(AppError::Config(
                "logs.max_files must be greater than zero".into(),
            ));
        }

        if self.bridge.host.trim().is_empty() || self.console.host.trim().is_empty() {
            return Err(AppError::Config("listen host must not be empty".into()));
        }

        Ok(())
    }
}
