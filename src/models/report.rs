//! Result payloads of the six remote operations.
//!
//! Timeouts are reported as ordinary values with `success = false`, so the
//! caller can tell "completed without reaching the desired state" apart from
//! "could not be attempted" (which is an error reply).

use serde::{Deserialize, Serialize};

/// Result of `launch_game`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LaunchOutcome {
    /// Whether a client attached before the deadline.
    pub success: bool,
    /// Identifier of the session created by this launch.
    pub session_id: String,
    /// Status label after the launch settled.
    pub status: String,
    /// Human-readable summary.
    pub message: String,
}

/// Result of `get_game_status`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusReport {
    /// True only while a client is attached and the status is `running`.
    pub running: bool,
    /// Current session, `null` when there is none.
    pub session_id: Option<String>,
    /// Status label, or `no_session`.
    pub status: String,
    /// Milliseconds since the session was created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uptime: Option<u64>,
}

impl StatusReport {
    /// Report used when there is no session.
    #[must_use]
    pub fn no_session() -> Self {
        Self {
            running: false,
            session_id: None,
            status: "no_session".into(),
            uptime: None,
        }
    }
}

/// Result of `get_logs`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogsReport {
    /// False when there is no session.
    pub success: bool,
    /// Number of lines returned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_count: Option<usize>,
    /// Lines joined with `\n`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<String>,
    /// Failure explanation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Result of `execute_lua`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandOutput {
    /// False when no code was given.
    pub success: bool,
    /// Lines appended during the capture window, joined with `\n`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Failure explanation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Result of `quick_restart`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RestartOutcome {
    /// Whether the session was running again before the deadline.
    pub success: bool,
    /// Human-readable summary.
    pub message: String,
    /// Lines appended since the restart was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

/// Result of `stop_game`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StopOutcome {
    /// Always true; stop never fails.
    pub success: bool,
    /// Human-readable summary.
    pub message: String,
}
