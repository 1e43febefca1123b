//! Session lifecycle status and launch options.

use serde::{Deserialize, Serialize};

/// Lifecycle status for the game session.
///
/// `Launching → Running → Stopped` is the normal path; a quick restart
/// moves `Running → Restarting → Running | Stopped`. Any state may be
/// forced to `Stopped`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Launcher invoked, waiting for the first client to attach.
    Launching,
    /// A client is attached.
    Running,
    /// Terminal state.
    Stopped,
    /// Restart command sent, waiting for the client to come back.
    Restarting,
}

impl SessionStatus {
    /// Wire label.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Launching => "launching",
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Restarting => "restarting",
        }
    }

    /// Whether the connection monitor should look for a client to attach.
    #[must_use]
    pub fn awaits_client(self) -> bool {
        matches!(self, Self::Launching | Self::Restarting)
    }

    /// Determine whether a lifecycle transition is permitted.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Launching | Self::Restarting, Self::Running)
                | (Self::Running, Self::Restarting)
                | (Self::Launching | Self::Running | Self::Restarting, Self::Stopped)
        )
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options accepted by `launch_game`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LaunchOptions {
    /// Accepted for compatibility; automated launches never attach a debugger.
    pub attach_debugger: bool,
    /// Start in multi-player mode.
    pub multi_mode: bool,
    /// Player count for multi-player mode.
    pub multi_players: Option<u32>,
    /// Enable the Tracy profiler.
    pub tracy: bool,
}
