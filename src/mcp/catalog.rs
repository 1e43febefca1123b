//! Static tool catalogue and typed tool arguments.
//!
//! Both the front (`tools/call`) and the host bridge server parse operation
//! arguments through [`ToolCall::parse`], so unknown or malformed fields are
//! rejected before anything reaches the session coordinator.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::models::LaunchOptions;
use crate::{AppError, Result};

// ── Catalogue ────────────────────────────────────────────────────────────────

/// Names of the six remote operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    /// `launch_game`
    LaunchGame,
    /// `get_game_status`
    GetGameStatus,
    /// `get_logs`
    GetLogs,
    /// `execute_lua`
    ExecuteLua,
    /// `quick_restart`
    QuickRestart,
    /// `stop_game`
    StopGame,
}

impl ToolName {
    /// Every tool, in catalogue order.
    pub const ALL: [Self; 6] = [
        Self::LaunchGame,
        Self::GetLogs,
        Self::ExecuteLua,
        Self::StopGame,
        Self::GetGameStatus,
        Self::QuickRestart,
    ];

    /// Wire name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LaunchGame => "launch_game",
            Self::GetGameStatus => "get_game_status",
            Self::GetLogs => "get_logs",
            Self::ExecuteLua => "execute_lua",
            Self::QuickRestart => "quick_restart",
            Self::StopGame => "stop_game",
        }
    }

    /// Look up a tool by wire name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.as_str() == name)
    }

    /// Catalogue entry advertised by `tools/list`.
    #[must_use]
    pub fn descriptor(self) -> Value {
        let (description, input_schema) = match self {
            Self::LaunchGame => (
                "Launch the game and wait for its client to connect.",
                json!({
                    "type": "object",
                    "properties": {
                        "attach_debugger": {
                            "type": "boolean",
                            "description": "Attach a debugger (ignored for automated launches)",
                            "default": false
                        },
                        "multi_mode": {
                            "type": "boolean",
                            "description": "Start in multi-player mode",
                            "default": false
                        },
                        "multi_players": {
                            "type": "number",
                            "description": "Player count for multi-player mode"
                        },
                        "tracy": {
                            "type": "boolean",
                            "description": "Enable the Tracy profiler",
                            "default": false
                        }
                    }
                }),
            ),
            Self::GetLogs => (
                "Read the game console log. Returns the most recent lines.",
                json!({
                    "type": "object",
                    "properties": {
                        "limit": {
                            "type": "number",
                            "description": "Return the N most recent lines, default 100",
                            "default": 100
                        }
                    }
                }),
            ),
            Self::ExecuteLua => (
                "Execute Lua code in the running game. The code runs in the game's Lua \
                 environment and can use the game API.",
                json!({
                    "type": "object",
                    "properties": {
                        "code": {
                            "type": "string",
                            "description": "Lua code to execute"
                        }
                    },
                    "required": ["code"]
                }),
            ),
            Self::StopGame => (
                "Stop the current game session.",
                json!({ "type": "object", "properties": {} }),
            ),
            Self::GetGameStatus => (
                "Report whether the game is running, the session id, and its uptime.",
                json!({ "type": "object", "properties": {} }),
            ),
            Self::QuickRestart => (
                "Quick restart (.rr command). Reloads every Lua script without \
                 restarting the game process.",
                json!({ "type": "object", "properties": {} }),
            ),
        };

        json!({
            "name": self.as_str(),
            "description": description,
            "inputSchema": input_schema,
        })
    }
}

/// `tools/list` result body.
#[must_use]
pub fn tool_list() -> Value {
    let tools: Vec<Value> = ToolName::ALL.into_iter().map(ToolName::descriptor).collect();
    json!({ "tools": tools })
}

// ── Typed arguments ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NoArgs {}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LogsArgs {
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExecuteArgs {
    code: String,
}

/// A validated operation invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    /// Launch with options.
    LaunchGame(LaunchOptions),
    /// Read status.
    GetGameStatus,
    /// Read the log tail.
    GetLogs {
        /// Line limit; the coordinator default applies when absent.
        limit: Option<usize>,
    },
    /// Run code in the game.
    ExecuteLua {
        /// Lua source.
        code: String,
    },
    /// Reload the game's scripts.
    QuickRestart,
    /// Stop the session.
    StopGame,
}

impl ToolCall {
    /// Validate `arguments` for the tool called `name`.
    ///
    /// Absent or `null` arguments are treated as an empty object.
    ///
    /// # Errors
    ///
    /// - `AppError::MethodNotFound` if `name` is not a known tool.
    /// - `AppError::InvalidParams` if the arguments are missing a required
    ///   field, carry an unknown field, or have the wrong type.
    pub fn parse(name: &str, arguments: Option<Value>) -> Result<Self> {
        let tool = ToolName::from_name(name)
            .ok_or_else(|| AppError::MethodNotFound(format!("Unknown tool: {name}")))?;
        let arguments = match arguments {
            None | Some(Value::Null) => Value::Object(serde_json::Map::new()),
            Some(value) => value,
        };

        Ok(match tool {
            ToolName::LaunchGame => Self::LaunchGame(decode(tool, arguments)?),
            ToolName::GetGameStatus => {
                decode::<NoArgs>(tool, arguments)?;
                Self::GetGameStatus
            }
            ToolName::GetLogs => Self::GetLogs {
                limit: decode::<LogsArgs>(tool, arguments)?.limit,
            },
            ToolName::ExecuteLua => Self::ExecuteLua {
                code: decode::<ExecuteArgs>(tool, arguments)?.code,
            },
            ToolName::QuickRestart => {
                decode::<NoArgs>(tool, arguments)?;
                Self::QuickRestart
            }
            ToolName::StopGame => {
                decode::<NoArgs>(tool, arguments)?;
                Self::StopGame
            }
        })
    }

    /// Which tool this call invokes.
    #[must_use]
    pub fn name(&self) -> ToolName {
        match self {
            Self::LaunchGame(_) => ToolName::LaunchGame,
            Self::GetGameStatus => ToolName::GetGameStatus,
            Self::GetLogs { .. } => ToolName::GetLogs,
            Self::ExecuteLua { .. } => ToolName::ExecuteLua,
            Self::QuickRestart => ToolName::QuickRestart,
            Self::StopGame => ToolName::StopGame,
        }
    }

    /// Bridge request parameters for this call.
    #[must_use]
    pub fn to_params(&self) -> Option<Value> {
        match self {
            Self::LaunchGame(options) => serde_json::to_value(options).ok(),
            Self::GetLogs { limit: Some(limit) } => Some(json!({ "limit": limit })),
            Self::ExecuteLua { code } => Some(json!({ "code": code })),
            Self::GetLogs { limit: None }
            | Self::GetGameStatus
            | Self::QuickRestart
            | Self::StopGame => None,
        }
    }
}

fn decode<T: DeserializeOwned>(tool: ToolName, arguments: Value) -> Result<T> {
    serde_json::from_value(arguments)
        .map_err(|err| AppError::InvalidParams(format!("{}: {err}", tool.as_str())))
}
