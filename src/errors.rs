//! Error types shared across the application.

use std::fmt::{Display, Formatter};

use serde_json::Value;

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Numeric error codes carried on the wire.
///
/// The first five are the standard JSON-RPC codes; the rest are domain
/// codes reported by the host for session-level failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    /// Line was not valid JSON.
    ParseError = -32700,
    /// Envelope failed validation.
    InvalidRequest = -32600,
    /// Unknown method name.
    MethodNotFound = -32601,
    /// Missing or malformed parameters.
    InvalidParams = -32602,
    /// Anything else.
    InternalError = -32603,
    /// The game is not running.
    GameNotRunning = -32001,
    /// The launcher failed to start the game.
    GameLaunchFailed = -32002,
    /// A command could not be delivered to the game.
    LuaExecutionFailed = -32003,
    /// There is no active session.
    SessionNotFound = -32004,
    /// The bridge connection failed, closed, or timed out.
    IpcConnectionFailed = -32005,
    /// A session exists but no game client is attached to it.
    ClientNotConnected = -32006,
}

impl ErrorCode {
    /// Wire representation.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Map a wire code back to a known code, if it is one.
    #[must_use]
    pub fn from_i32(code: i32) -> Option<Self> {
        let known = [
            Self::ParseError,
            Self::InvalidRequest,
            Self::MethodNotFound,
            Self::InvalidParams,
            Self::InternalError,
            Self::GameNotRunning,
            Self::GameLaunchFailed,
            Self::LuaExecutionFailed,
            Self::SessionNotFound,
            Self::IpcConnectionFailed,
            Self::ClientNotConnected,
        ];
        known.into_iter().find(|c| c.as_i32() == code)
    }
}

/// Application error enumeration covering all failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// File-system or I/O operation failure.
    Io(String),
    /// Bridge transport failure (connect, write, framing).
    Ipc(String),
    /// A bridge request received no reply before its deadline.
    Timeout(String),
    /// The bridge connection closed while the request was outstanding.
    ConnectionClosed(String),
    /// The peer answered a bridge request with an error reply.
    Remote {
        /// Code from the error reply.
        code: i32,
        /// Message from the error reply.
        message: String,
        /// Optional structured detail from the error reply.
        data: Option<Value>,
    },
    /// Envelope-level protocol violation.
    Protocol(String),
    /// Unknown method or operation name.
    MethodNotFound(String),
    /// Missing or malformed operation parameters.
    InvalidParams(String),
    /// No active session exists.
    SessionNotFound(String),
    /// The session has no attached game client.
    ClientNotConnected(String),
    /// The launcher failed; carries the launcher's own error text.
    LaunchFailed {
        /// Human-readable summary.
        message: String,
        /// Launcher error that caused the failure.
        cause: String,
    },
    /// The game process is not running.
    GameNotRunning(String),
    /// A command could not be handed to the game client.
    CommandFailed(String),
}

impl AppError {
    /// Wire code reported for this error.
    #[must_use]
    pub fn code(&self) -> i32 {
        let code = match self {
            Self::Remote { code, .. } => return *code,
            Self::Config(_) | Self::Io(_) => ErrorCode::InternalError,
            Self::Ipc(_) | Self::Timeout(_) | Self::ConnectionClosed(_) => {
                ErrorCode::IpcConnectionFailed
            }
            Self::Protocol(_) => ErrorCode::InvalidRequest,
            Self::MethodNotFound(_) => ErrorCode::MethodNotFound,
            Self::InvalidParams(_) => ErrorCode::InvalidParams,
            Self::SessionNotFound(_) => ErrorCode::SessionNotFound,
            Self::ClientNotConnected(_) => ErrorCode::ClientNotConnected,
            Self::LaunchFailed { .. } => ErrorCode::GameLaunchFailed,
            Self::GameNotRunning(_) => ErrorCode::GameNotRunning,
            Self::CommandFailed(_) => ErrorCode::LuaExecutionFailed,
        };
        code.as_i32()
    }

    /// Structured detail attached to the error reply, if any.
    #[must_use]
    pub fn data(&self) -> Option<Value> {
        match self {
            Self::Remote { data, .. } => data.clone(),
            Self::LaunchFailed { cause, .. } => {
                Some(serde_json::json!({ "original_error": cause }))
            }
            _ => None,
        }
    }

    /// Message text without the category prefix used by `Display`.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Config(msg)
            | Self::Io(msg)
            | Self::Ipc(msg)
            | Self::Timeout(msg)
            | Self::ConnectionClosed(msg)
            | Self::Protocol(msg)
            | Self::MethodNotFound(msg)
            | Self::InvalidParams(msg)
            | Self::SessionNotFound(msg)
            | Self::ClientNotConnected(msg)
            | Self::GameNotRunning(msg)
            | Self::CommandFailed(msg) => msg.clone(),
            Self::Remote { message, .. } => message.clone(),
            Self::LaunchFailed { message, cause } => format!("{message}: {cause}"),
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
            Self::Ipc(msg) => write!(f, "ipc: {msg}"),
            Self::Timeout(msg) => write!(f, "timeout: {msg}"),
            Self::ConnectionClosed(msg) => write!(f, "connection closed: {msg}"),
            Self::Remote { code, message, .. } => write!(f, "remote error {code}: {message}"),
            Self::Protocol(msg) => write!(f, "protocol: {msg}"),
            Self::MethodNotFound(msg) => write!(f, "method not found: {msg}"),
            Self::InvalidParams(msg) => write!(f, "invalid params: {msg}"),
            Self::SessionNotFound(msg) => write!(f, "session not found: {msg}"),
            Self::ClientNotConnected(msg) => write!(f, "client not connected: {msg}"),
            Self::LaunchFailed { message, cause } => {
                write!(f, "game launch failed: {message}: {cause}")
            }
            Self::GameNotRunning(msg) => write!(f, "game not running: {msg}"),
            Self::CommandFailed(msg) => write!(f, "command failed: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
