//! JSON-RPC 2.0 envelopes of the front protocol.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::errors::ErrorCode;
use crate::AppError;

/// Protocol version tag every request must carry.
pub const JSONRPC_VERSION: &str = "2.0";

/// An inbound envelope, kept loose so validation can report precise errors.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JsonRpcRequest {
    /// Version tag; must equal [`JSONRPC_VERSION`].
    #[serde(default)]
    pub jsonrpc: Option<Value>,
    /// Request id; `None` only when the member is absent (a notification).
    /// An explicit `null` id is `Some(Value::Null)` and still gets a reply.
    #[serde(default, deserialize_with = "present")]
    pub id: Option<Value>,
    /// Method name.
    #[serde(default)]
    pub method: Option<Value>,
    /// Method parameters.
    #[serde(default)]
    pub params: Option<Value>,
}

/// Error object of a failed envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcError {
    /// Numeric error code.
    pub code: i32,
    /// Human-readable message.
    pub message: String,
    /// Optional structured detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    /// Error with a known code and no detail.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.as_i32(),
            message: message.into(),
            data: None,
        }
    }
}

impl From<&AppError> for JsonRpcError {
    fn from(err: &AppError) -> Self {
        Self {
            code: err.code(),
            message: err.message(),
            data: err.data(),
        }
    }
}

/// An outbound envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcResponse {
    /// Always [`JSONRPC_VERSION`].
    pub jsonrpc: String,
    /// Id of the request being answered, `null` when it could not be read.
    pub id: Value,
    /// Success payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Failure payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Successful reply.
    #[must_use]
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Failed reply.
    #[must_use]
    pub fn failure(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Reply to a line that was not valid JSON.
    #[must_use]
    pub fn parse_error() -> Self {
        Self::failure(
            Value::Null,
            JsonRpcError::new(ErrorCode::ParseError, "Parse error"),
        )
    }
}

/// Keep a present member, `null` included, distinct from an absent one.
fn present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}
