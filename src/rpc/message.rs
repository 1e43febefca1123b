//! Bridge wire messages.
//!
//! Request: `{"id": "7", "method": "get_logs", "params": {"limit": 10}}`
//!
//! Response: `{"id": "7", "result": {...}}` or
//! `{"id": "7", "error": {"code": -32004, "message": "...", "data": ...}}`

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::errors::ErrorCode;
use crate::{AppError, Result};

/// One request or notification line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcRequest {
    /// Correlation id; notifications carry one too but expect no reply.
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    /// Method name.
    pub method: String,
    /// Method parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// Error body of a failed response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcErrorBody {
    /// Numeric error code.
    pub code: i32,
    /// Human-readable message.
    pub message: String,
    /// Optional structured detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcErrorBody {
    /// Build an error body from a known code.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.as_i32(),
            message: message.into(),
            data: None,
        }
    }
}

impl From<&AppError> for RpcErrorBody {
    fn from(err: &AppError) -> Self {
        Self {
            code: err.code(),
            message: err.message(),
            data: err.data(),
        }
    }
}

impl From<RpcErrorBody> for AppError {
    fn from(body: RpcErrorBody) -> Self {
        Self::Remote {
            code: body.code,
            message: body.message,
            data: body.data,
        }
    }
}

/// One response line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RpcResponse {
    /// Id of the request being answered; empty for parse-error replies.
    #[serde(deserialize_with = "id_from_string_or_number")]
    pub id: String,
    /// Success payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Failure payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorBody>,
}

impl RpcResponse {
    /// Successful reply.
    #[must_use]
    pub fn success(id: String, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Failed reply.
    #[must_use]
    pub fn failure(id: String, error: RpcErrorBody) -> Self {
        Self {
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Convert into the caller-facing result.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Remote` carrying the reply's error fields.
    pub fn into_result(self) -> Result<Value> {
        match self.error {
            Some(error) => Err(error.into()),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// A parsed inbound line: either side may send requests on a duplex link.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Line carried a `method`.
    Request(RpcRequest),
    /// Line carried an `id` and no `method`.
    Response(RpcResponse),
}

/// Parse one line into a request or a response.
///
/// # Errors
///
/// Returns `AppError::Ipc("malformed json: …")` if the line is not a JSON
/// object of either shape.
pub fn parse_line(line: &str) -> Result<Inbound> {
    let value: Value =
        serde_json::from_str(line).map_err(|e| AppError::Ipc(format!("malformed json: {e}")))?;

    if value.get("method").is_some() {
        serde_json::from_value(value)
            .map(Inbound::Request)
            .map_err(|e| AppError::Ipc(format!("malformed request: {e}")))
    } else {
        serde_json::from_value(value)
            .map(Inbound::Response)
            .map_err(|e| AppError::Ipc(format!("malformed response: {e}")))
    }
}

/// Serialize any message as one line, newline not included.
///
/// # Errors
///
/// Returns `AppError::Ipc` if serialization fails.
pub fn to_line<T: Serialize>(message: &T) -> Result<String> {
    serde_json::to_string(message).map_err(|e| AppError::Ipc(format!("serialize failed: {e}")))
}

fn id_from_string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Number(n) => n.to_string(),
    })
}
