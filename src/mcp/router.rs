//! Front-side envelope validation and dispatch.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info_span, warn, Instrument};

use super::catalog::{tool_list, ToolCall};
use super::envelope::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, JSONRPC_VERSION};
use crate::errors::ErrorCode;
use crate::rpc::RpcClient;
use crate::{AppError, Result};

/// Protocol revision reported by `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Name reported in `serverInfo`.
pub const SERVER_NAME: &str = "game-bridge";

/// Executes validated tool calls.
pub trait ToolBackend: Send + Sync {
    /// Run one operation and return its result payload.
    ///
    /// # Errors
    ///
    /// Whatever the backend reports; the code is preserved in the reply.
    fn invoke(&self, call: ToolCall) -> Pin<Box<dyn Future<Output = Result<Value>> + Send + '_>>;
}

impl ToolBackend for RpcClient {
    fn invoke(&self, call: ToolCall) -> Pin<Box<dyn Future<Output = Result<Value>> + Send + '_>> {
        Box::pin(async move { self.call(call.name().as_str(), call.to_params()).await })
    }
}

/// Validates envelopes and routes them to the meta-methods or the backend.
pub struct ProtocolRouter {
    backend: Arc<dyn ToolBackend>,
}

impl ProtocolRouter {
    /// Route tool calls to `backend`.
    #[must_use]
    pub fn new(backend: Arc<dyn ToolBackend>) -> Self {
        Self { backend }
    }

    /// Handle one parsed envelope.
    ///
    /// Returns `None` for notifications (envelopes without an `id`).
    pub async fn handle(&self, envelope: Value) -> Option<JsonRpcResponse> {
        let request: JsonRpcRequest = match serde_json::from_value(envelope) {
            Ok(request) => request,
            Err(err) => {
                debug!(error = %err, "envelope is not an object");
                return Some(invalid_request(Value::Null));
            }
        };

        let Some(id) = request.id.clone() else {
            debug!(method = ?request.method, "notification received; no reply");
            return None;
        };

        if request.jsonrpc.as_ref().and_then(Value::as_str) != Some(JSONRPC_VERSION) {
            return Some(invalid_request(id));
        }
        let Some(method) = request.method.as_ref().and_then(Value::as_str) else {
            return Some(invalid_request(id));
        };

        let span = info_span!("envelope", %id, method);
        let outcome = self
            .dispatch(method, request.params)
            .instrument(span)
            .await;

        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(err) => {
                debug!(error = %err, method, "request failed");
                JsonRpcResponse::failure(id, JsonRpcError::from(&err))
            }
        })
    }

    async fn dispatch(&self, method: &str, params: Option<Value>) -> Result<Value> {
        match method {
            "initialize" => Ok(json!({
                "protocolVersion": PROTOCOL_VERSION,
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": env!("CARGO_PKG_VERSION"),
                },
                "capabilities": { "tools": {} },
            })),
            "tools/list" => Ok(tool_list()),
            "tools/call" => self.call_tool(params).await,
            other => Err(AppError::MethodNotFound(format!("Method not found: {other}"))),
        }
    }

    async fn call_tool(&self, params: Option<Value>) -> Result<Value> {
        let mut params = match params {
            Some(Value::Object(map)) => map,
            None | Some(Value::Null) => serde_json::Map::new(),
            Some(_) => return Err(AppError::InvalidParams("params must be an object".into())),
        };
        let name = match params.remove("name") {
            Some(Value::String(name)) if !name.is_empty() => name,
            _ => return Err(AppError::InvalidParams("Tool name is required".into())),
        };
        let call = ToolCall::parse(&name, params.remove("arguments"))?;

        let result = self.backend.invoke(call).await.inspect_err(|err| {
            warn!(tool = %name, error = %err, "tool call failed");
        })?;
        let text = serde_json::to_string_pretty(&result).unwrap_or_else(|_| result.to_string());

        Ok(json!({ "content": [{ "type": "text", "text": text }] }))
    }
}

fn invalid_request(id: Value) -> JsonRpcResponse {
    JsonRpcResponse::failure(
        id,
        JsonRpcError::new(ErrorCode::InvalidRequest, "Invalid Request"),
    )
}
