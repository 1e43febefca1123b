//! Model Context Protocol front layer.
//!
//! [`router::ProtocolRouter`] validates JSON-RPC 2.0 envelopes and answers
//! `initialize`, `tools/list`, and `tools/call`; tool calls are relayed to a
//! [`router::ToolBackend`], normally the bridge client connected to the host.

pub mod catalog;
pub mod envelope;
pub mod router;
pub mod transport;

pub use catalog::{tool_list, ToolCall, ToolName};
pub use envelope::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, JSONRPC_VERSION};
pub use router::{ProtocolRouter, ToolBackend, PROTOCOL_VERSION};
pub use transport::{serve_lines, serve_stdio};
