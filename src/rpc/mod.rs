//! Correlated duplex RPC over newline-delimited JSON.
//!
//! The same framing is used on every byte stream in the system: the front
//! end's TCP link to the host, the host's game client connections, and the
//! stdio front envelope. [`client::RpcClient`] is the caller side with
//! request correlation and deadlines; [`server::serve_connection`] is the
//! answering side bound to an [`server::RpcService`].

pub mod client;
pub mod codec;
pub mod message;
pub mod server;

pub use client::RpcClient;
pub use codec::{LineCodec, LineReader, MAX_LINE_BYTES};
pub use message::{Inbound, RpcErrorBody, RpcRequest, RpcResponse};
pub use server::{serve_connection, RpcService};
