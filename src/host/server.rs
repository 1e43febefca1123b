//! TCP bridge server answering the six remote operations.
//!
//! ## Protocol
//!
//! Request (one JSON object per line):
//! ```json
//! {"id": "1", "method": "launch_game", "params": {"multi_mode": true}}
//! {"id": "2", "method": "get_logs", "params": {"limit": 20}}
//! ```
//!
//! Response (one JSON object per line):
//! ```json
//! {"id": "1", "result": {"success": true, "session_id": "session_...", ...}}
//! {"id": "2", "error": {"code": -32004, "message": "no active game session"}}
//! ```

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};

use crate::config::BridgeConfig;
use crate::mcp::{ToolCall, ToolName};
use crate::rpc::{serve_connection, RpcService};
use crate::session::SessionCoordinator;
use crate::{AppError, Result};

/// Binds the six operation names to a [`SessionCoordinator`].
pub struct SessionService {
    coordinator: Arc<SessionCoordinator>,
}

impl SessionService {
    /// Service backed by `coordinator`.
    #[must_use]
    pub fn new(coordinator: Arc<SessionCoordinator>) -> Self {
        Self { coordinator }
    }

    async fn run(&self, call: ToolCall) -> Result<Value> {
        let coordinator = &self.coordinator;
        match call {
            ToolCall::LaunchGame(options) => encode(&coordinator.launch(options).await?),
            ToolCall::GetGameStatus => encode(&coordinator.status()),
            ToolCall::GetLogs { limit } => encode(&coordinator.logs(limit)),
            ToolCall::ExecuteLua { code } => encode(&coordinator.execute_command(&code).await?),
            ToolCall::QuickRestart => encode(&coordinator.quick_restart().await?),
            ToolCall::StopGame => encode(&coordinator.stop().await),
        }
    }
}

impl RpcService for SessionService {
    fn handle(
        &self,
        method: String,
        params: Option<Value>,
    ) -> Pin<Box<dyn Future<Output = Result<Value>> + Send + '_>> {
        Box::pin(async move {
            if ToolName::from_name(&method).is_none() {
                return Err(AppError::MethodNotFound(format!("Unknown method: {method}")));
            }
            let call = ToolCall::parse(&method, params)?;
            self.run(call).await
        })
    }
}

fn encode<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value)
        .map_err(|err| AppError::Io(format!("failed to encode operation result: {err}")))
}

/// Bind the bridge listener and serve connections until `ct` fires.
///
/// Returns the bound address (useful with port 0) and the accept-loop task.
///
/// # Errors
///
/// Returns `AppError::Ipc` if the listener cannot be bound.
pub async fn spawn_bridge_server(
    config: &BridgeConfig,
    service: Arc<dyn RpcService>,
    ct: CancellationToken,
) -> Result<(SocketAddr, JoinHandle<()>)> {
    let addr = config.addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|err| AppError::Ipc(format!("failed to bind bridge server {addr}: {err}")))?;
    let local = listener
        .local_addr()
        .map_err(|err| AppError::Ipc(format!("bridge server has no address: {err}")))?;

    info!(addr = %local, "bridge server listening");

    let handle = tokio::spawn(
        async move {
            loop {
                tokio::select! {
                    () = ct.cancelled() => {
                        info!("bridge server shutting down");
                        break;
                    }
                    accepted = listener.accept() => match accepted {
                        Ok((stream, peer)) => {
                            let service = Arc::clone(&service);
                            let conn_ct = ct.child_token();
                            tokio::spawn(
                                async move {
                                    info!("bridge connection opened");
                                    let (read_half, write_half) = stream.into_split();
                                    serve_connection(read_half, write_half, service, conn_ct).await;
                                    info!("bridge connection closed");
                                }
                                .instrument(info_span!("bridge_conn", %peer)),
                            );
                        }
                        Err(err) => warn!(%err, "bridge accept failed"),
                    }
                }
            }
        }
        .instrument(info_span!("bridge_server", addr = %local)),
    );

    Ok((local, handle))
}
