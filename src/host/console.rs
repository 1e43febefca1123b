//! Console listener where game clients connect.
//!
//! Each accepted connection becomes a [`ConsoleClient`] appended to the
//! [`ConsoleRegistry`]; it is removed when the connection closes or the
//! client is disposed. The game reports output with `print` messages
//! (`{"method": "print", "params": {"message": "..."}}`) and receives
//! commands as `command` notifications.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::ConsoleConfig;
use crate::rpc::{RpcClient, RpcRequest};
use crate::session::{ClientId, ClientRegistry, GameClient, OutputTap};
use crate::{AppError, Result};

/// Method the game uses to report a line of output.
pub const PRINT_METHOD: &str = "print";

// ── Client handle ────────────────────────────────────────────────────────────

/// One connected game client.
pub struct ConsoleClient {
    id: ClientId,
    rpc: Arc<RpcClient>,
    tap: Mutex<Option<OutputTap>>,
}

impl ConsoleClient {
    /// Wrap an established connection.
    #[must_use]
    pub fn new(id: ClientId, rpc: Arc<RpcClient>) -> Self {
        Self {
            id,
            rpc,
            tap: Mutex::new(None),
        }
    }

    /// Route one emitted message through the tap, then forward it.
    pub fn emit(&self, message: &str) {
        let tap = self.tap_slot().clone();
        for line in message.lines() {
            if let Some(tap) = &tap {
                tap(line);
            }
            info!(target: "game", client_id = %self.id, "{line}");
        }
    }

    fn tap_slot(&self) -> MutexGuard<'_, Option<OutputTap>> {
        self.tap.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl GameClient for ConsoleClient {
    fn id(&self) -> ClientId {
        self.id
    }

    fn notify(&self, method: &str, params: Value) -> Result<()> {
        self.rpc.notify(method, Some(params))
    }

    fn install_output_tap(&self, tap: OutputTap) {
        *self.tap_slot() = Some(tap);
    }

    fn dispose(&self) {
        debug!(client_id = %self.id, "disposing game client");
        self.rpc.close();
    }
}

// ── Registry ─────────────────────────────────────────────────────────────────

/// Ordered set of live game clients, oldest first.
#[derive(Default)]
pub struct ConsoleRegistry {
    next_id: AtomicU64,
    clients: Mutex<Vec<Arc<ConsoleClient>>>,
}

impl ConsoleRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection and return its handle.
    pub fn register(&self, rpc: Arc<RpcClient>) -> Arc<ConsoleClient> {
        let id = ClientId(self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let client = Arc::new(ConsoleClient::new(id, rpc));
        self.lock().push(Arc::clone(&client));
        client
    }

    /// Drop the handle with `id`, if present.
    pub fn remove(&self, id: ClientId) {
        self.lock().retain(|client| client.id != id);
    }

    /// Number of registered clients.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no client is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Arc<ConsoleClient>>> {
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ClientRegistry for ConsoleRegistry {
    fn snapshot(&self) -> Vec<Arc<dyn GameClient>> {
        self.lock()
            .iter()
            .filter(|client| !client.rpc.is_closed())
            .map(|client| Arc::clone(client) as Arc<dyn GameClient>)
            .collect()
    }
}

// ── Listener ─────────────────────────────────────────────────────────────────

/// Bind the console listener and accept game clients until `ct` fires.
///
/// Returns the bound address (useful with port 0) and the accept-loop task.
///
/// # Errors
///
/// Returns `AppError::Ipc` if the listener cannot be bound.
pub async fn spawn_console_listener(
    config: &ConsoleConfig,
    registry: Arc<ConsoleRegistry>,
    request_timeout: Duration,
    ct: CancellationToken,
) -> Result<(SocketAddr, JoinHandle<()>)> {
    let addr = config.addr();
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|err| AppError::Ipc(format!("failed to bind console listener {addr}: {err}")))?;
    let local = listener
        .local_addr()
        .map_err(|err| AppError::Ipc(format!("console listener has no address: {err}")))?;

    info!(addr = %local, "console listener ready");

    let handle = tokio::spawn(
        async move {
            loop {
                tokio::select! {
                    () = ct.cancelled() => {
                        info!("console listener shutting down");
                        break;
                    }
                    accepted = listener.accept() => match accepted {
                        Ok((stream, peer)) => {
                            let (read_half, write_half) = stream.into_split();
                            let (rpc, inbound) = RpcClient::spawn(
                                peer.to_string(),
                                read_half,
                                write_half,
                                request_timeout,
                            );
                            let client = registry.register(rpc);
                            info!(client_id = %client.id, %peer, "game client connected");
                            tokio::spawn(
                                pump_client(client, inbound, Arc::clone(&registry))
                                    .instrument(info_span!("console_conn", %peer)),
                            );
                        }
                        Err(err) => warn!(%err, "console accept failed"),
                    }
                }
            }
        }
        .instrument(info_span!("console_listener", addr = %local)),
    );

    Ok((local, handle))
}

async fn pump_client(
    client: Arc<ConsoleClient>,
    mut inbound: mpsc::UnboundedReceiver<RpcRequest>,
    registry: Arc<ConsoleRegistry>,
) {
    while let Some(request) = inbound.recv().await {
        if request.method == PRINT_METHOD {
            match request
                .params
                .as_ref()
                .and_then(|params| params.get("message"))
                .and_then(Value::as_str)
            {
                Some(message) => client.emit(message),
                None => debug!("print message without text ignored"),
            }
        } else {
            debug!(method = %request.method, "unsupported game client message");
        }
    }

    registry.remove(client.id);
    info!(client_id = %client.id, "game client disconnected");
}
