//! Caller side of the bridge.
//!
//! Each [`RpcClient`] owns one duplex byte stream and two background tasks:
//! a reader that resolves pending calls from response lines, and a writer
//! that serializes outbound lines. Requests are correlated solely by id, so
//! replies may arrive in any order.
//!
//! # Pending table invariants
//!
//! - At most one entry per id; ids come from a monotonically increasing
//!   counter.
//! - An entry is removed when its reply arrives, its deadline elapses, its
//!   caller goes away, or the connection closes. Removal is idempotent; a
//!   reply for an id with no entry is dropped.
//! - On close every outstanding entry is rejected with
//!   `AppError::ConnectionClosed` and the table is cleared.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::SinkExt;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tokio_util::codec::FramedWrite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, warn, Instrument};

use super::codec::{LineCodec, LineReader};
use super::message::{parse_line, to_line, Inbound, RpcRequest, RpcResponse};
use crate::{AppError, Result};

/// Default reply deadline for [`RpcClient::call`].
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// ── Pending table ────────────────────────────────────────────────────────────

/// Bookkeeping for one in-flight request.
#[derive(Debug)]
pub struct PendingCall {
    /// Method name, for diagnostics.
    pub method: String,
    /// When the request was registered.
    pub created_at: Instant,
    /// When the request times out.
    pub deadline: Instant,
    result_tx: oneshot::Sender<Result<Value>>,
}

type PendingTable = Arc<Mutex<HashMap<String, PendingCall>>>;

fn lock(table: &PendingTable) -> MutexGuard<'_, HashMap<String, PendingCall>> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Removes a pending entry when the awaiting caller finishes or is dropped.
struct PendingGuard {
    id: String,
    table: PendingTable,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        lock(&self.table).remove(&self.id);
    }
}

// ── Client ───────────────────────────────────────────────────────────────────

/// Correlating RPC caller over one byte stream.
#[derive(Debug)]
pub struct RpcClient {
    label: String,
    next_id: AtomicU64,
    pending: PendingTable,
    outbound: mpsc::UnboundedSender<String>,
    request_timeout: Duration,
    closed: CancellationToken,
}

impl RpcClient {
    /// Start the reader and writer tasks over `reader` / `writer`.
    ///
    /// Returns the client and a receiver for requests and notifications the
    /// peer sends on the same stream.
    pub fn spawn<R, W>(
        label: impl Into<String>,
        reader: R,
        writer: W,
        request_timeout: Duration,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<RpcRequest>)
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let label = label.into();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let pending = PendingTable::default();
        let closed = CancellationToken::new();

        let span = info_span!("rpc_client", peer = %label);
        tokio::spawn(
            run_reader(reader, Arc::clone(&pending), inbound_tx, closed.clone())
                .instrument(span.clone()),
        );
        tokio::spawn(run_writer(writer, outbound_rx, closed.clone()).instrument(span));

        let client = Arc::new(Self {
            label,
            next_id: AtomicU64::new(0),
            pending,
            outbound: outbound_tx,
            request_timeout,
            closed,
        });
        (client, inbound_rx)
    }

    /// Connect to a TCP bridge server.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Ipc` if the connection cannot be established.
    pub async fn connect_tcp(
        addr: &str,
        request_timeout: Duration,
    ) -> Result<(Arc<Self>, mpsc::UnboundedReceiver<RpcRequest>)> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|err| AppError::Ipc(format!("failed to connect to {addr}: {err}")))?;
        let (read_half, write_half) = stream.into_split();
        Ok(Self::spawn(addr, read_half, write_half, request_timeout))
    }

    /// Send a request and wait for its correlated reply.
    ///
    /// # Errors
    ///
    /// - `AppError::Remote` when the peer replies with an error.
    /// - `AppError::Timeout` when no reply arrives before the deadline.
    /// - `AppError::ConnectionClosed` when the stream closes first.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value> {
        if self.closed.is_cancelled() {
            return Err(AppError::ConnectionClosed(format!(
                "{} is closed",
                self.label
            )));
        }

        let id = self.next_id();
        let now = Instant::now();
        let deadline = now + self.request_timeout;
        let (result_tx, result_rx) = oneshot::channel();

        lock(&self.pending).insert(
            id.clone(),
            PendingCall {
                method: method.to_owned(),
                created_at: now,
                deadline,
                result_tx,
            },
        );
        let _guard = PendingGuard {
            id: id.clone(),
            table: Arc::clone(&self.pending),
        };

        // The reader cancels before draining; checking after insertion
        // guarantees the entry is either drained or refused here.
        if self.closed.is_cancelled() {
            return Err(AppError::ConnectionClosed(format!(
                "{} is closed",
                self.label
            )));
        }

        let line = to_line(&RpcRequest {
            id: id.clone(),
            method: method.to_owned(),
            params,
        })?;
        self.outbound.send(line).map_err(|_| {
            AppError::ConnectionClosed(format!("{} writer has stopped", self.label))
        })?;
        debug!(id, method, "rpc request sent");

        match tokio::time::timeout_at(deadline, result_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(AppError::ConnectionClosed(format!(
                "{} closed before replying to {method}",
                self.label
            ))),
            Err(_) => {
                warn!(id, method, "rpc request timed out");
                Err(AppError::Timeout(format!("request timeout: {method}")))
            }
        }
    }

    /// Send a one-way notification; no pending entry is registered.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConnectionClosed` if the stream has closed.
    pub fn notify(&self, method: &str, params: Option<Value>) -> Result<()> {
        if self.closed.is_cancelled() {
            return Err(AppError::ConnectionClosed(format!(
                "{} is closed",
                self.label
            )));
        }

        let line = to_line(&RpcRequest {
            id: self.next_id(),
            method: method.to_owned(),
            params,
        })?;
        self.outbound
            .send(line)
            .map_err(|_| AppError::ConnectionClosed(format!("{} writer has stopped", self.label)))
    }

    /// Number of requests awaiting a reply.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        lock(&self.pending).len()
    }

    /// Whether the connection has closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Resolve once the connection has closed.
    pub async fn closed(&self) {
        self.closed.cancelled().await;
    }

    /// Close the stream and reject all outstanding calls.
    pub fn close(&self) {
        self.closed.cancel();
        fail_all(&self.pending, &self.label);
    }

    fn next_id(&self) -> String {
        (self.next_id.fetch_add(1, Ordering::SeqCst) + 1).to_string()
    }
}

impl Drop for RpcClient {
    fn drop(&mut self) {
        self.closed.cancel();
    }
}

// ── Background tasks ─────────────────────────────────────────────────────────

/// Read lines until EOF, a stream error, or close.
///
/// Responses resolve their pending entry; requests and notifications from
/// the peer are forwarded to `inbound_tx`. Unparseable lines are logged and
/// skipped. On exit the connection is marked closed and every pending call
/// is rejected.
async fn run_reader<R>(
    reader: R,
    pending: PendingTable,
    inbound_tx: mpsc::UnboundedSender<RpcRequest>,
    closed: CancellationToken,
) where
    R: AsyncRead + Unpin,
{
    let mut lines = LineReader::new(reader);

    loop {
        tokio::select! {
            biased;

            () = closed.cancelled() => break,

            next = lines.next_line() => match next {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match parse_line(&line) {
                        Ok(Inbound::Response(response)) => resolve(&pending, response),
                        Ok(Inbound::Request(request)) => {
                            if inbound_tx.send(request).is_err() {
                                debug!("inbound receiver dropped; discarding peer request");
                            }
                        }
                        Err(err) => {
                            warn!(error = %err, raw_line = %line, "rpc reader: parse error, skipping line");
                        }
                    }
                }
                Ok(None) => {
                    debug!("rpc reader: EOF");
                    break;
                }
                Err(err) => {
                    warn!(error = %err, "rpc reader: stream error");
                    break;
                }
            }
        }
    }

    closed.cancel();
    fail_all(&pending, "connection");
}

/// Serialize queued lines onto `writer` until close or the first write error.
async fn run_writer<W>(
    writer: W,
    mut outbound_rx: mpsc::UnboundedReceiver<String>,
    closed: CancellationToken,
) where
    W: AsyncWrite + Unpin,
{
    let mut framed = FramedWrite::new(writer, LineCodec::new());

    loop {
        tokio::select! {
            biased;

            () = closed.cancelled() => break,

            line = outbound_rx.recv() => match line {
                Some(line) => {
                    if let Err(err) = framed.send(line).await {
                        warn!(error = %err, "rpc writer: write failed");
                        closed.cancel();
                        break;
                    }
                }
                None => break,
            }
        }
    }

    if let Err(err) = framed.close().await {
        debug!(error = %err, "rpc writer: close failed");
    }
}

// ── Private helpers ──────────────────────────────────────────────────────────

/// Complete the pending entry for `response.id`; unknown ids are dropped.
fn resolve(pending: &PendingTable, response: RpcResponse) {
    let entry = lock(pending).remove(&response.id);
    match entry {
        Some(call) => {
            debug!(
                id = %response.id,
                method = %call.method,
                elapsed_ms = u64::try_from(call.created_at.elapsed().as_millis()).unwrap_or(u64::MAX),
                "rpc response received"
            );
            // The caller may have stopped waiting; nothing to do then.
            let _ = call.result_tx.send(response.into_result());
        }
        None => {
            debug!(id = %response.id, "rpc response for unknown id ignored");
        }
    }
}

/// Reject and remove every outstanding call.
fn fail_all(pending: &PendingTable, label: &str) {
    let drained: Vec<(String, PendingCall)> = lock(pending).drain().collect();
    for (id, call) in drained {
        debug!(id, method = %call.method, "rejecting pending call on close");
        let _ = call.result_tx.send(Err(AppError::ConnectionClosed(format!(
            "{label} closed before replying to {}",
            call.method
        ))));
    }
}
