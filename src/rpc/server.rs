//! Answering side of the bridge.
//!
//! One [`serve_connection`] call handles one accepted stream. Each inbound
//! line is parsed as a request and dispatched on its own task, so a slow
//! operation (a launch waiting for its client) does not hold up a status
//! query behind it. Replies are written in completion order and matched by
//! id on the caller side.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures_util::SinkExt;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::codec::FramedWrite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, warn, Instrument};

use super::codec::{LineCodec, LineReader};
use super::message::{to_line, RpcErrorBody, RpcRequest, RpcResponse};
use crate::errors::ErrorCode;
use crate::Result;

// ── Service seam ─────────────────────────────────────────────────────────────

/// Method table bound to a bridge server.
pub trait RpcService: Send + Sync + 'static {
    /// Handle one request.
    ///
    /// # Errors
    ///
    /// Any error is turned into an error reply carrying
    /// [`AppError::code`](crate::AppError::code).
    fn handle(
        &self,
        method: String,
        params: Option<Value>,
    ) -> Pin<Box<dyn Future<Output = Result<Value>> + Send + '_>>;
}

// ── Connection handler ───────────────────────────────────────────────────────

/// Serve requests from one connection until EOF or cancellation.
pub async fn serve_connection<R, W>(
    reader: R,
    writer: W,
    service: Arc<dyn RpcService>,
    cancel: CancellationToken,
) where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (reply_tx, reply_rx) = mpsc::unbounded_channel::<String>();
    let writer_task = tokio::spawn(run_writer(writer, reply_rx).in_current_span());
    let mut lines = LineReader::new(reader);

    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => {
                debug!("rpc server: cancellation received");
                break;
            }

            next = lines.next_line() => match next {
                Ok(Some(line)) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<RpcRequest>(trimmed) {
                        Ok(request) => dispatch(request, &service, &reply_tx),
                        Err(err) => {
                            warn!(error = %err, "rpc server: parse error");
                            let mut body = RpcErrorBody::new(ErrorCode::ParseError, "Parse error");
                            body.data = Some(Value::String(err.to_string()));
                            send_reply(&reply_tx, &RpcResponse::failure(String::new(), body));
                        }
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    warn!(error = %err, "rpc server: read error");
                    break;
                }
            }
        }
    }

    drop(reply_tx);
    if cancel.is_cancelled() {
        writer_task.abort();
    } else if let Err(err) = writer_task.await {
        debug!(error = %err, "rpc server: writer task ended abnormally");
    }
}

// ── Private helpers ──────────────────────────────────────────────────────────

/// Run one request on its own task so slow operations never block the
/// read loop. The reply is queued for the connection's writer.
fn dispatch(
    request: RpcRequest,
    service: &Arc<dyn RpcService>,
    reply_tx: &mpsc::UnboundedSender<String>,
) {
    let service = Arc::clone(service);
    let reply_tx = reply_tx.clone();
    let span = info_span!("rpc_request", id = %request.id, method = %request.method);

    tokio::spawn(
        async move {
            let RpcRequest { id, method, params } = request;
            let response = match service.handle(method, params).await {
                Ok(result) => RpcResponse::success(id, result),
                Err(err) => {
                    debug!(error = %err, "request failed");
                    RpcResponse::failure(id, RpcErrorBody::from(&err))
                }
            };
            send_reply(&reply_tx, &response);
        }
        .instrument(span),
    );
}

fn send_reply(reply_tx: &mpsc::UnboundedSender<String>, response: &RpcResponse) {
    match to_line(response) {
        Ok(line) => {
            if reply_tx.send(line).is_err() {
                debug!(id = %response.id, "connection gone before reply was written");
            }
        }
        Err(err) => warn!(error = %err, "failed to serialize reply"),
    }
}

async fn run_writer<W>(writer: W, mut reply_rx: mpsc::UnboundedReceiver<String>)
where
    W: AsyncWrite + Unpin,
{
    let mut framed = FramedWrite::new(writer, LineCodec::new());
    while let Some(line) = reply_rx.recv().await {
        if let Err(err) = framed.send(line).await {
            warn!(error = %err, "rpc server: failed to write reply");
            break;
        }
    }
}
