//! Stdio transport for the front protocol.
//!
//! Reads one envelope per line from the agent (stdin) and writes replies to
//! stdout. Envelopes are handled concurrently, so a launch waiting for its
//! client does not block a status query; replies go out in completion order.

use std::sync::Arc;

use futures_util::SinkExt;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::codec::FramedWrite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Instrument};

use super::envelope::JsonRpcResponse;
use super::router::ProtocolRouter;
use crate::rpc::{LineCodec, LineReader};
use crate::Result;

/// Serve the router over the process's stdin/stdout until EOF or cancellation.
///
/// # Errors
///
/// Returns `AppError::Io` if stdin cannot be read.
pub async fn serve_stdio(router: Arc<ProtocolRouter>, ct: CancellationToken) -> Result<()> {
    serve_lines(router, tokio::io::stdin(), tokio::io::stdout(), ct).await
}

/// Serve the router over any line-oriented byte stream.
///
/// # Errors
///
/// Returns `AppError::Io` if the reader fails.
pub async fn serve_lines<R, W>(
    router: Arc<ProtocolRouter>,
    reader: R,
    writer: W,
    ct: CancellationToken,
) -> Result<()>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (reply_tx, reply_rx) = mpsc::unbounded_channel::<JsonRpcResponse>();
    let writer_task = tokio::spawn(run_writer(writer, reply_rx).in_current_span());
    let mut lines = LineReader::new(reader);

    info!("stdio transport started");
    let outcome = loop {
        tokio::select! {
            biased;

            () = ct.cancelled() => break Ok(()),

            next = lines.next_line() => match next {
                Ok(Some(line)) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<Value>(trimmed) {
                        Ok(envelope) => {
                            let router = Arc::clone(&router);
                            let reply_tx = reply_tx.clone();
                            tokio::spawn(
                                async move {
                                    if let Some(response) = router.handle(envelope).await {
                                        let _ = reply_tx.send(response);
                                    }
                                }
                                .in_current_span(),
                            );
                        }
                        Err(err) => {
                            warn!(error = %err, "stdin line is not JSON");
                            let _ = reply_tx.send(JsonRpcResponse::parse_error());
                        }
                    }
                }
                Ok(None) => {
                    debug!("stdin closed");
                    break Ok(());
                }
                Err(err) => break Err(err),
            }
        }
    };

    drop(reply_tx);
    if ct.is_cancelled() {
        writer_task.abort();
    } else if let Err(err) = writer_task.await {
        debug!(error = %err, "stdout writer ended abnormally");
    }
    info!("stdio transport shut down");
    outcome
}

async fn run_writer<W>(writer: W, mut reply_rx: mpsc::UnboundedReceiver<JsonRpcResponse>)
where
    W: AsyncWrite + Unpin,
{
    let mut framed = FramedWrite::new(writer, LineCodec::new());
    while let Some(response) = reply_rx.recv().await {
        let line = match serde_json::to_string(&response) {
            Ok(line) => line,
            Err(err) => {
                warn!(error = %err, "failed to serialize reply");
                continue;
            }
        };
        if let Err(err) = framed.send(line).await {
            warn!(error = %err, "failed to write reply to stdout");
            break;
        }
    }
}
