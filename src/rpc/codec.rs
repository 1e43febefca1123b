//! Newline framing for bridge streams.
//!
//! [`LineCodec`] wraps [`tokio_util::codec::LinesCodec`] with a maximum line
//! length so an unterminated or oversized message cannot exhaust memory.
//! [`LineReader`] drives the codec over any [`AsyncRead`], keeping the
//! trailing partial fragment buffered across reads and skipping oversized
//! or undecodable lines without ending the stream.

use bytes::BytesMut;
use std::io::ErrorKind;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::codec::{Decoder, Encoder, LinesCodec, LinesCodecError};
use tracing::warn;

use crate::{AppError, Result};

/// Maximum line length accepted on inbound streams: 1 MiB.
pub const MAX_LINE_BYTES: usize = 1_048_576;

const READ_CHUNK: usize = 8 * 1024;

/// UTF-8 line codec delimited by `\n`.
///
/// Inbound lines longer than [`MAX_LINE_BYTES`] return
/// [`AppError::Ipc`]`("line too long: …")`; the codec then discards input up
/// to the next newline and resumes. Lines that are not valid UTF-8 return
/// [`AppError::Ipc`]`("invalid utf-8: …")` after being consumed from the
/// buffer. The limit is not enforced when encoding.
#[derive(Debug)]
pub struct LineCodec(LinesCodec);

impl LineCodec {
    /// Create a codec with the default [`MAX_LINE_BYTES`] limit.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_length(MAX_LINE_BYTES)
    }

    /// Create a codec with a custom inbound line limit.
    #[must_use]
    pub fn with_max_length(max_length: usize) -> Self {
        Self(LinesCodec::new_with_max_length(max_length))
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

// ── Decoder / Encoder ────────────────────────────────────────────────────────

impl Decoder for LineCodec {
    type Item = String;
    type Error = AppError;

    /// Decode the next complete line from `src`.
    ///
    /// Returns `Ok(None)` while no newline has been buffered yet.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        self.0.decode(src).map_err(map_codec_error)
    }

    /// Decode whatever remains at end of stream, newline or not.
    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        self.0.decode_eof(src).map_err(map_codec_error)
    }
}

impl Encoder<String> for LineCodec {
    type Error = AppError;

    /// Append `item` followed by a single `\n`.
    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<()> {
        self.0.encode(item, dst).map_err(map_codec_error)
    }
}

// ── Reader ───────────────────────────────────────────────────────────────────

/// Buffered line reader over an async byte stream.
pub struct LineReader<R> {
    inner: R,
    codec: LineCodec,
    buf: BytesMut,
    eof: bool,
}

impl<R> LineReader<R>
where
    R: AsyncRead + Unpin,
{
    /// Wrap `inner` with the default line limit.
    pub fn new(inner: R) -> Self {
        Self::with_codec(inner, LineCodec::new())
    }

    /// Wrap `inner` with a specific codec.
    pub fn with_codec(inner: R, codec: LineCodec) -> Self {
        Self {
            inner,
            codec,
            buf: BytesMut::with_capacity(READ_CHUNK),
            eof: false,
        }
    }

    /// Next complete line, or `None` at end of stream.
    ///
    /// Blank lines are returned as-is; callers decide whether to skip them.
    /// Oversized and invalid UTF-8 lines are logged and skipped; the
    /// following line is still delivered.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` when the underlying read fails.
    pub async fn next_line(&mut self) -> Result<Option<String>> {
        loop {
            let decoded = if self.eof {
                self.codec.decode_eof(&mut self.buf)
            } else {
                self.codec.decode(&mut self.buf)
            };

            match decoded {
                Ok(Some(line)) => return Ok(Some(line)),
                Ok(None) if self.eof => return Ok(None),
                Ok(None) => {}
                Err(AppError::Ipc(msg)) => {
                    warn!(error = %msg, "skipping unreadable line");
                    if self.eof {
                        return Ok(None);
                    }
                    continue;
                }
                Err(err) => return Err(err),
            }

            let read = self.inner.read_buf(&mut self.buf).await?;
            if read == 0 {
                self.eof = true;
            }
        }
    }
}

fn map_codec_error(e: LinesCodecError) -> AppError {
    match e {
        LinesCodecError::MaxLineLengthExceeded => {
            AppError::Ipc("line too long: exceeded the maximum line length".into())
        }
        // The codec splits the line off the buffer before validating it.
        LinesCodecError::Io(io_err) if io_err.kind() == ErrorKind::InvalidData => {
            AppError::Ipc(format!("invalid utf-8: {io_err}"))
        }
        LinesCodecError::Io(io_err) => AppError::Io(io_err.to_string()),
    }
}
