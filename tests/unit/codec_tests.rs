//! Unit tests for newline framing: `LineCodec` and `LineReader`.

use bytes::BytesMut;
use tokio::io::AsyncWriteExt;
use tokio_util::codec::{Decoder, Encoder};

use game_bridge::rpc::{LineCodec, LineReader};
use game_bridge::AppError;

/// A complete line is returned without its trailing newline.
#[test]
fn complete_line_is_decoded_without_newline() {
    let mut codec = LineCodec::new();
    let mut buf = BytesMut::from("{\"id\":\"1\",\"method\":\"get_game_status\"}\n");

    let line = codec.decode(&mut buf).expect("decode must succeed");

    assert_eq!(
        line.as_deref(),
        Some("{\"id\":\"1\",\"method\":\"get_game_status\"}")
    );
}

/// Two lines in one buffer are yielded by successive decode calls.
#[test]
fn batched_lines_are_each_decoded() {
    let mut codec = LineCodec::new();
    let mut buf = BytesMut::from("{\"id\":\"1\"}\n{\"id\":\"2\"}\n");

    assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("{\"id\":\"1\"}"));
    assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("{\"id\":\"2\"}"));
    assert!(codec.decode(&mut buf).unwrap().is_none());
}

/// A fragment without a newline stays buffered until the rest arrives.
#[test]
fn partial_fragment_is_retained_until_newline() {
    let mut codec = LineCodec::new();
    let mut buf = BytesMut::from("{\"id\":");

    assert!(codec.decode(&mut buf).unwrap().is_none());

    buf.extend_from_slice(b"\"9\"}\n");
    assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("{\"id\":\"9\"}"));
}

/// Exceeding the maximum length is reported as a transport error.
#[test]
fn oversized_line_is_rejected() {
    let mut codec = LineCodec::with_max_length(8);
    let mut buf = BytesMut::from("0123456789abcdef\n");

    let err = codec.decode(&mut buf).expect_err("line exceeds the limit");

    assert!(matches!(err, AppError::Ipc(ref msg) if msg.contains("line too long")));
}

/// Invalid UTF-8 is reported as a transport error and consumed.
#[test]
fn invalid_utf8_line_is_rejected_and_consumed() {
    let mut codec = LineCodec::new();
    let mut buf = BytesMut::from(&b"\xff\xfe{\"garbage\"}\n{\"id\":\"2\"}\n"[..]);

    let err = codec.decode(&mut buf).expect_err("line is not UTF-8");

    assert!(matches!(err, AppError::Ipc(ref msg) if msg.contains("invalid utf-8")));
    assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("{\"id\":\"2\"}"));
}

/// Encoding appends exactly one newline.
#[test]
fn encode_appends_newline() {
    let mut codec = LineCodec::new();
    let mut dst = BytesMut::new();

    codec.encode("{\"id\":\"1\"}".to_owned(), &mut dst).unwrap();

    assert_eq!(&dst[..], b"{\"id\":\"1\"}\n");
}

/// A frame split across several writes is reassembled by the reader.
#[tokio::test]
async fn reader_reassembles_frames_split_across_reads() {
    let (mut tx, rx) = tokio::io::duplex(64);
    let mut reader = LineReader::new(rx);

    let writer = tokio::spawn(async move {
        tx.write_all(b"{\"id\":\"1\",").await.unwrap();
        tx.flush().await.unwrap();
        tokio::task::yield_now().await;
        tx.write_all(b"\"result\":true}\n{\"id\":\"2\"}\n").await.unwrap();
    });

    assert_eq!(
        reader.next_line().await.unwrap().as_deref(),
        Some("{\"id\":\"1\",\"result\":true}")
    );
    assert_eq!(reader.next_line().await.unwrap().as_deref(), Some("{\"id\":\"2\"}"));
    writer.await.unwrap();
    assert!(reader.next_line().await.unwrap().is_none(), "EOF after writer drops");
}

/// An oversized line is skipped and the following line is still delivered.
#[tokio::test]
async fn reader_skips_oversized_line_and_continues() {
    let (mut tx, rx) = tokio::io::duplex(256);
    let mut reader = LineReader::with_codec(rx, LineCodec::with_max_length(16));

    tx.write_all(b"this line is far too long for the limit\n{\"ok\":1}\n")
        .await
        .unwrap();
    drop(tx);

    assert_eq!(reader.next_line().await.unwrap().as_deref(), Some("{\"ok\":1}"));
    assert!(reader.next_line().await.unwrap().is_none());
}

/// A final line without a newline is still delivered at EOF.
#[tokio::test]
async fn reader_yields_unterminated_final_line_at_eof() {
    let (mut tx, rx) = tokio::io::duplex(64);
    let mut reader = LineReader::new(rx);

    tx.write_all(b"{\"id\":\"last\"}").await.unwrap();
    drop(tx);

    assert_eq!(reader.next_line().await.unwrap().as_deref(), Some("{\"id\":\"last\"}"));
    assert!(reader.next_line().await.unwrap().is_none());
}

/// An invalid UTF-8 line is skipped and the following line is still delivered.
#[tokio::test]
async fn reader_skips_invalid_utf8_line_and_continues() {
    let (mut tx, rx) = tokio::io::duplex(256);
    let mut reader = LineReader::new(rx);

    tx.write_all(b"\xff\n{\"ok\":1}\n").await.unwrap();
    drop(tx);

    assert_eq!(reader.next_line().await.unwrap().as_deref(), Some("{\"ok\":1}"));
    assert!(reader.next_line().await.unwrap().is_none());
}
