//! Per-session log capture.
//!
//! Provides the [`LogSink`] trait the session coordinator writes game output
//! into, and [`LogSinkFactory`] for creating one sink per session. The
//! primary implementation, [`FileLogStore`], keeps one append-only file per
//! session and retains at most `max_files` of them.

pub mod file;

use std::sync::Arc;

use crate::Result;

/// Append-only line log with bounded tail reads.
///
/// Implementations must be [`Send`] and [`Sync`]: lines are appended from
/// the game client's output path while operations read the tail.
pub trait LogSink: Send + Sync {
    /// Append one line. Failures are logged, never raised.
    fn append(&self, line: &str);

    /// Up to `limit` most recent lines, oldest first.
    fn read_tail(&self, limit: usize) -> Vec<String>;

    /// Lines appended so far.
    fn line_count(&self) -> usize;

    /// Flush and release the underlying handle. Later appends are dropped.
    fn close(&self);
}

/// Creates the sink owned by a new session.
pub trait LogSinkFactory: Send + Sync {
    /// Open a fresh sink for `session_id`, applying retention first.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if the sink cannot be created.
    fn create(&self, session_id: &str) -> Result<Arc<dyn LogSink>>;
}

pub use file::{FileLogStore, SessionLogFile};
