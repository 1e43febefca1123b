//! File-backed session logs with count-capped retention.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use chrono::{SecondsFormat, Utc};
use tracing::{info, warn};

use super::{LogSink, LogSinkFactory};
use crate::config::LogConfig;
use crate::{AppError, Result};

// ── Store ────────────────────────────────────────────────────────────────────

/// Directory of session log files, at most `max_files` retained.
///
/// Creating a new file first deletes the oldest files (by modification
/// time) until at most `max_files - 1` remain, so the directory holds
/// exactly `max_files` files afterwards when it was already full.
#[derive(Debug, Clone)]
pub struct FileLogStore {
    dir: PathBuf,
    max_files: usize,
}

impl FileLogStore {
    /// Construct a store rooted at `dir`.
    #[must_use]
    pub fn new(dir: PathBuf, max_files: usize) -> Self {
        Self {
            dir,
            max_files: max_files.max(1),
        }
    }

    /// Construct a store from the `[logs]` config section.
    #[must_use]
    pub fn from_config(config: &LogConfig) -> Self {
        Self::new(config.dir.clone(), config.max_files)
    }

    /// All `.log` files currently in the directory, newest first.
    #[must_use]
    pub fn list_files(&self) -> Vec<PathBuf> {
        self.files_newest_first()
            .into_iter()
            .map(|(path, _)| path)
            .collect()
    }

    fn files_newest_first(&self) -> Vec<(PathBuf, SystemTime)> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(dir = %self.dir.display(), %err, "failed to list log directory");
                return Vec::new();
            }
        };

        let mut files: Vec<(PathBuf, SystemTime)> = entries
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "log"))
            .map(|path| {
                let modified = fs::metadata(&path)
                    .and_then(|meta| meta.modified())
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                (path, modified)
            })
            .collect();

        files.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| b.0.cmp(&a.0)));
        files
    }

    fn prune(&self) {
        let files = self.files_newest_first();
        if files.len() < self.max_files {
            return;
        }

        for (path, _) in files.into_iter().skip(self.max_files - 1) {
            match fs::remove_file(&path) {
                Ok(()) => info!(path = %path.display(), "deleted old session log"),
                Err(err) => warn!(path = %path.display(), %err, "failed to delete old session log"),
            }
        }
    }
}

impl LogSinkFactory for FileLogStore {
    fn create(&self, session_id: &str) -> Result<Arc<dyn LogSink>> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            AppError::Io(format!(
                "failed to create log directory {}: {e}",
                self.dir.display()
            ))
        })?;

        self.prune();

        let file_name = format!(
            "session-{session_id}-{}.log",
            Utc::now().timestamp_millis()
        );
        let sink = SessionLogFile::open(self.dir.join(file_name))?;
        Ok(Arc::new(sink))
    }
}

// ── Session file ─────────────────────────────────────────────────────────────

/// One session's append-only log file.
///
/// Each line is stored as `[<RFC 3339 timestamp>] <text>`. Text containing
/// newlines is stored as one file line per text line, so
/// [`LogSink::line_count`] always matches the number of stored lines.
#[derive(Debug)]
pub struct SessionLogFile {
    path: PathBuf,
    writer: Mutex<Option<BufWriter<File>>>,
    lines: AtomicUsize,
}

impl SessionLogFile {
    /// Create (or append to) the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if the file cannot be opened.
    pub fn open(path: PathBuf) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| AppError::Io(format!("failed to open log {}: {e}", path.display())))?;
        Ok(Self {
            path,
            writer: Mutex::new(Some(BufWriter::new(file))),
            lines: AtomicUsize::new(0),
        })
    }

    fn writer(&self) -> MutexGuard<'_, Option<BufWriter<File>>> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LogSink for SessionLogFile {
    fn append(&self, line: &str) {
        let mut guard = self.writer();
        let Some(writer) = guard.as_mut() else {
            return;
        };

        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        for text in line.lines() {
            if let Err(e) = writeln!(writer, "[{timestamp}] {text}") {
                warn!(path = %self.path.display(), "failed to append log line: {e}");
                return;
            }
            self.lines.fetch_add(1, Ordering::SeqCst);
        }
        if let Err(e) = writer.flush() {
            warn!(path = %self.path.display(), "failed to flush log: {e}");
        }
    }

    fn read_tail(&self, limit: usize) -> Vec<String> {
        if let Some(writer) = self.writer().as_mut() {
            if let Err(e) = writer.flush() {
                warn!(path = %self.path.display(), "failed to flush log before read: {e}");
            }
        }

        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %self.path.display(), "failed to read log: {e}");
                return Vec::new();
            }
        };

        let lines: Vec<&str> = content.lines().filter(|l| !l.trim().is_empty()).collect();
        let start = lines.len().saturating_sub(limit);
        lines[start..].iter().map(|l| (*l).to_owned()).collect()
    }

    fn line_count(&self) -> usize {
        self.lines.load(Ordering::SeqCst)
    }

    fn close(&self) {
        if let Some(mut writer) = self.writer().take() {
            if let Err(e) = writer.flush() {
                warn!(path = %self.path.display(), "failed to flush log on close: {e}");
            }
        }
    }
}
