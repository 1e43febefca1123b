//! Session coordinator: the state machine behind the six remote operations.
//!
//! Exactly one session exists at a time. All transitions are made while
//! holding the session lock and never across an `.await`, so the monitor
//! tick and the operations each commit atomically with respect to one
//! another. Sequential launches from one caller are mutually exclusive via
//! stop-before-start; concurrent launches from independent callers are not.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use super::collaborators::{ClientRegistry, Environment, GameClient, GameLauncher, LaunchRequest};
use super::monitor;
use crate::config::SessionConfig;
use crate::logs::{LogSink, LogSinkFactory};
use crate::models::{
    CommandOutput, LaunchOptions, LaunchOutcome, LogsReport, RestartOutcome, SessionStatus,
    StatusReport, StopOutcome,
};
use crate::{AppError, Result};

/// Default number of lines returned by [`SessionCoordinator::logs`].
pub const DEFAULT_LOG_LIMIT: usize = 100;

/// In-band method used for every command sent to the game.
pub const COMMAND_METHOD: &str = "command";

/// Command that reloads the game's scripts without restarting the process.
pub const RESTART_COMMAND: &str = ".rr";

/// Script sent by `stop` to make the local player quit.
pub const FORCE_QUIT_SCRIPT: &str = "\
local player = y3.player:get_local()
if player then
    GameAPI.role_force_quit(player.handle, 'game stopped')
end";

// ── Session slot ─────────────────────────────────────────────────────────────

/// The single tracked session.
pub(crate) struct Session {
    pub(crate) id: String,
    pub(crate) status: SessionStatus,
    pub(crate) started_at: Instant,
    pub(crate) client: Option<Arc<dyn GameClient>>,
    pub(crate) log: Arc<dyn LogSink>,
}

impl Session {
    /// Move to `next` if the lifecycle permits it; staying put is allowed.
    ///
    /// Returns whether the session is now in `next`.
    pub(crate) fn transition(&mut self, next: SessionStatus) -> bool {
        if self.status == next {
            return true;
        }
        if !self.status.can_transition_to(next) {
            debug!(
                session_id = %self.id,
                from = %self.status,
                to = %next,
                "status transition refused"
            );
            return false;
        }
        self.status = next;
        true
    }
}

/// Lock-protected session slot shared with the monitor task.
#[derive(Default)]
pub(crate) struct SessionSlot(Mutex<Option<Session>>);

impl SessionSlot {
    pub(crate) fn lock(&self) -> MutexGuard<'_, Option<Session>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ── Coordinator ──────────────────────────────────────────────────────────────

/// External collaborators supplied by the host at construction time.
pub struct Collaborators {
    /// Starts the game process.
    pub launcher: Arc<dyn GameLauncher>,
    /// Launch preconditions.
    pub environment: Arc<dyn Environment>,
    /// Live-handle registry.
    pub registry: Arc<dyn ClientRegistry>,
    /// Creates one log sink per session.
    pub logs: Arc<dyn LogSinkFactory>,
}

/// Result of sampling the session during an attach wait.
enum Observation {
    Running,
    Waiting,
    Gone,
}

/// Owns the session state machine and the connection monitor.
pub struct SessionCoordinator {
    config: SessionConfig,
    slot: Arc<SessionSlot>,
    launcher: Arc<dyn GameLauncher>,
    environment: Arc<dyn Environment>,
    registry: Arc<dyn ClientRegistry>,
    logs: Arc<dyn LogSinkFactory>,
    monitor_cancel: CancellationToken,
    monitor: Mutex<Option<JoinHandle<()>>>,
}

impl SessionCoordinator {
    /// Create a coordinator. The monitor is not running until [`start`](Self::start).
    #[must_use]
    pub fn new(config: SessionConfig, collaborators: Collaborators) -> Self {
        Self {
            config,
            slot: Arc::new(SessionSlot::default()),
            launcher: collaborators.launcher,
            environment: collaborators.environment,
            registry: collaborators.registry,
            logs: collaborators.logs,
            monitor_cancel: CancellationToken::new(),
            monitor: Mutex::new(None),
        }
    }

    /// Start the connection monitor. Idempotent.
    pub fn start(&self) {
        let mut monitor = self.monitor_handle();
        if monitor.is_some() || self.monitor_cancel.is_cancelled() {
            return;
        }

        *monitor = Some(monitor::spawn_monitor(
            Arc::clone(&self.slot),
            Arc::clone(&self.registry),
            self.config.poll_interval(),
            self.monitor_cancel.clone(),
        ));
        info!(
            poll_interval_ms = self.config.poll_interval_ms,
            "connection monitor started"
        );
    }

    /// Run one connection-monitor tick immediately.
    pub fn poll_connections(&self) {
        monitor::tick(&self.slot, self.registry.as_ref());
    }

    /// Launch the game and wait for its client to attach.
    ///
    /// A session that is not yet stopped is stopped first. A missed attach
    /// deadline is reported as `success = false`, not as an error.
    ///
    /// # Errors
    ///
    /// - Readiness errors from the [`Environment`], unchanged.
    /// - `AppError::Io` if the session log cannot be created.
    /// - `AppError::LaunchFailed` if the launcher fails; the session is
    ///   left `stopped`.
    pub async fn launch(&self, options: LaunchOptions) -> Result<LaunchOutcome> {
        if self.current_status().is_some_and(|s| s != SessionStatus::Stopped) {
            info!("stopping active session before launch");
            self.stop().await;
        }

        self.environment.editor_ready().await?;
        self.environment.map_ready().await?;

        let session_id = next_session_id();
        let log = self.logs.create(&session_id)?;
        {
            let mut guard = self.slot.lock();
            if let Some(previous) = guard.take() {
                previous.log.close();
            }
            *guard = Some(Session {
                id: session_id.clone(),
                status: SessionStatus::Launching,
                started_at: Instant::now(),
                client: None,
                log,
            });
        }

        let span = info_span!("launch", session_id = %session_id);
        async {
            info!(?options, "launching game");

            if let Err(err) = self.launcher.launch(LaunchRequest::from(&options)).await {
                self.set_status(&session_id, SessionStatus::Stopped);
                warn!(error = %err, "launcher failed");
                return Err(AppError::LaunchFailed {
                    message: "failed to launch game".into(),
                    cause: err.message(),
                });
            }

            if !self
                .wait_for_running(&session_id, self.config.launch_timeout())
                .await
            {
                self.set_status(&session_id, SessionStatus::Stopped);
                warn!("no client attached before the launch deadline");
                return Ok(LaunchOutcome {
                    success: false,
                    session_id: session_id.clone(),
                    status: SessionStatus::Stopped.as_str().into(),
                    message: "Game launched but client connection timeout".into(),
                });
            }

            let status = self
                .current_status()
                .unwrap_or(SessionStatus::Stopped)
                .as_str()
                .to_owned();
            info!(%status, "game launched");
            Ok(LaunchOutcome {
                success: true,
                session_id: session_id.clone(),
                status,
                message: "Game launched successfully".into(),
            })
        }
        .instrument(span)
        .await
    }

    /// Current session fields; no side effects.
    #[must_use]
    pub fn status(&self) -> StatusReport {
        let guard = self.slot.lock();
        let Some(session) = guard.as_ref() else {
            return StatusReport::no_session();
        };

        StatusReport {
            running: session.status == SessionStatus::Running,
            session_id: Some(session.id.clone()),
            status: session.status.as_str().into(),
            uptime: Some(
                u64::try_from(session.started_at.elapsed().as_millis()).unwrap_or(u64::MAX),
            ),
        }
    }

    /// The `limit` most recent lines of the session log.
    ///
    /// A missing or zero `limit` falls back to [`DEFAULT_LOG_LIMIT`].
    #[must_use]
    pub fn logs(&self, limit: Option<usize>) -> LogsReport {
        let Some(log) = self.slot.lock().as_ref().map(|s| Arc::clone(&s.log)) else {
            return LogsReport {
                success: false,
                log_count: None,
                logs: None,
                message: Some("No active session".into()),
            };
        };

        let limit = limit.filter(|n| *n > 0).unwrap_or(DEFAULT_LOG_LIMIT);
        let lines = log.read_tail(limit);
        LogsReport {
            success: true,
            log_count: Some(lines.len()),
            logs: Some(lines.join("\n")),
            message: None,
        }
    }

    /// Send `code` to the attached client and return the lines it produced
    /// during the capture window.
    ///
    /// Output attribution is time-based: lines from a concurrent command or
    /// output emitted after the window are not distinguished or captured.
    ///
    /// # Errors
    ///
    /// - `AppError::SessionNotFound` if there is no session.
    /// - `AppError::ClientNotConnected` if no client is attached.
    /// - `AppError::CommandFailed` if the command cannot be sent.
    pub async fn execute_command(&self, code: &str) -> Result<CommandOutput> {
        let (client, log) = self.attached()?;

        if code.trim().is_empty() {
            return Ok(CommandOutput {
                success: false,
                output: None,
                message: Some("No code provided".into()),
            });
        }

        let before = log.line_count();
        client
            .notify(COMMAND_METHOD, json!({ "data": code }))
            .map_err(|err| AppError::CommandFailed(err.message()))?;
        debug!(client_id = %client.id(), "command sent");

        tokio::time::sleep(self.config.capture_window()).await;

        Ok(CommandOutput {
            success: true,
            output: Some(lines_since(log.as_ref(), before).join("\n")),
            message: None,
        })
    }

    /// Reload the game's scripts and wait for the session to run again.
    ///
    /// # Errors
    ///
    /// - `AppError::SessionNotFound` if there is no session.
    /// - `AppError::ClientNotConnected` if no client is attached.
    /// - `AppError::CommandFailed` if the restart command cannot be sent.
    pub async fn quick_restart(&self) -> Result<RestartOutcome> {
        let (session_id, client, log, before) = {
            let mut guard = self.slot.lock();
            let session = guard
                .as_mut()
                .ok_or_else(|| AppError::SessionNotFound("no active game session".into()))?;
            let client = session
                .client
                .clone()
                .ok_or_else(|| AppError::ClientNotConnected("game client is not connected".into()))?;
            if !session.transition(SessionStatus::Restarting) {
                return Err(AppError::ClientNotConnected(format!(
                    "game session is {}",
                    session.status
                )));
            }
            let before = session.log.line_count();
            (session.id.clone(), client, Arc::clone(&session.log), before)
        };

        let span = info_span!("quick_restart", session_id = %session_id);
        async {
            if let Err(err) = client.notify(COMMAND_METHOD, json!({ "data": RESTART_COMMAND })) {
                self.set_status(&session_id, SessionStatus::Running);
                return Err(AppError::CommandFailed(err.message()));
            }
            info!("restart command sent");

            if !self
                .wait_for_running(&session_id, self.config.restart_timeout())
                .await
            {
                self.set_status(&session_id, SessionStatus::Stopped);
                warn!("client did not reconnect before the restart deadline");
                return Ok(RestartOutcome {
                    success: false,
                    message: "Game restart timeout - client did not reconnect".into(),
                    output: None,
                });
            }

            Ok(RestartOutcome {
                success: true,
                message: "Game restarted successfully".into(),
                output: Some(lines_since(log.as_ref(), before).join("\n")),
            })
        }
        .instrument(span)
        .await
    }

    /// Stop the session and release everything it holds.
    ///
    /// In-band failures are swallowed; cleanup always runs.
    pub async fn stop(&self) -> StopOutcome {
        let Some((session_id, client)) = self
            .slot
            .lock()
            .as_ref()
            .map(|s| (s.id.clone(), s.client.clone()))
        else {
            return StopOutcome {
                success: true,
                message: "No active session".into(),
            };
        };

        let span = info_span!("stop", session_id = %session_id);
        async {
            if let Some(client) = client {
                match client.notify(COMMAND_METHOD, json!({ "data": FORCE_QUIT_SCRIPT })) {
                    Ok(()) => tokio::time::sleep(self.config.stop_grace()).await,
                    Err(err) => debug!(error = %err, "forced quit could not be sent"),
                }
                client.dispose();
            }

            let mut guard = self.slot.lock();
            if guard.as_ref().is_some_and(|s| s.id == session_id) {
                if let Some(mut session) = guard.take() {
                    session.transition(SessionStatus::Stopped);
                    session.client = None;
                    session.log.close();
                }
            }
            info!("game stopped");
        }
        .instrument(span)
        .await;

        StopOutcome {
            success: true,
            message: "Game stopped".into(),
        }
    }

    /// Stop the monitor and any remaining session.
    pub async fn dispose(&self) {
        self.monitor_cancel.cancel();
        let handle = self.monitor_handle().take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                debug!(error = %err, "connection monitor ended abnormally");
            }
        }

        if self.slot.lock().is_some() {
            self.stop().await;
        }
        info!("session coordinator disposed");
    }

    fn current_status(&self) -> Option<SessionStatus> {
        self.slot.lock().as_ref().map(|s| s.status)
    }

    fn set_status(&self, session_id: &str, status: SessionStatus) {
        if let Some(session) = self.slot.lock().as_mut().filter(|s| s.id == session_id) {
            session.transition(status);
        }
    }

    fn attached(&self) -> Result<(Arc<dyn GameClient>, Arc<dyn LogSink>)> {
        let guard = self.slot.lock();
        let session = guard
            .as_ref()
            .ok_or_else(|| AppError::SessionNotFound("no active game session".into()))?;
        let client = session
            .client
            .clone()
            .ok_or_else(|| AppError::ClientNotConnected("game client is not connected".into()))?;
        Ok((client, Arc::clone(&session.log)))
    }

    fn observe(&self, session_id: &str) -> Observation {
        match self.slot.lock().as_ref() {
            Some(session) if session.id == session_id => {
                if session.client.is_some() && session.status == SessionStatus::Running {
                    Observation::Running
                } else {
                    Observation::Waiting
                }
            }
            _ => Observation::Gone,
        }
    }

    /// Sample every poll interval until the session runs with a client
    /// attached, the deadline passes, or the session is replaced.
    async fn wait_for_running(&self, session_id: &str, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            match self.observe(session_id) {
                Observation::Running => return true,
                Observation::Gone => return false,
                Observation::Waiting => {}
            }

            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let pause = self.config.poll_interval().min(deadline - now);
            tokio::time::sleep(pause).await;
        }
    }

    fn monitor_handle(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.monitor.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for SessionCoordinator {
    fn drop(&mut self) {
        self.monitor_cancel.cancel();
    }
}

// ── Private helpers ──────────────────────────────────────────────────────────

/// `session_<millis>`, strictly increasing within the process.
fn next_session_id() -> String {
    static LAST: AtomicI64 = AtomicI64::new(0);

    let now = Utc::now().timestamp_millis();
    let previous = LAST
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(now.max(last + 1)))
        .unwrap_or(now);
    format!("session_{}", now.max(previous + 1))
}

/// Lines appended to `log` after it held `before` lines.
fn lines_since(log: &dyn LogSink, before: usize) -> Vec<String> {
    let fresh = log.line_count().saturating_sub(before);
    if fresh == 0 {
        Vec::new()
    } else {
        log.read_tail(fresh)
    }
}
