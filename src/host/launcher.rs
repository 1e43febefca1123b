//! Game process launcher and launch readiness checks.
//!
//! The process is started with `kill_on_drop(true)`; the handle of the most
//! recent launch is held until the next launch replaces it or the launcher
//! is dropped.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::{Mutex, PoisonError};

use tokio::process::{Child, Command};
use tracing::{debug, info, info_span};

use crate::config::LauncherConfig;
use crate::session::{Environment, GameLauncher, LaunchRequest};
use crate::{AppError, Result};

/// Starts the configured game executable.
pub struct ProcessLauncher {
    config: LauncherConfig,
    child: Mutex<Option<Child>>,
}

impl ProcessLauncher {
    /// Launcher for the `[launcher]` config section.
    #[must_use]
    pub fn new(config: LauncherConfig) -> Self {
        Self {
            config,
            child: Mutex::new(None),
        }
    }

    /// Full argument list for one launch.
    #[must_use]
    pub fn command_args(&self, request: &LaunchRequest) -> Vec<String> {
        let mut args = self.config.args.clone();
        for (key, value) in &request.lua_args {
            args.push(format!("--lua-arg={key}={value}"));
        }
        if request.multi_mode {
            args.push("--multi-mode".into());
            if let Some(players) = request.player_count {
                args.push("--players".into());
                args.push(players.to_string());
            }
        }
        if request.tracy {
            args.push("--tracy".into());
        }
        args
    }

    fn spawn(&self, request: &LaunchRequest) -> Result<()> {
        if self.config.program.trim().is_empty() {
            return Err(AppError::Config("launcher program is not configured".into()));
        }

        let span = info_span!("spawn_game", program = %self.config.program);
        let _guard = span.enter();

        let args = self.command_args(request);
        let mut cmd = Command::new(&self.config.program);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        if let Some(dir) = &self.config.map_dir {
            cmd.current_dir(dir);
        }

        let child = cmd
            .spawn()
            .map_err(|err| AppError::Io(format!("failed to spawn game process: {err}")))?;

        info!(pid = child.id().unwrap_or(0), ?args, "game process spawned");

        let previous = self
            .child
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(child);
        if previous.is_some() {
            debug!("previous game process handle released");
        }
        Ok(())
    }
}

impl GameLauncher for ProcessLauncher {
    fn launch(
        &self,
        request: LaunchRequest,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move { self.spawn(&request) })
    }
}

/// Readiness gate derived from configuration.
///
/// The editor is always considered ready; the map is ready when no map
/// directory is configured or the configured one exists.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredEnvironment {
    map_dir: Option<PathBuf>,
}

impl ConfiguredEnvironment {
    /// Gate on `map_dir`, if any.
    #[must_use]
    pub fn new(map_dir: Option<PathBuf>) -> Self {
        Self { map_dir }
    }
}

impl Environment for ConfiguredEnvironment {
    fn editor_ready(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async { Ok(()) })
    }

    fn map_ready(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            let Some(dir) = &self.map_dir else {
                return Ok(());
            };
            match tokio::fs::metadata(dir).await {
                Ok(meta) if meta.is_dir() => Ok(()),
                Ok(_) => Err(AppError::Config(format!(
                    "map path is not a directory: {}",
                    dir.display()
                ))),
                Err(err) => Err(AppError::Config(format!(
                    "map directory {} is not available: {err}",
                    dir.display()
                ))),
            }
        })
    }
}
