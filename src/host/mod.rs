//! Host side: the process that owns the game session.
//!
//! [`start`] wires the default collaborators (console registry, process
//! launcher, configured readiness gate, rotating file logs) into a
//! [`SessionCoordinator`] and exposes it through the TCP bridge server.

pub mod console;
pub mod launcher;
pub mod server;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::GlobalConfig;
use crate::logs::FileLogStore;
use crate::session::{ClientRegistry, Collaborators, SessionCoordinator};
use crate::Result;

pub use console::{spawn_console_listener, ConsoleClient, ConsoleRegistry};
pub use launcher::{ConfiguredEnvironment, ProcessLauncher};
pub use server::{spawn_bridge_server, SessionService};

/// A running host.
pub struct Host {
    /// Address the bridge server is bound to.
    pub bridge_addr: SocketAddr,
    /// Address game clients connect to.
    pub console_addr: SocketAddr,
    /// Session state machine.
    pub coordinator: Arc<SessionCoordinator>,
    /// Live game clients.
    pub registry: Arc<ConsoleRegistry>,
    ct: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

/// Start every host component from `config`.
///
/// # Errors
///
/// Returns `AppError::Ipc` if either listener cannot be bound.
pub async fn start(config: &GlobalConfig, ct: CancellationToken) -> Result<Host> {
    let registry = Arc::new(ConsoleRegistry::new());
    let (console_addr, console_task) = spawn_console_listener(
        &config.console,
        Arc::clone(&registry),
        config.bridge.request_timeout(),
        ct.clone(),
    )
    .await?;

    let coordinator = Arc::new(SessionCoordinator::new(
        config.session.clone(),
        Collaborators {
            launcher: Arc::new(ProcessLauncher::new(config.launcher.clone())),
            environment: Arc::new(ConfiguredEnvironment::new(config.launcher.map_dir.clone())),
            registry: Arc::clone(&registry) as Arc<dyn ClientRegistry>,
            logs: Arc::new(FileLogStore::from_config(&config.logs)),
        },
    ));
    coordinator.start();

    let (bridge_addr, bridge_task) = spawn_bridge_server(
        &config.bridge,
        Arc::new(SessionService::new(Arc::clone(&coordinator))),
        ct.clone(),
    )
    .await?;

    info!(%bridge_addr, %console_addr, log_dir = %config.logs.dir.display(), "host ready");

    Ok(Host {
        bridge_addr,
        console_addr,
        coordinator,
        registry,
        ct,
        tasks: vec![console_task, bridge_task],
    })
}

impl Host {
    /// Stop the listeners and dispose of the session.
    pub async fn shutdown(self) {
        self.ct.cancel();
        for task in self.tasks {
            if let Err(err) = task.await {
                debug!(error = %err, "host task ended abnormally");
            }
        }
        self.coordinator.dispose().await;
        info!("host shut down");
    }
}
