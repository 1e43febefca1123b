//! Connection monitor: attaches and detaches game clients.
//!
//! The registry exposes only a point-in-time snapshot, never disconnect
//! events, so the monitor diffs the current session against a fresh
//! snapshot on every tick. Each tick runs synchronously under the session
//! lock; ticks never overlap and a transition is committed before any other
//! task can observe the session.
//!
//! | Status       | Client   | Registry observation          | Transition                  |
//! |--------------|----------|-------------------------------|-----------------------------|
//! | `launching`  | none     | a latest handle exists        | attach, `running`           |
//! | `restarting` | none     | a latest handle exists        | attach, `running`           |
//! | `running`    | attached | handle missing from snapshot  | detach, `stopped`           |
//! | `restarting` | attached | handle missing from snapshot  | detach, stay `restarting`   |
//!
//! A restarting session keeps its attached handle even when newer handles
//! appear; it only looks for a replacement once that handle has vanished.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::collaborators::{ClientRegistry, GameClient};
use super::coordinator::{Session, SessionSlot};
use crate::models::SessionStatus;

/// Run one monitor tick against the current session.
pub(crate) fn tick(slot: &SessionSlot, registry: &dyn ClientRegistry) {
    let mut guard = slot.lock();
    let Some(session) = guard.as_mut() else {
        return;
    };

    match (session.status, session.client.clone()) {
        (status, None) if status.awaits_client() => {
            if let Some(latest) = registry.latest() {
                attach(session, latest);
            }
        }
        (SessionStatus::Running, Some(client)) => {
            if !registry.contains(client.id()) && session.transition(SessionStatus::Stopped) {
                info!(
                    session_id = %session.id,
                    client_id = %client.id(),
                    "client disconnected from session"
                );
                session.client = None;
            }
        }
        (SessionStatus::Restarting, Some(client)) => {
            if !registry.contains(client.id()) {
                info!(
                    session_id = %session.id,
                    client_id = %client.id(),
                    "client disconnected during restart, waiting for reconnection"
                );
                session.client = None;
            }
        }
        _ => {}
    }
}

fn attach(session: &mut Session, client: Arc<dyn GameClient>) {
    let previous = session.status;
    if !session.transition(SessionStatus::Running) {
        return;
    }

    let log = Arc::clone(&session.log);
    client.install_output_tap(Arc::new(move |line: &str| log.append(line)));

    info!(
        session_id = %session.id,
        client_id = %client.id(),
        previous_status = %previous,
        "client attached to session"
    );
    session.client = Some(client);
}

/// Spawn the periodic monitor. Runs until `cancel` fires.
pub(crate) fn spawn_monitor(
    slot: Arc<SessionSlot>,
    registry: Arc<dyn ClientRegistry>,
    period: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    debug!("connection monitor stopping");
                    break;
                }
                _ = interval.tick() => tick(&slot, registry.as_ref()),
            }
        }
    })
}
