//! Interfaces to the parts of the host the coordinator does not own.
//!
//! The coordinator never constructs or destroys client handles. It only
//! asks the [`ClientRegistry`] which handles are alive right now; membership
//! changes in that snapshot are the sole attach/detach signal.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use crate::models::LaunchOptions;
use crate::Result;

/// Stable identity of a live client handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub u64);

impl Display for ClientId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

/// Callback invoked with every line a client emits, before it is forwarded.
pub type OutputTap = Arc<dyn Fn(&str) + Send + Sync>;

/// A connected game client.
pub trait GameClient: Send + Sync {
    /// Identity used for registry membership checks.
    fn id(&self) -> ClientId;

    /// Send a one-way message to the client.
    ///
    /// # Errors
    ///
    /// Returns `AppError::ConnectionClosed` if the client's connection is gone.
    fn notify(&self, method: &str, params: Value) -> Result<()>;

    /// Route every subsequently emitted line through `tap` before it is
    /// forwarded unmodified. Replaces any previous tap.
    fn install_output_tap(&self, tap: OutputTap);

    /// Release the client's transport resources.
    fn dispose(&self);
}

/// Point-in-time view of live client handles, oldest first.
pub trait ClientRegistry: Send + Sync {
    /// Currently alive handles in the order they appeared.
    fn snapshot(&self) -> Vec<Arc<dyn GameClient>>;

    /// Most recently added live handle.
    fn latest(&self) -> Option<Arc<dyn GameClient>> {
        self.snapshot().pop()
    }

    /// Whether the handle with `id` is still alive.
    fn contains(&self, id: ClientId) -> bool {
        self.snapshot().iter().any(|client| client.id() == id)
    }
}

/// Arguments handed to the launcher.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchRequest {
    /// Extra script arguments; automated launches pass none.
    pub lua_args: BTreeMap<String, String>,
    /// Start in multi-player mode.
    pub multi_mode: bool,
    /// Player count for multi-player mode.
    pub player_count: Option<u32>,
    /// Enable the Tracy profiler.
    pub tracy: bool,
}

impl From<&LaunchOptions> for LaunchRequest {
    fn from(options: &LaunchOptions) -> Self {
        // Debugger attachment is never forwarded for automated launches.
        Self {
            lua_args: BTreeMap::new(),
            multi_mode: options.multi_mode,
            player_count: options.multi_players,
            tracy: options.tracy,
        }
    }
}

/// Starts the game process. Completion means the process was started, not
/// that a client has connected.
pub trait GameLauncher: Send + Sync {
    /// Start the game.
    ///
    /// # Errors
    ///
    /// Any error aborts the launch and is reported as `GAME_LAUNCH_FAILED`.
    fn launch(&self, request: LaunchRequest) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Preconditions that must hold before launching.
pub trait Environment: Send + Sync {
    /// Resolve once the editor is ready.
    ///
    /// # Errors
    ///
    /// Propagated unchanged to the `launch_game` caller.
    fn editor_ready(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;

    /// Resolve once the map project is ready.
    ///
    /// # Errors
    ///
    /// Propagated unchanged to the `launch_game` caller.
    fn map_ready(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}
