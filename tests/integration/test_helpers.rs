//! Shared fakes for coordinator and protocol integration tests.
//!
//! Provides in-memory implementations of the collaborator traits so the
//! state machine can be driven deterministically under paused time.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;

use game_bridge::config::SessionConfig;
use game_bridge::logs::{LogSink, LogSinkFactory};
use game_bridge::session::{
    ClientId, ClientRegistry, Collaborators, Environment, GameClient, GameLauncher,
    LaunchRequest, OutputTap, SessionCoordinator,
};
use game_bridge::{AppError, Result};

static NEXT_CLIENT: AtomicU64 = AtomicU64::new(1);

/// Game client that records notifications and replays output on demand.
#[derive(Default)]
pub struct FakeClient {
    id: u64,
    pub notified: Mutex<Vec<(String, Value)>>,
    tap: Mutex<Option<OutputTap>>,
    pub taps_installed: AtomicUsize,
    pub disposed: AtomicBool,
    pub fail_notify: AtomicBool,
}

impl FakeClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            id: NEXT_CLIENT.fetch_add(1, Ordering::SeqCst),
            ..Self::default()
        })
    }

    /// Emit one line of game output through the installed tap.
    pub fn emit(&self, line: &str) {
        let tap = self.tap.lock().unwrap().clone();
        if let Some(tap) = tap {
            tap(line);
        }
    }

    pub fn notifications(&self) -> Vec<(String, Value)> {
        self.notified.lock().unwrap().clone()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

impl GameClient for FakeClient {
    fn id(&self) -> ClientId {
        ClientId(self.id)
    }

    fn notify(&self, method: &str, params: Value) -> Result<()> {
        if self.fail_notify.load(Ordering::SeqCst) {
            return Err(AppError::ConnectionClosed("fake client is gone".into()));
        }
        self.notified
            .lock()
            .unwrap()
            .push((method.to_owned(), params));
        Ok(())
    }

    fn install_output_tap(&self, tap: OutputTap) {
        self.taps_installed.fetch_add(1, Ordering::SeqCst);
        *self.tap.lock().unwrap() = Some(tap);
    }

    fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
    }
}

/// Live-handle registry the test adds to and removes from directly.
#[derive(Default)]
pub struct FakeRegistry {
    clients: Mutex<Vec<Arc<FakeClient>>>,
}

impl FakeRegistry {
    pub fn connect(&self, client: &Arc<FakeClient>) {
        self.clients.lock().unwrap().push(Arc::clone(client));
    }

    pub fn disconnect(&self, client: &Arc<FakeClient>) {
        self.clients
            .lock()
            .unwrap()
            .retain(|c| c.id() != client.id());
    }
}

impl ClientRegistry for FakeRegistry {
    fn snapshot(&self) -> Vec<Arc<dyn GameClient>> {
        self.clients
            .lock()
            .unwrap()
            .iter()
            .map(|c| Arc::clone(c) as Arc<dyn GameClient>)
            .collect()
    }
}

/// Launcher that records requests and optionally fails.
#[derive(Default)]
pub struct FakeLauncher {
    pub requests: Mutex<Vec<LaunchRequest>>,
    pub failure: Mutex<Option<String>>,
}

impl FakeLauncher {
    pub fn launches(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl GameLauncher for FakeLauncher {
    fn launch(
        &self,
        request: LaunchRequest,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            self.requests.lock().unwrap().push(request);
            match self.failure.lock().unwrap().clone() {
                Some(message) => Err(AppError::Io(message)),
                None => Ok(()),
            }
        })
    }
}

/// Readiness gate whose map check can be made to fail.
#[derive(Default)]
pub struct FakeEnvironment {
    pub map_error: Mutex<Option<String>>,
}

impl Environment for FakeEnvironment {
    fn editor_ready(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async { Ok(()) })
    }

    fn map_ready(&self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            match self.map_error.lock().unwrap().clone() {
                Some(message) => Err(AppError::Config(message)),
                None => Ok(()),
            }
        })
    }
}

/// In-memory log sink storing raw lines.
#[derive(Default)]
pub struct MemoryLog {
    pub session_id: String,
    lines: Mutex<Vec<String>>,
    pub closed: AtomicBool,
}

impl MemoryLog {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl LogSink for MemoryLog {
    fn append(&self, line: &str) {
        if !self.is_closed() {
            self.lines.lock().unwrap().push(line.to_owned());
        }
    }

    fn read_tail(&self, limit: usize) -> Vec<String> {
        let lines = self.lines.lock().unwrap();
        let start = lines.len().saturating_sub(limit);
        lines[start..].to_vec()
    }

    fn line_count(&self) -> usize {
        self.lines.lock().unwrap().len()
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Factory that keeps every sink it created.
#[derive(Default)]
pub struct MemoryLogs {
    pub created: Mutex<Vec<Arc<MemoryLog>>>,
}

impl MemoryLogs {
    pub fn latest(&self) -> Arc<MemoryLog> {
        Arc::clone(self.created.lock().unwrap().last().expect("a log was created"))
    }

    pub fn count(&self) -> usize {
        self.created.lock().unwrap().len()
    }
}

impl LogSinkFactory for MemoryLogs {
    fn create(&self, session_id: &str) -> Result<Arc<dyn LogSink>> {
        let log = Arc::new(MemoryLog {
            session_id: session_id.to_owned(),
            ..MemoryLog::default()
        });
        self.created.lock().unwrap().push(Arc::clone(&log));
        Ok(log)
    }
}

/// A coordinator wired to fakes, with handles to each fake.
pub struct Fixture {
    pub coordinator: Arc<SessionCoordinator>,
    pub registry: Arc<FakeRegistry>,
    pub launcher: Arc<FakeLauncher>,
    pub environment: Arc<FakeEnvironment>,
    pub logs: Arc<MemoryLogs>,
}

/// Build a started coordinator using the default timings.
pub fn fixture() -> Fixture {
    fixture_with(SessionConfig::default())
}

/// Build a started coordinator using `config`.
pub fn fixture_with(config: SessionConfig) -> Fixture {
    let registry = Arc::new(FakeRegistry::default());
    let launcher = Arc::new(FakeLauncher::default());
    let environment = Arc::new(FakeEnvironment::default());
    let logs = Arc::new(MemoryLogs::default());

    let coordinator = Arc::new(SessionCoordinator::new(
        config,
        Collaborators {
            launcher: Arc::clone(&launcher) as Arc<dyn GameLauncher>,
            environment: Arc::clone(&environment) as Arc<dyn Environment>,
            registry: Arc::clone(&registry) as Arc<dyn ClientRegistry>,
            logs: Arc::clone(&logs) as Arc<dyn LogSinkFactory>,
        },
    ));
    coordinator.start();

    Fixture {
        coordinator,
        registry,
        launcher,
        environment,
        logs,
    }
}

impl Fixture {
    /// Launch and attach `client`, returning once the session is running.
    pub async fn launch_running(&self, client: &Arc<FakeClient>) {
        self.registry.connect(client);
        let outcome = self
            .coordinator
            .launch(game_bridge::models::LaunchOptions::default())
            .await
            .expect("launch succeeds");
        assert!(outcome.success, "launch attached: {outcome:?}");
    }
}
