//! Integration tests for the console listener and its client registry.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

use game_bridge::config::ConsoleConfig;
use game_bridge::host::{spawn_console_listener, ConsoleRegistry};
use game_bridge::rpc::LineReader;
use game_bridge::session::ClientRegistry;

struct Game {
    reader: LineReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Game {
    async fn print(&mut self, message: &str) {
        let line = json!({ "id": "g1", "method": "print", "params": { "message": message } });
        self.writer
            .write_all(format!("{line}\n").as_bytes())
            .await
            .unwrap();
    }

    async fn recv(&mut self) -> Option<Value> {
        self.reader
            .next_line()
            .await
            .unwrap()
            .map(|line| serde_json::from_str(&line).unwrap())
    }
}

async fn listener() -> (Arc<ConsoleRegistry>, std::net::SocketAddr, CancellationToken) {
    let registry = Arc::new(ConsoleRegistry::new());
    let ct = CancellationToken::new();
    let config = ConsoleConfig {
        host: "127.0.0.1".into(),
        port: 0,
    };
    let (addr, _task) = spawn_console_listener(
        &config,
        Arc::clone(&registry),
        Duration::from_secs(5),
        ct.clone(),
    )
    .await
    .expect("listener binds");
    (registry, addr, ct)
}

async fn connect(addr: std::net::SocketAddr) -> Game {
    let stream = TcpStream::connect(addr).await.expect("connect");
    let (read, write) = stream.into_split();
    Game {
        reader: LineReader::new(read),
        writer: write,
    }
}

async fn eventually(mut check: impl FnMut() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 2s");
}

#[tokio::test]
async fn connecting_registers_a_client() {
    let (registry, addr, ct) = listener().await;

    let _game = connect(addr).await;

    eventually(|| registry.len() == 1).await;
    assert_eq!(registry.snapshot().len(), 1);
    ct.cancel();
}

#[tokio::test]
async fn clients_are_listed_oldest_first() {
    let (registry, addr, ct) = listener().await;

    let _first = connect(addr).await;
    eventually(|| registry.len() == 1).await;
    let _second = connect(addr).await;
    eventually(|| registry.len() == 2).await;

    let ids: Vec<_> = registry.snapshot().iter().map(|c| c.id()).collect();
    assert!(ids[0] < ids[1]);
    ct.cancel();
}

#[tokio::test]
async fn print_lines_pass_through_the_tap() {
    let (registry, addr, ct) = listener().await;
    let mut game = connect(addr).await;
    eventually(|| registry.len() == 1).await;

    let seen = Arc::new(Mutex::new(Vec::<String>::new()));
    let sink = Arc::clone(&seen);
    registry.snapshot()[0].install_output_tap(Arc::new(move |line: &str| {
        sink.lock().unwrap().push(line.to_owned());
    }));

    game.print("first\nsecond").await;

    eventually(|| seen.lock().unwrap().len() == 2).await;
    assert_eq!(*seen.lock().unwrap(), vec!["first", "second"]);
    ct.cancel();
}

#[tokio::test]
async fn notify_reaches_the_game_socket() {
    let (registry, addr, ct) = listener().await;
    let mut game = connect(addr).await;
    eventually(|| registry.len() == 1).await;

    registry.snapshot()[0]
        .notify("command", json!({ "data": "print(1)" }))
        .unwrap();

    let message = game.recv().await.expect("a command line");
    assert_eq!(message["method"], "command");
    assert_eq!(message["params"]["data"], "print(1)");
    ct.cancel();
}

#[tokio::test]
async fn closing_the_connection_removes_the_client() {
    let (registry, addr, ct) = listener().await;
    let game = connect(addr).await;
    eventually(|| registry.len() == 1).await;

    drop(game);

    eventually(|| registry.is_empty()).await;
    assert!(registry.snapshot().is_empty());
    ct.cancel();
}

#[tokio::test]
async fn dispose_closes_the_game_socket() {
    let (registry, addr, ct) = listener().await;
    let mut game = connect(addr).await;
    eventually(|| registry.len() == 1).await;

    registry.snapshot()[0].dispose();

    assert!(registry.snapshot().is_empty(), "closed clients are not offered");
    let eof = tokio::time::timeout(Duration::from_secs(2), game.recv())
        .await
        .expect("socket closes");
    assert!(eof.is_none());
    ct.cancel();
}
