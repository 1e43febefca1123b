#![forbid(unsafe_code)]

//! `game-bridge-mcp`: tool-protocol front end for `game-bridge`.
//!
//! Speaks JSON-RPC 2.0 on stdin/stdout and relays tool calls to the host
//! over the TCP bridge. Diagnostics go to stderr; stdout carries only
//! protocol envelopes.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use game_bridge::config::GlobalConfig;
use game_bridge::mcp::{serve_stdio, ProtocolRouter, ToolBackend};
use game_bridge::rpc::RpcClient;
use game_bridge::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "game-bridge-mcp",
    about = "MCP stdio front end for the game-bridge host",
    version,
    long_about = None
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Override the host bridge port.
    #[arg(long)]
    port: Option<u16>,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Config(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ───────────────────────────
    let mut config = GlobalConfig::load_or_default(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.bridge.port = port;
    }

    // ── Connect to the host bridge ───────────────────
    let addr = config.bridge.addr();
    let (bridge, _peer_requests) =
        RpcClient::connect_tcp(&addr, config.bridge.request_timeout()).await?;
    info!(%addr, "connected to host bridge");

    let router = Arc::new(ProtocolRouter::new(Arc::clone(&bridge) as Arc<dyn ToolBackend>));
    let ct = CancellationToken::new();

    let watch_ct = ct.clone();
    let watch_bridge = Arc::clone(&bridge);
    tokio::spawn(async move {
        tokio::select! {
            () = watch_bridge.closed() => error!("host bridge connection lost"),
            () = watch_ct.cancelled() => {}
        }
    });

    // ── Serve stdio until EOF ────────────────────────
    let outcome = serve_stdio(router, ct.clone()).await;
    ct.cancel();
    bridge.close();
    info!("game-bridge-mcp shut down");
    outcome
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_ansi(false);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
