use std::path::PathBuf;
use std::time::Duration;

use game_bridge::{config::GlobalConfig, AppError};

fn sample_toml() -> &'static str {
    r#"
[bridge]
host = "127.0.0.1"
port = 31000
request_timeout_ms = 5000

[console]
port = 31001

[logs]
dir = "/tmp/game-bridge-test-logs"
max_files = 3

[session]
poll_interval_ms = 250
launch_timeout_ms = 20000
restart_timeout_ms = 4000
capture_window_ms = 500
stop_grace_ms = 200

[launcher]
program = "/opt/game/engine"
args = ["--editor-launch"]
map_dir = "/opt/maps/demo"
"#
}

#[test]
fn parses_complete_config() {
    let config = GlobalConfig::from_toml_str(sample_toml()).expect("valid config");

    assert_eq!(config.bridge.addr(), "127.0.0.1:31000");
    assert_eq!(config.bridge.request_timeout(), Duration::from_secs(5));
    assert_eq!(config.console.addr(), "127.0.0.1:31001");
    assert_eq!(config.logs.dir, PathBuf::from("/tmp/game-bridge-test-logs"));
    assert_eq!(config.logs.max_files, 3);
    assert_eq!(config.session.poll_interval(), Duration::from_millis(250));
    assert_eq!(config.session.launch_timeout(), Duration::from_secs(20));
    assert_eq!(config.session.restart_timeout(), Duration::from_secs(4));
    assert_eq!(config.session.capture_window(), Duration::from_millis(500));
    assert_eq!(config.session.stop_grace(), Duration::from_millis(200));
    assert_eq!(config.launcher.program, "/opt/game/engine");
    assert_eq!(config.launcher.args, vec!["--editor-launch".to_owned()]);
    assert_eq!(config.launcher.map_dir, Some(PathBuf::from("/opt/maps/demo")));
}

#[test]
fn empty_config_uses_defaults() {
    let config = GlobalConfig::from_toml_str("").expect("defaults are valid");

    assert_eq!(config.bridge.addr(), "127.0.0.1:25897");
    assert_eq!(config.bridge.request_timeout(), Duration::from_secs(30));
    assert_eq!(config.console.port, 25898);
    assert_eq!(config.logs.max_files, 5);
    assert!(config.logs.dir.ends_with("game-bridge-logs"));
    assert_eq!(config.session.poll_interval_ms, 500);
    assert_eq!(config.session.launch_timeout_ms, 60_000);
    assert_eq!(config.session.restart_timeout_ms, 10_000);
    assert_eq!(config.session.capture_window_ms, 1_000);
    assert_eq!(config.session.stop_grace_ms, 1_000);
    assert!(config.launcher.program.is_empty());
    assert_eq!(config, GlobalConfig::default());
}

#[test]
fn partial_section_keeps_other_defaults() {
    let config = GlobalConfig::from_toml_str("[bridge]\nport = 0\n").expect("valid");

    assert_eq!(config.bridge.port, 0);
    assert_eq!(config.bridge.host, "127.0.0.1");
    assert_eq!(config.bridge.request_timeout_ms, 30_000);
}

#[test]
fn zero_poll_interval_is_rejected() {
    let result = GlobalConfig::from_toml_str("[session]\npoll_interval_ms = 0\n");
    assert!(matches!(result, Err(AppError::Config(msg)) if msg.contains("poll_interval_ms")));
}

#[test]
fn zero_max_files_is_rejected() {
    let result = GlobalConfig::from_toml_str("[logs]\nmax_files = 0\n");
    assert!(matches!(result, Err(AppError::Config(msg)) if msg.contains("max_files")));
}

#[test]
fn empty_host_is_rejected() {
    let result = GlobalConfig::from_toml_str("[bridge]\nhost = \"\"\n");
    assert!(matches!(result, Err(AppError::Config(_))));
}

#[test]
fn malformed_toml_is_config_error() {
    let result = GlobalConfig::from_toml_str("[bridge\nport = 1");
    assert!(matches!(result, Err(AppError::Config(_))));
}

#[test]
fn load_or_default_without_path_is_default() {
    let config = GlobalConfig::load_or_default(None).expect("defaults");
    assert_eq!(config, GlobalConfig::default());
}

#[test]
fn load_from_path_reads_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, sample_toml()).unwrap();

    let config = GlobalConfig::load_or_default(Some(&path)).expect("file loads");
    assert_eq!(config.bridge.port, 31000);
}

#[test]
fn load_from_missing_path_is_config_error() {
    let result = GlobalConfig::load_from_path("/nonexistent/game-bridge.toml");
    assert!(matches!(result, Err(AppError::Config(_))));
}
