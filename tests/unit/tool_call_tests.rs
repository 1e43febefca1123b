//! Unit tests for typed tool argument validation.

use serde_json::json;

use game_bridge::mcp::{ToolCall, ToolName};
use game_bridge::models::LaunchOptions;
use game_bridge::AppError;

#[test]
fn missing_arguments_are_an_empty_object() {
    assert_eq!(
        ToolCall::parse("launch_game", None).unwrap(),
        ToolCall::LaunchGame(LaunchOptions::default())
    );
    assert_eq!(
        ToolCall::parse("get_game_status", Some(serde_json::Value::Null)).unwrap(),
        ToolCall::GetGameStatus
    );
}

#[test]
fn launch_options_are_typed() {
    let call = ToolCall::parse(
        "launch_game",
        Some(json!({ "attach_debugger": true, "multi_mode": true, "multi_players": 2 })),
    )
    .unwrap();

    assert_eq!(
        call,
        ToolCall::LaunchGame(LaunchOptions {
            attach_debugger: true,
            multi_mode: true,
            multi_players: Some(2),
            tracy: false,
        })
    );
}

#[test]
fn get_logs_limit_is_optional() {
    assert_eq!(
        ToolCall::parse("get_logs", Some(json!({}))).unwrap(),
        ToolCall::GetLogs { limit: None }
    );
    assert_eq!(
        ToolCall::parse("get_logs", Some(json!({ "limit": 20 }))).unwrap(),
        ToolCall::GetLogs { limit: Some(20) }
    );
}

#[test]
fn negative_limit_is_invalid() {
    let err = ToolCall::parse("get_logs", Some(json!({ "limit": -1 }))).unwrap_err();
    assert!(matches!(err, AppError::InvalidParams(_)));
}

#[test]
fn execute_lua_requires_code() {
    let err = ToolCall::parse("execute_lua", Some(json!({}))).unwrap_err();
    assert!(matches!(err, AppError::InvalidParams(ref msg) if msg.contains("code")));
    assert_eq!(err.code(), -32602);
}

#[test]
fn execute_lua_code_must_be_a_string() {
    let err = ToolCall::parse("execute_lua", Some(json!({ "code": 42 }))).unwrap_err();
    assert!(matches!(err, AppError::InvalidParams(_)));
}

#[test]
fn unknown_fields_are_rejected() {
    for (name, args) in [
        ("stop_game", json!({ "force": true })),
        ("quick_restart", json!({ "hard": true })),
        ("execute_lua", json!({ "code": "print(1)", "timeout": 5 })),
    ] {
        let err = ToolCall::parse(name, Some(args)).unwrap_err();
        assert!(matches!(err, AppError::InvalidParams(_)), "{name}: {err}");
    }
}

#[test]
fn unknown_tool_is_method_not_found() {
    let err = ToolCall::parse("reboot_game", None).unwrap_err();
    assert!(matches!(err, AppError::MethodNotFound(ref msg) if msg.contains("reboot_game")));
}

#[test]
fn to_params_round_trips_through_parse() {
    let calls = [
        ToolCall::LaunchGame(LaunchOptions {
            tracy: true,
            ..LaunchOptions::default()
        }),
        ToolCall::GetGameStatus,
        ToolCall::GetLogs { limit: Some(7) },
        ToolCall::GetLogs { limit: None },
        ToolCall::ExecuteLua {
            code: "print('hi')".into(),
        },
        ToolCall::QuickRestart,
        ToolCall::StopGame,
    ];

    for call in calls {
        let reparsed = ToolCall::parse(call.name().as_str(), call.to_params()).unwrap();
        assert_eq!(reparsed, call);
    }
}

#[test]
fn tool_names_resolve_by_wire_name() {
    for tool in ToolName::ALL {
        assert_eq!(ToolName::from_name(tool.as_str()), Some(tool));
    }
    assert_eq!(ToolName::from_name("tools/call"), None);
}
