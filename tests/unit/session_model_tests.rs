//! Unit tests for session status, launch options, and result payloads.

use serde_json::json;

use game_bridge::models::{LaunchOptions, LaunchOutcome, LogsReport, SessionStatus, StatusReport};
use game_bridge::session::LaunchRequest;

#[test]
fn status_labels_are_snake_case() {
    assert_eq!(SessionStatus::Launching.as_str(), "launching");
    assert_eq!(SessionStatus::Running.to_string(), "running");
    assert_eq!(
        serde_json::to_value(SessionStatus::Restarting).unwrap(),
        json!("restarting")
    );
}

#[test]
fn only_launching_and_restarting_await_a_client() {
    assert!(SessionStatus::Launching.awaits_client());
    assert!(SessionStatus::Restarting.awaits_client());
    assert!(!SessionStatus::Running.awaits_client());
    assert!(!SessionStatus::Stopped.awaits_client());
}

#[test]
fn permitted_transitions() {
    use SessionStatus::{Launching, Restarting, Running, Stopped};

    assert!(Launching.can_transition_to(Running));
    assert!(Running.can_transition_to(Restarting));
    assert!(Restarting.can_transition_to(Running));
    assert!(Restarting.can_transition_to(Stopped));
    assert!(Running.can_transition_to(Stopped));

    assert!(!Stopped.can_transition_to(Running));
    assert!(!Launching.can_transition_to(Restarting));
    assert!(!Stopped.can_transition_to(Launching));
}

#[test]
fn launch_options_default_to_false() {
    let options: LaunchOptions = serde_json::from_value(json!({})).unwrap();
    assert_eq!(options, LaunchOptions::default());
}

#[test]
fn launch_options_reject_unknown_fields() {
    let result = serde_json::from_value::<LaunchOptions>(json!({ "debugger": true }));
    assert!(result.is_err());
}

#[test]
fn launch_request_never_forwards_debugger() {
    let options = LaunchOptions {
        attach_debugger: true,
        multi_mode: true,
        multi_players: Some(4),
        tracy: true,
    };

    let request = LaunchRequest::from(&options);

    assert!(request.lua_args.is_empty());
    assert!(request.multi_mode);
    assert_eq!(request.player_count, Some(4));
    assert!(request.tracy);
}

#[test]
fn no_session_status_report() {
    let value = serde_json::to_value(StatusReport::no_session()).unwrap();
    assert_eq!(
        value,
        json!({ "running": false, "session_id": null, "status": "no_session" })
    );
}

#[test]
fn launch_outcome_shape() {
    let outcome = LaunchOutcome {
        success: true,
        session_id: "session_1".into(),
        status: "running".into(),
        message: "Game launched successfully".into(),
    };

    assert_eq!(
        serde_json::to_value(outcome).unwrap(),
        json!({
            "success": true,
            "session_id": "session_1",
            "status": "running",
            "message": "Game launched successfully"
        })
    );
}

#[test]
fn failed_logs_report_has_only_message() {
    let report = LogsReport {
        success: false,
        log_count: None,
        logs: None,
        message: Some("No active session".into()),
    };

    assert_eq!(
        serde_json::to_value(report).unwrap(),
        json!({ "success": false, "message": "No active session" })
    );
}
