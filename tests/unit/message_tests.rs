//! Unit tests for bridge wire messages.

use serde_json::json;

use game_bridge::rpc::message::{parse_line, to_line};
use game_bridge::rpc::{Inbound, RpcErrorBody, RpcRequest, RpcResponse};
use game_bridge::AppError;

#[test]
fn request_line_parses_as_request() {
    let inbound = parse_line(r#"{"id":"3","method":"get_logs","params":{"limit":5}}"#).unwrap();

    let Inbound::Request(request) = inbound else {
        panic!("expected a request");
    };
    assert_eq!(request.id, "3");
    assert_eq!(request.method, "get_logs");
    assert_eq!(request.params, Some(json!({ "limit": 5 })));
}

#[test]
fn numeric_id_is_accepted_as_string() {
    let inbound = parse_line(r#"{"id":7,"result":{"ok":true}}"#).unwrap();

    let Inbound::Response(response) = inbound else {
        panic!("expected a response");
    };
    assert_eq!(response.id, "7");
    assert_eq!(response.into_result().unwrap(), json!({ "ok": true }));
}

#[test]
fn error_response_becomes_remote_error() {
    let inbound =
        parse_line(r#"{"id":"1","error":{"code":-32004,"message":"no active game session"}}"#)
            .unwrap();

    let Inbound::Response(response) = inbound else {
        panic!("expected a response");
    };
    let err = response.into_result().unwrap_err();
    assert!(matches!(
        err,
        AppError::Remote { code: -32004, ref message, data: None } if message == "no active game session"
    ));
}

#[test]
fn malformed_json_is_ipc_error() {
    let err = parse_line("{not json").unwrap_err();
    assert!(matches!(err, AppError::Ipc(ref msg) if msg.starts_with("malformed json")));
}

#[test]
fn request_without_params_omits_field() {
    let line = to_line(&RpcRequest {
        id: "1".into(),
        method: "stop_game".into(),
        params: None,
    })
    .unwrap();

    assert_eq!(line, r#"{"id":"1","method":"stop_game"}"#);
}

#[test]
fn failure_response_serializes_error_body() {
    let body = RpcErrorBody::from(&AppError::ClientNotConnected(
        "game client is not connected".into(),
    ));
    let line = to_line(&RpcResponse::failure("9".into(), body)).unwrap();
    let value: serde_json::Value = serde_json::from_str(&line).unwrap();

    assert_eq!(value["id"], "9");
    assert_eq!(value["error"]["code"], -32006);
    assert_eq!(value["error"]["message"], "game client is not connected");
    assert!(value.get("result").is_none());
    assert!(value["error"].get("data").is_none());
}

#[test]
fn success_response_without_result_is_null() {
    let response: RpcResponse = serde_json::from_str(r#"{"id":"2"}"#).unwrap();
    assert_eq!(response.into_result().unwrap(), serde_json::Value::Null);
}
