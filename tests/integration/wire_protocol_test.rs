//! Wire Protocol Integration Tests
//!
//! Feeds JSON-encoded worker events, as an out-of-process worker would send
//! them, through the session controller.

use tokio::sync::mpsc;

use lumen_chat::services::WorkerLink;
use lumen_chat::{SessionController, SessionStatus};
use lumen_core::{CoreError, WorkerCommand, WorkerEvent};

const LOAD_AND_TURN: &[&str] = &[
    r#"{"status":"loading","data":"Loading model..."}"#,
    r#"{"status":"initiate","file":"onnx/model.onnx","name":"tiny-chat","total":2048}"#,
    r#"{"status":"initiate","file":"tokenizer.json","name":"tiny-chat","total":512}"#,
    r#"{"status":"progress","file":"tokenizer.json","name":"tiny-chat","loaded":512,"total":512}"#,
    r#"{"status":"done","file":"tokenizer.json"}"#,
    r#"{"status":"progress","file":"onnx/model.onnx","loaded":1024,"total":2048}"#,
];

const FINISH_LOAD: &[&str] = &[
    r#"{"status":"progress","file":"onnx/model.onnx","loaded":2048,"total":2048}"#,
    r#"{"status":"done","file":"onnx/model.onnx"}"#,
    r#"{"status":"loading","data":"Compiling shaders and warming up model..."}"#,
    r#"{"status":"ready"}"#,
];

const TURN: &[&str] = &[
    r#"{"status":"start"}"#,
    r#"{"status":"update","output":"<think>","tps":0.0,"numTokens":1,"state":"thinking"}"#,
    r#"{"status":"update","output":"</think>","tps":20.0,"numTokens":2,"state":"thinking"}"#,
    r#"{"status":"update","output":"Paris","tps":18.5,"numTokens":3,"state":"answering"}"#,
    r#"{"status":"complete"}"#,
];

fn decode_all(session: &mut SessionController, lines: &[&str]) {
    for line in lines {
        session.handle_event(WorkerEvent::decode(line).unwrap());
    }
}

#[test]
fn test_json_event_stream_drives_session() {
    let (tx, mut commands) = mpsc::unbounded_channel();
    let mut session = SessionController::default();
    session.attach_worker(WorkerLink::new(tx));
    session.load().unwrap();

    decode_all(&mut session, LOAD_AND_TURN);
    let snap = session.snapshot();
    assert_eq!(snap.status, SessionStatus::Loading);
    assert_eq!(snap.progress.len(), 1);
    assert_eq!(snap.progress[0].file, "onnx/model.onnx");
    assert_eq!(snap.progress[0].name.as_deref(), Some("tiny-chat"));
    assert_eq!(snap.progress[0].percent(), 50.0);

    decode_all(&mut session, FINISH_LOAD);
    assert_eq!(session.status(), SessionStatus::Ready);

    session.submit("Capital of France?").unwrap();
    decode_all(&mut session, TURN);

    let snap = session.snapshot();
    assert!(!snap.degraded);
    let reply = &snap.transcript[1];
    assert_eq!(reply.content, "<think></think>Paris");
    assert_eq!(reply.answer(), "Paris");
    assert_eq!(snap.last_metrics.unwrap().token_count, 3);

    let mut kinds = Vec::new();
    while let Ok(cmd) = commands.try_recv() {
        kinds.push(cmd.kind());
    }
    assert_eq!(kinds, vec!["check", "load", "generate"]);
}

#[test]
fn test_unknown_status_is_parse_error() {
    let err = WorkerEvent::decode(r#"{"status":"paused"}"#).unwrap_err();
    assert!(matches!(err, CoreError::Parse(_)));
}

#[test]
fn test_generate_command_encodes_transcript() {
    let (tx, mut commands) = mpsc::unbounded_channel();
    let mut session = SessionController::default();
    session.attach_worker(WorkerLink::new(tx));
    session.load().unwrap();
    session.handle_event(WorkerEvent::Ready);
    session.submit("hi").unwrap();

    let generate = std::iter::from_fn(|| commands.try_recv().ok())
        .find(|c| matches!(c, WorkerCommand::Generate(_)))
        .unwrap();
    let json = serde_json::to_value(&generate).unwrap();
    assert_eq!(json["type"], "generate");
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
    assert_eq!(json["data"][0]["role"], "user");
}
