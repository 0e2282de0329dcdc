//! Echo Session Integration Tests
//!
//! Runs the whole stack: session service, worker runtime and echo backend.

use std::time::Duration;

use lumen_chat::{AppConfig, AppError, SessionHandle, SessionService, SessionStatus, SubmitOutcome};
use lumen_core::Role;
use lumen_llm::EchoBackend;

const WAIT: Duration = Duration::from_secs(10);

fn config() -> AppConfig {
    AppConfig {
        token_delay_ms: 0,
        ..Default::default()
    }
}

async fn ready_session(backend: EchoBackend, config: &AppConfig) -> SessionHandle {
    let (handle, _task) = SessionService::start(backend, config).unwrap();
    handle.load().await.unwrap();
    tokio::time::timeout(WAIT, handle.wait_for(|s| s.status == SessionStatus::Ready))
        .await
        .expect("model never became ready")
        .unwrap();
    handle
}

async fn wait_idle(handle: &SessionHandle) -> lumen_chat::SessionSnapshot {
    tokio::time::timeout(WAIT, handle.wait_for(|s| !s.is_running))
        .await
        .expect("generation never completed")
        .unwrap()
}

#[tokio::test]
async fn test_echo_round_trip_with_reasoning() {
    let backend = EchoBackend::new("echo").with_reasoning(true);
    let handle = ready_session(backend, &config()).await;

    assert_eq!(
        handle.submit("hello world").await.unwrap(),
        SubmitOutcome::Dispatched
    );
    let snap = wait_idle(&handle).await;

    assert_eq!(snap.transcript.len(), 2);
    let reply = &snap.transcript[1];
    assert_eq!(reply.role, Role::Assistant);
    assert_eq!(reply.answer(), "hello world");
    assert!(reply.reasoning().starts_with("<think>"));
    assert!(reply.reasoning().ends_with("</think>"));
    assert!(snap.last_metrics.unwrap().token_count > 2);
    assert!(!snap.degraded);

    handle.shutdown();
}

#[tokio::test]
async fn test_echo_without_marker_answers_from_first_token() {
    let config = AppConfig {
        reasoning_end_marker: None,
        ..config()
    };
    let handle = ready_session(EchoBackend::new("echo"), &config).await;

    handle.submit("plain answer").await.unwrap();
    let snap = wait_idle(&handle).await;

    assert_eq!(snap.transcript[1].answer_offset, Some(0));
    assert_eq!(snap.transcript[1].content, "plain answer");
}

#[tokio::test]
async fn test_second_submit_while_streaming_is_refused() {
    let backend = EchoBackend::new("echo").with_token_delay(Duration::from_millis(20));
    let handle = ready_session(backend, &config()).await;

    handle.submit("a b c d e f").await.unwrap();
    let err = handle.submit("not now").await.unwrap_err();
    assert!(err.is_invalid_state());

    let snap = wait_idle(&handle).await;
    assert_eq!(snap.transcript.len(), 2);
}

#[tokio::test]
async fn test_interrupt_ends_turn_early() {
    let backend = EchoBackend::new("echo").with_token_delay(Duration::from_millis(25));
    let handle = ready_session(backend, &config()).await;

    let long_text = vec!["word"; 200].join(" ");
    handle.submit(long_text.clone()).await.unwrap();
    tokio::time::timeout(
        WAIT,
        handle.wait_for(|s| s.transcript.get(1).map_or(false, |m| !m.content.is_empty())),
    )
    .await
    .expect("no tokens streamed")
    .unwrap();

    handle.interrupt().await.unwrap();
    let snap = wait_idle(&handle).await;

    assert!(snap.transcript[1].content.len() < long_text.len());
    assert!(snap.error.is_none());

    // The session is usable again.
    handle.submit("again").await.unwrap();
    let snap = wait_idle(&handle).await;
    assert_eq!(snap.transcript.len(), 4);
}

#[tokio::test]
async fn test_load_failure_surfaces_error() {
    let backend = EchoBackend::new("echo").with_load_failure("disk full");
    let (handle, _task) = SessionService::start(backend, &config()).unwrap();
    handle.load().await.unwrap();

    let snap = tokio::time::timeout(WAIT, handle.wait_for(|s| s.error.is_some()))
        .await
        .expect("no error reported")
        .unwrap();
    assert_eq!(snap.status, SessionStatus::Loading);
    assert!(snap.error.unwrap().contains("disk full"));
    assert!(handle.load().await.unwrap_err().is_invalid_state());
}

#[tokio::test]
async fn test_capability_failure_reported_at_startup() {
    let backend = EchoBackend::new("echo").with_capability(false);
    let (handle, _task) = SessionService::start(backend, &config()).unwrap();

    let snap = tokio::time::timeout(WAIT, handle.wait_for(|s| s.error.is_some()))
        .await
        .expect("no error reported")
        .unwrap();
    assert_eq!(snap.status, SessionStatus::Uninitialized);
    assert!(!snap.can_load());
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let config = AppConfig {
        event_queue_capacity: 0,
        ..config()
    };
    let err = SessionService::start(EchoBackend::new("echo"), &config).unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn test_reset_clears_and_next_turn_is_fresh() {
    let handle = ready_session(EchoBackend::new("echo"), &config()).await;

    handle.submit("first").await.unwrap();
    wait_idle(&handle).await;
    handle.reset().await.unwrap();
    assert!(handle.snapshot().transcript.is_empty());

    handle.submit("second").await.unwrap();
    let snap = wait_idle(&handle).await;
    assert_eq!(snap.transcript.len(), 2);
    assert_eq!(snap.transcript[0].content, "second");
}
