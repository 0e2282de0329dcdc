//! Session Flow Integration Tests
//!
//! Drives a `SessionController` with hand-written worker events and checks
//! the commands it sends back.

use tokio::sync::mpsc;

use lumen_chat::services::WorkerLink;
use lumen_chat::{SessionController, SessionStatus, SubmitOutcome};
use lumen_core::{ChatMessage, GenerationMetrics, Phase, Role, WorkerCommand, WorkerEvent};

// ============================================================================
// Helpers
// ============================================================================

struct Harness {
    session: SessionController,
    commands: mpsc::UnboundedReceiver<WorkerCommand>,
}

impl Harness {
    fn new() -> Self {
        let (tx, commands) = mpsc::unbounded_channel();
        let mut session = SessionController::default();
        session.attach_worker(WorkerLink::new(tx));
        Self { session, commands }
    }

    fn ready() -> Self {
        let mut harness = Self::new();
        harness.session.load().unwrap();
        harness.session.handle_event(WorkerEvent::Ready);
        harness.sent();
        harness
    }

    fn sent(&mut self) -> Vec<WorkerCommand> {
        let mut out = Vec::new();
        while let Ok(cmd) = self.commands.try_recv() {
            out.push(cmd);
        }
        out
    }

    fn feed(&mut self, events: Vec<WorkerEvent>) {
        for event in events {
            self.session.handle_event(event);
        }
    }

    fn finish_turn(&mut self, reply: &str) {
        self.feed(vec![
            WorkerEvent::Start,
            update(reply, 10.0, 1, Phase::Answering),
            WorkerEvent::Complete,
        ]);
    }
}

fn update(output: &str, tps: f64, num_tokens: u64, state: Phase) -> WorkerEvent {
    WorkerEvent::Update {
        output: output.to_string(),
        tps,
        num_tokens,
        state,
    }
}

fn count_generates(commands: &[WorkerCommand]) -> usize {
    commands
        .iter()
        .filter(|c| matches!(c, WorkerCommand::Generate(_)))
        .count()
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_load_then_first_turn() {
    let mut h = Harness::new();
    assert_eq!(h.sent(), vec![WorkerCommand::Check]);

    h.session.load().unwrap();
    h.feed(vec![
        WorkerEvent::Loading {
            data: "Loading model...".to_string(),
        },
        WorkerEvent::Initiate {
            file: "A".to_string(),
            name: None,
            total: 100,
        },
        WorkerEvent::Progress {
            file: "A".to_string(),
            name: None,
            loaded: 40,
            total: 100,
        },
    ]);
    let loading = h.session.snapshot();
    assert_eq!(loading.status, SessionStatus::Loading);
    assert_eq!(loading.loading_message.as_deref(), Some("Loading model..."));
    assert_eq!(loading.progress.len(), 1);
    assert_eq!(loading.progress[0].loaded, 40);
    assert_eq!(loading.progress[0].percent(), 40.0);

    h.feed(vec![
        WorkerEvent::Progress {
            file: "A".to_string(),
            name: None,
            loaded: 100,
            total: 100,
        },
        WorkerEvent::Done {
            file: "A".to_string(),
        },
        WorkerEvent::Ready,
    ]);
    assert_eq!(h.session.status(), SessionStatus::Ready);

    assert_eq!(h.session.submit("hello").unwrap(), SubmitOutcome::Dispatched);
    h.feed(vec![
        WorkerEvent::Start,
        update("Hi", 12.3, 1, Phase::Reasoning),
        update(" there", 11.0, 2, Phase::Answering),
        WorkerEvent::Complete,
    ]);

    let snap = h.session.snapshot();
    assert_eq!(snap.status, SessionStatus::Ready);
    assert!(!snap.is_running);
    assert!(snap.progress.is_empty());
    assert_eq!(
        snap.transcript,
        vec![
            ChatMessage::user("hello"),
            ChatMessage {
                role: Role::Assistant,
                content: "Hi there".to_string(),
                answer_offset: Some(2),
            },
        ]
    );
    assert_eq!(
        snap.last_metrics,
        Some(GenerationMetrics {
            tokens_per_second: 11.0,
            token_count: 2,
        })
    );

    let sent = h.sent();
    assert_eq!(sent, vec![WorkerCommand::Load, WorkerCommand::Generate(vec![ChatMessage::user("hello")])]);
}

#[test]
fn test_rapid_submissions_send_one_generate() {
    let mut h = Harness::ready();

    assert!(h.session.submit("one").is_ok());
    for text in ["two", "three", "four"] {
        assert!(h.session.submit(text).unwrap_err().is_invalid_state());
    }
    assert_eq!(count_generates(&h.sent()), 1);

    h.finish_turn("ok");
    assert!(h.session.submit("five").is_ok());
    assert_eq!(count_generates(&h.sent()), 1);
}

#[test]
fn test_roles_alternate_across_turns() {
    let mut h = Harness::ready();
    for i in 0..5 {
        h.session.submit(&format!("question {}", i)).unwrap();
        h.finish_turn("answer");
    }

    let transcript = h.session.transcript();
    assert_eq!(transcript.len(), 10);
    for (i, msg) in transcript.iter().enumerate() {
        let expected = if i % 2 == 0 { Role::User } else { Role::Assistant };
        assert_eq!(msg.role, expected, "turn {}", i);
    }
}

#[test]
fn test_repeated_ready_leaves_conversation_alone() {
    let mut h = Harness::ready();
    h.session.submit("first").unwrap();
    h.finish_turn("one");
    h.session.submit("second").unwrap();
    h.finish_turn("two");
    let before = h.session.snapshot();
    h.sent();

    h.feed(vec![WorkerEvent::Ready, WorkerEvent::Ready]);

    let after = h.session.snapshot();
    assert_eq!(after.status, SessionStatus::Ready);
    assert_eq!(after.transcript, before.transcript);
    assert_eq!(after.last_metrics, before.last_metrics);
    assert!(!after.is_running);
    assert!(!after.degraded);
    assert!(h.sent().is_empty());
}

#[test]
fn test_duplicate_progress_events_settle_empty() {
    let mut h = Harness::new();
    h.session.load().unwrap();
    let initiate = WorkerEvent::Initiate {
        file: "A".to_string(),
        name: None,
        total: 100,
    };
    let half = WorkerEvent::Progress {
        file: "A".to_string(),
        name: None,
        loaded: 50,
        total: 100,
    };
    let full = WorkerEvent::Progress {
        file: "A".to_string(),
        name: None,
        loaded: 100,
        total: 100,
    };
    h.feed(vec![
        initiate,
        half.clone(),
        half,
        full.clone(),
        full,
        WorkerEvent::Done {
            file: "A".to_string(),
        },
    ]);
    assert!(h.session.snapshot().progress.is_empty());
    assert!(!h.session.is_degraded());
}

#[test]
fn test_progress_without_initiate_is_tolerated() {
    let mut h = Harness::new();
    h.session.load().unwrap();
    h.feed(vec![WorkerEvent::Progress {
        file: "tokenizer.json".to_string(),
        name: Some("tiny".to_string()),
        loaded: 3,
        total: 4,
    }]);

    let snap = h.session.snapshot();
    assert_eq!(snap.progress.len(), 1);
    assert_eq!(snap.progress[0].percent(), 75.0);
    assert!(!snap.degraded);
}

#[test]
fn test_answer_offset_stays_put_after_late_reasoning() {
    let mut h = Harness::ready();
    h.session.submit("q").unwrap();
    h.feed(vec![
        WorkerEvent::Start,
        update("think", 1.0, 1, Phase::Reasoning),
        update("A", 1.0, 2, Phase::Answering),
        update("?", 1.0, 3, Phase::Reasoning),
        update("B", 1.0, 4, Phase::Answering),
    ]);
    let msg = h.session.transcript().last().unwrap().clone();
    assert_eq!(msg.content, "thinkA?B");
    assert_eq!(msg.answer_offset, Some(5));
}

#[test]
fn test_reset_then_submit_matches_fresh_session() {
    let mut h = Harness::ready();
    h.session.submit("first").unwrap();
    h.finish_turn("reply");
    h.sent();

    h.session.reset().unwrap();
    assert_eq!(h.sent(), vec![WorkerCommand::Reset]);
    assert!(h.session.snapshot().last_metrics.is_none());

    h.session.submit("again").unwrap();
    assert_eq!(
        h.sent(),
        vec![WorkerCommand::Generate(vec![ChatMessage::user("again")])]
    );
    assert_eq!(h.session.transcript().len(), 2);
}

#[test]
fn test_interrupted_turn_keeps_partial_text() {
    let mut h = Harness::ready();
    h.session.submit("tell me a story").unwrap();
    h.feed(vec![
        WorkerEvent::Start,
        update("Once", 4.0, 1, Phase::Answering),
    ]);

    h.session.interrupt().unwrap();
    assert!(h.session.is_running());
    assert!(h.session.reset().unwrap_err().is_invalid_state());

    h.feed(vec![WorkerEvent::Complete]);
    let snap = h.session.snapshot();
    assert!(!snap.is_running);
    assert_eq!(snap.transcript[1].content, "Once");
    assert!(snap.can_submit());
}

#[test]
fn test_capability_failure_blocks_loading() {
    let mut h = Harness::new();
    h.feed(vec![WorkerEvent::Error {
        data: "Unsupported: no compatible accelerator found".to_string(),
    }]);

    let snap = h.session.snapshot();
    assert!(!snap.can_load());
    assert!(h.session.load().unwrap_err().is_invalid_state());
    assert_eq!(h.sent(), vec![WorkerCommand::Check]);
}
