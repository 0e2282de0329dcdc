//! Session Controller
//!
//! The state machine behind one chat session. It owns the single worker link,
//! turns presentation intents into worker commands, and folds worker events
//! into the transcript and progress list. It never waits on the worker: every
//! command's effect arrives later as events through `handle_event`.
//!
//! Status moves `Uninitialized -> Loading -> Ready` and never back. Within
//! `Ready`, `is_running` is true from the moment a user turn is accepted until
//! the worker's `complete` for that turn, and at most one generation is ever
//! outstanding.

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use lumen_core::assembler::{apply_update, begin_turn};
use lumen_core::{
    ChatMessage, GenerationMetrics, ProgressAggregator, Role, TokenUpdate, WorkerCommand,
    WorkerEvent,
};

use crate::models::session::{SessionSnapshot, SessionStatus, SubmitOutcome};
use crate::services::prompt::{PassthroughPromptBuilder, PromptBuilder};
use crate::services::worker_link::WorkerLink;
use crate::utils::error::{AppError, AppResult};

/// Owned state of one chat session.
pub struct SessionController {
    session_id: String,
    status: SessionStatus,
    error: Option<String>,
    loading_message: Option<String>,
    transcript: Vec<ChatMessage>,
    progress: ProgressAggregator,
    last_metrics: Option<GenerationMetrics>,
    is_running: bool,
    /// A Generate command was sent and its `complete` has not arrived
    generate_outstanding: bool,
    degraded: bool,
    worker: Option<WorkerLink>,
    prompt_builder: Box<dyn PromptBuilder>,
}

impl SessionController {
    pub fn new(prompt_builder: Box<dyn PromptBuilder>) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            status: SessionStatus::Uninitialized,
            error: None,
            loading_message: None,
            transcript: Vec::new(),
            progress: ProgressAggregator::new(),
            last_metrics: None,
            is_running: false,
            generate_outstanding: false,
            degraded: false,
            worker: None,
            prompt_builder,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    // ── Worker link ────────────────────────────────────────────────────

    /// Attach the compute worker and send the startup capability check.
    ///
    /// A session has exactly one worker for its lifetime; later calls are
    /// refused and return `false`.
    pub fn attach_worker(&mut self, link: WorkerLink) -> bool {
        if self.worker.is_some() {
            warn!("[Session] Worker already attached, ignoring second link");
            return false;
        }
        if let Err(e) = link.send(WorkerCommand::Check) {
            warn!("[Session] Capability check not sent: {}", e);
        }
        self.worker = Some(link);
        info!("[Session] Worker attached to session {}", self.session_id);
        true
    }

    fn send(&self, command: WorkerCommand) -> AppResult<()> {
        match &self.worker {
            Some(link) => link.send(command),
            None => Err(AppError::worker("no worker attached to this session")),
        }
    }

    // ── Presentation intents ───────────────────────────────────────────

    /// Ask the worker to load the model.
    pub fn load(&mut self) -> AppResult<()> {
        if let Some(err) = &self.error {
            return Err(AppError::invalid_state(format!(
                "loading already failed ({}), start a new session",
                err
            )));
        }
        if self.status != SessionStatus::Uninitialized {
            return Err(AppError::invalid_state(format!(
                "model is already {}",
                self.status
            )));
        }

        self.send(WorkerCommand::Load)?;
        self.status = SessionStatus::Loading;
        info!("[Session] Loading model");
        Ok(())
    }

    /// Submit user text as the next turn and start generating the reply.
    ///
    /// Empty input is ignored. A submission while the model is not ready or a
    /// generation is running is refused, never queued.
    pub fn submit(&mut self, text: &str) -> AppResult<SubmitOutcome> {
        if text.trim().is_empty() {
            debug!("[Session] Ignoring empty submission");
            return Ok(SubmitOutcome::Ignored);
        }
        if self.status != SessionStatus::Ready {
            return Err(AppError::invalid_state(format!(
                "model is {}, not ready",
                self.status
            )));
        }
        if self.is_running {
            return Err(AppError::invalid_state("a generation is already running"));
        }
        if self.worker.is_none() {
            return Err(AppError::worker("no worker attached to this session"));
        }

        let previous_metrics = self.last_metrics.take();
        self.append_user_turn(text);
        match self.maybe_dispatch_generate() {
            Ok(true) => Ok(SubmitOutcome::Dispatched),
            Ok(false) => {
                self.rollback_user_turn(previous_metrics);
                Err(AppError::internal("generation was not dispatched"))
            }
            Err(e) => {
                warn!("[Session] Generate not sent, dropping user turn: {}", e);
                self.rollback_user_turn(previous_metrics);
                Err(e)
            }
        }
    }

    /// Ask the running generation to stop. Advisory: the session stays
    /// running until the worker's `complete` arrives.
    pub fn interrupt(&mut self) -> AppResult<()> {
        if !self.is_running {
            return Err(AppError::invalid_state("no generation is running"));
        }
        self.send(WorkerCommand::Interrupt)?;
        info!("[Session] Interrupt requested");
        Ok(())
    }

    /// Clear the conversation and the worker's cached state.
    pub fn reset(&mut self) -> AppResult<()> {
        if self.is_running {
            return Err(AppError::invalid_state(
                "cannot reset while a generation is running",
            ));
        }
        self.send(WorkerCommand::Reset)?;
        self.transcript.clear();
        self.last_metrics = None;
        info!("[Session] Conversation reset");
        Ok(())
    }

    /// Append the user turn built from `text` and mark the session running.
    fn append_user_turn(&mut self, text: &str) {
        let content = self.prompt_builder.build(&self.transcript, text);
        self.transcript.push(ChatMessage::user(content));
        self.last_metrics = None;
        self.is_running = true;
    }

    /// Undo `append_user_turn` when no Generate went out for it.
    fn rollback_user_turn(&mut self, previous_metrics: Option<GenerationMetrics>) {
        if matches!(self.transcript.last(), Some(last) if last.role == Role::User) {
            self.transcript.pop();
        }
        self.last_metrics = previous_metrics;
        self.is_running = false;
    }

    /// Send Generate if the transcript ends with a user turn and nothing is
    /// outstanding, then open the assistant placeholder for the reply.
    /// Returns whether a request was sent.
    fn maybe_dispatch_generate(&mut self) -> AppResult<bool> {
        if self.generate_outstanding {
            return Ok(false);
        }
        match self.transcript.last() {
            Some(last) if last.role == Role::User => {}
            _ => return Ok(false),
        }

        self.send(WorkerCommand::Generate(self.transcript.clone()))?;
        self.generate_outstanding = true;
        self.transcript.push(ChatMessage::assistant(""));
        debug!(
            "[Session] Generation dispatched with {} turns",
            self.transcript.len() - 1
        );
        Ok(true)
    }

    // ── Worker events ──────────────────────────────────────────────────

    /// Apply one inbound worker event.
    pub fn handle_event(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::Loading { data } => {
                if self.status == SessionStatus::Ready {
                    debug!("[Session] Loading message after ready: {}", data);
                    return;
                }
                self.status = SessionStatus::Loading;
                self.loading_message = Some(data);
            }
            event @ (WorkerEvent::Initiate { .. }
            | WorkerEvent::Progress { .. }
            | WorkerEvent::Done { .. }) => {
                self.progress.apply(&event);
            }
            WorkerEvent::Ready => {
                if self.status == SessionStatus::Ready {
                    debug!("[Session] Duplicate ready event");
                    return;
                }
                self.status = SessionStatus::Ready;
                self.progress.clear();
                self.loading_message = None;
                info!("[Session] Model ready");
            }
            WorkerEvent::Error { data } => {
                error!("[Session] Worker reported error: {}", data);
                self.error = Some(data);
            }
            WorkerEvent::Start => {
                if !self.generate_outstanding {
                    self.protocol_violation("start", "no generation was requested");
                    return;
                }
                if let Err(e) = begin_turn(&mut self.transcript, &mut self.last_metrics) {
                    self.protocol_violation("start", &e.to_string());
                }
            }
            WorkerEvent::Update {
                output,
                tps,
                num_tokens,
                state,
            } => {
                if !self.generate_outstanding {
                    self.protocol_violation("update", "no generation is open");
                    return;
                }
                let update = TokenUpdate {
                    output: &output,
                    tps,
                    num_tokens,
                    phase: state,
                };
                if let Err(e) = apply_update(&mut self.transcript, &mut self.last_metrics, update)
                {
                    self.protocol_violation("update", &e.to_string());
                }
            }
            WorkerEvent::Complete => {
                if !self.is_running {
                    self.protocol_violation("complete", "no generation is running");
                    return;
                }
                self.is_running = false;
                self.generate_outstanding = false;
                if let Some(metrics) = &self.last_metrics {
                    info!(
                        "[Session] Generation complete: {} tokens at {:.1} tok/s",
                        metrics.token_count, metrics.tokens_per_second
                    );
                } else {
                    info!("[Session] Generation complete");
                }
            }
        }
    }

    /// The worker's event channel closed. Nothing more will arrive.
    pub fn handle_worker_lost(&mut self) {
        error!(
            "[Session] Worker event channel closed (running: {})",
            self.is_running
        );
    }

    fn protocol_violation(&mut self, event: &str, reason: &str) {
        warn!("[Session] Dropping {} event: {}", event, reason);
        self.degraded = true;
    }

    /// Current observable state.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id.clone(),
            status: self.status,
            error: self.error.clone(),
            loading_message: self.loading_message.clone(),
            transcript: self.transcript.clone(),
            progress: self.progress.snapshot(),
            last_metrics: self.last_metrics,
            is_running: self.is_running,
            degraded: self.degraded,
        }
    }
}

impl Default for SessionController {
    fn default() -> Self {
        Self::new(Box::new(PassthroughPromptBuilder))
    }
}
