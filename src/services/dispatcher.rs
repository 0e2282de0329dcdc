//! Session Service
//!
//! Runs a `SessionController` on its own task. Worker events and presentation
//! intents are taken one at a time from their queues, so the controller never
//! needs a lock, and a fresh `SessionSnapshot` is published on a watch channel
//! after each one.

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, Instrument};

use lumen_core::WorkerEvent;
use lumen_llm::ModelBackend;

use crate::models::session::{SessionSnapshot, SubmitOutcome};
use crate::models::settings::AppConfig;
use crate::services::prompt::builder_for;
use crate::services::session::SessionController;
use crate::services::worker_link::spawn_worker;
use crate::utils::error::{AppError, AppResult};

/// A request from the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserIntent {
    Load,
    Submit(String),
    Interrupt,
    Reset,
}

struct IntentRequest {
    intent: UserIntent,
    reply: oneshot::Sender<AppResult<SubmitOutcome>>,
}

impl std::fmt::Debug for IntentRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntentRequest")
            .field("intent", &self.intent)
            .finish()
    }
}

/// Dispatcher loop owning the session controller.
pub struct SessionService {
    controller: SessionController,
    events: mpsc::Receiver<WorkerEvent>,
    intents: mpsc::UnboundedReceiver<IntentRequest>,
    snapshots: watch::Sender<SessionSnapshot>,
    shutdown: CancellationToken,
    worker_task: Option<JoinHandle<()>>,
}

impl SessionService {
    /// Spawn the dispatcher for a controller whose worker is already attached.
    pub fn spawn(
        controller: SessionController,
        events: mpsc::Receiver<WorkerEvent>,
    ) -> (SessionHandle, JoinHandle<()>) {
        Self::spawn_inner(controller, events, None)
    }

    /// Build a complete session from config: spawn `backend` as the worker,
    /// attach it, and start the dispatcher.
    pub fn start<B>(backend: B, config: &AppConfig) -> AppResult<(SessionHandle, JoinHandle<()>)>
    where
        B: ModelBackend + 'static,
    {
        config.validate().map_err(AppError::validation)?;
        let prompt_builder = builder_for(config.prompt_template.as_deref())?;
        let mut controller = SessionController::new(prompt_builder);

        let worker = spawn_worker(backend, config);
        controller.attach_worker(worker.link);

        Ok(Self::spawn_inner(controller, worker.events, Some(worker.task)))
    }

    fn spawn_inner(
        controller: SessionController,
        events: mpsc::Receiver<WorkerEvent>,
        worker_task: Option<JoinHandle<()>>,
    ) -> (SessionHandle, JoinHandle<()>) {
        let (intent_tx, intent_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(controller.snapshot());
        let shutdown = CancellationToken::new();
        let span = info_span!("session", id = %controller.session_id());

        let service = Self {
            controller,
            events,
            intents: intent_rx,
            snapshots: snapshot_tx,
            shutdown: shutdown.clone(),
            worker_task,
        };
        let task = tokio::spawn(service.run().instrument(span));

        let handle = SessionHandle {
            intents: intent_tx,
            snapshots: snapshot_rx,
            shutdown,
        };
        (handle, task)
    }

    async fn run(mut self) {
        info!("[SessionService] Dispatcher started");
        let mut events_open = true;

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                request = self.intents.recv() => match request {
                    Some(request) => {
                        let result = self.apply(request.intent);
                        // Publish first so the caller sees the effect of its own intent.
                        self.publish();
                        let _ = request.reply.send(result);
                    }
                    None => break,
                },
                event = self.events.recv(), if events_open => match event {
                    Some(event) => {
                        debug!("[SessionService] Event {}", event.kind());
                        self.controller.handle_event(event);
                        self.publish();
                    }
                    None => {
                        events_open = false;
                        self.controller.handle_worker_lost();
                    }
                },
            }
        }

        let Self {
            controller,
            events,
            worker_task,
            ..
        } = self;
        // Dropping the link and the event receiver stops the worker.
        drop(controller);
        drop(events);
        if let Some(task) = worker_task {
            let _ = task.await;
        }
        info!("[SessionService] Dispatcher stopped");
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.controller.snapshot());
    }

    fn apply(&mut self, intent: UserIntent) -> AppResult<SubmitOutcome> {
        debug!("[SessionService] Intent {:?}", intent);
        match intent {
            UserIntent::Load => self.controller.load().map(|_| SubmitOutcome::Dispatched),
            UserIntent::Submit(text) => self.controller.submit(&text),
            UserIntent::Interrupt => self
                .controller
                .interrupt()
                .map(|_| SubmitOutcome::Dispatched),
            UserIntent::Reset => self.controller.reset().map(|_| SubmitOutcome::Dispatched),
        }
    }
}

/// Cloneable front-end handle to a running session.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    intents: mpsc::UnboundedSender<IntentRequest>,
    snapshots: watch::Receiver<SessionSnapshot>,
    shutdown: CancellationToken,
}

impl SessionHandle {
    /// Send an intent and wait for the controller's verdict.
    pub async fn send(&self, intent: UserIntent) -> AppResult<SubmitOutcome> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.intents
            .send(IntentRequest {
                intent,
                reply: reply_tx,
            })
            .map_err(|_| AppError::internal("session service has stopped"))?;
        reply_rx
            .await
            .map_err(|_| AppError::internal("session service dropped the request"))?
    }

    pub async fn load(&self) -> AppResult<()> {
        self.send(UserIntent::Load).await.map(|_| ())
    }

    pub async fn submit(&self, text: impl Into<String>) -> AppResult<SubmitOutcome> {
        self.send(UserIntent::Submit(text.into())).await
    }

    pub async fn interrupt(&self) -> AppResult<()> {
        self.send(UserIntent::Interrupt).await.map(|_| ())
    }

    pub async fn reset(&self) -> AppResult<()> {
        self.send(UserIntent::Reset).await.map(|_| ())
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver notified on every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    /// Wait until a published snapshot satisfies `predicate`.
    pub async fn wait_for<F>(&self, predicate: F) -> AppResult<SessionSnapshot>
    where
        F: FnMut(&SessionSnapshot) -> bool,
    {
        let mut rx = self.snapshots.clone();
        let snapshot = rx
            .wait_for(predicate)
            .await
            .map_err(|_| AppError::internal("session service has stopped"))?;
        Ok(snapshot.clone())
    }

    /// Stop the dispatcher. The worker goes down with it.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}
