//! Worker Runtime
//!
//! Hosts a `ModelBackend` on its own tokio task and speaks the command/event
//! protocol with the session. Commands arrive on an unbounded channel so the
//! session never blocks on a send; events leave on a bounded channel, in the
//! order they were produced.

use std::collections::VecDeque;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use lumen_core::{ChatMessage, WorkerCommand, WorkerEvent};

use crate::backend::{ModelBackend, ProgressReporter, TokenSink};
use crate::error::{LlmError, LlmResult};
use crate::streamer::TokenStreamer;

/// Default capacity of the event channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Options for spawning a worker.
#[derive(Debug, Clone)]
pub struct WorkerOptions {
    /// Capacity of the bounded event channel
    pub event_capacity: usize,
    /// Closing marker of the model's reasoning block, if it has one
    pub reasoning_end_marker: Option<String>,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            event_capacity: DEFAULT_EVENT_CAPACITY,
            reasoning_end_marker: None,
        }
    }
}

/// Session-side ends of a spawned worker.
#[derive(Debug)]
pub struct WorkerChannels {
    /// Fire-and-forget command sender
    pub commands: mpsc::UnboundedSender<WorkerCommand>,
    /// Ordered event stream
    pub events: mpsc::Receiver<WorkerEvent>,
    /// Task running the worker loop; ends when the command sender is dropped
    /// or the event receiver goes away
    pub handle: JoinHandle<()>,
}

/// Spawns compute workers.
pub struct WorkerRuntime;

impl WorkerRuntime {
    /// Spawn `backend` on a new task. Must be called inside a tokio runtime.
    pub fn spawn<B>(backend: B, options: WorkerOptions) -> WorkerChannels
    where
        B: ModelBackend + 'static,
    {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel(options.event_capacity.max(1));

        let worker = Worker {
            backend,
            commands: command_rx,
            events: event_tx,
            deferred: VecDeque::new(),
            loaded: false,
            reasoning_end_marker: options.reasoning_end_marker,
        };
        let handle = tokio::spawn(worker.run());

        WorkerChannels {
            commands: command_tx,
            events: event_rx,
            handle,
        }
    }
}

struct Worker<B> {
    backend: B,
    commands: mpsc::UnboundedReceiver<WorkerCommand>,
    events: mpsc::Sender<WorkerEvent>,
    /// Commands received mid-generation, replayed once it ends
    deferred: VecDeque<WorkerCommand>,
    loaded: bool,
    reasoning_end_marker: Option<String>,
}

impl<B: ModelBackend> Worker<B> {
    async fn run(mut self) {
        info!("[Worker] Started for backend {}", self.backend.name());
        loop {
            let command = match self.deferred.pop_front() {
                Some(command) => command,
                None => match self.commands.recv().await {
                    Some(command) => command,
                    None => break,
                },
            };
            debug!("[Worker] Handling {} command", command.kind());

            let outcome = match command {
                WorkerCommand::Check => self.check().await,
                WorkerCommand::Load => self.load().await,
                WorkerCommand::Generate(messages) => self.generate(messages).await,
                WorkerCommand::Interrupt => {
                    debug!("[Worker] Interrupt with no generation running, ignoring");
                    Ok(())
                }
                WorkerCommand::Reset => self.reset().await,
            };

            if let Err(LlmError::ChannelClosed) = outcome {
                break;
            }
        }
        info!("[Worker] Stopped");
    }

    async fn emit(&self, event: WorkerEvent) -> LlmResult<()> {
        self.events
            .send(event)
            .await
            .map_err(|_| LlmError::ChannelClosed)
    }

    async fn emit_error(&self, err: &LlmError) -> LlmResult<()> {
        self.emit(WorkerEvent::Error {
            data: err.to_string(),
        })
        .await
    }

    async fn check(&mut self) -> LlmResult<()> {
        if let Err(e) = self.backend.check().await {
            warn!("[Worker] Capability check failed: {}", e);
            self.emit_error(&e).await?;
        }
        Ok(())
    }

    async fn load(&mut self) -> LlmResult<()> {
        if self.loaded {
            debug!("[Worker] Model already loaded");
            return self.emit(WorkerEvent::Ready).await;
        }

        let name = self.backend.name().to_string();
        self.emit(WorkerEvent::Loading {
            data: format!("Loading model {}...", name),
        })
        .await?;

        let reporter = ProgressReporter::new(self.events.clone(), Some(name.clone()));
        match self.backend.load(&reporter).await {
            Ok(()) => {
                self.loaded = true;
                info!("[Worker] Model {} ready", name);
                self.emit(WorkerEvent::Ready).await
            }
            Err(LlmError::ChannelClosed) => Err(LlmError::ChannelClosed),
            Err(e) => {
                warn!("[Worker] Loading {} failed: {}", name, e);
                self.emit_error(&e).await
            }
        }
    }

    async fn generate(&mut self, messages: Vec<ChatMessage>) -> LlmResult<()> {
        self.emit(WorkerEvent::Start).await?;

        let result = if self.loaded {
            self.run_generation(&messages).await
        } else {
            Err(LlmError::NotLoaded)
        };

        match result {
            Ok(()) => {}
            Err(LlmError::Cancelled) => info!("[Worker] Generation interrupted"),
            Err(LlmError::ChannelClosed) => return Err(LlmError::ChannelClosed),
            Err(e) => {
                warn!("[Worker] Generation failed: {}", e);
                self.emit_error(&e).await?;
            }
        }

        // Always close the turn, interrupted or failed.
        self.emit(WorkerEvent::Complete).await
    }

    /// Drive the backend while still listening for commands, so an interrupt
    /// can reach the running generation.
    async fn run_generation(&mut self, messages: &[ChatMessage]) -> LlmResult<()> {
        let cancel = CancellationToken::new();
        let mut sink = TokenSink::new(
            self.events.clone(),
            TokenStreamer::new(self.reasoning_end_marker.clone()),
        );
        let mut commands_open = true;

        let result = {
            let mut generation = self.backend.generate(messages, &mut sink, &cancel);
            loop {
                tokio::select! {
                    result = &mut generation => break result,
                    command = self.commands.recv(), if commands_open => match command {
                        Some(WorkerCommand::Interrupt) => {
                            debug!("[Worker] Interrupt requested");
                            cancel.cancel();
                        }
                        Some(other) => {
                            debug!("[Worker] Deferring {} until generation ends", other.kind());
                            self.deferred.push_back(other);
                        }
                        None => {
                            commands_open = false;
                            cancel.cancel();
                        }
                    },
                }
            }
        };

        debug!("[Worker] Generation produced {} tokens", sink.num_tokens());
        result
    }

    async fn reset(&mut self) -> LlmResult<()> {
        if let Err(e) = self.backend.reset().await {
            warn!("[Worker] Reset failed: {}", e);
            self.emit_error(&e).await?;
        }
        Ok(())
    }
}
