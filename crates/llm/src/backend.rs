//! Model Backend Trait
//!
//! Defines the interface the worker runtime drives. A backend owns the model
//! runtime, tokenizer and artifact cache; it reports loading progress and
//! streamed tokens through the sinks handed to it and never talks to the
//! session directly.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use lumen_core::{ChatMessage, WorkerEvent};

use crate::error::{LlmError, LlmResult};
use crate::streamer::TokenStreamer;

/// Trait that all model backends must implement.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Returns the model name for logging and loading messages.
    fn name(&self) -> &str;

    /// Check that the host can run this backend at all.
    ///
    /// Default: always capable.
    async fn check(&self) -> LlmResult<()> {
        Ok(())
    }

    /// Fetch and initialize the model, reporting per-artifact progress.
    async fn load(&mut self, progress: &ProgressReporter) -> LlmResult<()>;

    /// Generate the next assistant turn for `messages`, pushing every decoded
    /// token into `sink`.
    ///
    /// Implementations must stop promptly once `cancel` fires and return
    /// either `Ok(())` or `Err(LlmError::Cancelled)`.
    async fn generate(
        &mut self,
        messages: &[ChatMessage],
        sink: &mut TokenSink,
        cancel: &CancellationToken,
    ) -> LlmResult<()>;

    /// Drop cached conversation state (e.g. the KV cache).
    ///
    /// Default: nothing to drop.
    async fn reset(&mut self) -> LlmResult<()> {
        Ok(())
    }
}

/// Reports loading progress as worker events.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    events: mpsc::Sender<WorkerEvent>,
    /// Model the artifacts belong to
    name: Option<String>,
}

impl ProgressReporter {
    pub fn new(events: mpsc::Sender<WorkerEvent>, name: Option<String>) -> Self {
        Self { events, name }
    }

    /// Human-readable loading stage.
    pub async fn loading(&self, message: impl Into<String>) -> LlmResult<()> {
        self.emit(WorkerEvent::Loading {
            data: message.into(),
        })
        .await
    }

    pub async fn initiate(&self, file: &str, total: u64) -> LlmResult<()> {
        self.emit(WorkerEvent::Initiate {
            file: file.to_string(),
            name: self.name.clone(),
            total,
        })
        .await
    }

    pub async fn progress(&self, file: &str, loaded: u64, total: u64) -> LlmResult<()> {
        self.emit(WorkerEvent::Progress {
            file: file.to_string(),
            name: self.name.clone(),
            loaded,
            total,
        })
        .await
    }

    pub async fn done(&self, file: &str) -> LlmResult<()> {
        self.emit(WorkerEvent::Done {
            file: file.to_string(),
        })
        .await
    }

    async fn emit(&self, event: WorkerEvent) -> LlmResult<()> {
        self.events
            .send(event)
            .await
            .map_err(|_| LlmError::ChannelClosed)
    }
}

/// Receives decoded tokens of the running turn and forwards them as
/// `update` events annotated with throughput and phase.
#[derive(Debug)]
pub struct TokenSink {
    events: mpsc::Sender<WorkerEvent>,
    streamer: TokenStreamer,
}

impl TokenSink {
    pub fn new(events: mpsc::Sender<WorkerEvent>, streamer: TokenStreamer) -> Self {
        Self { events, streamer }
    }

    /// Push the text of one decoded token.
    pub async fn push(&mut self, text: &str) -> LlmResult<()> {
        let sample = self.streamer.observe(text);
        self.events
            .send(WorkerEvent::Update {
                output: text.to_string(),
                tps: sample.tps,
                num_tokens: sample.num_tokens,
                state: sample.phase,
            })
            .await
            .map_err(|_| LlmError::ChannelClosed)
    }

    /// Tokens pushed so far in this turn.
    pub fn num_tokens(&self) -> u64 {
        self.streamer.num_tokens()
    }
}
