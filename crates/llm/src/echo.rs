//! Echo Backend
//!
//! Deterministic stand-in for a real model. Loading walks a fixed list of
//! fake artifacts and generation streams the last user message back word by
//! word, optionally preceded by a short `<think>` block.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use lumen_core::{ChatMessage, Role};

use crate::backend::{ModelBackend, ProgressReporter, TokenSink};
use crate::error::{LlmError, LlmResult};

const PROGRESS_STEPS: u64 = 4;

/// Backend that echoes the user's last message.
#[derive(Debug, Clone)]
pub struct EchoBackend {
    model_id: String,
    token_delay: Duration,
    artifacts: Vec<(String, u64)>,
    reasoning: bool,
    capable: bool,
    load_failure: Option<String>,
}

impl EchoBackend {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            token_delay: Duration::ZERO,
            artifacts: vec![
                ("config.json".to_string(), 1_024),
                ("tokenizer.json".to_string(), 16_384),
                ("model.safetensors".to_string(), 262_144),
            ],
            reasoning: false,
            capable: true,
            load_failure: None,
        }
    }

    /// Pause between streamed tokens.
    pub fn with_token_delay(mut self, delay: Duration) -> Self {
        self.token_delay = delay;
        self
    }

    /// Replace the fake artifact list with `(file, size)` pairs.
    pub fn with_artifacts<I, S>(mut self, artifacts: I) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        self.artifacts = artifacts
            .into_iter()
            .map(|(file, size)| (file.into(), size))
            .collect();
        self
    }

    /// Open every answer with a `<think>...</think>` block.
    pub fn with_reasoning(mut self, reasoning: bool) -> Self {
        self.reasoning = reasoning;
        self
    }

    /// Pretend the host lacks (or has) the required accelerator.
    pub fn with_capability(mut self, capable: bool) -> Self {
        self.capable = capable;
        self
    }

    /// Make every load attempt fail with `message`.
    pub fn with_load_failure(mut self, message: impl Into<String>) -> Self {
        self.load_failure = Some(message.into());
        self
    }

    fn tokens_for(&self, messages: &[ChatMessage]) -> Vec<String> {
        let mut tokens = Vec::new();
        if self.reasoning {
            tokens.extend(
                ["<think>", "Echoing", " the", " question", "</think>"]
                    .iter()
                    .map(|t| t.to_string()),
            );
        }

        let question = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        for (i, word) in question.split_whitespace().enumerate() {
            if i == 0 {
                tokens.push(word.to_string());
            } else {
                tokens.push(format!(" {}", word));
            }
        }
        tokens
    }
}

#[async_trait]
impl ModelBackend for EchoBackend {
    fn name(&self) -> &str {
        &self.model_id
    }

    async fn check(&self) -> LlmResult<()> {
        if self.capable {
            Ok(())
        } else {
            Err(LlmError::Unsupported {
                message: "no compatible accelerator found".to_string(),
            })
        }
    }

    async fn load(&mut self, progress: &ProgressReporter) -> LlmResult<()> {
        if let Some(message) = &self.load_failure {
            return Err(LlmError::LoadFailed {
                message: message.clone(),
            });
        }

        for (file, size) in &self.artifacts {
            progress.initiate(file, *size).await?;
            for step in 1..=PROGRESS_STEPS {
                progress
                    .progress(file, size * step / PROGRESS_STEPS, *size)
                    .await?;
            }
            progress.done(file).await?;
        }
        progress.loading("Compiling shaders and warming up model...").await
    }

    async fn generate(
        &mut self,
        messages: &[ChatMessage],
        sink: &mut TokenSink,
        cancel: &CancellationToken,
    ) -> LlmResult<()> {
        for token in self.tokens_for(messages) {
            if cancel.is_cancelled() {
                return Err(LlmError::Cancelled);
            }
            sink.push(&token).await?;
            if !self.token_delay.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(LlmError::Cancelled),
                    _ = tokio::time::sleep(self.token_delay) => {}
                }
            }
        }
        debug!("[Echo] Finished after {} tokens", sink.num_tokens());
        Ok(())
    }
}
