//! Generation Stream Assembly
//!
//! Folds streamed token deltas into the open assistant turn. The functions
//! here operate on the transcript and metrics handed to them and hold no
//! state of their own; the session controller owns both.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::protocol::{ChatMessage, Phase, Role};

/// Throughput sample of the running generation. Always the most recent
/// sample reported by the worker, never an average.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationMetrics {
    pub tokens_per_second: f64,
    pub token_count: u64,
}

impl GenerationMetrics {
    /// Wall-clock seconds implied by the sample, if the rate is known.
    pub fn elapsed_secs(&self) -> Option<f64> {
        if self.tokens_per_second > 0.0 {
            Some(self.token_count as f64 / self.tokens_per_second)
        } else {
            None
        }
    }
}

/// Payload of one `update` event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TokenUpdate<'a> {
    pub output: &'a str,
    pub tps: f64,
    pub num_tokens: u64,
    pub phase: Phase,
}

/// Open the assistant turn for a generation that just started.
///
/// An empty assistant placeholder already at the end of the transcript is
/// reused; after a `user` turn (or on an empty transcript) a new assistant
/// message is appended. Metrics are cleared either way.
pub fn begin_turn(
    transcript: &mut Vec<ChatMessage>,
    metrics: &mut Option<GenerationMetrics>,
) -> CoreResult<()> {
    match transcript.last() {
        Some(last) if last.role == Role::Assistant => {
            if !last.content.is_empty() || last.answer_offset.is_some() {
                return Err(CoreError::contract(
                    "start received while the previous assistant turn has content",
                ));
            }
        }
        _ => transcript.push(ChatMessage::assistant("")),
    }
    *metrics = None;
    Ok(())
}

/// Fold one streamed delta into the last (open) assistant message.
pub fn apply_update(
    transcript: &mut [ChatMessage],
    metrics: &mut Option<GenerationMetrics>,
    update: TokenUpdate<'_>,
) -> CoreResult<()> {
    let open = match transcript.last_mut() {
        Some(msg) if msg.role == Role::Assistant => msg,
        Some(_) => {
            return Err(CoreError::contract(
                "update received while the last turn is not an assistant message",
            ))
        }
        None => return Err(CoreError::contract("update received on an empty transcript")),
    };

    *metrics = Some(GenerationMetrics {
        tokens_per_second: update.tps,
        token_count: update.num_tokens,
    });

    let boundary = open.content.len();
    open.content.push_str(update.output);
    if open.answer_offset.is_none() && update.phase == Phase::Answering {
        open.answer_offset = Some(boundary);
    }
    Ok(())
}
