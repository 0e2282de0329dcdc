//! Token Streamer
//!
//! Per-turn bookkeeping for streamed output: token count, throughput, and
//! which phase the model is in. Reasoning models wrap their preliminary output
//! in a `<think>`-style block; everything after the closing marker is the
//! answer. Models without such a block answer from the first token.

use tokio::time::Instant;

use lumen_core::Phase;

/// Default closing marker of a reasoning block.
pub const DEFAULT_REASONING_END: &str = "</think>";

/// Sample produced for each streamed delta.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamSample {
    /// Phase the delta belongs to
    pub phase: Phase,
    /// Tokens emitted so far in this turn, including this one
    pub num_tokens: u64,
    /// Tokens per second since the first token (0.0 until a second token)
    pub tps: f64,
}

/// Tracks throughput and phase for one generation turn.
#[derive(Debug, Clone)]
pub struct TokenStreamer {
    /// Closing marker of the reasoning block, if the model has one
    end_marker: Option<String>,
    phase: Phase,
    /// Trailing text kept to catch a marker split across deltas
    window: String,
    started: Option<Instant>,
    num_tokens: u64,
}

impl TokenStreamer {
    pub fn new(end_marker: Option<String>) -> Self {
        let phase = if end_marker.is_some() {
            Phase::Reasoning
        } else {
            Phase::Answering
        };
        Self {
            end_marker,
            phase,
            window: String::new(),
            started: None,
            num_tokens: 0,
        }
    }

    /// Record one token's text and return the sample to report with it.
    ///
    /// The delta that contains the closing marker still belongs to the
    /// reasoning phase; the answer starts with the next delta.
    pub fn observe(&mut self, text: &str) -> StreamSample {
        let phase = self.phase;
        self.track_marker(text);

        self.num_tokens += 1;
        let tps = match self.started {
            None => {
                self.started = Some(Instant::now());
                0.0
            }
            Some(start) => {
                let elapsed = start.elapsed().as_secs_f64();
                if elapsed > 0.0 {
                    self.num_tokens as f64 / elapsed
                } else {
                    0.0
                }
            }
        };

        StreamSample {
            phase,
            num_tokens: self.num_tokens,
            tps,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn num_tokens(&self) -> u64 {
        self.num_tokens
    }

    fn track_marker(&mut self, text: &str) {
        if self.phase == Phase::Answering {
            return;
        }
        let Some(marker) = self.end_marker.as_deref() else {
            return;
        };

        self.window.push_str(text);
        if self.window.contains(marker) {
            self.phase = Phase::Answering;
            self.window.clear();
            return;
        }

        // Keep only as much tail as a split marker could need.
        let keep = marker.len().saturating_sub(1);
        if self.window.len() > keep {
            let mut cut = self.window.len() - keep;
            while !self.window.is_char_boundary(cut) {
                cut += 1;
            }
            self.window.drain(..cut);
        }
    }
}
