//! Lumen Chat Core
//!
//! The pieces of the chat session that do not need a runtime: the message
//! protocol spoken with the compute worker, and the two pure reducers that the
//! session controller feeds inbound events into.
//!
//! ## Module Organization
//!
//! - `error` - Core error types (`CoreError`, `CoreResult`)
//! - `protocol` - Worker commands, worker events and transcript messages
//! - `progress` - Per-artifact load progress aggregation
//! - `assembler` - Folding streamed token deltas into the transcript
//!
//! This crate depends only on serde and thiserror so both the worker runtime
//! and the application crate can share it.

pub mod assembler;
pub mod error;
pub mod progress;
pub mod protocol;

// ── Error Types ────────────────────────────────────────────────────────
pub use error::{CoreError, CoreResult};

// ── Protocol ───────────────────────────────────────────────────────────
pub use protocol::{ChatMessage, Phase, Role, WorkerCommand, WorkerEvent};

// ── Reducers ───────────────────────────────────────────────────────────
pub use assembler::{GenerationMetrics, TokenUpdate};
pub use progress::{LoadArtifact, ProgressAggregator};
