//! Lumen Chat LLM
//!
//! The compute worker side of the chat session:
//! - `backend` - the `ModelBackend` trait plus the progress and token sinks
//!   a backend reports through
//! - `streamer` - throughput and reasoning/answering phase tracking
//! - `runtime` - the worker task that speaks the command/event protocol
//! - `echo` - a deterministic backend for demos and tests
//!
//! Numeric inference, tokenization and artifact caching belong to concrete
//! backends; the runtime only sees the trait.

pub mod backend;
pub mod echo;
pub mod error;
pub mod runtime;
pub mod streamer;

// Re-export main types
pub use backend::{ModelBackend, ProgressReporter, TokenSink};
pub use echo::EchoBackend;
pub use error::{LlmError, LlmResult};
pub use runtime::{WorkerChannels, WorkerOptions, WorkerRuntime};
pub use streamer::{TokenStreamer, DEFAULT_REASONING_END};
