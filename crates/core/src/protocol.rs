//! Worker Protocol
//!
//! The vocabulary exchanged with the compute worker. The two sides never share
//! memory: commands flow from the session controller to the worker and events
//! flow back, each as an owned, serializable value.
//!
//! Commands are tagged by `type` (payload under `data`), events by `status`,
//! so the JSON form stays readable when a worker lives out of process.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Author of a transcript turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// One transcript turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    /// Byte offset into `content` where the answering phase begins.
    /// Set at most once, the first time an answering delta arrives.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_offset: Option<usize>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            answer_offset: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            answer_offset: None,
        }
    }

    /// Text produced before the answering phase (empty if no boundary was seen
    /// and the message never entered a reasoning phase).
    pub fn reasoning(&self) -> &str {
        self.answer_offset
            .and_then(|offset| self.content.get(..offset))
            .unwrap_or("")
    }

    /// Text of the answering phase; the whole content when no usable boundary
    /// was recorded.
    pub fn answer(&self) -> &str {
        self.answer_offset
            .and_then(|offset| self.content.get(offset..))
            .unwrap_or(&self.content)
    }
}

/// Phase tag carried by every streamed delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Preliminary reasoning ("thinking") output
    #[serde(alias = "thinking")]
    Reasoning,
    /// Final answer output
    Answering,
}

/// Commands sent from the session controller to the compute worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum WorkerCommand {
    /// Capability check, sent once when the worker link is set up
    Check,
    /// Start loading the model artifacts
    Load,
    /// Generate the next assistant turn for the full transcript
    Generate(Vec<ChatMessage>),
    /// Ask the running generation to stop early
    Interrupt,
    /// Drop any conversation state cached by the worker
    Reset,
}

impl WorkerCommand {
    /// Short name used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            WorkerCommand::Check => "check",
            WorkerCommand::Load => "load",
            WorkerCommand::Generate(_) => "generate",
            WorkerCommand::Interrupt => "interrupt",
            WorkerCommand::Reset => "reset",
        }
    }
}

/// Events emitted by the compute worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WorkerEvent {
    /// Loading has begun; `data` is a human-readable description
    Loading { data: String },

    /// An artifact download started
    Initiate {
        file: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default)]
        total: u64,
    },

    /// Bytes received for an artifact
    Progress {
        file: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        loaded: u64,
        total: u64,
    },

    /// An artifact finished downloading
    Done { file: String },

    /// The model is loaded and accepts generation requests
    Ready,

    /// A generation turn has started
    Start,

    /// A streamed delta of the running turn
    Update {
        output: String,
        #[serde(default)]
        tps: f64,
        #[serde(alias = "numTokens")]
        num_tokens: u64,
        state: Phase,
    },

    /// The running turn has ended, interrupted or not
    Complete,

    /// A worker-side failure, surfaced verbatim
    Error { data: String },
}

impl WorkerEvent {
    /// Short name used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            WorkerEvent::Loading { .. } => "loading",
            WorkerEvent::Initiate { .. } => "initiate",
            WorkerEvent::Progress { .. } => "progress",
            WorkerEvent::Done { .. } => "done",
            WorkerEvent::Ready => "ready",
            WorkerEvent::Start => "start",
            WorkerEvent::Update { .. } => "update",
            WorkerEvent::Complete => "complete",
            WorkerEvent::Error { .. } => "error",
        }
    }

    /// Decode an event from its JSON form. Unknown `status` tags are rejected.
    pub fn decode(json: &str) -> CoreResult<Self> {
        serde_json::from_str(json).map_err(|e| CoreError::parse(format!("worker event: {}", e)))
    }
}
