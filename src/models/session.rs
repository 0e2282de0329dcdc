//! Session Models
//!
//! Observable state of the chat session, as published to the front end.

use serde::{Deserialize, Serialize};

use lumen_core::{ChatMessage, GenerationMetrics, LoadArtifact};

/// Model lifecycle of a session. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// No load requested yet
    #[default]
    Uninitialized,
    /// Artifacts are being fetched and the model initialized
    Loading,
    /// The model can generate
    Ready,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Uninitialized => write!(f, "uninitialized"),
            SessionStatus::Loading => write!(f, "loading"),
            SessionStatus::Ready => write!(f, "ready"),
        }
    }
}

/// Read-only view of the session, republished after every handled event or
/// intent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub status: SessionStatus,
    /// Loading failure reported by the worker
    pub error: Option<String>,
    /// Latest human-readable loading stage
    pub loading_message: Option<String>,
    pub transcript: Vec<ChatMessage>,
    /// Artifacts still loading, in the order they were first reported
    pub progress: Vec<LoadArtifact>,
    pub last_metrics: Option<GenerationMetrics>,
    pub is_running: bool,
    /// A protocol violation was observed and dropped
    pub degraded: bool,
}

impl SessionSnapshot {
    /// Whether a submission would currently be accepted
    pub fn can_submit(&self) -> bool {
        self.status == SessionStatus::Ready && !self.is_running
    }

    /// Whether a load would currently be accepted
    pub fn can_load(&self) -> bool {
        self.status == SessionStatus::Uninitialized && self.error.is_none()
    }
}

/// Result of a submit intent that was not refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// A generation request went to the worker
    Dispatched,
    /// The input was empty; nothing happened
    Ignored,
}
