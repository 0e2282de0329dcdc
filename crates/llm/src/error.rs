//! Worker Error Types

/// Errors raised by model backends and the worker runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum LlmError {
    /// The host cannot run this backend at all (failed capability check)
    Unsupported { message: String },
    /// Loading the model artifacts failed
    LoadFailed { message: String },
    /// Generation was requested before the model finished loading
    NotLoaded,
    /// Generation failed part-way
    GenerationFailed { message: String },
    /// Generation stopped because of an interrupt
    Cancelled,
    /// The session side of the link is gone
    ChannelClosed,
    /// Other error
    Other { message: String },
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmError::Unsupported { message } => write!(f, "Unsupported: {}", message),
            LlmError::LoadFailed { message } => write!(f, "Load failed: {}", message),
            LlmError::NotLoaded => write!(f, "Model is not loaded"),
            LlmError::GenerationFailed { message } => {
                write!(f, "Generation failed: {}", message)
            }
            LlmError::Cancelled => write!(f, "Generation cancelled"),
            LlmError::ChannelClosed => write!(f, "Worker event channel closed"),
            LlmError::Other { message } => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for LlmError {}

/// Result type alias for worker operations
pub type LlmResult<T> = Result<T, LlmError>;
