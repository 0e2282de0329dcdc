//! Core Error Types
//!
//! Errors shared by the protocol and the reducers. Kept to thiserror + std so
//! the core crate stays lightweight.

use thiserror::Error;

/// Core error type for the Lumen Chat workspace.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A wire message could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),

    /// JSON serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A reducer was asked to operate on state that breaks its contract,
    /// e.g. a stream update with no open assistant turn
    #[error("Contract violation: {0}")]
    Contract(String),
}

/// Result type alias for core errors
pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a contract violation error
    pub fn contract(msg: impl Into<String>) -> Self {
        Self::Contract(msg.into())
    }

    /// Whether this error means the session state can no longer be trusted.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::Contract(_))
    }
}

/// Convert CoreError to a string
impl From<CoreError> for String {
    fn from(err: CoreError) -> String {
        err.to_string()
    }
}
