//! Lumen Chat
//!
//! Session side of a chat client for locally-running language models.
//! It includes:
//! - The session controller state machine and its dispatcher task
//! - The worker link and prompt building
//! - JSON configuration storage
//! - Terminal command parsing for the `lumen-chat` binary
//!
//! The model itself runs in a compute worker from `lumen-llm`; the protocol
//! and the pure reducers live in `lumen-core`.

pub mod commands;
pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

pub use models::session::{SessionSnapshot, SessionStatus, SubmitOutcome};
pub use models::settings::{AppConfig, SettingsUpdate};
pub use services::{SessionController, SessionHandle, SessionService, UserIntent};
pub use storage::ConfigService;
pub use utils::error::{AppError, AppResult};
