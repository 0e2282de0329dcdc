//! Services
//!
//! Session logic: the controller state machine, the dispatcher task that
//! drives it, the worker link, and prompt building.

pub mod dispatcher;
pub mod prompt;
pub mod session;
pub mod worker_link;

pub use dispatcher::{SessionHandle, SessionService, UserIntent};
pub use prompt::{PassthroughPromptBuilder, PromptBuilder, TemplatePromptBuilder};
pub use session::SessionController;
pub use worker_link::{spawn_worker, SpawnedWorker, WorkerLink};
