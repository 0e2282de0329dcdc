//! Data Models
//!
//! Configuration and session-state structures shared by services and the
//! front end.

pub mod session;
pub mod settings;

pub use session::*;
pub use settings::*;
