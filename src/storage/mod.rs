//! Storage Layer
//!
//! Sessions live in memory only; the JSON config file is the one thing
//! persisted.

pub mod config;

pub use config::*;
