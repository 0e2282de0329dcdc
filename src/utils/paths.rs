//! Cross-Platform Path Utilities
//!
//! Resolves the application directory (~/.lumen-chat/) and the files in it.

use std::path::{Path, PathBuf};

use crate::utils::error::{AppError, AppResult};

/// Get the user's home directory
pub fn home_dir() -> AppResult<PathBuf> {
    dirs::home_dir().ok_or_else(|| AppError::config("Could not determine home directory"))
}

/// Get the Lumen Chat directory (~/.lumen-chat/)
pub fn lumen_chat_dir() -> AppResult<PathBuf> {
    Ok(home_dir()?.join(".lumen-chat"))
}

/// Get the config file path (~/.lumen-chat/config.json)
pub fn config_path() -> AppResult<PathBuf> {
    Ok(lumen_chat_dir()?.join("config.json"))
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> AppResult<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

/// Get the Lumen Chat directory, creating if it doesn't exist
pub fn ensure_lumen_chat_dir() -> AppResult<PathBuf> {
    let path = lumen_chat_dir()?;
    ensure_dir(&path)?;
    Ok(path)
}
