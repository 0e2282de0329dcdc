//! Settings Models
//!
//! Application configuration and settings data structures.

use serde::{Deserialize, Serialize};

use lumen_llm::DEFAULT_REASONING_END;

/// Smallest accepted capacity of the inbound event queue.
pub const MIN_EVENT_QUEUE_CAPACITY: usize = 8;

/// Application configuration stored in config.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model identifier handed to the backend
    pub model_id: String,
    /// Capacity of the bounded worker event queue
    #[serde(default = "default_event_queue_capacity")]
    pub event_queue_capacity: usize,
    /// Prompt template; `{{question}}` is replaced by the user's text.
    /// When unset, the text is sent as typed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_template: Option<String>,
    /// Closing marker of the model's reasoning block, if it emits one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_end_marker: Option<String>,
    /// Delay between streamed tokens of the demo backend, in milliseconds
    #[serde(default)]
    pub token_delay_ms: u64,
    /// Default log filter ("error", "warn", "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Enable debug mode
    #[serde(default)]
    pub debug_mode: bool,
}

fn default_event_queue_capacity() -> usize {
    256
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model_id: "echo-reasoner-1b".to_string(),
            event_queue_capacity: default_event_queue_capacity(),
            prompt_template: None,
            reasoning_end_marker: Some(DEFAULT_REASONING_END.to_string()),
            token_delay_ms: 40,
            log_level: default_log_level(),
            debug_mode: false,
        }
    }
}

/// Settings update request (partial update)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SettingsUpdate {
    pub model_id: Option<String>,
    pub event_queue_capacity: Option<usize>,
    pub prompt_template: Option<String>,
    pub reasoning_end_marker: Option<String>,
    pub token_delay_ms: Option<u64>,
    pub log_level: Option<String>,
    pub debug_mode: Option<bool>,
}

impl AppConfig {
    /// Apply a partial update to the configuration
    pub fn apply_update(&mut self, update: SettingsUpdate) {
        if let Some(model_id) = update.model_id {
            self.model_id = model_id;
        }
        if let Some(capacity) = update.event_queue_capacity {
            self.event_queue_capacity = capacity;
        }
        if let Some(template) = update.prompt_template {
            // An empty template switches templating off
            self.prompt_template = Some(template).filter(|t| !t.is_empty());
        }
        if let Some(marker) = update.reasoning_end_marker {
            self.reasoning_end_marker = Some(marker).filter(|m| !m.is_empty());
        }
        if let Some(delay) = update.token_delay_ms {
            self.token_delay_ms = delay;
        }
        if let Some(level) = update.log_level {
            self.log_level = level;
        }
        if let Some(debug) = update.debug_mode {
            self.debug_mode = debug;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.model_id.trim().is_empty() {
            return Err("model_id must not be empty".to_string());
        }

        if self.event_queue_capacity < MIN_EVENT_QUEUE_CAPACITY {
            return Err(format!(
                "event_queue_capacity must be at least {}",
                MIN_EVENT_QUEUE_CAPACITY
            ));
        }

        if let Some(template) = &self.prompt_template {
            if !template.contains("{{") {
                return Err("prompt_template must contain a {{question}} placeholder".to_string());
            }
        }

        if !["error", "warn", "info", "debug", "trace"].contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level: {}. Must be one of error, warn, info, debug, trace",
                self.log_level
            ));
        }

        if self.token_delay_ms > 10_000 {
            return Err("token_delay_ms cannot exceed 10000".to_string());
        }

        Ok(())
    }
}
