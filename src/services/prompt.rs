//! Prompt Building
//!
//! Turns the text a user typed into the content of the `user` turn sent to
//! the model. Builders are pure: the same prior transcript and text always
//! give the same prompt.

use regex::{NoExpand, Regex};

use lumen_core::ChatMessage;

use crate::utils::error::{AppError, AppResult};

const PLACEHOLDER_PATTERN: &str = r"\{\{\s*(\w+)\s*\}\}";
const QUESTION_VARIABLE: &str = "question";

/// Builds the user-turn content from the typed text.
pub trait PromptBuilder: Send + Sync {
    fn build(&self, prior: &[ChatMessage], text: &str) -> String;
}

/// Sends the text exactly as typed.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughPromptBuilder;

impl PromptBuilder for PassthroughPromptBuilder {
    fn build(&self, _prior: &[ChatMessage], text: &str) -> String {
        text.to_string()
    }
}

/// Wraps the text in a fixed template with a `{{question}}` placeholder.
#[derive(Debug, Clone)]
pub struct TemplatePromptBuilder {
    template: String,
    placeholder: Regex,
}

impl TemplatePromptBuilder {
    /// Compile a template. Fails if it has no `{{question}}` placeholder or
    /// uses any other variable.
    pub fn new(template: impl Into<String>) -> AppResult<Self> {
        let template = template.into();
        let placeholder = Regex::new(PLACEHOLDER_PATTERN)
            .map_err(|e| AppError::internal(format!("Invalid placeholder pattern: {}", e)))?;

        let variables = extract_variables(&placeholder, &template);
        if let Some(unknown) = variables.iter().find(|v| v.as_str() != QUESTION_VARIABLE) {
            return Err(AppError::validation(format!(
                "Unknown prompt template variable: {{{{{}}}}}",
                unknown
            )));
        }
        if variables.is_empty() {
            return Err(AppError::validation(
                "Prompt template must contain a {{question}} placeholder",
            ));
        }

        Ok(Self {
            template,
            placeholder,
        })
    }

    pub fn template(&self) -> &str {
        &self.template
    }
}

impl PromptBuilder for TemplatePromptBuilder {
    fn build(&self, _prior: &[ChatMessage], text: &str) -> String {
        self.placeholder
            .replace_all(&self.template, NoExpand(text))
            .into_owned()
    }
}

/// Pick the builder for an optional configured template.
pub fn builder_for(template: Option<&str>) -> AppResult<Box<dyn PromptBuilder>> {
    match template {
        Some(template) => Ok(Box::new(TemplatePromptBuilder::new(template)?)),
        None => Ok(Box::new(PassthroughPromptBuilder)),
    }
}

/// Placeholder names in order of first appearance
fn extract_variables(placeholder: &Regex, content: &str) -> Vec<String> {
    let mut vars: Vec<String> = Vec::new();
    for caps in placeholder.captures_iter(content) {
        let name = caps[1].to_string();
        if !vars.contains(&name) {
            vars.push(name);
        }
    }
    vars
}
