//! Error types for prompt operations

use thiserror::Error;

/// Result type for prompt operations
pub type Result<T> = std::result::Result<T, PromptError>;

/// Errors that can occur while managing or rendering prompt templates
#[derive(Error, Debug)]
pub enum PromptError {
    /// No template registered under the requested name
    #[error("template not registered: {0}")]
    TemplateNotRegistered(String),

    /// Template source failed to parse
    #[error("template '{name}' failed to parse: {detail}")]
    ParseFailed { name: String, detail: String },

    /// Rendering failed
    #[error("template '{name}' failed to render: {detail}")]
    RenderFailed { name: String, detail: String },
}
