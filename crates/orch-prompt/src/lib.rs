//! Prompt template management for orch-rs
//!
//! MiniJinja-backed prompt templates with a thread-safe registry. Includes
//! built-in templates for the standard analysis operations; callers may
//! register their own under any name.

pub mod defaults;
pub mod error;
pub mod registry;
pub mod template;

// Re-export main types
pub use defaults::{default_templates, register_defaults};
pub use error::{PromptError, Result};
pub use registry::PromptRegistry;
pub use template::PromptTemplate;
