//! MiniJinja-based prompt template

use crate::{PromptError, Result};
use minijinja::Environment;

/// A named prompt template backed by MiniJinja
///
/// The source is validated at construction, so a stored template always
/// renders (given serializable variables). Standard Jinja2 syntax applies:
/// `{{ variable }}`, `{% if %}`, `{% for %}` and filters.
pub struct PromptTemplate {
    name: String,
    source: String,
}

impl PromptTemplate {
    /// Create a template, validating the source parses
    ///
    /// Validation is syntax-only: variables are unknown until render time, so
    /// a template applying filters to them must not be rejected here.
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let source = source.into();

        let env = environment();
        env.template_from_str(&source)
            .map_err(|e| PromptError::ParseFailed {
                name: name.clone(),
                detail: e.to_string(),
            })?;

        Ok(Self { name, source })
    }

    /// Template name/identifier
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw template source (for debugging/inspection)
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Render the template with the given variables
    pub fn render(&self, vars: &serde_json::Value) -> Result<String> {
        let env = environment();
        let value = minijinja::value::Value::from_serialize(vars);

        env.render_str(&self.source, value)
            .map_err(|e| PromptError::RenderFailed {
                name: self.name.clone(),
                detail: e.to_string(),
            })
    }
}

// A fresh environment per operation avoids lifetime coupling between the
// environment and stored sources.
fn environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.add_filter("upper", |s: String| s.to_uppercase());
    env.add_filter("lower", |s: String| s.to_lowercase());
    env.add_filter("trim", |s: String| s.trim().to_string());
    env
}

impl std::fmt::Debug for PromptTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptTemplate")
            .field("name", &self.name)
            .field("source_len", &self.source.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_simple_render() {
        let template = PromptTemplate::new("test", "Analyze {{ symbol }}").unwrap();
        let result = template.render(&json!({ "symbol": "AAPL" })).unwrap();
        assert_eq!(result, "Analyze AAPL");
    }

    #[test]
    fn test_invalid_source_rejected() {
        let result = PromptTemplate::new("test", "{{ unclosed");
        assert!(result.is_err());
    }

    #[test]
    fn test_filters() {
        let template = PromptTemplate::new("test", "{{ symbol | upper }}").unwrap();
        let result = template.render(&json!({ "symbol": "aapl" })).unwrap();
        assert_eq!(result, "AAPL");
    }

    #[test]
    fn test_conditional() {
        let template = PromptTemplate::new(
            "test",
            "{% if context %}Context:\n{{ context }}{% else %}No context available.{% endif %}",
        )
        .unwrap();

        let with = template.render(&json!({ "context": "recent data" })).unwrap();
        assert!(with.contains("recent data"));

        let without = template.render(&json!({ "context": "" })).unwrap();
        assert_eq!(without, "No context available.");
    }

    #[test]
    fn test_missing_variable_renders_empty() {
        let template = PromptTemplate::new("test", "value: {{ absent }}").unwrap();
        let result = template.render(&json!({})).unwrap();
        assert_eq!(result, "value: ");
    }
}
