//! Prompt template registry

use crate::{PromptError, PromptTemplate, Result};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Thread-safe registry of named prompt templates
///
/// Registration replaces any template with the same name; lookups hand out
/// shared handles so renders never hold the registry lock.
pub struct PromptRegistry {
    templates: RwLock<HashMap<String, Arc<PromptTemplate>>>,
}

impl PromptRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            templates: RwLock::new(HashMap::new()),
        }
    }

    /// Register a template
    pub fn register(&self, template: PromptTemplate) {
        if let Ok(mut templates) = self.templates.write() {
            templates.insert(template.name().to_string(), Arc::new(template));
        }
    }

    /// Validate and register a template from raw source
    pub fn register_str(&self, name: impl Into<String>, source: impl Into<String>) -> Result<()> {
        let template = PromptTemplate::new(name, source)?;
        self.register(template);
        Ok(())
    }

    /// Get a template by name
    pub fn get(&self, name: &str) -> Option<Arc<PromptTemplate>> {
        self.templates.read().ok()?.get(name).cloned()
    }

    /// Check whether a template is registered
    pub fn contains(&self, name: &str) -> bool {
        self.templates
            .read()
            .map(|t| t.contains_key(name))
            .unwrap_or(false)
    }

    /// Render a registered template with the given variables
    pub fn render(&self, name: &str, vars: &serde_json::Value) -> Result<String> {
        let template = self
            .get(name)
            .ok_or_else(|| PromptError::TemplateNotRegistered(name.to_string()))?;
        template.render(vars)
    }

    /// Names of all registered templates
    pub fn list(&self) -> Vec<String> {
        self.templates
            .read()
            .map(|t| t.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of registered templates
    pub fn len(&self) -> usize {
        self.templates.read().map(|t| t.len()).unwrap_or(0)
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PromptRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PromptRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptRegistry")
            .field("templates", &self.list())
            .finish()
    }
}
