//! Provider configuration

use crate::error::{ProviderError, Result};
use crate::request::TokenUsage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Backend a [`ProviderConfig`] points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Anthropic messages API
    Anthropic,
    /// OpenAI chat completions API (also covers compatible local servers)
    OpenAi,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Anthropic => write!(f, "anthropic"),
            ProviderKind::OpenAi => write!(f, "openai"),
        }
    }
}

/// Configuration for one model backend
///
/// Resolved once at startup and immutable afterwards. [`ProviderConfig::validate`]
/// fails fast on missing required fields instead of letting a half-configured
/// adapter fail on first use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Which backend this configures
    pub kind: ProviderKind,

    /// Model identifier used when a request does not name one
    pub model: String,

    /// API key
    pub api_key: String,

    /// Override for the API base URL; adapter default when `None`
    pub api_base: Option<String>,

    /// Default maximum tokens per generation
    pub max_tokens: usize,

    /// Default per-request timeout
    pub timeout: Duration,

    /// Maximum attempts for transient failures
    pub max_retries: u32,

    /// Base delay for exponential backoff between attempts
    pub retry_delay: Duration,

    /// Price per 1k input tokens
    pub input_cost_per_1k: f64,

    /// Price per 1k output tokens
    pub output_cost_per_1k: f64,
}

impl ProviderConfig {
    /// Configuration for an Anthropic backend with default limits and pricing
    pub fn anthropic(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            kind: ProviderKind::Anthropic,
            model: model.into(),
            api_key: api_key.into(),
            api_base: None,
            max_tokens: 1024,
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            input_cost_per_1k: 0.003,
            output_cost_per_1k: 0.015,
        }
    }

    /// Configuration for an OpenAI-compatible backend with default limits and pricing
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            kind: ProviderKind::OpenAi,
            model: model.into(),
            api_key: api_key.into(),
            api_base: None,
            max_tokens: 1024,
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            input_cost_per_1k: 0.0025,
            output_cost_per_1k: 0.01,
        }
    }

    /// Read the API key for `kind` from the conventional environment variable
    /// (`ANTHROPIC_API_KEY` / `OPENAI_API_KEY`).
    pub fn from_env(kind: ProviderKind, model: impl Into<String>) -> Result<Self> {
        let var = match kind {
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
            ProviderKind::OpenAi => "OPENAI_API_KEY",
        };
        let api_key = std::env::var(var).map_err(|_| {
            ProviderError::Configuration(format!("{var} environment variable not set"))
        })?;
        Ok(match kind {
            ProviderKind::Anthropic => Self::anthropic(api_key, model),
            ProviderKind::OpenAi => Self::openai(api_key, model),
        })
    }

    /// Set the API base URL
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = Some(base.into());
        self
    }

    /// Set the default per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry count and base backoff delay
    pub fn with_retries(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }

    /// Set the default maximum tokens
    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set per-1k-token pricing
    pub fn with_pricing(mut self, input_per_1k: f64, output_per_1k: f64) -> Self {
        self.input_cost_per_1k = input_per_1k;
        self.output_cost_per_1k = output_per_1k;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(ProviderError::Configuration(format!(
                "{} provider requires a model name",
                self.kind
            )));
        }
        if self.api_key.trim().is_empty() {
            return Err(ProviderError::Configuration(format!(
                "{} provider requires an API key",
                self.kind
            )));
        }
        if self.max_retries == 0 {
            return Err(ProviderError::Configuration(
                "max_retries must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Cost of a completed generation given its reported token usage
    pub fn cost_for(&self, usage: TokenUsage) -> f64 {
        (usage.input_tokens as f64 / 1000.0) * self.input_cost_per_1k
            + (usage.output_tokens as f64 / 1000.0) * self.output_cost_per_1k
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anthropic_defaults() {
        let config = ProviderConfig::anthropic("key", "claude-sonnet-4-5-20250929");
        assert_eq!(config.kind, ProviderKind::Anthropic);
        assert_eq!(config.max_retries, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_empty_key() {
        let config = ProviderConfig::anthropic("", "model");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_empty_model() {
        let config = ProviderConfig::openai("key", "  ");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_retries() {
        let config = ProviderConfig::openai("key", "gpt-4o").with_retries(0, Duration::from_secs(1));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cost_for_usage() {
        let config = ProviderConfig::anthropic("key", "m").with_pricing(0.003, 0.015);
        let usage = TokenUsage {
            input_tokens: 1000,
            output_tokens: 2000,
        };
        let cost = config.cost_for(usage);
        assert!((cost - 0.033).abs() < 1e-9);
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(ProviderKind::Anthropic.to_string(), "anthropic");
        assert_eq!(ProviderKind::OpenAi.to_string(), "openai");
    }
}
