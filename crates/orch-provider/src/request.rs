//! Generation request and result types

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

/// Request for a single text generation
///
/// A plain value type: callers build one per call and nothing is shared.
/// The request carries its own timeout so each adapter can enforce it
/// regardless of client-level settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Fully rendered prompt text
    pub prompt: String,

    /// Target model; empty means "use the adapter's configured model"
    #[serde(default)]
    pub model: String,

    /// Maximum tokens to generate
    pub max_tokens: usize,

    /// Sampling temperature (0.0-1.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Per-request timeout enforced by the adapter
    pub timeout: Duration,

    /// Correlation id carried through logs and results
    pub request_id: Uuid,

    /// Opaque caller metadata (correlation ids, caller names)
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl GenerationRequest {
    /// Create a builder for generation requests
    pub fn builder(prompt: impl Into<String>) -> GenerationRequestBuilder {
        GenerationRequestBuilder::new(prompt)
    }
}

/// Builder for [`GenerationRequest`]
pub struct GenerationRequestBuilder {
    prompt: String,
    model: String,
    max_tokens: usize,
    temperature: Option<f32>,
    timeout: Duration,
    metadata: HashMap<String, String>,
}

impl GenerationRequestBuilder {
    /// Create a new builder
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: String::new(),
            max_tokens: 1024,
            temperature: None,
            timeout: Duration::from_secs(30),
            metadata: HashMap::new(),
        }
    }

    /// Set the target model
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the maximum tokens
    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the per-request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Attach a metadata entry
    pub fn metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Build the request, assigning a fresh correlation id
    pub fn build(self) -> GenerationRequest {
        GenerationRequest {
            prompt: self.prompt,
            model: self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            timeout: self.timeout,
            request_id: Uuid::new_v4(),
            metadata: self.metadata,
        }
    }
}

/// Token usage reported by the backend
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Number of input tokens
    pub input_tokens: usize,

    /// Number of output tokens
    pub output_tokens: usize,
}

impl TokenUsage {
    /// Total tokens used (input + output)
    pub fn total(&self) -> usize {
        self.input_tokens + self.output_tokens
    }
}

/// Successful outcome of a generation call
///
/// Failure is expressed through `Result<GenerationResult, ProviderError>`
/// rather than a success flag, so a value of this type always carries
/// produced text. The result is owned exclusively by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Produced text
    pub text: String,

    /// Adapter that served the request
    pub provider: String,

    /// Model that actually ran
    pub model: String,

    /// Token usage statistics
    pub usage: TokenUsage,

    /// Wall-clock latency of the attempt that succeeded
    pub latency: Duration,

    /// Cost in account currency, computed from usage and configured prices
    pub cost: f64,

    /// Correlation id copied from the request
    pub request_id: Uuid,
}
