//! Anthropic Claude adapter
//!
//! Implements [`ModelProvider`] against the Anthropic messages API.
//! See: https://docs.anthropic.com/en/api/messages

use crate::provider::CounterCell;
use crate::{
    GenerationRequest, GenerationResult, ModelProvider, ProviderConfig, ProviderCounters,
    ProviderError, Result, TokenUsage,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, instrument};

const DEFAULT_API_BASE: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Anthropic Claude adapter
pub struct AnthropicProvider {
    client: Client,
    config: ProviderConfig,
    api_base: String,
    counters: CounterCell,
}

impl AnthropicProvider {
    /// Create a new adapter from a validated configuration
    pub fn new(config: ProviderConfig) -> Result<Self> {
        config.validate()?;
        // Per-request deadlines are enforced with tokio::time::timeout, so the
        // client itself carries no global timeout.
        let client = Client::builder().build()?;
        let api_base = config
            .api_base
            .clone()
            .unwrap_or_else(|| DEFAULT_API_BASE.to_string());

        Ok(Self {
            client,
            config,
            api_base,
            counters: CounterCell::default(),
        })
    }

    fn effective_model<'a>(&'a self, request: &'a GenerationRequest) -> &'a str {
        if request.model.is_empty() {
            &self.config.model
        } else {
            &request.model
        }
    }

    async fn send(&self, request: &GenerationRequest, model: &str) -> Result<(String, TokenUsage)> {
        let body = MessagesRequest {
            model,
            max_tokens: request.max_tokens,
            messages: vec![MessageParam {
                role: "user",
                content: &request.prompt,
            }],
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(format!("{}/messages", self.api_base))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            return Err(match status.as_u16() {
                401 | 403 => ProviderError::AuthenticationFailed,
                400 | 422 => ProviderError::InvalidRequest(error_text),
                404 => ProviderError::ModelNotFound(model.to_string()),
                429 => ProviderError::RateLimited(error_text),
                500..=599 => ProviderError::ServerError(format!("HTTP {status}: {error_text}")),
                _ => ProviderError::UnexpectedResponse(format!("HTTP {status}: {error_text}")),
            });
        }

        let parsed: MessagesResponse = response.json().await.map_err(|e| {
            ProviderError::UnexpectedResponse(format!("failed to parse response: {e}"))
        })?;

        let text: String = parsed
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text.as_str())
            .collect();

        Ok((
            text,
            TokenUsage {
                input_tokens: parsed.usage.input_tokens,
                output_tokens: parsed.usage.output_tokens,
            },
        ))
    }
}

#[async_trait]
impl ModelProvider for AnthropicProvider {
    #[instrument(skip(self, request), fields(request_id = %request.request_id))]
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult> {
        self.counters.record_request();
        let model = self.effective_model(request).to_string();
        let started = Instant::now();

        debug!(model = %model, "sending request to Anthropic API");

        let outcome = tokio::time::timeout(request.timeout, self.send(request, &model)).await;
        let (text, usage) = match outcome {
            Err(_) => {
                self.counters.record_failure();
                return Err(ProviderError::Timeout(format!(
                    "no response within {:?}",
                    request.timeout
                )));
            }
            Ok(Err(e)) => {
                self.counters.record_failure();
                return Err(e);
            }
            Ok(Ok(parts)) => parts,
        };

        let latency = started.elapsed();
        debug!(
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            ?latency,
            "received Anthropic response"
        );

        Ok(GenerationResult {
            text,
            provider: self.name().to_string(),
            model,
            usage,
            latency,
            cost: self.config.cost_for(usage),
            request_id: request.request_id,
        })
    }

    async fn health_check(&self) -> bool {
        let probe = self
            .client
            .get(format!("{}/models", self.api_base))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .timeout(HEALTH_CHECK_TIMEOUT)
            .send();

        match probe.await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn counters(&self) -> ProviderCounters {
        self.counters.snapshot()
    }
}

// Wire types matching the Anthropic API format exactly

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: usize,
    messages: Vec<MessageParam<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct MessageParam<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: UsageResponse,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct UsageResponse {
    input_tokens: usize,
    output_tokens: usize,
}
