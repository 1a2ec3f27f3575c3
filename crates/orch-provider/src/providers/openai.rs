//! OpenAI-compatible adapter
//!
//! Implements [`ModelProvider`] against the chat completions API. With an
//! `api_base` override this also covers local OpenAI-compatible servers
//! (LM Studio, vLLM, Ollama's compatibility endpoint).

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

const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// OpenAI chat completions adapter
pub struct OpenAiProvider {
    client: Client,
    config: ProviderConfig,
    api_base: String,
    counters: CounterCell,
}

impl OpenAiProvider {
    /// Create a new adapter from a validated configuration
    pub fn new(config: ProviderConfig) -> Result<Self> {
        config.validate()?;
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
        let body = ChatRequest {
            model,
            messages: vec![ChatMessageParam {
                role: "user",
                content: &request.prompt,
            }],
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(&self.config.api_key)
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

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            ProviderError::UnexpectedResponse(format!("failed to parse response: {e}"))
        })?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| {
                ProviderError::UnexpectedResponse("response contained no choices".to_string())
            })?;

        let usage = parsed.usage.unwrap_or_default();
        Ok((
            text,
            TokenUsage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
            },
        ))
    }
}

#[async_trait]
impl ModelProvider for OpenAiProvider {
    #[instrument(skip(self, request), fields(request_id = %request.request_id))]
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult> {
        self.counters.record_request();
        let model = self.effective_model(request).to_string();
        let started = Instant::now();

        debug!(model = %model, "sending request to chat completions API");

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
            "received chat completions response"
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
            .bearer_auth(&self.config.api_key)
            .timeout(HEALTH_CHECK_TIMEOUT)
            .send();

        match probe.await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    fn name(&self) -> &'static str {
        "openai"
    }

    fn counters(&self) -> ProviderCounters {
        self.counters.snapshot()
    }
}

// Wire types matching the chat completions format exactly

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessageParam<'a>>,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ChatMessageParam<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: String,
}

#[derive(Debug, Deserialize, Default)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: usize,
    #[serde(default)]
    completion_tokens: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_creation() {
        let provider = OpenAiProvider::new(ProviderConfig::openai("test-key", "gpt-4o"));
        assert!(provider.is_ok());
        assert_eq!(provider.unwrap().name(), "openai");
    }

    #[test]
    fn test_rejects_invalid_config() {
        let result = OpenAiProvider::new(ProviderConfig::openai("key", ""));
        assert!(result.is_err());
    }

    #[test]
    fn test_local_endpoint_override() {
        let config = ProviderConfig::openai("lm-studio", "qwen2.5-7b-instruct")
            .with_api_base("http://localhost:1234/v1");
        let provider = OpenAiProvider::new(config).unwrap();
        assert_eq!(provider.api_base, "http://localhost:1234/v1");
    }
}
