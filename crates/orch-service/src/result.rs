//! Analysis report types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of one `analyze` call
///
/// Always structurally valid: when every provider is exhausted the service
/// returns a degraded report (`success == false`, `error` populated) instead
/// of raising, so downstream consumers only ever inspect the flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Analyzed instrument
    pub symbol: String,

    /// Operation (template name) that produced the report
    pub operation: String,

    /// Model output, empty when degraded
    pub content: String,

    /// Whether model output was obtained
    pub success: bool,

    /// True when this report stands in for a failed generation
    pub degraded: bool,

    /// Whether the report was served from the response cache
    pub cached: bool,

    /// Adapter that served the request, when one did
    pub provider: Option<String>,

    /// Model that ran, when one did
    pub model: Option<String>,

    /// Failure explanation for degraded reports
    pub error: Option<String>,

    /// End-to-end latency of the call that produced this report
    pub latency_ms: u64,

    /// Cost of the generation (0 for cache hits and degraded reports)
    pub cost: f64,

    /// When the report was produced
    pub timestamp: DateTime<Utc>,

    /// Correlation id
    pub request_id: Uuid,
}

impl AnalysisReport {
    /// Report for a completed generation
    pub fn completed(
        symbol: impl Into<String>,
        operation: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            operation: operation.into(),
            content: content.into(),
            success: true,
            degraded: false,
            cached: false,
            provider: None,
            model: None,
            error: None,
            latency_ms: 0,
            cost: 0.0,
            timestamp: Utc::now(),
            request_id: Uuid::new_v4(),
        }
    }

    /// Structurally valid stand-in carrying an error explanation
    pub fn degraded(
        symbol: impl Into<String>,
        operation: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            operation: operation.into(),
            content: String::new(),
            success: false,
            degraded: true,
            cached: false,
            provider: None,
            model: None,
            error: Some(error.into()),
            latency_ms: 0,
            cost: 0.0,
            timestamp: Utc::now(),
            request_id: Uuid::new_v4(),
        }
    }

    /// Set the serving provider and model
    pub fn with_provider(mut self, provider: impl Into<String>, model: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self.model = Some(model.into());
        self
    }

    /// Set the observed latency
    pub fn with_latency_ms(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// Set the generation cost
    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completed_report() {
        let report = AnalysisReport::completed("AAPL", "technical", "uptrend intact")
            .with_provider("anthropic", "claude-sonnet-4-5")
            .with_cost(0.004);

        assert!(report.success);
        assert!(!report.degraded);
        assert!(report.error.is_none());
        assert_eq!(report.provider.as_deref(), Some("anthropic"));
    }

    #[test]
    fn test_degraded_report_is_structurally_valid() {
        let report = AnalysisReport::degraded("AAPL", "technical", "all providers exhausted");

        assert!(!report.success);
        assert!(report.degraded);
        assert!(report.content.is_empty());
        assert_eq!(report.error.as_deref(), Some("all providers exhausted"));
        // Still serializes like any other report
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"degraded\":true"));
    }
}
