//! LLM orchestration service for orch-rs
//!
//! This crate sits between many concurrent analysis callers and one or more
//! interchangeable model providers. It composes:
//!
//! - A content-addressed, TTL-bound response cache
//! - A concurrency governor bounding in-flight provider calls
//! - A cost tracker with one-shot budget alerts
//! - Incremental service metrics
//! - A health state machine (`Initializing → Ready ⇄ Degraded → Error`, plus
//!   terminal `ShuttingDown`)
//! - Per-call failover from the active provider to a configured fallback
//!
//! # Failure contract
//!
//! [`OrchestrationService::analyze`] always returns a structurally valid
//! [`AnalysisReport`]; failures come back as degraded reports.
//! [`OrchestrationService::generate_text`] propagates errors instead. The
//! asymmetry is intentional: report-building callers want a value every time,
//! while low-level callers want the real error.
//!
//! # Example
//!
//! ```rust,ignore
//! use orch_context::MarketSnapshot;
//! use orch_provider::{ProviderConfig, ProviderKind};
//! use orch_service::{OrchestrationService, ServiceConfig};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServiceConfig::builder()
//!         .provider(ProviderConfig::from_env(
//!             ProviderKind::Anthropic,
//!             "claude-sonnet-4-5-20250929",
//!         )?)
//!         .build()?;
//!
//!     let service = OrchestrationService::new(config)?;
//!     service.initialize().await?;
//!
//!     let snapshot = MarketSnapshot::new("AAPL", "1h")
//!         .with_value("close", json!(231.4))
//!         .with_value("volume", json!(2_000_000));
//!     let report = service.analyze(snapshot, "technical", None).await;
//!     println!("{}", report.content);
//!
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod concurrency;
pub mod config;
pub mod cost;
pub mod error;
pub mod health;
pub mod metrics;
pub mod result;
pub mod service;

// Re-export main types
pub use cache::{CacheStats, ResponseCache};
pub use concurrency::{ConcurrencyGovernor, SlotPermit};
pub use config::{BudgetConfig, ServiceConfig, ServiceConfigBuilder};
pub use cost::{CostSnapshot, CostTracker};
pub use error::{Result, ServiceError};
pub use health::{HealthReport, ProviderHealth, ServiceState};
pub use metrics::{MetricsSnapshot, ServiceMetrics};
pub use result::AnalysisReport;
pub use service::OrchestrationService;

// Re-export the subject and provider types callers interact with
pub use orch_context::{MarketSnapshot, WindowConfig};
pub use orch_provider::{GenerationRequest, GenerationResult, ProviderConfig, ProviderKind};
