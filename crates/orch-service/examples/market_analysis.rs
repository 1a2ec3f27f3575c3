//! End-to-end orchestration example
//!
//! Requires `ANTHROPIC_API_KEY` (and optionally `OPENAI_API_KEY` for the
//! fallback provider):
//!
//! ```bash
//! cargo run --example market_analysis
//! ```

use orch_service::{
    MarketSnapshot, OrchestrationService, ProviderConfig, ProviderKind, ServiceConfig,
};
use serde_json::json;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    orch_utils::init_tracing();

    let mut builder = ServiceConfig::builder().provider(ProviderConfig::from_env(
        ProviderKind::Anthropic,
        "claude-sonnet-4-5-20250929",
    )?);
    if let Ok(fallback) = ProviderConfig::from_env(ProviderKind::OpenAi, "gpt-4o") {
        builder = builder
            .provider(fallback)
            .fallback_provider(ProviderKind::OpenAi);
    }

    let service = Arc::new(OrchestrationService::new(builder.build()?)?);
    service.initialize().await?;
    let monitor = service.clone().spawn_health_monitor();

    // Feed the context window a couple of observations, then analyze.
    let earlier = MarketSnapshot::new("AAPL", "1d")
        .with_value("close", json!(229.8))
        .with_value("volume", json!(48_000_000));
    service
        .analyze(earlier, "technical", Some("previous session close".to_string()))
        .await;

    let snapshot = MarketSnapshot::new("AAPL", "1h")
        .with_value("close", json!(231.4))
        .with_value("volume", json!(2_000_000))
        .with_value("rsi_14", json!(58.3));
    let report = service.analyze(snapshot, "comprehensive", None).await;

    if report.success {
        println!("--- {} ({}) ---", report.symbol, report.operation);
        println!("{}", report.content);
        println!(
            "provider={} cost=${:.4} latency={}ms cached={}",
            report.provider.as_deref().unwrap_or("-"),
            report.cost,
            report.latency_ms,
            report.cached
        );
    } else {
        eprintln!("analysis degraded: {}", report.error.as_deref().unwrap_or("-"));
    }

    let health = service.health_check().await;
    println!("service status: {}", health.status);
    println!("metrics: {:?}", service.metrics());

    service.shutdown().await;
    monitor.abort();
    Ok(())
}
