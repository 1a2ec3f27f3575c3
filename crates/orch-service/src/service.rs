//! Orchestration service
//!
//! Composes the response cache, context window, concurrency governor, cost
//! tracker and provider adapters behind two inbound calls with deliberately
//! different failure contracts:
//!
//! - [`OrchestrationService::analyze`] **never fails**: when every provider
//!   is exhausted it returns a degraded [`AnalysisReport`] carrying the error
//!   explanation, so report-building collaborators never need error handling
//!   beyond the `success` flag.
//! - [`OrchestrationService::generate_text`] **propagates** provider errors
//!   to the caller.
//!
//! Keep that asymmetry in mind when adding new entry points.

use crate::cache::ResponseCache;
use crate::concurrency::ConcurrencyGovernor;
use crate::config::ServiceConfig;
use crate::cost::CostTracker;
use crate::error::{Result, ServiceError};
use crate::health::{HealthReport, ProviderHealth, ServiceState};
use crate::metrics::{MetricsSnapshot, ServiceMetrics};
use crate::result::AnalysisReport;
use orch_context::{ContextWindowManager, MarketSnapshot};
use orch_prompt::PromptRegistry;
use orch_provider::{
    GenerationRequest, GenerationResult, ModelProvider, ProviderKind, RetryPolicy,
};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// LLM orchestration service
///
/// Each instance owns its cache, context window, metrics and cost state;
/// multiple independent instances can coexist in one process.
pub struct OrchestrationService {
    config: ServiceConfig,
    providers: HashMap<ProviderKind, Arc<dyn ModelProvider>>,
    active: RwLock<ProviderKind>,
    state: RwLock<ServiceState>,
    window: ContextWindowManager,
    prompts: PromptRegistry,
    cache: ResponseCache<AnalysisReport>,
    governor: ConcurrencyGovernor,
    cost: CostTracker,
    metrics: ServiceMetrics,
}

impl OrchestrationService {
    /// Create a service, building adapters from the configured providers
    pub fn new(config: ServiceConfig) -> Result<Self> {
        config.validate()?;
        let mut providers: HashMap<ProviderKind, Arc<dyn ModelProvider>> = HashMap::new();
        for provider_config in &config.providers {
            providers.insert(
                provider_config.kind,
                orch_provider::providers::from_config(provider_config)?,
            );
        }
        Self::assemble(config, providers)
    }

    /// Create a service with caller-supplied adapters
    ///
    /// Every configured provider kind must have a matching adapter. Used for
    /// custom backends and tests.
    pub fn with_providers(
        config: ServiceConfig,
        providers: Vec<(ProviderKind, Arc<dyn ModelProvider>)>,
    ) -> Result<Self> {
        config.validate()?;
        Self::assemble(config, providers.into_iter().collect())
    }

    fn assemble(
        config: ServiceConfig,
        providers: HashMap<ProviderKind, Arc<dyn ModelProvider>>,
    ) -> Result<Self> {
        for provider_config in &config.providers {
            if !providers.contains_key(&provider_config.kind) {
                return Err(ServiceError::Configuration(format!(
                    "no adapter supplied for configured provider {}",
                    provider_config.kind
                )));
            }
        }

        let prompts = PromptRegistry::new();
        orch_prompt::register_defaults(&prompts)?;

        Ok(Self {
            window: ContextWindowManager::new(config.window.clone()),
            prompts,
            cache: ResponseCache::new(config.cache_max_entries, config.cache_ttl),
            governor: ConcurrencyGovernor::new(config.max_concurrent_requests),
            cost: CostTracker::new(config.budget.clone()),
            metrics: ServiceMetrics::new(),
            active: RwLock::new(config.active_provider),
            state: RwLock::new(ServiceState::Initializing),
            providers,
            config,
        })
    }

    /// Run the startup health sweep
    ///
    /// Zero healthy providers is a fatal startup error; the service enters
    /// `Error` and the caller gets [`ServiceError::NoHealthyProvider`]. With
    /// every provider healthy the service is `Ready`, otherwise `Degraded`.
    pub async fn initialize(&self) -> Result<()> {
        info!(
            providers = self.providers.len(),
            active = %self.active_provider(),
            "initializing orchestration service"
        );

        let health = self.probe_providers().await;
        let healthy = health.iter().filter(|p| p.healthy).count();

        if healthy == 0 {
            self.set_state(ServiceState::Error);
            return Err(ServiceError::NoHealthyProvider);
        }
        if healthy == health.len() {
            self.set_state(ServiceState::Ready);
        } else {
            warn!(
                healthy,
                total = health.len(),
                "starting degraded: some providers failed their health check"
            );
            self.set_state(ServiceState::Degraded);
        }
        Ok(())
    }

    /// Re-derive the service state from current provider health
    ///
    /// None healthy maps to `Error`, all healthy to `Ready`, anything in
    /// between to `Degraded`. A shutting-down service stays shutting down.
    pub async fn refresh_health(&self) -> ServiceState {
        if self.state() == ServiceState::ShuttingDown {
            return ServiceState::ShuttingDown;
        }

        let health = self.probe_providers().await;
        let healthy = health.iter().filter(|p| p.healthy).count();
        let new_state = if healthy == 0 {
            ServiceState::Error
        } else if healthy == health.len() {
            ServiceState::Ready
        } else {
            ServiceState::Degraded
        };

        if new_state != self.state() {
            info!(from = %self.state(), to = %new_state, "service state transition");
        }
        self.set_state(new_state);
        new_state
    }

    /// Periodically refresh health in a background task
    ///
    /// The task holds only a weak handle and exits once the service is
    /// dropped or shutting down.
    pub fn spawn_health_monitor(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        let weak = Arc::downgrade(&self);
        let interval = self.config.health_check_interval;
        drop(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(service) = weak.upgrade() else { break };
                if service.state() == ServiceState::ShuttingDown {
                    break;
                }
                service.refresh_health().await;
            }
        })
    }

    /// Analyze a market snapshot with the named prompt template
    ///
    /// Always returns a structurally valid report; on any failure the report
    /// is degraded (`success == false`) with the explanation in `error`.
    pub async fn analyze(
        &self,
        snapshot: MarketSnapshot,
        template_name: &str,
        extra_context: Option<String>,
    ) -> AnalysisReport {
        let started = Instant::now();
        self.metrics.record_request();

        let symbol = snapshot.symbol.clone();
        let timeframe = snapshot.timeframe.clone();
        let subject = snapshot.identity();

        if self.state() == ServiceState::ShuttingDown {
            self.metrics.record_failure();
            return AnalysisReport::degraded(symbol, template_name, "service is shutting down");
        }

        let observation = snapshot.format_line();
        self.window.update(snapshot, extra_context).await;
        let context = self
            .window
            .optimized_context(self.config.window.target_tokens)
            .await;

        let vars = serde_json::json!({
            "symbol": symbol,
            "timeframe": timeframe,
            "observation": observation,
            "context": context,
        });
        let prompt = match self.prompts.render(template_name, &vars) {
            Ok(prompt) => prompt,
            Err(e) => {
                self.metrics.record_failure();
                return AnalysisReport::degraded(symbol, template_name, e.to_string());
            }
        };

        // The prompt embeds the context string, so any window change is
        // already part of the key. Concurrent misses for the same key may
        // both reach the provider; results for identical prompts are
        // idempotent, so the duplicate call is accepted rather than deduped.
        let key = ResponseCache::<AnalysisReport>::cache_key(template_name, &subject, &prompt);
        if let Some(mut report) = self.cache.get(&key).await {
            debug!(symbol = %symbol, operation = template_name, "cache hit");
            self.metrics.record_cache_hit();
            self.metrics.record_success();
            self.metrics.record_latency(started.elapsed());
            report.cached = true;
            return report;
        }
        self.metrics.record_cache_miss();

        if self.cost.is_exhausted() {
            self.metrics.record_failure();
            return AnalysisReport::degraded(
                symbol,
                template_name,
                "budget exhausted and hard cap enforced",
            );
        }

        let _permit = match self.governor.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                self.metrics.record_failure();
                return AnalysisReport::degraded(symbol, template_name, e.to_string());
            }
        };

        match self.generate_with_failover(&prompt, template_name).await {
            Ok(result) => {
                self.cost.record(result.cost);
                self.metrics.record_success();
                self.metrics.record_latency(started.elapsed());

                let report = AnalysisReport::completed(&symbol, template_name, result.text)
                    .with_provider(result.provider, result.model)
                    .with_latency_ms(started.elapsed().as_millis() as u64)
                    .with_cost(result.cost);
                self.cache.put(key, report.clone()).await;
                report
            }
            Err(e) => {
                self.metrics.record_failure();
                self.metrics.record_latency(started.elapsed());
                warn!(symbol = %symbol, operation = template_name, error = %e, "analysis degraded");
                AnalysisReport::degraded(symbol, template_name, e.to_string())
                    .with_latency_ms(started.elapsed().as_millis() as u64)
            }
        }
    }

    /// Generate raw text against the active provider
    ///
    /// Unlike [`OrchestrationService::analyze`], provider failure propagates
    /// to the caller. No caching, no failover.
    pub async fn generate_text(&self, prompt: impl Into<String>) -> Result<String> {
        let active = self.active_provider();
        let provider_config = self
            .config
            .provider_config(active)
            .ok_or(ServiceError::UnknownProvider(active))?;

        let request = GenerationRequest::builder(prompt)
            .max_tokens(provider_config.max_tokens)
            .timeout(provider_config.timeout)
            .build();
        self.generate_text_with(request).await.map(|r| r.text)
    }

    /// Generate with full control over the request parameters
    pub async fn generate_text_with(&self, request: GenerationRequest) -> Result<GenerationResult> {
        self.metrics.record_request();

        if self.state() == ServiceState::ShuttingDown {
            self.metrics.record_failure();
            return Err(ServiceError::ShuttingDown);
        }
        if self.cost.is_exhausted() {
            self.metrics.record_failure();
            return Err(ServiceError::BudgetExhausted(
                "hard cap enforced".to_string(),
            ));
        }

        let started = Instant::now();
        let _permit = match self.governor.acquire().await {
            Ok(permit) => permit,
            Err(e) => {
                self.metrics.record_failure();
                return Err(e);
            }
        };

        let outcome = self.attempt_provider(self.active_provider(), &request).await;
        match outcome {
            Ok(result) => {
                self.cost.record(result.cost);
                self.metrics.record_success();
                self.metrics.record_latency(started.elapsed());
                Ok(result)
            }
            Err(e) => {
                self.metrics.record_failure();
                self.metrics.record_latency(started.elapsed());
                Err(e)
            }
        }
    }

    /// Generate with retry, failing over once to the configured fallback
    ///
    /// The fallback is selected for this call only; the shared active
    /// provider is never mutated here, so the original selection is in place
    /// after the call regardless of the fallback's outcome.
    async fn generate_with_failover(
        &self,
        prompt: &str,
        operation: &str,
    ) -> Result<GenerationResult> {
        let active = self.active_provider();
        let request = self.build_request(active, prompt, operation)?;

        let primary_err = match self.attempt_provider(active, &request).await {
            Ok(result) => return Ok(result),
            Err(e) => e,
        };

        let Some(fallback) = self.config.fallback_provider.filter(|f| *f != active) else {
            return Err(ServiceError::Exhausted(format!("{active}: {primary_err}")));
        };

        warn!(
            active = %active,
            fallback = %fallback,
            error = %primary_err,
            "active provider exhausted, failing over for this call"
        );

        let fallback_request = self.build_request(fallback, prompt, operation)?;
        match self.attempt_provider(fallback, &fallback_request).await {
            Ok(result) => Ok(result),
            Err(fallback_err) => Err(ServiceError::Exhausted(format!(
                "{active}: {primary_err}; {fallback}: {fallback_err}"
            ))),
        }
    }

    fn build_request(
        &self,
        kind: ProviderKind,
        prompt: &str,
        operation: &str,
    ) -> Result<GenerationRequest> {
        let provider_config = self
            .config
            .provider_config(kind)
            .ok_or(ServiceError::UnknownProvider(kind))?;
        Ok(GenerationRequest::builder(prompt)
            .max_tokens(provider_config.max_tokens)
            .timeout(provider_config.timeout)
            .metadata("operation", operation)
            .build())
    }

    /// Run one provider's generate under its configured retry policy
    async fn attempt_provider(
        &self,
        kind: ProviderKind,
        request: &GenerationRequest,
    ) -> Result<GenerationResult> {
        let provider = self
            .providers
            .get(&kind)
            .ok_or(ServiceError::UnknownProvider(kind))?
            .clone();
        let provider_config = self
            .config
            .provider_config(kind)
            .ok_or(ServiceError::UnknownProvider(kind))?;

        let policy = RetryPolicy::new(
            provider_config.max_retries,
            provider_config.retry_delay,
            MAX_BACKOFF,
        );
        policy
            .execute(provider.name(), || provider.generate(request))
            .await
            .map_err(ServiceError::from)
    }

    /// Switch the active provider after a successful health check
    ///
    /// An unhealthy or unconfigured target is rejected and the current
    /// provider stays active.
    pub async fn switch_provider(&self, kind: ProviderKind) -> Result<()> {
        let provider = self
            .providers
            .get(&kind)
            .ok_or(ServiceError::UnknownProvider(kind))?;

        if !provider.health_check().await {
            warn!(target = %kind, "rejecting provider switch: target unhealthy");
            return Err(ServiceError::UnhealthyTarget(kind));
        }

        if let Ok(mut active) = self.active.write() {
            info!(from = %*active, to = %kind, "switching active provider");
            *active = kind;
        }
        Ok(())
    }

    /// The provider currently serving traffic
    pub fn active_provider(&self) -> ProviderKind {
        self.active
            .read()
            .map(|kind| *kind)
            .unwrap_or(self.config.active_provider)
    }

    /// Current lifecycle state
    pub fn state(&self) -> ServiceState {
        self.state
            .read()
            .map(|state| *state)
            .unwrap_or(ServiceState::Error)
    }

    fn set_state(&self, new_state: ServiceState) {
        if let Ok(mut state) = self.state.write() {
            *state = new_state;
        }
    }

    async fn probe_providers(&self) -> Vec<ProviderHealth> {
        let probes = self.providers.values().map(|provider| {
            let provider = provider.clone();
            async move {
                ProviderHealth {
                    name: provider.name().to_string(),
                    healthy: provider.health_check().await,
                    counters: provider.counters(),
                }
            }
        });
        let mut health = futures::future::join_all(probes).await;
        health.sort_by(|a, b| a.name.cmp(&b.name));
        health
    }

    /// Full observability snapshot, safe to call concurrently with traffic
    pub async fn health_check(&self) -> HealthReport {
        HealthReport {
            status: self.state(),
            active_provider: self.active_provider().to_string(),
            providers: self.probe_providers().await,
            cache: self.cache.stats().await,
            cost: self.cost.snapshot(),
            metrics: self.metrics.snapshot(),
        }
    }

    /// Point-in-time copy of the service counters
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Prompt registry, for registering caller templates
    pub fn prompts(&self) -> &PromptRegistry {
        &self.prompts
    }

    /// Context window manager
    pub fn window(&self) -> &ContextWindowManager {
        &self.window
    }

    /// Cost tracker; the external scheduler calls the period resets
    pub fn cost(&self) -> &CostTracker {
        &self.cost
    }

    /// Currently in-flight provider calls
    pub fn in_flight(&self) -> usize {
        self.governor.in_flight()
    }

    /// Drop every cached response
    pub async fn clear_cache(&self) {
        self.cache.clear().await;
        info!("response cache cleared");
    }

    /// Stop accepting work, drain in-flight requests, release resources
    pub async fn shutdown(&self) {
        info!("shutting down orchestration service");
        self.set_state(ServiceState::ShuttingDown);
        self.governor.close().await;
        info!("orchestration service drained");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BudgetConfig;
    use async_trait::async_trait;
    use orch_provider::{ProviderConfig, ProviderError, TokenUsage};
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    enum MockBehavior {
        Succeed,
        AlwaysTimeout,
        FatalAuth,
    }

    struct MockProvider {
        label: &'static str,
        behavior: MockBehavior,
        healthy: AtomicBool,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl MockProvider {
        fn new(label: &'static str, behavior: MockBehavior) -> Arc<Self> {
            Arc::new(Self {
                label,
                behavior,
                healthy: AtomicBool::new(true),
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            })
        }

        fn succeeding(label: &'static str) -> Arc<Self> {
            Self::new(label, MockBehavior::Succeed)
        }

        fn timing_out(label: &'static str) -> Arc<Self> {
            Self::new(label, MockBehavior::AlwaysTimeout)
        }

        fn fatal(label: &'static str) -> Arc<Self> {
            Self::new(label, MockBehavior::FatalAuth)
        }

        fn set_healthy(&self, healthy: bool) {
            self.healthy.store(healthy, Ordering::SeqCst);
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn max_in_flight(&self) -> usize {
            self.max_in_flight.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ModelProvider for MockProvider {
        async fn generate(
            &self,
            request: &GenerationRequest,
        ) -> orch_provider::Result<GenerationResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            match self.behavior {
                MockBehavior::Succeed => Ok(GenerationResult {
                    text: format!("analysis for request {}", request.request_id),
                    provider: self.label.to_string(),
                    model: "mock-model".to_string(),
                    usage: TokenUsage {
                        input_tokens: 100,
                        output_tokens: 50,
                    },
                    latency: Duration::from_millis(5),
                    cost: 0.01,
                    request_id: request.request_id,
                }),
                MockBehavior::AlwaysTimeout => {
                    Err(ProviderError::Timeout("mock timeout".to_string()))
                }
                MockBehavior::FatalAuth => Err(ProviderError::AuthenticationFailed),
            }
        }

        async fn health_check(&self) -> bool {
            self.healthy.load(Ordering::SeqCst)
        }

        fn name(&self) -> &str {
            self.label
        }
    }

    fn test_config() -> ServiceConfig {
        ServiceConfig::builder()
            .provider(
                ProviderConfig::anthropic("test-key", "mock-claude")
                    .with_retries(3, Duration::from_millis(5)),
            )
            .provider(
                ProviderConfig::openai("test-key", "mock-gpt")
                    .with_retries(3, Duration::from_millis(5)),
            )
            .fallback_provider(ProviderKind::OpenAi)
            .build()
            .unwrap()
    }

    fn service_with(
        primary: Arc<MockProvider>,
        fallback: Arc<MockProvider>,
    ) -> OrchestrationService {
        let providers: Vec<(ProviderKind, Arc<dyn ModelProvider>)> = vec![
            (ProviderKind::Anthropic, primary),
            (ProviderKind::OpenAi, fallback),
        ];
        OrchestrationService::with_providers(test_config(), providers).unwrap()
    }

    fn snapshot(symbol: &str) -> MarketSnapshot {
        MarketSnapshot::new(symbol, "1h")
            .with_value("close", json!(231.4))
            .with_value("volume", json!(2_000_000.0))
    }

    #[tokio::test]
    async fn test_initialize_all_healthy_is_ready() {
        let service = service_with(
            MockProvider::succeeding("primary"),
            MockProvider::succeeding("fallback"),
        );
        service.initialize().await.unwrap();
        assert_eq!(service.state(), ServiceState::Ready);
    }

    #[tokio::test]
    async fn test_initialize_partially_healthy_is_degraded() {
        let primary = MockProvider::succeeding("primary");
        let fallback = MockProvider::succeeding("fallback");
        fallback.set_healthy(false);

        let service = service_with(primary, fallback);
        service.initialize().await.unwrap();
        assert_eq!(service.state(), ServiceState::Degraded);
    }

    #[tokio::test]
    async fn test_initialize_none_healthy_is_fatal() {
        let primary = MockProvider::succeeding("primary");
        let fallback = MockProvider::succeeding("fallback");
        primary.set_healthy(false);
        fallback.set_healthy(false);

        let service = service_with(primary, fallback);
        let result = service.initialize().await;
        assert!(matches!(result, Err(ServiceError::NoHealthyProvider)));
        assert_eq!(service.state(), ServiceState::Error);
    }

    #[tokio::test]
    async fn test_health_transitions_follow_provider_recovery() {
        let primary = MockProvider::succeeding("primary");
        let fallback = MockProvider::succeeding("fallback");
        let service = service_with(primary.clone(), fallback.clone());
        service.initialize().await.unwrap();
        assert_eq!(service.state(), ServiceState::Ready);

        fallback.set_healthy(false);
        assert_eq!(service.refresh_health().await, ServiceState::Degraded);

        primary.set_healthy(false);
        assert_eq!(service.refresh_health().await, ServiceState::Error);

        primary.set_healthy(true);
        fallback.set_healthy(true);
        assert_eq!(service.refresh_health().await, ServiceState::Ready);
    }

    #[tokio::test]
    async fn test_analyze_success() {
        let primary = MockProvider::succeeding("primary");
        let service = service_with(primary.clone(), MockProvider::succeeding("fallback"));
        service.initialize().await.unwrap();

        let report = service.analyze(snapshot("AAPL"), "technical", None).await;

        assert!(report.success);
        assert!(!report.degraded);
        assert!(!report.cached);
        assert!(!report.content.is_empty());
        assert_eq!(report.provider.as_deref(), Some("primary"));
        assert_eq!(primary.calls(), 1);

        let metrics = service.metrics();
        assert_eq!(metrics.total_requests, 1);
        assert_eq!(metrics.successful_requests, 1);
        assert_eq!(metrics.cache_misses, 1);
        assert_eq!(metrics.cache_hits, 0);
    }

    #[tokio::test]
    async fn test_analyze_is_idempotent_within_cache_ttl() {
        let primary = MockProvider::succeeding("primary");
        let service = service_with(primary.clone(), MockProvider::succeeding("fallback"));
        service.initialize().await.unwrap();

        let observation = snapshot("AAPL");
        let first = service
            .analyze(observation.clone(), "technical", None)
            .await;
        let second = service.analyze(observation, "technical", None).await;

        assert_eq!(primary.calls(), 1);
        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(first.content, second.content);
        assert_eq!(service.metrics().cache_hits, 1);
    }

    #[tokio::test]
    async fn test_analyze_distinct_subjects_miss_independently() {
        let primary = MockProvider::succeeding("primary");
        let service = service_with(primary.clone(), MockProvider::succeeding("fallback"));
        service.initialize().await.unwrap();

        service.analyze(snapshot("AAPL"), "technical", None).await;
        service.analyze(snapshot("MSFT"), "technical", None).await;

        assert_eq!(primary.calls(), 2);
    }

    #[tokio::test]
    async fn test_analyze_fails_over_and_restores_active_provider() {
        let primary = MockProvider::timing_out("primary");
        let fallback = MockProvider::succeeding("fallback");
        let service = service_with(primary.clone(), fallback.clone());
        service.initialize().await.unwrap();

        let report = service.analyze(snapshot("AAPL"), "technical", None).await;

        assert!(report.success, "fallback should have served the call");
        assert!(!report.degraded);
        assert_eq!(report.provider.as_deref(), Some("fallback"));
        // Active provider identity is untouched by the per-call failover
        assert_eq!(service.active_provider(), ProviderKind::Anthropic);
        // Transient failures burn every configured retry before failover
        assert_eq!(primary.calls(), 3);
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test]
    async fn test_analyze_fatal_error_fails_over_without_retry() {
        let primary = MockProvider::fatal("primary");
        let fallback = MockProvider::succeeding("fallback");
        let service = service_with(primary.clone(), fallback.clone());
        service.initialize().await.unwrap();

        let report = service.analyze(snapshot("AAPL"), "technical", None).await;

        assert!(report.success);
        assert_eq!(primary.calls(), 1);
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test]
    async fn test_analyze_degrades_when_all_providers_fail() {
        let service = service_with(
            MockProvider::timing_out("primary"),
            MockProvider::timing_out("fallback"),
        );
        service.initialize().await.unwrap();

        let report = service.analyze(snapshot("AAPL"), "technical", None).await;

        assert!(!report.success);
        assert!(report.degraded);
        assert!(report.content.is_empty());
        let error = report.error.expect("degraded report carries an error");
        assert!(error.contains("exhausted"));
        assert_eq!(service.metrics().failed_requests, 1);
    }

    #[tokio::test]
    async fn test_analyze_unknown_template_degrades() {
        let service = service_with(
            MockProvider::succeeding("primary"),
            MockProvider::succeeding("fallback"),
        );
        service.initialize().await.unwrap();

        let report = service.analyze(snapshot("AAPL"), "no-such-template", None).await;

        assert!(!report.success);
        assert!(report.degraded);
        assert!(report.error.unwrap().contains("not registered"));
    }

    #[tokio::test]
    async fn test_concurrency_bound_holds_under_load() {
        let config = ServiceConfig::builder()
            .provider(
                ProviderConfig::anthropic("test-key", "mock-claude")
                    .with_retries(3, Duration::from_millis(5)),
            )
            .provider(
                ProviderConfig::openai("test-key", "mock-gpt")
                    .with_retries(3, Duration::from_millis(5)),
            )
            .max_concurrent_requests(3)
            .build()
            .unwrap();
        let primary = MockProvider::succeeding("primary");
        let providers: Vec<(ProviderKind, Arc<dyn ModelProvider>)> = vec![
            (ProviderKind::Anthropic, primary.clone()),
            (ProviderKind::OpenAi, MockProvider::succeeding("fallback")),
        ];
        let service =
            Arc::new(OrchestrationService::with_providers(config, providers).unwrap());
        service.initialize().await.unwrap();

        let mut handles = Vec::new();
        for i in 0..12 {
            let service = service.clone();
            handles.push(tokio::spawn(async move {
                service
                    .analyze(snapshot(&format!("SYM{i}")), "technical", None)
                    .await
            }));
        }
        for handle in handles {
            let report = handle.await.unwrap();
            assert!(report.success);
        }

        assert!(primary.max_in_flight() <= 3, "bound was {}", primary.max_in_flight());
        assert_eq!(service.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_generate_text_propagates_provider_errors() {
        let service = service_with(
            MockProvider::fatal("primary"),
            MockProvider::succeeding("fallback"),
        );
        service.initialize().await.unwrap();

        let result = service.generate_text("hello").await;
        assert!(matches!(
            result,
            Err(ServiceError::Provider(ProviderError::AuthenticationFailed))
        ));
    }

    #[tokio::test]
    async fn test_generate_text_success() {
        let service = service_with(
            MockProvider::succeeding("primary"),
            MockProvider::succeeding("fallback"),
        );
        service.initialize().await.unwrap();

        let text = service.generate_text("hello").await.unwrap();
        assert!(text.starts_with("analysis for request"));
        assert!(service.cost().snapshot().daily_spent > 0.0);
    }

    #[tokio::test]
    async fn test_switch_provider_rejects_unhealthy_target() {
        let primary = MockProvider::succeeding("primary");
        let fallback = MockProvider::succeeding("fallback");
        fallback.set_healthy(false);
        let service = service_with(primary, fallback);
        service.initialize().await.unwrap();

        let result = service.switch_provider(ProviderKind::OpenAi).await;
        assert!(matches!(result, Err(ServiceError::UnhealthyTarget(_))));
        assert_eq!(service.active_provider(), ProviderKind::Anthropic);
    }

    #[tokio::test]
    async fn test_switch_provider_to_healthy_target() {
        let service = service_with(
            MockProvider::succeeding("primary"),
            MockProvider::succeeding("fallback"),
        );
        service.initialize().await.unwrap();

        service.switch_provider(ProviderKind::OpenAi).await.unwrap();
        assert_eq!(service.active_provider(), ProviderKind::OpenAi);
    }

    #[tokio::test]
    async fn test_switch_provider_unknown_target() {
        let config = ServiceConfig::builder()
            .provider(ProviderConfig::anthropic("test-key", "mock-claude"))
            .build()
            .unwrap();
        let service = OrchestrationService::with_providers(
            config,
            vec![(
                ProviderKind::Anthropic,
                MockProvider::succeeding("primary") as Arc<dyn ModelProvider>,
            )],
        )
        .unwrap();

        let result = service.switch_provider(ProviderKind::OpenAi).await;
        assert!(matches!(result, Err(ServiceError::UnknownProvider(_))));
    }

    #[tokio::test]
    async fn test_shutdown_rejects_new_work() {
        let primary = MockProvider::succeeding("primary");
        let service = service_with(primary.clone(), MockProvider::succeeding("fallback"));
        service.initialize().await.unwrap();

        service.shutdown().await;
        assert_eq!(service.state(), ServiceState::ShuttingDown);

        let report = service.analyze(snapshot("AAPL"), "technical", None).await;
        assert!(report.degraded);
        assert!(report.error.unwrap().contains("shutting down"));
        assert_eq!(primary.calls(), 0);

        let result = service.generate_text("hello").await;
        assert!(matches!(result, Err(ServiceError::ShuttingDown)));
    }

    #[tokio::test]
    async fn test_budget_hard_cap_degrades_analyze() {
        let config = ServiceConfig::builder()
            .provider(
                ProviderConfig::anthropic("test-key", "mock-claude")
                    .with_retries(3, Duration::from_millis(5)),
            )
            .budget(BudgetConfig {
                daily_budget: 0.005,
                monthly_budget: 100.0,
                alert_threshold: 0.8,
                enforce_hard_cap: true,
            })
            .build()
            .unwrap();
        let primary = MockProvider::succeeding("primary");
        let service = OrchestrationService::with_providers(
            config,
            vec![(
                ProviderKind::Anthropic,
                primary.clone() as Arc<dyn ModelProvider>,
            )],
        )
        .unwrap();
        service.initialize().await.unwrap();

        // First call spends 0.01 and exhausts the 0.005 daily budget
        let first = service.analyze(snapshot("AAPL"), "technical", None).await;
        assert!(first.success);

        let second = service.analyze(snapshot("MSFT"), "technical", None).await;
        assert!(second.degraded);
        assert!(second.error.unwrap().contains("budget"));
        assert_eq!(primary.calls(), 1);
    }

    #[tokio::test]
    async fn test_health_report_shape() {
        let service = service_with(
            MockProvider::succeeding("primary"),
            MockProvider::succeeding("fallback"),
        );
        service.initialize().await.unwrap();
        service.analyze(snapshot("AAPL"), "technical", None).await;

        let report = service.health_check().await;
        assert_eq!(report.status, ServiceState::Ready);
        assert_eq!(report.active_provider, "anthropic");
        assert_eq!(report.providers.len(), 2);
        assert!(report.providers.iter().all(|p| p.healthy));
        assert_eq!(report.cache.entries, 1);
        assert_eq!(report.metrics.total_requests, 1);

        // The report serializes for the observability surface
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "ready");
    }

    #[tokio::test]
    async fn test_clear_cache_forces_regeneration() {
        let primary = MockProvider::succeeding("primary");
        let service = service_with(primary.clone(), MockProvider::succeeding("fallback"));
        service.initialize().await.unwrap();

        let observation = snapshot("AAPL");
        service.analyze(observation.clone(), "technical", None).await;
        service.clear_cache().await;
        service.analyze(observation, "technical", None).await;

        assert_eq!(primary.calls(), 2);
    }
}
