//! Configuration for the orchestration service

use crate::error::{Result, ServiceError};
use orch_context::WindowConfig;
use orch_provider::{ProviderConfig, ProviderKind};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Budget limits and alerting for the cost governor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    /// Daily spend budget
    pub daily_budget: f64,

    /// Monthly spend budget
    pub monthly_budget: f64,

    /// Utilization fraction that triggers the one-shot alert
    pub alert_threshold: f64,

    /// Refuse new paid generations once a budget is spent
    ///
    /// Off by default: the governor observes and alerts but never blocks.
    pub enforce_hard_cap: bool,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            daily_budget: 10.0,
            monthly_budget: 200.0,
            alert_threshold: 0.8,
            enforce_hard_cap: false,
        }
    }
}

/// Configuration for [`crate::OrchestrationService`]
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Backends available to this instance
    pub providers: Vec<ProviderConfig>,

    /// Provider serving traffic after startup
    pub active_provider: ProviderKind,

    /// Provider tried once per call after the active one is exhausted
    pub fallback_provider: Option<ProviderKind>,

    /// Cap on simultaneously in-flight provider calls
    pub max_concurrent_requests: usize,

    /// Response cache capacity
    pub cache_max_entries: usize,

    /// Response cache entry TTL
    pub cache_ttl: Duration,

    /// Context window tuning
    pub window: WindowConfig,

    /// Budget limits and alerting
    pub budget: BudgetConfig,

    /// Interval for the optional background health monitor
    pub health_check_interval: Duration,
}

impl ServiceConfig {
    /// Create a configuration builder
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.providers.is_empty() {
            return Err(ServiceError::Configuration(
                "at least one provider must be configured".to_string(),
            ));
        }
        for provider in &self.providers {
            provider.validate()?;
        }
        if !self.has_provider(self.active_provider) {
            return Err(ServiceError::Configuration(format!(
                "active provider {} is not among the configured providers",
                self.active_provider
            )));
        }
        if let Some(fallback) = self.fallback_provider {
            if !self.has_provider(fallback) {
                return Err(ServiceError::Configuration(format!(
                    "fallback provider {fallback} is not among the configured providers"
                )));
            }
        }
        if self.max_concurrent_requests == 0 {
            return Err(ServiceError::Configuration(
                "max_concurrent_requests must be greater than 0".to_string(),
            ));
        }
        if self.cache_max_entries == 0 {
            return Err(ServiceError::Configuration(
                "cache_max_entries must be greater than 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.budget.alert_threshold) {
            return Err(ServiceError::Configuration(
                "alert_threshold must be within [0, 1]".to_string(),
            ));
        }
        Ok(())
    }

    /// The configuration for one provider kind, when present
    pub fn provider_config(&self, kind: ProviderKind) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.kind == kind)
    }

    fn has_provider(&self, kind: ProviderKind) -> bool {
        self.provider_config(kind).is_some()
    }
}

/// Builder for [`ServiceConfig`]
#[derive(Debug, Default)]
pub struct ServiceConfigBuilder {
    providers: Vec<ProviderConfig>,
    active_provider: Option<ProviderKind>,
    fallback_provider: Option<ProviderKind>,
    max_concurrent_requests: Option<usize>,
    cache_max_entries: Option<usize>,
    cache_ttl: Option<Duration>,
    window: Option<WindowConfig>,
    budget: Option<BudgetConfig>,
    health_check_interval: Option<Duration>,
}

impl ServiceConfigBuilder {
    /// Add a provider; the first added becomes the active one unless
    /// overridden
    pub fn provider(mut self, config: ProviderConfig) -> Self {
        if self.active_provider.is_none() {
            self.active_provider = Some(config.kind);
        }
        self.providers.push(config);
        self
    }

    /// Set the active provider
    pub fn active_provider(mut self, kind: ProviderKind) -> Self {
        self.active_provider = Some(kind);
        self
    }

    /// Set the fallback provider
    pub fn fallback_provider(mut self, kind: ProviderKind) -> Self {
        self.fallback_provider = Some(kind);
        self
    }

    /// Set the in-flight request cap
    pub fn max_concurrent_requests(mut self, max: usize) -> Self {
        self.max_concurrent_requests = Some(max);
        self
    }

    /// Set the response cache capacity
    pub fn cache_max_entries(mut self, max: usize) -> Self {
        self.cache_max_entries = Some(max);
        self
    }

    /// Set the response cache TTL
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    /// Set the context window configuration
    pub fn window(mut self, window: WindowConfig) -> Self {
        self.window = Some(window);
        self
    }

    /// Set the budget configuration
    pub fn budget(mut self, budget: BudgetConfig) -> Self {
        self.budget = Some(budget);
        self
    }

    /// Set the background health monitor interval
    pub fn health_check_interval(mut self, interval: Duration) -> Self {
        self.health_check_interval = Some(interval);
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<ServiceConfig> {
        let active_provider = self.active_provider.ok_or_else(|| {
            ServiceError::Configuration("at least one provider must be configured".to_string())
        })?;

        let config = ServiceConfig {
            providers: self.providers,
            active_provider,
            fallback_provider: self.fallback_provider,
            max_concurrent_requests: self.max_concurrent_requests.unwrap_or(10),
            cache_max_entries: self.cache_max_entries.unwrap_or(100),
            cache_ttl: self.cache_ttl.unwrap_or(Duration::from_secs(300)),
            window: self.window.unwrap_or_default(),
            budget: self.budget.unwrap_or_default(),
            health_check_interval: self.health_check_interval.unwrap_or(Duration::from_secs(30)),
        };

        config.validate()?;
        Ok(config)
    }
}
