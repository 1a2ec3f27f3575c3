//! Service state and health reporting

use crate::cache::CacheStats;
use crate::cost::CostSnapshot;
use crate::metrics::MetricsSnapshot;
use orch_provider::ProviderCounters;
use serde::Serialize;
use std::fmt;

/// Lifecycle state of an orchestration service instance
///
/// `Degraded` means some but not all providers are unhealthy (traffic still
/// flows); `Error` means none are. Operators rely on the distinction to tell
/// a partial outage from a total one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    Initializing,
    Ready,
    Degraded,
    Error,
    ShuttingDown,
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ServiceState::Initializing => "initializing",
            ServiceState::Ready => "ready",
            ServiceState::Degraded => "degraded",
            ServiceState::Error => "error",
            ServiceState::ShuttingDown => "shutting_down",
        };
        write!(f, "{label}")
    }
}

/// Health of one configured provider
#[derive(Debug, Clone, Serialize)]
pub struct ProviderHealth {
    pub name: String,
    pub healthy: bool,
    pub counters: ProviderCounters,
}

/// Read-only snapshot of the whole service, safe to take under traffic
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: ServiceState,
    pub active_provider: String,
    pub providers: Vec<ProviderHealth>,
    pub cache: CacheStats,
    pub cost: CostSnapshot,
    pub metrics: MetricsSnapshot,
}
