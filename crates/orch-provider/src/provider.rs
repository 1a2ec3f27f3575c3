//! Model provider trait definition

use crate::{GenerationRequest, GenerationResult, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Trait for model backends
///
/// Implementations provide access to one concrete generation service
/// (Anthropic, OpenAI, a local compatible server). Adapters are
/// interchangeable and carry no cross-adapter shared state; every call
/// enforces the request's own timeout and reports failures through the
/// transient/fatal taxonomy in [`crate::ProviderError`].
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Run one generation attempt
    ///
    /// Must complete (or fail) within `request.timeout`; a timeout surfaces
    /// as a transient error so the retry policy applies.
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult>;

    /// Cheap reachability probe against the backend
    async fn health_check(&self) -> bool;

    /// Adapter name (e.g. "anthropic", "openai")
    fn name(&self) -> &str;

    /// Per-adapter counters for the observability surface
    fn counters(&self) -> ProviderCounters {
        ProviderCounters::default()
    }
}

/// Snapshot of one adapter's request counters
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ProviderCounters {
    /// Generation attempts issued
    pub requests: u64,
    /// Attempts that ended in an error
    pub failures: u64,
}

/// Atomic counter pair shared by the concrete adapters
#[derive(Debug, Default)]
pub(crate) struct CounterCell {
    requests: AtomicU64,
    failures: AtomicU64,
}

#[allow(dead_code)]
impl CounterCell {
    pub(crate) fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> ProviderCounters {
        ProviderCounters {
            requests: self.requests.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_cell() {
        let cell = CounterCell::default();
        cell.record_request();
        cell.record_request();
        cell.record_failure();

        let snapshot = cell.snapshot();
        assert_eq!(snapshot.requests, 2);
        assert_eq!(snapshot.failures, 1);
    }
}
