//! Cost/budget governor
//!
//! Accumulates spend and flags threshold breaches. Purely observational by
//! default: it alerts but never blocks a request. The optional hard cap is
//! checked by the service before paid generations when enabled.

use crate::config::BudgetConfig;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Mutex;
use tracing::warn;

#[derive(Debug, Default)]
struct CostInner {
    daily_spent: f64,
    monthly_spent: f64,
    emitted: HashSet<String>,
    alerts: Vec<String>,
}

/// Snapshot of accumulated spend for the observability surface
#[derive(Debug, Clone, Serialize)]
pub struct CostSnapshot {
    pub daily_spent: f64,
    pub monthly_spent: f64,
    pub daily_budget: f64,
    pub monthly_budget: f64,
    pub daily_utilization: f64,
    pub monthly_utilization: f64,
}

/// Running spend totals with one-shot threshold alerts
pub struct CostTracker {
    budget: BudgetConfig,
    inner: Mutex<CostInner>,
}

impl CostTracker {
    /// Create a tracker for the given budget
    pub fn new(budget: BudgetConfig) -> Self {
        Self {
            budget,
            inner: Mutex::new(CostInner::default()),
        }
    }

    /// Add the cost of one completed generation to both running totals
    ///
    /// Emits at most one alert per (period, threshold) until the matching
    /// reset, no matter how many requests cross it.
    pub fn record(&self, cost: f64) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        inner.daily_spent += cost;
        inner.monthly_spent += cost;

        let daily = inner.daily_spent;
        let monthly = inner.monthly_spent;
        self.check_threshold(&mut inner, "daily", daily, self.budget.daily_budget);
        self.check_threshold(&mut inner, "monthly", monthly, self.budget.monthly_budget);
    }

    fn check_threshold(&self, inner: &mut CostInner, period: &str, spent: f64, budget: f64) {
        if budget <= 0.0 || spent / budget < self.budget.alert_threshold {
            return;
        }
        let dedup_key = format!("{period}:{}", self.budget.alert_threshold);
        if !inner.emitted.insert(dedup_key) {
            return;
        }
        let message = format!(
            "{period} budget {:.0}% utilized ({spent:.2}/{budget:.2})",
            self.budget.alert_threshold * 100.0
        );
        warn!("{message}");
        inner.alerts.push(message);
    }

    /// Whether the hard cap is enforced and a budget is spent
    pub fn is_exhausted(&self) -> bool {
        if !self.budget.enforce_hard_cap {
            return false;
        }
        let Ok(inner) = self.inner.lock() else {
            return false;
        };
        inner.daily_spent >= self.budget.daily_budget
            || inner.monthly_spent >= self.budget.monthly_budget
    }

    /// Reset daily accumulation at the external day boundary
    pub fn reset_daily(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.daily_spent = 0.0;
            inner.emitted.retain(|key| !key.starts_with("daily:"));
        }
    }

    /// Reset monthly accumulation at the external month boundary
    pub fn reset_monthly(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.monthly_spent = 0.0;
            inner.emitted.retain(|key| !key.starts_with("monthly:"));
        }
    }

    /// Alerts emitted so far (oldest first)
    pub fn alerts(&self) -> Vec<String> {
        self.inner
            .lock()
            .map(|inner| inner.alerts.clone())
            .unwrap_or_default()
    }

    /// Snapshot for the observability surface
    pub fn snapshot(&self) -> CostSnapshot {
        let (daily_spent, monthly_spent) = self
            .inner
            .lock()
            .map(|inner| (inner.daily_spent, inner.monthly_spent))
            .unwrap_or((0.0, 0.0));

        let utilization = |spent: f64, budget: f64| if budget > 0.0 { spent / budget } else { 0.0 };
        CostSnapshot {
            daily_spent,
            monthly_spent,
            daily_budget: self.budget.daily_budget,
            monthly_budget: self.budget.monthly_budget,
            daily_utilization: utilization(daily_spent, self.budget.daily_budget),
            monthly_utilization: utilization(monthly_spent, self.budget.monthly_budget),
        }
    }
}
