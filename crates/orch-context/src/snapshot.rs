//! Market snapshot subject type

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// One observation of a market subject
///
/// The payload is an ordered key/value map so that formatting (and therefore
/// any prompt built from it) is deterministic for identical inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Instrument symbol (e.g. "AAPL", "BTC-USD")
    pub symbol: String,

    /// Observation timeframe (e.g. "1m", "1h", "1d")
    pub timeframe: String,

    /// When the observation was taken
    pub observed_at: DateTime<Utc>,

    /// Observation payload (prices, volume, indicator values)
    pub data: BTreeMap<String, serde_json::Value>,
}

impl MarketSnapshot {
    /// Create a snapshot observed now
    pub fn new(symbol: impl Into<String>, timeframe: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe: timeframe.into(),
            observed_at: Utc::now(),
            data: BTreeMap::new(),
        }
    }

    /// Set the observation timestamp (backfills, tests)
    pub fn with_observed_at(mut self, observed_at: DateTime<Utc>) -> Self {
        self.observed_at = observed_at;
        self
    }

    /// Attach a payload value
    pub fn with_value(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Reported volume, when the payload carries one
    pub fn volume(&self) -> Option<f64> {
        self.data.get("volume").and_then(serde_json::Value::as_f64)
    }

    /// Stable identity of the observed subject
    ///
    /// Two snapshots of the same instrument on the same timeframe share an
    /// identity; the context window keeps at most one entry per identity.
    pub fn identity(&self) -> String {
        format!("{}:{}", self.symbol, self.timeframe)
    }

    /// Single-line rendering used for context assembly
    pub fn format_line(&self) -> String {
        let mut line = format!(
            "[{} {} @ {}]",
            self.symbol,
            self.timeframe,
            self.observed_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
        for (key, value) in &self.data {
            let _ = write!(line, " {key}={value}");
        }
        line
    }
}
