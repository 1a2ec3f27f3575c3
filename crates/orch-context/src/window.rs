//! Priority-ordered context window
//!
//! Keeps the most relevant recent observations and serves them as a single
//! token-budgeted string for prompt construction. Ranking is a greedy
//! priority insert and assembly is a greedy knapsack walk; priority order
//! already approximates value density, so neither aims for optimality.

use crate::snapshot::MarketSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// Tokens-per-word factor used by the estimator
const TOKENS_PER_WORD: f64 = 1.3;

/// Configuration for [`ContextWindowManager`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Hard cap on retained entries
    pub max_entries: usize,

    /// How long an observation stays usable
    pub entry_ttl: Duration,

    /// Token budget for assembled context
    pub target_tokens: usize,

    /// Fraction of `target_tokens` kept when compressing
    pub compression_ratio: f64,

    /// Volume at or above this counts as material
    pub high_volume_threshold: f64,

    /// Timeframes that receive the category bonus
    pub priority_timeframes: Vec<String>,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            max_entries: 50,
            entry_ttl: Duration::from_secs(3600),
            target_tokens: 2000,
            compression_ratio: 0.7,
            high_volume_threshold: 1_000_000.0,
            priority_timeframes: vec![
                "15m".to_string(),
                "1h".to_string(),
                "4h".to_string(),
                "1d".to_string(),
            ],
        }
    }
}

/// One retained observation with its computed priority
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextEntry {
    /// Observation payload
    pub snapshot: MarketSnapshot,

    /// Free-form caller context attached to the observation
    pub extra: Option<String>,

    /// Retention priority in [0, 1]
    pub priority: f64,

    /// Entry time-to-live
    pub ttl: Duration,
}

impl ContextEntry {
    /// Seconds since the observation was taken
    fn age_seconds(&self, now: DateTime<Utc>) -> i64 {
        (now - self.snapshot.observed_at).num_seconds()
    }

    /// Whether the entry has outlived its TTL
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.age_seconds(now) > self.ttl.as_secs() as i64
    }

    /// Rendering used in assembled context
    pub fn formatted(&self) -> String {
        match &self.extra {
            Some(extra) => format!("{} | {}", self.snapshot.format_line(), extra),
            None => self.snapshot.format_line(),
        }
    }

    /// Estimated token footprint of the formatted entry
    pub fn token_estimate(&self) -> usize {
        let words = self.formatted().split_whitespace().count();
        (words as f64 * TOKENS_PER_WORD).ceil() as usize
    }
}

/// Compute the retention priority of an observation
///
/// Starts at 0.5 and adds three weighted signals: freshness (staircase over
/// the observation age), materiality (high volume) and category (privileged
/// timeframe). The result is deterministic for identical inputs and clamped
/// to [0, 1].
pub fn priority_score(snapshot: &MarketSnapshot, now: DateTime<Utc>, config: &WindowConfig) -> f64 {
    let mut score: f64 = 0.5;

    let age = (now - snapshot.observed_at).num_seconds();
    score += if age < 60 {
        0.3
    } else if age < 300 {
        0.2
    } else if age < 900 {
        0.1
    } else {
        0.0
    };

    if snapshot
        .volume()
        .is_some_and(|v| v >= config.high_volume_threshold)
    {
        score += 0.1;
    }

    if config
        .priority_timeframes
        .iter()
        .any(|t| t == &snapshot.timeframe)
    {
        score += 0.1;
    }

    score.clamp(0.0, 1.0)
}

/// Insert keeping the vector sorted by descending priority, then drop the
/// lowest-priority tail beyond `max_entries`.
fn insert_sorted(entries: &mut Vec<ContextEntry>, entry: ContextEntry, max_entries: usize) {
    let position = entries.partition_point(|e| e.priority >= entry.priority);
    entries.insert(position, entry);
    entries.truncate(max_entries);
}

fn purge_expired(entries: &mut Vec<ContextEntry>, now: DateTime<Utc>) {
    entries.retain(|e| !e.is_expired(now));
}

fn total_tokens(entries: &[ContextEntry]) -> usize {
    entries.iter().map(ContextEntry::token_estimate).sum()
}

/// Keep entries by descending priority until the cumulative estimate reaches
/// `target_tokens * compression_ratio`, discard the rest. No-op while the
/// window fits the target, which also makes compression idempotent.
fn compress_entries(entries: &mut Vec<ContextEntry>, config: &WindowConfig) {
    if total_tokens(entries) <= config.target_tokens {
        return;
    }

    let budget = (config.target_tokens as f64 * config.compression_ratio) as usize;
    let mut cumulative = 0;
    let mut keep = 0;
    for entry in entries.iter() {
        cumulative += entry.token_estimate();
        keep += 1;
        if cumulative >= budget {
            break;
        }
    }

    let dropped = entries.len() - keep;
    entries.truncate(keep);
    if dropped > 0 {
        debug!(kept = keep, dropped, budget, "compressed context window");
    }
}

/// Bounded, priority-ordered store of recent observations
///
/// All mutation (`update`, `compress`, expiry purge) happens under the write
/// half of a single lock, so mutating operations never interleave. Reads
/// (`optimized_context`) take the read half and therefore see only fully
/// applied states; expired entries are skipped on read and physically removed
/// by the next mutation.
pub struct ContextWindowManager {
    config: WindowConfig,
    entries: RwLock<Vec<ContextEntry>>,
}

impl ContextWindowManager {
    /// Create a manager with the given configuration
    pub fn new(config: WindowConfig) -> Self {
        Self {
            config,
            entries: RwLock::new(Vec::new()),
        }
    }

    /// The configuration in use
    pub fn config(&self) -> &WindowConfig {
        &self.config
    }

    /// Record an observation, replacing any previous entry for the same
    /// subject identity
    ///
    /// Existing entries are re-scored first (freshness decays), the window is
    /// re-sorted, the new entry lands at its priority position and the tail
    /// beyond `max_entries` is dropped. If the estimated window size then
    /// exceeds `target_tokens`, compression runs in the same critical
    /// section.
    pub async fn update(&self, snapshot: MarketSnapshot, extra: Option<String>) {
        let now = Utc::now();
        let mut entries = self.entries.write().await;

        purge_expired(&mut entries, now);
        let identity = snapshot.identity();
        entries.retain(|e| e.snapshot.identity() != identity);

        for entry in entries.iter_mut() {
            entry.priority = priority_score(&entry.snapshot, now, &self.config);
        }
        entries.sort_by(|a, b| b.priority.total_cmp(&a.priority));

        let entry = ContextEntry {
            priority: priority_score(&snapshot, now, &self.config),
            snapshot,
            extra,
            ttl: self.config.entry_ttl,
        };
        debug!(identity = %identity, priority = entry.priority, "context window updated");
        insert_sorted(&mut entries, entry, self.config.max_entries);

        if total_tokens(&entries) > self.config.target_tokens {
            compress_entries(&mut entries, &self.config);
        }
    }

    /// Assemble the context string for a prompt
    ///
    /// Walks entries highest-priority first, accumulating token estimates,
    /// and stops before the first entry that would exceed `target_tokens`.
    pub async fn optimized_context(&self, target_tokens: usize) -> String {
        let now = Utc::now();
        let entries = self.entries.read().await;

        let mut used = 0;
        let mut lines = Vec::new();
        for entry in entries.iter() {
            if entry.is_expired(now) {
                continue;
            }
            let estimate = entry.token_estimate();
            if used + estimate > target_tokens {
                break;
            }
            used += estimate;
            lines.push(entry.formatted());
        }

        lines.join("\n")
    }

    /// Shrink the window below the configured token target
    pub async fn compress(&self) {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        purge_expired(&mut entries, now);
        compress_entries(&mut entries, &self.config);
    }

    /// Copy of the current entries, highest priority first
    pub async fn entries(&self) -> Vec<ContextEntry> {
        self.entries.read().await.clone()
    }

    /// Number of retained entries
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the window is empty
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop every entry
    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}
