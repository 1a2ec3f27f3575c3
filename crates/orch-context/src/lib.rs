//! Context window management for orch-rs
//!
//! This crate maintains the most relevant recent market observations as a
//! bounded, priority-ordered window and serves them as a single
//! token-budgeted string for prompt construction. It includes:
//!
//! - [`MarketSnapshot`], the observed subject value type
//! - [`ContextEntry`] with a computed retention priority in [0, 1]
//! - [`ContextWindowManager`] with greedy priority insertion, TTL expiry,
//!   token-budgeted assembly and compression

pub mod snapshot;
pub mod window;

// Re-export main types
pub use snapshot::MarketSnapshot;
pub use window::{ContextEntry, ContextWindowManager, WindowConfig, priority_score};
