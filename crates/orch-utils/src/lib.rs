//! Shared utilities for orch-rs
//!
//! Currently provides logging/tracing initialization used by the other
//! workspace crates and by integration binaries.

pub mod logging;

pub use logging::init_tracing;
