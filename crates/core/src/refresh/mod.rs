//! Single-symbol and bulk refresh orchestration.
//!
//! The orchestrator owns no fetch policy of its own: providers decide between
//! cache, fetch and degraded serve. It snapshots the prior cache state, asks
//! the active provider, and reports what happened per symbol.

mod refresh_model;
mod refresh_service;

#[cfg(test)]
mod refresh_service_tests;

pub use refresh_model::{CacheStatus, RefreshResult, RefreshSummary};
pub use refresh_service::{RefreshOrchestrator, RefreshServiceTrait};
