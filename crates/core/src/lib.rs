//! Pricewatch Core - market-aware price caching and refresh.
//!
//! This crate contains the refresh engine: session-aware staleness, provider
//! quotas, the cache contract and the orchestration of single and bulk
//! refreshes. It is database-agnostic and defines traits that are implemented
//! by the `storage-sqlite` crate.

pub mod errors;
pub mod holdings;
pub mod market_session;
pub mod quotes;
pub mod refresh;
pub mod settings;
pub mod utils;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
