//! Market data provider abstractions and implementations.
//!
//! This module contains:
//! - The `MarketDataProvider` trait that all providers implement
//! - Provider capabilities and published call budgets
//! - Concrete provider implementations (Alpha Vantage, CoinGecko, synthetic)
//!
//! Providers here are deliberately thin: one upstream request in, typed
//! quotes or a typed error out. Caching, staleness and quota policy live
//! in the core crate.

mod capabilities;
mod http;
mod traits;

pub mod alpha_vantage;
pub mod coingecko;
pub mod synthetic;

// Re-exports
pub use capabilities::{ProviderCapabilities, RateLimit};
pub use http::DEFAULT_TIMEOUT;
pub use traits::MarketDataProvider;
