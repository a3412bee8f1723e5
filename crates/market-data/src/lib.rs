//! Pricewatch Market Data Crate
//!
//! This crate provides provider-agnostic quote fetching for the
//! Pricewatch price cache.
//!
//! # Overview
//!
//! The market data crate supports:
//! - Multiple asset kinds: equities, crypto
//! - Multiple providers: Alpha Vantage, CoinGecko and a synthetic generator
//! - Explicit response schemas per provider with typed failures
//!
//! # Architecture
//!
//! ```text
//! +------------------+
//! |   core crate     |  (cache, quota, staleness, refresh)
//! +------------------+
//!          |
//!          v
//! +------------------+
//! |    Provider      |  (Alpha Vantage, CoinGecko, Synthetic)
//! +------------------+
//!          |
//!          v
//! +------------------+
//! |     Quote        |  (immutable priced snapshot)
//! +------------------+
//! ```
//!
//! # Core Types
//!
//! - [`Quote`] - Priced snapshot with secondary BTC price and 24h stats
//! - [`MarketDataProvider`] - Trait each upstream source implements
//! - [`MarketDataError`] / [`ErrorKind`] - Failure taxonomy and its reporting category

pub mod errors;
pub mod models;
pub mod provider;

pub use errors::{ErrorKind, MarketDataError};
pub use models::{normalize_symbol, AssetKind, ProviderId, Quote};

pub use provider::alpha_vantage::AlphaVantageProvider;
pub use provider::coingecko::CoinGeckoProvider;
pub use provider::synthetic::SyntheticProvider;
pub use provider::{MarketDataProvider, ProviderCapabilities, RateLimit};
