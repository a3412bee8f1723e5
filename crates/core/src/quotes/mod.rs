//! Quote caching and fetching.
//!
//! - [`model`] - Cache entries, provider calls and quote provenance
//! - [`store`] - Storage traits for the price cache and the call log
//! - [`quota`] - Per-provider call quotas derived from the call log
//! - [`symbol_locks`] - Per-symbol single flight
//! - [`providers`] - Cache-aware price providers
//!
//! # Architecture
//!
//! ```text
//! RefreshOrchestrator → PriceProvider → market-data crate (upstream adapters)
//!                            ↓       ↘
//!                  PriceCacheStore   QuotaTracker → CallLogStore
//! ```

pub mod model;
pub mod providers;
pub mod quota;
pub mod store;
pub mod symbol_locks;

#[cfg(test)]
pub(crate) mod test_support;

pub use model::{CacheEntry, FetchedQuote, ProviderCall, QuoteOrigin};
pub use providers::{
    BatchQuotes, CryptoPriceProvider, EquitiesPriceProvider, PriceProvider, ProviderContext,
    SyntheticPriceProvider,
};
pub use quota::{QuotaPermit, QuotaTracker, QuotaUsage};
pub use store::{CallLogStore, PriceCacheStore};
pub use symbol_locks::{SymbolGuard, SymbolLocks};
