//! Price providers as seen by the refresh engine.
//!
//! Each variant wraps a raw adapter from the market-data crate and decides
//! whether to answer from the cache, spend quota on a fetch, or degrade to a
//! cached value.

mod crypto_price_provider;
mod equities_price_provider;
mod price_provider;
mod provider_context;
mod synthetic_price_provider;

pub use crypto_price_provider::CryptoPriceProvider;
pub use equities_price_provider::EquitiesPriceProvider;
pub use price_provider::{BatchQuotes, PriceProvider};
pub use provider_context::ProviderContext;
pub use synthetic_price_provider::SyntheticPriceProvider;
