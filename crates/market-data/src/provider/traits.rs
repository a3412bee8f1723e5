//! Market data provider trait definitions.
//!
//! This module defines the core `MarketDataProvider` trait that all
//! market data providers must implement.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::errors::MarketDataError;
use crate::models::Quote;

use super::capabilities::{ProviderCapabilities, RateLimit};

/// Trait for market data providers.
///
/// Implementations talk to one upstream source and nothing else: no caching,
/// no quota bookkeeping. Symbols passed in are already normalized.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use pricewatch_market_data::provider::{MarketDataProvider, ProviderCapabilities, RateLimit};
///
/// struct MyProvider;
///
/// #[async_trait]
/// impl MarketDataProvider for MyProvider {
///     fn id(&self) -> &'static str {
///         "MY_PROVIDER"
///     }
///
///     fn capabilities(&self) -> ProviderCapabilities {
///         ProviderCapabilities {
///             asset_kinds: &[AssetKind::Equity],
///             supports_batch: false,
///             requires_api_key: false,
///         }
///     }
///
///     fn rate_limit(&self) -> RateLimit {
///         RateLimit::default()
///     }
///
///     // ... implement get_latest_quote
/// }
/// ```
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Unique identifier for this provider.
    ///
    /// Used as the source tag on quotes and as the key of the call log.
    fn id(&self) -> &'static str;

    /// Describes what this provider can do.
    fn capabilities(&self) -> ProviderCapabilities;

    /// Published call budget for this provider.
    fn rate_limit(&self) -> RateLimit;

    /// Fetch the latest quote for one symbol.
    async fn get_latest_quote(&self, symbol: &str) -> Result<Quote, MarketDataError>;

    /// Fetch latest quotes for several symbols.
    ///
    /// The returned map is keyed by the symbols as passed in. Symbols the
    /// provider has no data for are omitted rather than failing the call.
    /// The default implementation issues one request per symbol.
    async fn get_latest_quotes(
        &self,
        symbols: &[String],
    ) -> Result<HashMap<String, Quote>, MarketDataError> {
        let mut quotes = HashMap::with_capacity(symbols.len());
        for symbol in symbols {
            match self.get_latest_quote(symbol).await {
                Ok(quote) => {
                    quotes.insert(symbol.clone(), quote);
                }
                Err(MarketDataError::NoData(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(quotes)
    }
}
