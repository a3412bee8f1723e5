use std::collections::HashMap;

use async_trait::async_trait;

use pricewatch_market_data::MarketDataError;

use crate::quotes::model::FetchedQuote;

/// Outcome of a multi-symbol lookup.
#[derive(Debug, Default)]
pub struct BatchQuotes {
    /// Quotes keyed by normalized symbol.
    pub quotes: HashMap<String, FetchedQuote>,
    /// Symbols that failed individually.
    pub failures: HashMap<String, MarketDataError>,
    /// Set when the lookup failed as a whole; symbols absent from both maps
    /// were lost to it.
    pub batch_error: Option<MarketDataError>,
}

/// A source of current prices.
#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Provider tag reported in summaries and charged in the call log.
    fn name(&self) -> &'static str;

    /// Whether `get_multiple_prices` prices all symbols in one round trip.
    fn supports_batch(&self) -> bool {
        false
    }

    /// Current price for one symbol, possibly served from the cache.
    async fn get_current_price(&self, symbol: &str) -> Result<FetchedQuote, MarketDataError>;

    /// Current prices for many symbols.
    ///
    /// The default looks symbols up one at a time; a failure for one symbol
    /// never stops the others.
    async fn get_multiple_prices(&self, symbols: &[String]) -> BatchQuotes {
        let mut batch = BatchQuotes::default();
        for symbol in symbols {
            match self.get_current_price(symbol).await {
                Ok(fetched) => {
                    batch.quotes.insert(symbol.clone(), fetched);
                }
                Err(err) => {
                    batch.failures.insert(symbol.clone(), err);
                }
            }
        }
        batch
    }
}
