use std::sync::Arc;

use async_trait::async_trait;

use pricewatch_market_data::provider::synthetic::PROVIDER_ID;
use pricewatch_market_data::{normalize_symbol, MarketDataError, SyntheticProvider};

use super::price_provider::{BatchQuotes, PriceProvider};
use crate::quotes::model::FetchedQuote;
use crate::utils::time_utils::Clock;

/// Generated prices for environments without credentials.
///
/// Never touches the cache or the quota; every lookup is a fresh value.
pub struct SyntheticPriceProvider {
    generator: SyntheticProvider,
    clock: Arc<dyn Clock>,
}

impl SyntheticPriceProvider {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            generator: SyntheticProvider::new(),
            clock,
        }
    }
}

#[async_trait]
impl PriceProvider for SyntheticPriceProvider {
    fn name(&self) -> &'static str {
        PROVIDER_ID
    }

    fn supports_batch(&self) -> bool {
        true
    }

    async fn get_current_price(&self, symbol: &str) -> Result<FetchedQuote, MarketDataError> {
        let symbol = normalize_symbol(symbol)?;
        let now = self.clock.now();
        Ok(FetchedQuote::fresh(self.generator.quote_at(&symbol, now), now))
    }

    async fn get_multiple_prices(&self, symbols: &[String]) -> BatchQuotes {
        let now = self.clock.now();
        let mut batch = BatchQuotes::default();
        for raw in symbols {
            match normalize_symbol(raw) {
                Ok(symbol) => {
                    let quote = self.generator.quote_at(&symbol, now);
                    batch.quotes.insert(symbol, FetchedQuote::fresh(quote, now));
                }
                Err(e) => {
                    batch.failures.insert(raw.clone(), e);
                }
            }
        }
        batch
    }
}
