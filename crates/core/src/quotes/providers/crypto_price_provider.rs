use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use log::{debug, info};

use pricewatch_market_data::{normalize_symbol, MarketDataError, MarketDataProvider};

use super::price_provider::{BatchQuotes, PriceProvider};
use super::provider_context::ProviderContext;
use crate::quotes::model::{CacheEntry, FetchedQuote};

/// Batch-oriented crypto provider.
///
/// Single lookups are answered from the cache while it is younger than the
/// TTL, regardless of any market session. Multi-symbol lookups always make
/// one round trip for every requested symbol and cache each returned quote.
pub struct CryptoPriceProvider {
    upstream: Arc<dyn MarketDataProvider>,
    ctx: ProviderContext,
    ttl: Duration,
}

impl CryptoPriceProvider {
    pub fn new(upstream: Arc<dyn MarketDataProvider>, ctx: ProviderContext, ttl: Duration) -> Self {
        Self { upstream, ctx, ttl }
    }

    /// Serve every cached symbol as degraded after a batch-wide failure.
    fn degrade_all(
        &self,
        batch: &mut BatchQuotes,
        symbols: &[String],
        cached: &HashMap<String, CacheEntry>,
        err: &MarketDataError,
    ) {
        if !err.allows_cache_fallback() {
            return;
        }
        for symbol in symbols {
            if let Some(entry) = cached.get(symbol) {
                batch.quotes.insert(
                    symbol.clone(),
                    FetchedQuote::degraded(entry.clone(), err.kind(), err.to_string()),
                );
            }
        }
    }
}

#[async_trait]
impl PriceProvider for CryptoPriceProvider {
    fn name(&self) -> &'static str {
        self.upstream.id()
    }

    fn supports_batch(&self) -> bool {
        true
    }

    async fn get_current_price(&self, symbol: &str) -> Result<FetchedQuote, MarketDataError> {
        let symbol = normalize_symbol(symbol)?;
        let _in_flight = self.ctx.locks.lock(&symbol).await;

        let cached = self.ctx.read_cached(&symbol);
        let now = self.ctx.clock.now();
        if let Some(entry) = cached.as_ref() {
            if entry.age(now) <= self.ttl {
                debug!("Cache hit for {} ({}s old)", symbol, entry.age(now).num_seconds());
                return Ok(FetchedQuote::cached(entry.clone()));
            }
        }

        let provider = self.upstream.id();
        let Some(permit) = self.ctx.reserve(provider).await else {
            return self.ctx.fallback(
                &symbol,
                cached,
                MarketDataError::RateLimited {
                    provider: provider.to_string(),
                },
            );
        };

        let result = self
            .ctx
            .with_timeout(provider, self.upstream.get_latest_quote(&symbol))
            .await;
        self.ctx
            .settle(permit, std::slice::from_ref(&symbol), &result)
            .await;

        match result {
            Ok(quote) => {
                let fetched_at = self.ctx.write_cache(&quote).await;
                Ok(FetchedQuote::fresh(quote, fetched_at))
            }
            Err(err) => self.ctx.fallback(&symbol, cached, err),
        }
    }

    async fn get_multiple_prices(&self, symbols: &[String]) -> BatchQuotes {
        let mut batch = BatchQuotes::default();
        let mut wanted: Vec<String> = Vec::with_capacity(symbols.len());
        for raw in symbols {
            match normalize_symbol(raw) {
                Ok(symbol) if !wanted.contains(&symbol) => wanted.push(symbol),
                Ok(_) => {}
                Err(e) => {
                    batch.failures.insert(raw.clone(), e);
                }
            }
        }
        if wanted.is_empty() {
            return batch;
        }

        let _in_flight = self.ctx.locks.lock_many(&wanted).await;
        let cached = self.ctx.read_cached_batch(&wanted);

        let provider = self.upstream.id();
        let Some(permit) = self.ctx.reserve(provider).await else {
            let err = MarketDataError::RateLimited {
                provider: provider.to_string(),
            };
            self.degrade_all(&mut batch, &wanted, &cached, &err);
            batch.batch_error = Some(err);
            return batch;
        };

        let result = self
            .ctx
            .with_timeout(provider, self.upstream.get_latest_quotes(&wanted))
            .await;
        self.ctx.settle(permit, &wanted, &result).await;

        match result {
            Ok(mut quotes) => {
                for symbol in &wanted {
                    match quotes.remove(symbol) {
                        Some(quote) => {
                            let fetched_at = self.ctx.write_cache(&quote).await;
                            batch
                                .quotes
                                .insert(symbol.clone(), FetchedQuote::fresh(quote, fetched_at));
                        }
                        None => {
                            let err = MarketDataError::NoData(symbol.clone());
                            match cached.get(symbol) {
                                Some(entry) => {
                                    batch.quotes.insert(
                                        symbol.clone(),
                                        FetchedQuote::degraded(
                                            entry.clone(),
                                            err.kind(),
                                            err.to_string(),
                                        ),
                                    );
                                }
                                None => {
                                    batch.failures.insert(symbol.clone(), err);
                                }
                            }
                        }
                    }
                }
                info!(
                    "{} priced {} of {} symbols in one call",
                    provider,
                    batch.quotes.values().filter(|q| q.origin.is_fresh_fetch()).count(),
                    wanted.len()
                );
            }
            Err(err) => {
                self.degrade_all(&mut batch, &wanted, &cached, &err);
                batch.batch_error = Some(err);
            }
        }

        batch
    }
}
