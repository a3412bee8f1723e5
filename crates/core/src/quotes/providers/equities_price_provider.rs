use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use log::debug;

use pricewatch_market_data::{normalize_symbol, MarketDataError, MarketDataProvider};

use super::price_provider::PriceProvider;
use super::provider_context::ProviderContext;
use crate::market_session::MarketSessionTracker;
use crate::quotes::model::FetchedQuote;

/// Single-symbol equities provider with market-aware caching.
///
/// Per lookup:
///
/// ```text
/// cache fresh for the session          -> cached
/// quota exhausted                      -> degraded cache, or RateLimited
/// fetch fails (network, status, parse) -> degraded cache, or the typed error
/// fetch succeeds                       -> written to cache, returned fresh
/// ```
pub struct EquitiesPriceProvider {
    upstream: Arc<dyn MarketDataProvider>,
    ctx: ProviderContext,
    session: Arc<MarketSessionTracker>,
    interval: Duration,
}

impl EquitiesPriceProvider {
    pub fn new(
        upstream: Arc<dyn MarketDataProvider>,
        ctx: ProviderContext,
        session: Arc<MarketSessionTracker>,
        interval: Duration,
    ) -> Self {
        Self {
            upstream,
            ctx,
            session,
            interval,
        }
    }
}

#[async_trait]
impl PriceProvider for EquitiesPriceProvider {
    fn name(&self) -> &'static str {
        self.upstream.id()
    }

    async fn get_current_price(&self, symbol: &str) -> Result<FetchedQuote, MarketDataError> {
        let symbol = normalize_symbol(symbol)?;
        let _in_flight = self.ctx.locks.lock(&symbol).await;

        let cached = self.ctx.read_cached(&symbol);
        let now = self.ctx.clock.now();
        let last_update = cached.as_ref().map(|entry| entry.fetched_at);
        if let Some(entry) = cached.as_ref() {
            if !self.session.should_refresh(last_update, self.interval, now) {
                debug!("Cache hit for {} ({}s old)", symbol, entry.age(now).num_seconds());
                return Ok(FetchedQuote::cached(entry.clone()));
            }
        }
        debug!("Cache miss for {}", symbol);

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
}
