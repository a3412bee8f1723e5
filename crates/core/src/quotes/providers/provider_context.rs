use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, warn};

use pricewatch_market_data::{MarketDataError, Quote};

use crate::quotes::model::{CacheEntry, FetchedQuote};
use crate::quotes::quota::{QuotaPermit, QuotaTracker};
use crate::quotes::store::PriceCacheStore;
use crate::quotes::symbol_locks::SymbolLocks;
use crate::utils::time_utils::Clock;

/// Collaborators shared by the cache-aware providers.
///
/// Storage failures never fail a lookup: an unreadable cache is treated as a
/// miss, a failed write is logged, and a quota check that cannot be computed
/// denies the call.
#[derive(Clone)]
pub struct ProviderContext {
    pub cache: Arc<dyn PriceCacheStore>,
    pub quota: Arc<QuotaTracker>,
    pub locks: Arc<SymbolLocks>,
    pub clock: Arc<dyn Clock>,
    /// Upper bound on a single upstream round trip.
    pub timeout: Duration,
}

impl ProviderContext {
    pub fn new(
        cache: Arc<dyn PriceCacheStore>,
        quota: Arc<QuotaTracker>,
        clock: Arc<dyn Clock>,
        timeout: Duration,
    ) -> Self {
        Self {
            cache,
            quota,
            locks: Arc::new(SymbolLocks::new()),
            clock,
            timeout,
        }
    }

    pub(crate) fn read_cached(&self, symbol: &str) -> Option<CacheEntry> {
        match self.cache.latest(symbol) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Failed to read cached price for {}: {}", symbol, e);
                None
            }
        }
    }

    pub(crate) fn read_cached_batch(&self, symbols: &[String]) -> HashMap<String, CacheEntry> {
        self.cache.latest_batch(symbols).unwrap_or_else(|e| {
            warn!("Failed to read cached prices: {}", e);
            HashMap::new()
        })
    }

    /// Write a fetched quote; returns the `fetched_at` used.
    pub(crate) async fn write_cache(&self, quote: &Quote) -> DateTime<Utc> {
        let fetched_at = self.clock.now();
        if let Err(e) = self.cache.put(quote, fetched_at).await {
            warn!("Failed to cache price for {}: {}", quote.symbol, e);
        }
        fetched_at
    }

    pub(crate) async fn reserve(&self, provider: &str) -> Option<QuotaPermit> {
        match self.quota.try_reserve(provider).await {
            Ok(permit) => permit,
            Err(e) => {
                warn!("Quota check for {} failed, denying call: {}", provider, e);
                None
            }
        }
    }

    /// Charge the call if the provider actually answered.
    pub(crate) async fn settle<T>(
        &self,
        permit: QuotaPermit,
        symbols: &[String],
        result: &Result<T, MarketDataError>,
    ) {
        let (answered, succeeded) = match result {
            Ok(_) => (true, true),
            Err(e) => (e.provider_answered(), false),
        };
        if !answered {
            debug!("{} did not answer; quota slot released", permit.provider());
            return;
        }
        let provider = permit.provider().to_string();
        if let Err(e) = permit.commit(symbols, succeeded).await {
            warn!("Failed to record call to {}: {}", provider, e);
        }
    }

    /// Bound an upstream future by the configured timeout.
    pub(crate) async fn with_timeout<T, F>(&self, provider: &str, fut: F) -> Result<T, MarketDataError>
    where
        F: std::future::Future<Output = Result<T, MarketDataError>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(MarketDataError::Timeout {
                provider: provider.to_string(),
            }),
        }
    }

    /// Serve `cached` in place of a failed or disallowed fetch, or surface
    /// the error when there is nothing to fall back on.
    pub(crate) fn fallback(
        &self,
        symbol: &str,
        cached: Option<CacheEntry>,
        err: MarketDataError,
    ) -> Result<FetchedQuote, MarketDataError> {
        match cached {
            Some(entry) if err.allows_cache_fallback() => {
                warn!("Serving cached price for {} after failure: {}", symbol, err);
                Ok(FetchedQuote::degraded(entry, err.kind(), err.to_string()))
            }
            _ => Err(err),
        }
    }
}
