//! Hand-written collaborators shared by the quote and refresh tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;

use pricewatch_market_data::{
    AssetKind, MarketDataError, MarketDataProvider, ProviderCapabilities, Quote, RateLimit,
};

use super::model::{CacheEntry, ProviderCall};
use super::store::{CallLogStore, PriceCacheStore};
use crate::errors::{DatabaseError, Error, Result};
use crate::utils::time_utils::ManualClock;

/// Friday 2024-05-10 10:00 in New York: the default session is open.
pub fn market_open_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 10, 14, 0, 0).unwrap()
}

/// Saturday 2024-05-11 10:00 in New York.
pub fn weekend_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 11, 14, 0, 0).unwrap()
}

pub fn fixed_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(market_open_instant()))
}

pub fn quote(symbol: &str, price: Decimal, at: DateTime<Utc>, source: &str) -> Quote {
    Quote::new(symbol, price, at, source)
}

// =========================================================================
// Mock CallLogStore
// =========================================================================

#[derive(Clone, Default)]
pub struct MockCallLog {
    calls: Arc<Mutex<Vec<ProviderCall>>>,
    fail_on_count: Arc<Mutex<bool>>,
}

impl MockCallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_on_count(&self, fail: bool) {
        *self.fail_on_count.lock().unwrap() = fail;
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CallLogStore for MockCallLog {
    async fn record_call(&self, call: &ProviderCall) -> Result<()> {
        self.calls.lock().unwrap().push(call.clone());
        Ok(())
    }

    fn count_calls_since(&self, provider: &str, since: DateTime<Utc>) -> Result<u64> {
        if *self.fail_on_count.lock().unwrap() {
            return Err(Error::Database(DatabaseError::QueryFailed(
                "Intentional count failure".into(),
            )));
        }
        let calls = self.calls.lock().unwrap();
        Ok(calls
            .iter()
            .filter(|c| c.provider == provider && c.called_at >= since)
            .count() as u64)
    }
}

// =========================================================================
// Mock PriceCacheStore
// =========================================================================

#[derive(Clone, Default)]
pub struct MockPriceCache {
    entries: Arc<Mutex<Vec<CacheEntry>>>,
    fail_on_put: Arc<Mutex<bool>>,
    fail_on_read: Arc<Mutex<bool>>,
}

impl MockPriceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, symbol: &str, price: Decimal, fetched_at: DateTime<Utc>) {
        let quote = quote(symbol, price, fetched_at, "SEED");
        self.entries
            .lock()
            .unwrap()
            .push(CacheEntry::new(quote, fetched_at));
    }

    pub fn set_fail_on_put(&self, fail: bool) {
        *self.fail_on_put.lock().unwrap() = fail;
    }

    pub fn set_fail_on_read(&self, fail: bool) {
        *self.fail_on_read.lock().unwrap() = fail;
    }

    pub fn entries_for(&self, symbol: &str) -> Vec<CacheEntry> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.symbol == symbol)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

#[async_trait]
impl PriceCacheStore for MockPriceCache {
    fn latest(&self, symbol: &str) -> Result<Option<CacheEntry>> {
        if *self.fail_on_read.lock().unwrap() {
            return Err(Error::Database(DatabaseError::QueryFailed(
                "Intentional read failure".into(),
            )));
        }
        let entries = self.entries.lock().unwrap();
        Ok(entries
            .iter()
            .filter(|e| e.symbol == symbol)
            .max_by_key(|e| e.fetched_at)
            .cloned())
    }

    fn latest_batch(&self, symbols: &[String]) -> Result<HashMap<String, CacheEntry>> {
        let mut result = HashMap::new();
        for symbol in symbols {
            if let Some(entry) = self.latest(symbol)? {
                result.insert(symbol.clone(), entry);
            }
        }
        Ok(result)
    }

    async fn put(&self, quote: &Quote, fetched_at: DateTime<Utc>) -> Result<CacheEntry> {
        if *self.fail_on_put.lock().unwrap() {
            return Err(Error::Unexpected("Intentional put failure".into()));
        }
        let entry = CacheEntry::new(quote.clone(), fetched_at);
        self.entries.lock().unwrap().push(entry.clone());
        Ok(entry)
    }
}

// =========================================================================
// Scripted MarketDataProvider
// =========================================================================

/// Upstream provider whose answers are set per symbol.
#[derive(Clone)]
pub struct ScriptedProvider {
    id: &'static str,
    batch: bool,
    prices: Arc<Mutex<HashMap<String, std::result::Result<Decimal, MarketDataError>>>>,
    batch_error: Arc<Mutex<Option<MarketDataError>>>,
    delay: Option<StdDuration>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedProvider {
    pub fn new(id: &'static str, batch: bool) -> Self {
        Self {
            id,
            batch,
            prices: Arc::new(Mutex::new(HashMap::new())),
            batch_error: Arc::new(Mutex::new(None)),
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_delay(mut self, delay: StdDuration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn set_price(&self, symbol: &str, price: Decimal) {
        self.prices
            .lock()
            .unwrap()
            .insert(symbol.to_string(), Ok(price));
    }

    pub fn set_error(&self, symbol: &str, error: MarketDataError) {
        self.prices
            .lock()
            .unwrap()
            .insert(symbol.to_string(), Err(error));
    }

    pub fn set_batch_error(&self, error: MarketDataError) {
        *self.batch_error.lock().unwrap() = Some(error);
    }

    /// Number of upstream round trips made.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn round_trip(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn answer(&self, symbol: &str) -> std::result::Result<Quote, MarketDataError> {
        let prices = self.prices.lock().unwrap();
        match prices.get(symbol) {
            Some(Ok(price)) => Ok(quote(symbol, *price, Utc::now(), self.id)),
            Some(Err(e)) => Err(e.clone()),
            None => Err(MarketDataError::NoData(symbol.to_string())),
        }
    }
}

#[async_trait]
impl MarketDataProvider for ScriptedProvider {
    fn id(&self) -> &'static str {
        self.id
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            asset_kinds: &[AssetKind::Equity, AssetKind::Crypto],
            supports_batch: self.batch,
            requires_api_key: false,
        }
    }

    fn rate_limit(&self) -> RateLimit {
        RateLimit::default()
    }

    async fn get_latest_quote(&self, symbol: &str) -> std::result::Result<Quote, MarketDataError> {
        self.round_trip().await;
        self.answer(symbol)
    }

    async fn get_latest_quotes(
        &self,
        symbols: &[String],
    ) -> std::result::Result<HashMap<String, Quote>, MarketDataError> {
        self.round_trip().await;
        if let Some(err) = self.batch_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(symbols
            .iter()
            .filter_map(|s| self.answer(s).ok().map(|q| (s.clone(), q)))
            .collect())
    }
}
