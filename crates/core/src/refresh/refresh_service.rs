use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use async_trait::async_trait;
use log::{debug, info, warn};

use pricewatch_market_data::{normalize_symbol, ErrorKind};

use super::refresh_model::{CacheStatus, RefreshResult, RefreshSummary};
use crate::errors::Result;
use crate::holdings::HoldingsRepositoryTrait;
use crate::market_session::{MarketSessionTracker, SessionStatus};
use crate::quotes::{BatchQuotes, CacheEntry, PriceCacheStore, PriceProvider};
use crate::settings::RefreshSettings;
use crate::utils::time_utils::Clock;

/// Trait for refresh operations consumed by the application layer.
#[async_trait]
pub trait RefreshServiceTrait: Send + Sync {
    /// Refresh one symbol. Failures are reported in the result, never raised.
    async fn refresh_symbol(&self, symbol: &str) -> RefreshResult;

    /// Refresh every tracked symbol. Only failing to enumerate holdings is an error.
    async fn refresh_all(&self) -> Result<RefreshSummary>;

    /// Cache health across tracked symbols.
    fn status(&self) -> Result<CacheStatus>;

    /// Cached entries for tracked symbols, without fetching.
    fn latest_prices(&self) -> Result<Vec<CacheEntry>>;

    fn session_status(&self) -> SessionStatus;

    fn provider_name(&self) -> &'static str;
}

/// Drives refreshes through whichever provider is currently selected.
pub struct RefreshOrchestrator {
    provider: RwLock<Arc<dyn PriceProvider>>,
    cache: Arc<dyn PriceCacheStore>,
    holdings: Arc<dyn HoldingsRepositoryTrait>,
    session: Arc<MarketSessionTracker>,
    clock: Arc<dyn Clock>,
    settings: RefreshSettings,
}

impl RefreshOrchestrator {
    pub fn new(
        provider: Arc<dyn PriceProvider>,
        cache: Arc<dyn PriceCacheStore>,
        holdings: Arc<dyn HoldingsRepositoryTrait>,
        session: Arc<MarketSessionTracker>,
        clock: Arc<dyn Clock>,
        settings: RefreshSettings,
    ) -> Self {
        Self {
            provider: RwLock::new(provider),
            cache,
            holdings,
            session,
            clock,
            settings,
        }
    }

    /// Swap the active provider. In-flight refreshes finish on the old one.
    pub fn set_provider(&self, provider: Arc<dyn PriceProvider>) {
        let mut current = self.provider.write().unwrap_or_else(|e| e.into_inner());
        info!("Switching price provider {} -> {}", current.name(), provider.name());
        *current = provider;
    }

    pub fn provider(&self) -> Arc<dyn PriceProvider> {
        self.provider
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Distinct normalized symbols from holdings, in first-seen order.
    /// Symbols that fail normalization are kept verbatim so they get a result.
    fn tracked_symbols(&self) -> Result<Vec<String>> {
        let mut seen = HashSet::new();
        Ok(self
            .holdings
            .tracked_symbols()?
            .into_iter()
            .map(|raw| normalize_symbol(&raw).unwrap_or(raw))
            .filter(|symbol| seen.insert(symbol.clone()))
            .collect())
    }

    fn snapshot(&self, symbols: &[String]) -> HashMap<String, CacheEntry> {
        self.cache.latest_batch(symbols).unwrap_or_else(|e| {
            warn!("Failed to snapshot cached prices: {}", e);
            HashMap::new()
        })
    }

    async fn fetch_all(provider: &dyn PriceProvider, symbols: &[String]) -> BatchQuotes {
        if provider.supports_batch() {
            return provider.get_multiple_prices(symbols).await;
        }
        let mut batch = BatchQuotes::default();
        for symbol in symbols {
            match provider.get_current_price(symbol).await {
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

#[async_trait]
impl RefreshServiceTrait for RefreshOrchestrator {
    async fn refresh_symbol(&self, symbol: &str) -> RefreshResult {
        let now = self.clock.now();
        let symbol = match normalize_symbol(symbol) {
            Ok(symbol) => symbol,
            Err(e) => return RefreshResult::failed(symbol, None, e.kind(), e.to_string(), now),
        };

        let old = match self.cache.latest(&symbol) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Failed to read cached price for {}: {}", symbol, e);
                None
            }
        };

        let provider = self.provider();
        let result = match provider.get_current_price(&symbol).await {
            Ok(fetched) => RefreshResult::from_fetched(&symbol, old.as_ref(), &fetched, now),
            Err(e) => RefreshResult::failed(&symbol, old.as_ref(), e.kind(), e.to_string(), now),
        };
        debug!(
            "Refreshed {} via {}: updated={} source={:?}",
            symbol,
            provider.name(),
            result.updated,
            result.source
        );
        result
    }

    async fn refresh_all(&self) -> Result<RefreshSummary> {
        let started = Instant::now();
        let timestamp = self.clock.now();
        let provider = self.provider();

        let symbols = self.tracked_symbols()?;
        if symbols.is_empty() {
            debug!("No tracked symbols; nothing to refresh");
            return Ok(RefreshSummary::empty(provider.name(), timestamp));
        }

        // Baseline must be captured before any fetch writes to the cache.
        let old = self.snapshot(&symbols);

        let (valid, invalid): (Vec<String>, Vec<String>) = symbols
            .iter()
            .cloned()
            .partition(|s| normalize_symbol(s).is_ok());

        let mut batch = if valid.is_empty() {
            BatchQuotes::default()
        } else {
            Self::fetch_all(provider.as_ref(), &valid).await
        };
        for symbol in invalid {
            if let Err(e) = normalize_symbol(&symbol) {
                batch.failures.insert(symbol, e);
            }
        }

        let results: Vec<RefreshResult> = symbols
            .iter()
            .map(|symbol| {
                let old = old.get(symbol);
                let result = if let Some(fetched) = batch.quotes.get(symbol) {
                    RefreshResult::from_fetched(symbol, old, fetched, timestamp)
                } else if let Some(err) = batch.failures.get(symbol) {
                    RefreshResult::failed(symbol, old, err.kind(), err.to_string(), timestamp)
                } else {
                    let message = match &batch.batch_error {
                        Some(err) => format!("Batch fetch failed: {}", err),
                        None => format!("No price returned for {}", symbol),
                    };
                    RefreshResult::failed(symbol, old, ErrorKind::ProviderError, message, timestamp)
                };
                result.into_bulk_outcome()
            })
            .collect();

        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let summary = RefreshSummary::from_results(provider.name(), timestamp, results, duration_ms);
        info!("{}", summary.summary());
        Ok(summary)
    }

    fn status(&self) -> Result<CacheStatus> {
        let symbols = self.tracked_symbols()?;
        let entries = self.cache.latest_batch(&symbols)?;
        let now = self.clock.now();
        Ok(CacheStatus::compute(
            &symbols,
            &entries,
            self.provider_name(),
            self.session.is_open(now),
            self.settings.refresh_interval(),
            self.settings.force_refresh_threshold(),
            now,
        ))
    }

    fn latest_prices(&self) -> Result<Vec<CacheEntry>> {
        let symbols = self.tracked_symbols()?;
        let mut entries = self.cache.latest_batch(&symbols)?;
        Ok(symbols
            .iter()
            .filter_map(|symbol| entries.remove(symbol))
            .collect())
    }

    fn session_status(&self) -> SessionStatus {
        self.session.session_status(self.clock.now())
    }

    fn provider_name(&self) -> &'static str {
        self.provider().name()
    }
}
