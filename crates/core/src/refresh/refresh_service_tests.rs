//! Tests for the refresh orchestrator.
//!
//! Collaborators are in-memory: a scripted upstream behind the real
//! cache-aware providers, a mock cache and call log, and a fixed clock set to
//! an open market unless a test moves it.

use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use pricewatch_market_data::{AssetKind, ErrorKind, MarketDataError};

use super::*;
use crate::errors::{Error, Result};
use crate::holdings::{Holding, HoldingsRepositoryTrait, NewHolding};
use crate::market_session::MarketSessionTracker;
use crate::quotes::test_support::{
    fixed_clock, MockCallLog, MockPriceCache, ScriptedProvider,
};
use crate::quotes::{
    CryptoPriceProvider, EquitiesPriceProvider, PriceCacheStore, PriceProvider, ProviderContext,
    QuotaTracker, SyntheticPriceProvider,
};
use crate::settings::{MarketSessionSettings, QuotaLimits, RefreshSettings};
use crate::utils::time_utils::{Clock, ManualClock};

// =========================================================================
// Mock HoldingsRepository
// =========================================================================

#[derive(Clone, Default)]
struct MockHoldings {
    symbols: Arc<Mutex<Vec<String>>>,
    fail: Arc<Mutex<bool>>,
}

impl MockHoldings {
    fn with_symbols(symbols: &[&str]) -> Self {
        let holdings = Self::default();
        *holdings.symbols.lock().unwrap() = symbols.iter().map(|s| s.to_string()).collect();
        holdings
    }
}

#[async_trait]
impl HoldingsRepositoryTrait for MockHoldings {
    fn list(&self) -> Result<Vec<Holding>> {
        Ok(Vec::new())
    }

    fn tracked_symbols(&self) -> Result<Vec<String>> {
        if *self.fail.lock().unwrap() {
            return Err(Error::Repository("holdings unavailable".into()));
        }
        Ok(self.symbols.lock().unwrap().clone())
    }

    async fn add(&self, holding: NewHolding) -> Result<Holding> {
        self.symbols.lock().unwrap().push(holding.symbol.clone());
        Ok(Holding {
            id: "test".to_string(),
            symbol: holding.symbol,
            quantity: holding.quantity,
            asset_kind: holding.asset_kind,
            created_at: Utc::now(),
        })
    }
}

// =========================================================================
// Fixture
// =========================================================================

struct Fixture {
    orchestrator: RefreshOrchestrator,
    upstream: ScriptedProvider,
    cache: MockPriceCache,
    log: MockCallLog,
    clock: Arc<ManualClock>,
    ctx: ProviderContext,
    session: Arc<MarketSessionTracker>,
}

enum Kind {
    Equities,
    Crypto,
}

fn fixture(kind: Kind, holdings: MockHoldings, limits: QuotaLimits) -> Fixture {
    let id = match kind {
        Kind::Equities => "EQ",
        Kind::Crypto => "CG",
    };
    let upstream = ScriptedProvider::new(id, matches!(kind, Kind::Crypto));
    let cache = MockPriceCache::new();
    let log = MockCallLog::new();
    let clock = fixed_clock();
    let settings = RefreshSettings::default();
    let session = Arc::new(MarketSessionTracker::new(&MarketSessionSettings::default()));
    let quota = Arc::new(
        QuotaTracker::new(Arc::new(log.clone()), clock.clone()).with_limits(id, limits),
    );
    let ctx = ProviderContext::new(
        Arc::new(cache.clone()),
        quota,
        clock.clone(),
        StdDuration::from_secs(5),
    );
    let provider: Arc<dyn PriceProvider> = match kind {
        Kind::Equities => Arc::new(EquitiesPriceProvider::new(
            Arc::new(upstream.clone()),
            ctx.clone(),
            session.clone(),
            settings.refresh_interval(),
        )),
        Kind::Crypto => Arc::new(CryptoPriceProvider::new(
            Arc::new(upstream.clone()),
            ctx.clone(),
            settings.crypto_cache_ttl(),
        )),
    };
    let orchestrator = RefreshOrchestrator::new(
        provider,
        Arc::new(cache.clone()),
        Arc::new(holdings),
        session.clone(),
        clock.clone(),
        settings,
    );
    Fixture {
        orchestrator,
        upstream,
        cache,
        log,
        clock,
        ctx,
        session,
    }
}

fn equities(holdings: &[&str]) -> Fixture {
    fixture(
        Kind::Equities,
        MockHoldings::with_symbols(holdings),
        QuotaLimits::new(5, 25),
    )
}

fn crypto(holdings: &[&str]) -> Fixture {
    fixture(
        Kind::Crypto,
        MockHoldings::with_symbols(holdings),
        QuotaLimits::new(30, 10_000),
    )
}

fn assert_counts_consistent(summary: &RefreshSummary) {
    assert_eq!(
        summary.updated_symbols + summary.failed_symbols,
        summary.total_symbols
    );
    assert_eq!(summary.results.len(), summary.total_symbols);
    for result in &summary.results {
        if !result.updated {
            assert!(result.error_type.is_some(), "{} lacks an error kind", result.symbol);
        }
    }
}

// =========================================================================
// Single-symbol refresh
// =========================================================================

#[tokio::test]
async fn test_no_cache_open_market_fetches_from_api() {
    let f = equities(&[]);
    f.upstream.set_price("AAPL", dec!(189.5));

    let result = f.orchestrator.refresh_symbol("AAPL").await;

    assert!(result.updated);
    assert_eq!(result.source.as_deref(), Some("api"));
    assert_eq!(result.new_price, Some(dec!(189.5)));
    assert_eq!(result.old_price, None);
    assert_eq!(result.cache_age, None);
    assert_eq!(f.upstream.call_count(), 1);
}

#[tokio::test]
async fn test_recent_cache_is_served_without_provider_call() {
    let f = equities(&[]);
    f.cache
        .seed("AAPL", dec!(150), f.clock.now() - Duration::minutes(2));
    f.upstream.set_price("AAPL", dec!(151));

    let result = f.orchestrator.refresh_symbol("AAPL").await;

    assert!(!result.updated);
    assert_eq!(result.source.as_deref(), Some("cache"));
    assert_eq!(result.error_type, Some(ErrorKind::CacheFresh));
    assert_eq!(result.new_price, Some(dec!(150)));
    assert_eq!(result.cache_age, Some(120));
    assert_eq!(f.upstream.call_count(), 0);
}

#[tokio::test]
async fn test_quota_exhausted_serves_cached_price_without_error() {
    let f = fixture(
        Kind::Equities,
        MockHoldings::default(),
        QuotaLimits::new(5, 0),
    );
    f.cache
        .seed("AAPL", dec!(150.00), f.clock.now() - Duration::hours(2));

    let result = f.orchestrator.refresh_symbol("AAPL").await;

    assert_eq!(result.new_price, Some(dec!(150.00)));
    assert!(!result.updated);
    assert_eq!(result.source.as_deref(), Some("cache"));
    assert_eq!(result.error_type, Some(ErrorKind::RateLimited));
    assert_eq!(f.upstream.call_count(), 0);
}

#[tokio::test]
async fn test_price_delta_against_previous_cache() {
    let f = equities(&[]);
    f.cache
        .seed("MSFT", dec!(400), f.clock.now() - Duration::minutes(10));
    f.upstream.set_price("MSFT", dec!(410));

    let result = f.orchestrator.refresh_symbol("msft").await;

    assert!(result.updated);
    assert_eq!(result.symbol, "MSFT");
    assert_eq!(result.old_price, Some(dec!(400)));
    assert_eq!(result.price_change, dec!(10));
    assert_eq!(result.price_change_pct, dec!(2.5));
}

#[tokio::test]
async fn test_invalid_symbol_is_reported() {
    let f = equities(&[]);
    let result = f.orchestrator.refresh_symbol("  ").await;
    assert!(!result.updated);
    assert_eq!(result.error_type, Some(ErrorKind::InvalidSymbol));
    assert_eq!(f.upstream.call_count(), 0);
}

#[tokio::test]
async fn test_failure_without_cache_surfaces_kind() {
    let f = equities(&[]);
    f.upstream.set_error(
        "AAPL",
        MarketDataError::Network {
            provider: "EQ".to_string(),
            message: "down".to_string(),
        },
    );
    let result = f.orchestrator.refresh_symbol("AAPL").await;
    assert_eq!(result.error_type, Some(ErrorKind::NetworkError));
    assert_eq!(result.new_price, None);
    assert_eq!(result.source, None);
}

#[tokio::test]
async fn test_more_fetches_than_minute_limit_are_denied() {
    let f = fixture(
        Kind::Equities,
        MockHoldings::default(),
        QuotaLimits::new(3, 25),
    );
    for symbol in ["A", "B", "C", "D"] {
        f.upstream.set_price(symbol, dec!(10));
    }
    for symbol in ["A", "B", "C"] {
        assert!(f.orchestrator.refresh_symbol(symbol).await.updated);
    }
    let denied = f.orchestrator.refresh_symbol("D").await;
    assert_eq!(denied.error_type, Some(ErrorKind::RateLimited));
    assert_eq!(f.log.calls().len(), 3);

    f.clock.advance(Duration::seconds(61));
    assert!(f.orchestrator.refresh_symbol("D").await.updated);
}

// =========================================================================
// Bulk refresh
// =========================================================================

#[tokio::test]
async fn test_bulk_refresh_with_no_holdings_is_empty() {
    let f = equities(&[]);
    let summary = f.orchestrator.refresh_all().await.unwrap();

    assert_eq!(summary.total_symbols, 0);
    assert_eq!(summary.updated_symbols, 0);
    assert_eq!(summary.failed_symbols, 0);
    assert!(summary.results.is_empty());
    assert_eq!(summary.duration_ms, 0);
    assert_eq!(summary.provider_name, "EQ");
}

#[tokio::test]
async fn test_bulk_batch_writes_one_entry_per_symbol() {
    let f = crypto(&["btc", "ETH"]);
    f.upstream.set_price("BTC", dec!(65000));
    f.upstream.set_price("ETH", dec!(3200));

    let summary = f.orchestrator.refresh_all().await.unwrap();

    assert_counts_consistent(&summary);
    assert_eq!(summary.updated_symbols, 2);
    assert_eq!(f.upstream.call_count(), 1);
    assert_eq!(f.cache.entries_for("BTC").len(), 1);
    assert_eq!(f.cache.entries_for("ETH").len(), 1);
    let symbols: Vec<&str> = summary.results.iter().map(|r| r.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["BTC", "ETH"]);
}

#[tokio::test]
async fn test_bulk_preserves_holdings_order_and_dedups() {
    let f = crypto(&["SOL", "btc", "ETH", "BTC"]);
    for (symbol, price) in [("SOL", dec!(150)), ("BTC", dec!(65000)), ("ETH", dec!(3200))] {
        f.upstream.set_price(symbol, price);
    }

    let summary = f.orchestrator.refresh_all().await.unwrap();
    let symbols: Vec<&str> = summary.results.iter().map(|r| r.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["SOL", "BTC", "ETH"]);
    assert_eq!(summary.total_symbols, 3);
}

#[tokio::test]
async fn test_bulk_one_failure_does_not_abort_others() {
    let f = equities(&["AAPL", "NOPE", "MSFT"]);
    f.upstream.set_price("AAPL", dec!(190));
    f.upstream.set_price("MSFT", dec!(410));

    let summary = f.orchestrator.refresh_all().await.unwrap();

    assert_counts_consistent(&summary);
    assert_eq!(summary.updated_symbols, 2);
    assert_eq!(summary.failed_symbols, 1);
    let nope = &summary.results[1];
    assert_eq!(nope.symbol, "NOPE");
    assert_eq!(nope.error_type, Some(ErrorKind::ProviderError));
    assert!(nope.error.as_deref().unwrap_or_default().starts_with("NoData: "));
}

#[tokio::test]
async fn test_bulk_unrefreshed_symbols_report_provider_error() {
    let f = fixture(
        Kind::Equities,
        MockHoldings::with_symbols(&["AAPL", "MSFT", "TSLA"]),
        QuotaLimits::new(5, 0),
    );
    f.cache
        .seed("AAPL", dec!(150), f.clock.now() - Duration::minutes(2));
    f.cache
        .seed("MSFT", dec!(400), f.clock.now() - Duration::hours(2));

    let summary = f.orchestrator.refresh_all().await.unwrap();

    assert_counts_consistent(&summary);
    assert_eq!(summary.updated_symbols, 0);
    assert_eq!(f.upstream.call_count(), 0);
    let detail = |i: usize| summary.results[i].error.clone().unwrap_or_default();
    for result in &summary.results {
        assert_eq!(result.error_type, Some(ErrorKind::ProviderError), "{}", result.symbol);
    }
    // fresh cache, quota-degraded cache, quota denied with nothing cached
    assert!(detail(0).starts_with("CacheFresh: "));
    assert_eq!(summary.results[0].new_price, Some(dec!(150)));
    assert!(detail(1).starts_with("RateLimited: "));
    assert_eq!(summary.results[1].new_price, Some(dec!(400)));
    assert!(detail(2).starts_with("RateLimited: "));
    assert_eq!(summary.results[2].new_price, None);
    assert_eq!(summary.served_from_cache(), 2);
}

#[tokio::test]
async fn test_bulk_batch_error_message_reaches_unresolved_symbols() {
    let f = crypto(&["BTC", "ETH"]);
    f.cache
        .seed("BTC", dec!(64000), f.clock.now() - Duration::hours(1));
    f.upstream.set_batch_error(MarketDataError::Network {
        provider: "CG".to_string(),
        message: "connection reset".to_string(),
    });

    let summary = f.orchestrator.refresh_all().await.unwrap();

    assert_counts_consistent(&summary);
    assert_eq!(summary.updated_symbols, 0);
    let btc = &summary.results[0];
    assert_eq!(btc.source.as_deref(), Some("cache"));
    assert_eq!(btc.new_price, Some(dec!(64000)));
    let eth = &summary.results[1];
    assert_eq!(eth.error_type, Some(ErrorKind::ProviderError));
    assert!(eth
        .error
        .as_deref()
        .unwrap_or_default()
        .contains("connection reset"));
    assert_eq!(summary.served_from_cache(), 1);
}

#[tokio::test]
async fn test_bulk_snapshot_precedes_fetch() {
    let f = crypto(&["BTC"]);
    f.cache
        .seed("BTC", dec!(60000), f.clock.now() - Duration::minutes(30));
    f.upstream.set_price("BTC", dec!(66000));

    let summary = f.orchestrator.refresh_all().await.unwrap();
    let btc = &summary.results[0];
    assert_eq!(btc.old_price, Some(dec!(60000)));
    assert_eq!(btc.new_price, Some(dec!(66000)));
    assert_eq!(btc.price_change, dec!(6000));
    assert_eq!(btc.price_change_pct, dec!(10));
}

#[tokio::test]
async fn test_bulk_invalid_holding_symbol_gets_result() {
    let f = crypto(&["BTC", "not a symbol"]);
    f.upstream.set_price("BTC", dec!(65000));

    let summary = f.orchestrator.refresh_all().await.unwrap();
    assert_counts_consistent(&summary);
    let invalid = &summary.results[1];
    assert_eq!(invalid.error_type, Some(ErrorKind::ProviderError));
    assert!(invalid.error.as_deref().unwrap_or_default().starts_with("InvalidSymbol: "));
}

#[tokio::test]
async fn test_bulk_holdings_failure_is_an_error() {
    let holdings = MockHoldings::default();
    *holdings.fail.lock().unwrap() = true;
    let f = fixture(Kind::Equities, holdings, QuotaLimits::new(5, 25));
    assert!(f.orchestrator.refresh_all().await.is_err());
}

// =========================================================================
// Provider selection, status and latest prices
// =========================================================================

#[tokio::test]
async fn test_set_provider_switches_source() {
    let f = equities(&["AAPL"]);
    assert_eq!(f.orchestrator.provider_name(), "EQ");

    f.orchestrator
        .set_provider(Arc::new(SyntheticPriceProvider::new(f.clock.clone())));
    assert_eq!(f.orchestrator.provider_name(), "SYNTHETIC");

    let summary = f.orchestrator.refresh_all().await.unwrap();
    assert_eq!(summary.provider_name, "SYNTHETIC");
    assert_eq!(summary.updated_symbols, 1);
    assert_eq!(f.upstream.call_count(), 0);

    // switching back reuses the same cache and quota context
    let crypto_provider = CryptoPriceProvider::new(
        Arc::new(ScriptedProvider::new("CG", true)),
        f.ctx.clone(),
        Duration::minutes(5),
    );
    f.orchestrator.set_provider(Arc::new(crypto_provider));
    assert_eq!(f.orchestrator.provider_name(), "CG");
}

#[tokio::test]
async fn test_status_reflects_cache_ages() {
    let f = equities(&["AAPL", "MSFT"]);
    let now = f.clock.now();
    f.cache.seed("AAPL", dec!(190), now - Duration::minutes(3));
    f.cache.seed("MSFT", dec!(410), now - Duration::minutes(40));

    let status = f.orchestrator.status().unwrap();
    assert_eq!(status.total_count, 2);
    assert_eq!(status.stale_count, 1);
    assert_eq!(status.cache_age_minutes, 3);
    assert!(!status.cache_stale);
    assert!(status.market_open);
    assert_eq!(status.provider_name, "EQ");

    let again = f.orchestrator.status().unwrap();
    assert!(again.cache_age_minutes >= status.cache_age_minutes);
}

#[tokio::test]
async fn test_status_without_cache_needs_force_refresh() {
    let f = equities(&["AAPL"]);
    let status = f.orchestrator.status().unwrap();
    assert_eq!(status.last_updated, None);
    assert!(status.cache_stale);
    assert!(status.force_refresh_needed);
    assert_eq!(status.cache_age_minutes, 0);
}

#[tokio::test]
async fn test_latest_prices_reads_without_fetching() {
    let f = equities(&["AAPL", "MSFT"]);
    f.cache
        .seed("MSFT", dec!(410), f.clock.now() - Duration::days(3));

    let prices = f.orchestrator.latest_prices().unwrap();
    assert_eq!(prices.len(), 1);
    assert_eq!(prices[0].symbol, "MSFT");
    assert_eq!(prices[0].quote.price, dec!(410));
    assert_eq!(f.upstream.call_count(), 0);
}

#[tokio::test]
async fn test_session_status_uses_clock() {
    let f = equities(&[]);
    let status = f.orchestrator.session_status();
    assert!(status.is_open);
    assert_eq!(status, f.session.session_status(f.clock.now()));
}

#[tokio::test]
async fn test_round_trip_preserves_price_fields() {
    let f = crypto(&[]);
    f.upstream.set_price("ETH", dec!(3210.55));
    let result = f.orchestrator.refresh_symbol("ETH").await;
    assert!(result.updated);

    let cached = f.ctx.cache.latest("ETH").unwrap().unwrap();
    assert_eq!(Some(cached.quote.price), result.new_price);
    assert_eq!(cached.quote.price_btc, None);
    assert_eq!(cached.fetched_at, f.clock.now());
}

#[tokio::test]
async fn test_bulk_refresh_includes_added_holding() {
    let holdings = MockHoldings::default();
    holdings
        .add(NewHolding {
            symbol: "DOGE".to_string(),
            quantity: Decimal::ONE,
            asset_kind: AssetKind::Crypto,
        })
        .await
        .unwrap();
    let f = fixture(Kind::Crypto, holdings, QuotaLimits::new(30, 10_000));
    f.upstream.set_price("DOGE", dec!(0.15));
    let summary = f.orchestrator.refresh_all().await.unwrap();
    assert_eq!(summary.total_symbols, 1);
    assert_eq!(summary.updated_symbols, 1);
}
