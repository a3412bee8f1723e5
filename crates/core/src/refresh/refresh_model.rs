use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use pricewatch_market_data::ErrorKind;

use crate::quotes::{CacheEntry, FetchedQuote, QuoteOrigin};

/// Outcome of refreshing one symbol.
///
/// `updated` is true only for a fresh provider value; every other outcome
/// carries an `error_type`, `CacheFresh` when nothing needed refreshing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshResult {
    pub symbol: String,
    pub old_price: Option<Decimal>,
    pub new_price: Option<Decimal>,
    pub updated: bool,
    pub error: Option<String>,
    pub error_type: Option<ErrorKind>,
    pub timestamp: DateTime<Utc>,
    /// `"api"` or `"cache"`; absent when no price could be produced.
    pub source: Option<String>,
    pub price_change: Decimal,
    pub price_change_pct: Decimal,
    /// Age in seconds of the cached value before the attempt.
    pub cache_age: Option<i64>,
}

impl RefreshResult {
    pub fn from_fetched(
        symbol: &str,
        old: Option<&CacheEntry>,
        fetched: &FetchedQuote,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let (error_type, error) = match &fetched.origin {
            QuoteOrigin::Api => (None, None),
            QuoteOrigin::Cache => (
                Some(ErrorKind::CacheFresh),
                Some(ErrorKind::CacheFresh.user_message().to_string()),
            ),
            QuoteOrigin::Degraded { kind, reason } => (Some(*kind), Some(reason.clone())),
        };
        let old_price = old.map(|e| e.quote.price);
        let new_price = Some(fetched.quote.price);
        let (price_change, price_change_pct) = price_delta(old_price, new_price);

        Self {
            symbol: symbol.to_string(),
            old_price,
            new_price,
            updated: fetched.origin.is_fresh_fetch(),
            error,
            error_type,
            timestamp,
            source: Some(fetched.origin.source_tag().to_string()),
            price_change,
            price_change_pct,
            cache_age: old.map(|e| e.age(timestamp).num_seconds()),
        }
    }

    pub fn failed(
        symbol: &str,
        old: Option<&CacheEntry>,
        kind: ErrorKind,
        message: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            old_price: old.map(|e| e.quote.price),
            new_price: None,
            updated: false,
            error: Some(message.into()),
            error_type: Some(kind),
            timestamp,
            source: None,
            price_change: Decimal::ZERO,
            price_change_pct: Decimal::ZERO,
            cache_age: old.map(|e| e.age(timestamp).num_seconds()),
        }
    }

    /// Relabels a result that produced no fresh value as `ProviderError`.
    ///
    /// Bulk refresh reports one kind for every symbol it could not refresh;
    /// the original kind is kept as a prefix of the message.
    pub fn into_bulk_outcome(mut self) -> Self {
        if self.updated {
            return self;
        }
        if let Some(kind) = self.error_type.replace(ErrorKind::ProviderError) {
            if kind != ErrorKind::ProviderError {
                let detail = self.error.take().unwrap_or_else(|| kind.user_message().to_string());
                self.error = Some(format!("{}: {}", kind.as_str(), detail));
            }
        }
        self
    }
}

/// Absolute and percent change; the percentage stays zero unless the old
/// price is positive.
fn price_delta(old: Option<Decimal>, new: Option<Decimal>) -> (Decimal, Decimal) {
    match (old, new) {
        (Some(old), Some(new)) => {
            let change = new - old;
            let pct = if old > Decimal::ZERO {
                (change / old * Decimal::ONE_HUNDRED).round_dp(4)
            } else {
                Decimal::ZERO
            };
            (change, pct)
        }
        _ => (Decimal::ZERO, Decimal::ZERO),
    }
}

/// Aggregate report of a bulk refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefreshSummary {
    pub total_symbols: usize,
    pub updated_symbols: usize,
    pub failed_symbols: usize,
    /// One result per symbol, in enumeration order.
    pub results: Vec<RefreshResult>,
    pub provider_name: String,
    pub timestamp: DateTime<Utc>,
    pub duration_ms: u64,
}

impl RefreshSummary {
    pub fn empty(provider_name: &str, timestamp: DateTime<Utc>) -> Self {
        Self::from_results(provider_name, timestamp, Vec::new(), 0)
    }

    pub fn from_results(
        provider_name: &str,
        timestamp: DateTime<Utc>,
        results: Vec<RefreshResult>,
        duration_ms: u64,
    ) -> Self {
        let total_symbols = results.len();
        let updated_symbols = results.iter().filter(|r| r.updated).count();
        Self {
            total_symbols,
            updated_symbols,
            failed_symbols: total_symbols - updated_symbols,
            results,
            provider_name: provider_name.to_string(),
            timestamp,
            duration_ms,
        }
    }

    /// Non-updated symbols that still have a (cached) price.
    pub fn served_from_cache(&self) -> usize {
        self.results
            .iter()
            .filter(|r| !r.updated && r.new_price.is_some())
            .count()
    }

    pub fn summary(&self) -> String {
        format!(
            "Refreshed {}/{} symbols via {} in {}ms ({} served from cache)",
            self.updated_symbols,
            self.total_symbols,
            self.provider_name,
            self.duration_ms,
            self.served_from_cache()
        )
    }
}

/// Cache health for the tracked symbols.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStatus {
    pub last_updated: Option<DateTime<Utc>>,
    /// Tracked symbols with no entry or an entry older than the interval.
    pub stale_count: usize,
    pub total_count: usize,
    pub provider_name: String,
    pub cache_stale: bool,
    pub force_refresh_needed: bool,
    pub cache_age_minutes: i64,
    pub market_open: bool,
}

impl CacheStatus {
    pub fn compute(
        symbols: &[String],
        entries: &HashMap<String, CacheEntry>,
        provider_name: &str,
        market_open: bool,
        interval: Duration,
        force_threshold: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        let last_updated = symbols
            .iter()
            .filter_map(|s| entries.get(s))
            .map(|e| e.fetched_at)
            .max();
        let stale_count = symbols
            .iter()
            .filter(|s| entries.get(*s).map_or(true, |e| e.age(now) > interval))
            .count();
        let age = last_updated.map(|t| (now - t).max(Duration::zero()));

        Self {
            last_updated,
            stale_count,
            total_count: symbols.len(),
            provider_name: provider_name.to_string(),
            cache_stale: age.map_or(true, |a| a > interval),
            force_refresh_needed: age.map_or(!symbols.is_empty(), |a| a > force_threshold),
            cache_age_minutes: age.map_or(0, |a| a.num_minutes()),
            market_open,
        }
    }
}
