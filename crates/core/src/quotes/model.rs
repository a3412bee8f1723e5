//! Domain models for cached quotes and provider calls.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use pricewatch_market_data::{ErrorKind, Quote};

/// The current cached quote for a symbol.
///
/// Physically the cache is an append-only log; the entry for a symbol is the
/// row with the greatest `fetched_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub symbol: String,
    pub quote: Quote,
    pub fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(quote: Quote, fetched_at: DateTime<Utc>) -> Self {
        Self {
            symbol: quote.symbol.clone(),
            quote,
            fetched_at,
        }
    }

    /// Time elapsed since the entry was written, never negative.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        (now - self.fetched_at).max(Duration::zero())
    }
}

/// One external call charged against a provider's quota.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderCall {
    pub provider: String,
    pub called_at: DateTime<Utc>,
    /// Symbols requested in the call (one for single lookups).
    pub symbols: Vec<String>,
    /// Whether the call produced a usable quote.
    pub succeeded: bool,
}

/// Where a returned quote came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuoteOrigin {
    /// Freshly fetched from the provider.
    Api,
    /// Cached value that was still within its freshness window.
    Cache,
    /// Cached value served because a fetch was disallowed or failed.
    Degraded { kind: ErrorKind, reason: String },
}

impl QuoteOrigin {
    /// Source tag reported to callers: `"api"` or `"cache"`.
    pub fn source_tag(&self) -> &'static str {
        match self {
            QuoteOrigin::Api => "api",
            QuoteOrigin::Cache | QuoteOrigin::Degraded { .. } => "cache",
        }
    }

    pub fn is_fresh_fetch(&self) -> bool {
        matches!(self, QuoteOrigin::Api)
    }
}

/// A quote together with its provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedQuote {
    pub quote: Quote,
    pub origin: QuoteOrigin,
    /// When the quote entered the cache (or was fetched, for uncached providers).
    pub fetched_at: DateTime<Utc>,
}

impl FetchedQuote {
    pub fn fresh(quote: Quote, fetched_at: DateTime<Utc>) -> Self {
        Self {
            quote,
            origin: QuoteOrigin::Api,
            fetched_at,
        }
    }

    pub fn cached(entry: CacheEntry) -> Self {
        Self {
            quote: entry.quote,
            origin: QuoteOrigin::Cache,
            fetched_at: entry.fetched_at,
        }
    }

    pub fn degraded(entry: CacheEntry, kind: ErrorKind, reason: impl Into<String>) -> Self {
        Self {
            quote: entry.quote,
            origin: QuoteOrigin::Degraded {
                kind,
                reason: reason.into(),
            },
            fetched_at: entry.fetched_at,
        }
    }
}
