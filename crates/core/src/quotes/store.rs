//! Quote storage traits.
//!
//! These traits abstract the persistence layer for the price cache and the
//! provider call log, allowing different storage backends to be used
//! interchangeably.
//!
//! # Design Notes
//!
//! - Async methods are used for writes, which go through a single writer
//! - Sync methods are used for simple reads that are typically fast

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use pricewatch_market_data::Quote;

use super::model::{CacheEntry, ProviderCall};
use crate::errors::Result;

/// Storage interface for the price cache.
#[async_trait]
pub trait PriceCacheStore: Send + Sync {
    /// The entry with the greatest `fetched_at` for `symbol`, or `None` when
    /// nothing has been cached yet.
    fn latest(&self, symbol: &str) -> Result<Option<CacheEntry>>;

    /// Latest entry for each of `symbols` that has one.
    fn latest_batch(&self, symbols: &[String]) -> Result<HashMap<String, CacheEntry>>;

    /// Append `quote` to the cache as fetched at `fetched_at`.
    ///
    /// Ordering is not validated: writing an older `fetched_at` than the
    /// current entry is accepted and simply does not become the latest.
    async fn put(&self, quote: &Quote, fetched_at: DateTime<Utc>) -> Result<CacheEntry>;
}

/// Storage interface for the provider call log that quota decisions read.
#[async_trait]
pub trait CallLogStore: Send + Sync {
    /// Append one call to the log.
    async fn record_call(&self, call: &ProviderCall) -> Result<()>;

    /// Calls recorded for `provider` at or after `since`.
    fn count_calls_since(&self, provider: &str, since: DateTime<Utc>) -> Result<u64>;
}
