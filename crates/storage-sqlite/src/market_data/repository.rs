use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sql_query;
use diesel::sql_types::Text;
use diesel::sqlite::{Sqlite, SqliteConnection};
use log::debug;

use super::model::{PriceSnapshotDB, ProviderCallDB};
use crate::db::{get_connection, WriteHandle};
use crate::errors::{IntoCore, StorageError};
use crate::schema::price_snapshots::dsl as snapshots_dsl;
use crate::schema::provider_calls::dsl as calls_dsl;
use crate::utils::{chunk_for_sqlite, encode_timestamp};
use pricewatch_core::quotes::{CacheEntry, CallLogStore, PriceCacheStore, ProviderCall};
use pricewatch_core::Result;
use pricewatch_market_data::Quote;

/// SQLite-backed price cache and provider call log.
///
/// Both live in the same database so a cache write and its call record go
/// through the same writer.
pub struct PriceCacheRepository {
    pool: Arc<Pool<ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl PriceCacheRepository {
    pub fn new(pool: Arc<Pool<ConnectionManager<SqliteConnection>>>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }

    /// The most recent `limit` entries for `symbol`, newest first.
    pub fn history(&self, symbol: &str, limit: i64) -> Result<Vec<CacheEntry>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = snapshots_dsl::price_snapshots
            .filter(snapshots_dsl::symbol.eq(symbol))
            .order((snapshots_dsl::fetched_at.desc(), snapshots_dsl::id.desc()))
            .limit(limit)
            .select(PriceSnapshotDB::as_select())
            .load::<PriceSnapshotDB>(&mut conn)
            .into_core()?;

        rows.into_iter()
            .map(|row| CacheEntry::try_from(row).map_err(Into::into))
            .collect()
    }

    /// Calls recorded for `provider` at or after `since`, oldest first.
    pub fn calls_since(&self, provider: &str, since: DateTime<Utc>) -> Result<Vec<ProviderCall>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = calls_dsl::provider_calls
            .filter(calls_dsl::provider.eq(provider))
            .filter(calls_dsl::called_at.ge(encode_timestamp(since)))
            .order(calls_dsl::called_at.asc())
            .select(ProviderCallDB::as_select())
            .load::<ProviderCallDB>(&mut conn)
            .into_core()?;

        rows.into_iter()
            .map(|row| ProviderCall::try_from(row).map_err(Into::into))
            .collect()
    }
}

#[async_trait]
impl PriceCacheStore for PriceCacheRepository {
    fn latest(&self, symbol: &str) -> Result<Option<CacheEntry>> {
        let mut conn = get_connection(&self.pool)?;
        let row = snapshots_dsl::price_snapshots
            .filter(snapshots_dsl::symbol.eq(symbol))
            .order((snapshots_dsl::fetched_at.desc(), snapshots_dsl::id.desc()))
            .select(PriceSnapshotDB::as_select())
            .first::<PriceSnapshotDB>(&mut conn)
            .optional()
            .into_core()?;

        match row {
            Some(row) => Ok(Some(CacheEntry::try_from(row)?)),
            None => Ok(None),
        }
    }

    fn latest_batch(&self, symbols: &[String]) -> Result<HashMap<String, CacheEntry>> {
        let mut result = HashMap::new();
        if symbols.is_empty() {
            return Ok(result);
        }

        let mut conn = get_connection(&self.pool)?;
        for chunk in chunk_for_sqlite(symbols) {
            let placeholders = chunk.iter().map(|_| "?").collect::<Vec<_>>().join(", ");
            let sql = format!(
                "WITH ranked AS ( \
                    SELECT p.*, \
                        ROW_NUMBER() OVER (PARTITION BY p.symbol ORDER BY p.fetched_at DESC, p.id DESC) AS rn \
                    FROM price_snapshots p WHERE p.symbol IN ({}) \
                ) \
                SELECT id, symbol, price, price_btc, market_cap, volume_24h, change_24h, \
                       quote_timestamp, source, fetched_at \
                FROM ranked WHERE rn = 1",
                placeholders
            );

            let mut query = Box::new(sql_query(sql)).into_boxed::<Sqlite>();
            for symbol in chunk {
                query = query.bind::<Text, _>(symbol.as_str());
            }

            let rows: Vec<PriceSnapshotDB> = query.load::<PriceSnapshotDB>(&mut conn).into_core()?;
            for row in rows {
                let entry = CacheEntry::try_from(row)?;
                result.insert(entry.symbol.clone(), entry);
            }
        }

        debug!(
            "Cache batch read: {} of {} symbols cached",
            result.len(),
            symbols.len()
        );
        Ok(result)
    }

    async fn put(&self, quote: &Quote, fetched_at: DateTime<Utc>) -> Result<CacheEntry> {
        let row = PriceSnapshotDB::from_quote(quote, fetched_at);
        // Read back through the codec so the returned entry matches what a
        // later `latest` yields, down to timestamp precision.
        let entry = CacheEntry::try_from(row.clone())?;

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::insert_into(snapshots_dsl::price_snapshots)
                    .values(&row)
                    .execute(conn)
                    .map_err(StorageError::QueryFailed)?;
                Ok(())
            })
            .await?;

        Ok(entry)
    }
}

#[async_trait]
impl CallLogStore for PriceCacheRepository {
    async fn record_call(&self, call: &ProviderCall) -> Result<()> {
        let row = ProviderCallDB::try_from(call)?;

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::insert_into(calls_dsl::provider_calls)
                    .values(&row)
                    .execute(conn)
                    .map_err(StorageError::QueryFailed)?;
                Ok(())
            })
            .await
    }

    fn count_calls_since(&self, provider: &str, since: DateTime<Utc>) -> Result<u64> {
        let mut conn = get_connection(&self.pool)?;
        let count: i64 = calls_dsl::provider_calls
            .filter(calls_dsl::provider.eq(provider))
            .filter(calls_dsl::called_at.ge(encode_timestamp(since)))
            .count()
            .get_result(&mut conn)
            .into_core()?;
        Ok(count.max(0) as u64)
    }
}
