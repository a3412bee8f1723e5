//! Database models for cached prices and provider calls.

use diesel::prelude::*;
use uuid::Uuid;

use pricewatch_core::quotes::{CacheEntry, ProviderCall};
use pricewatch_market_data::Quote;

use crate::errors::StorageError;
use crate::utils::{
    decode_decimal, decode_optional_decimal, decode_timestamp, encode_decimal, encode_timestamp,
};

/// One row of the append-only price cache.
#[derive(Queryable, Selectable, Insertable, QueryableByName, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::price_snapshots)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PriceSnapshotDB {
    pub id: String,
    pub symbol: String,
    pub price: String,
    pub price_btc: Option<String>,
    pub market_cap: Option<String>,
    pub volume_24h: Option<String>,
    pub change_24h: Option<String>,
    pub quote_timestamp: String,
    pub source: String,
    pub fetched_at: String,
}

impl PriceSnapshotDB {
    pub fn from_quote(quote: &Quote, fetched_at: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            symbol: quote.symbol.clone(),
            price: encode_decimal(quote.price),
            price_btc: quote.price_btc.map(encode_decimal),
            market_cap: quote.market_cap.map(encode_decimal),
            volume_24h: quote.volume_24h.map(encode_decimal),
            change_24h: quote.change_24h.map(encode_decimal),
            quote_timestamp: encode_timestamp(quote.timestamp),
            source: quote.source.clone(),
            fetched_at: encode_timestamp(fetched_at),
        }
    }
}

impl TryFrom<PriceSnapshotDB> for CacheEntry {
    type Error = StorageError;

    fn try_from(row: PriceSnapshotDB) -> Result<Self, Self::Error> {
        let quote = Quote {
            price: decode_decimal("price", &row.price)?,
            price_btc: decode_optional_decimal("price_btc", row.price_btc.as_deref())?,
            market_cap: decode_optional_decimal("market_cap", row.market_cap.as_deref())?,
            volume_24h: decode_optional_decimal("volume_24h", row.volume_24h.as_deref())?,
            change_24h: decode_optional_decimal("change_24h", row.change_24h.as_deref())?,
            timestamp: decode_timestamp("quote_timestamp", &row.quote_timestamp)?,
            source: row.source,
            symbol: row.symbol,
        };
        let fetched_at = decode_timestamp("fetched_at", &row.fetched_at)?;
        Ok(CacheEntry::new(quote, fetched_at))
    }
}

/// One row of the provider call log.
#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::provider_calls)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ProviderCallDB {
    pub id: String,
    pub provider: String,
    pub called_at: String,
    /// JSON array of the requested symbols.
    pub symbols: String,
    pub succeeded: bool,
}

impl TryFrom<&ProviderCall> for ProviderCallDB {
    type Error = StorageError;

    fn try_from(call: &ProviderCall) -> Result<Self, Self::Error> {
        let symbols = serde_json::to_string(&call.symbols)
            .map_err(|e| StorageError::CorruptRow(format!("symbols: {}", e)))?;
        Ok(Self {
            id: Uuid::now_v7().to_string(),
            provider: call.provider.clone(),
            called_at: encode_timestamp(call.called_at),
            symbols,
            succeeded: call.succeeded,
        })
    }
}

impl TryFrom<ProviderCallDB> for ProviderCall {
    type Error = StorageError;

    fn try_from(row: ProviderCallDB) -> Result<Self, Self::Error> {
        let symbols = serde_json::from_str(&row.symbols)
            .map_err(|e| StorageError::CorruptRow(format!("symbols: '{}' ({})", row.symbols, e)))?;
        Ok(ProviderCall {
            provider: row.provider,
            called_at: decode_timestamp("called_at", &row.called_at)?,
            symbols,
            succeeded: row.succeeded,
        })
    }
}
