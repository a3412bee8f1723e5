//! Column codecs and query helpers shared by the repositories.
//!
//! Timestamps are stored as fixed-width RFC 3339 text in UTC (microsecond
//! precision, `Z` suffix) so that string order matches time order and range
//! filters can compare columns directly. Decimals are stored as their
//! canonical text form to avoid float rounding.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;

use crate::errors::StorageError;

/// Parameters per `IN (...)` query, below SQLite's default variable limit.
pub const SQLITE_MAX_PARAMS_CHUNK: usize = 500;

/// Split `items` into slices small enough for one `IN (...)` query.
pub fn chunk_for_sqlite<T>(items: &[T]) -> impl Iterator<Item = &[T]> {
    items.chunks(SQLITE_MAX_PARAMS_CHUNK)
}

pub fn encode_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_timestamp(column: &str, raw: &str) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StorageError::CorruptRow(format!("{}: '{}' ({})", column, raw, e)))
}

pub fn encode_decimal(value: Decimal) -> String {
    value.normalize().to_string()
}

pub fn decode_decimal(column: &str, raw: &str) -> Result<Decimal, StorageError> {
    Decimal::from_str(raw)
        .map_err(|e| StorageError::CorruptRow(format!("{}: '{}' ({})", column, raw, e)))
}

pub fn decode_optional_decimal(
    column: &str,
    raw: Option<&str>,
) -> Result<Option<Decimal>, StorageError> {
    raw.map(|r| decode_decimal(column, r)).transpose()
}
