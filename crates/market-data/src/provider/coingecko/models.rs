//! CoinGecko API response structures.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Deserialize;

/// `/simple/price` response: coin id to its price record.
pub(super) type SimplePriceResponse = HashMap<String, SimplePrice>;

/// Price record for one coin.
///
/// Fields appear only when requested through the matching `include_*`
/// query parameter; a coin with no `usd` key is unusable. Amounts are read
/// from the JSON number text, never through `f64`.
#[derive(Debug, Default, Deserialize)]
pub(super) struct SimplePrice {
    #[serde(default, with = "rust_decimal::serde::arbitrary_precision_option")]
    pub usd: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::arbitrary_precision_option")]
    pub btc: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::arbitrary_precision_option")]
    pub usd_market_cap: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::arbitrary_precision_option")]
    pub usd_24h_vol: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::arbitrary_precision_option")]
    pub usd_24h_change: Option<Decimal>,
    /// Seconds since epoch; may carry a fractional part.
    pub last_updated_at: Option<f64>,
}

/// Error body returned with non-2xx statuses and some throttled 200s.
#[derive(Debug, Deserialize)]
pub(super) struct ErrorResponse {
    pub status: Option<ErrorStatus>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ErrorStatus {
    pub error_code: Option<u16>,
    pub error_message: Option<String>,
}
