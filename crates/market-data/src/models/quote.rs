use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Market data quote
///
/// A priced snapshot of an instrument at a point in time. Quotes are never
/// mutated after creation; a new fetch produces a new quote.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Canonical (upper-case) symbol the caller asked for
    pub symbol: String,

    /// Price in the primary denomination (USD)
    pub price: Decimal,

    /// Price in the secondary denomination (BTC), crypto only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_btc: Option<Decimal>,

    /// Market capitalization in USD
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<Decimal>,

    /// Traded volume over the last 24 hours
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_24h: Option<Decimal>,

    /// Price change over the last 24 hours, in percent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_24h: Option<Decimal>,

    /// Timestamp the provider attached to the price
    pub timestamp: DateTime<Utc>,

    /// Provider that produced the quote (ALPHA_VANTAGE, COINGECKO, SYNTHETIC)
    pub source: String,
}

impl Quote {
    /// Create a new quote with minimal required fields
    pub fn new(symbol: &str, price: Decimal, timestamp: DateTime<Utc>, source: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            price,
            price_btc: None,
            market_cap: None,
            volume_24h: None,
            change_24h: None,
            timestamp,
            source: source.to_string(),
        }
    }

    pub fn with_price_btc(mut self, price_btc: Option<Decimal>) -> Self {
        self.price_btc = price_btc;
        self
    }

    pub fn with_market_cap(mut self, market_cap: Option<Decimal>) -> Self {
        self.market_cap = market_cap;
        self
    }

    pub fn with_volume_24h(mut self, volume_24h: Option<Decimal>) -> Self {
        self.volume_24h = volume_24h;
        self
    }

    pub fn with_change_24h(mut self, change_24h: Option<Decimal>) -> Self {
        self.change_24h = change_24h;
        self
    }
}
