//! CoinGecko market data provider implementation.
//!
//! Prices cryptocurrencies in batches through `/simple/price`:
//! one request carries every requested coin id and returns USD and BTC
//! prices plus market cap, 24h volume and 24h change.
//!
//! Friendly tickers ("BTC") are mapped to CoinGecko coin ids ("bitcoin")
//! through a static table; unmapped tickers are sent as their own id.
//!
//! API documentation: https://docs.coingecko.com/reference/simple-price

mod models;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use tracing::{debug, warn};

use self::models::{ErrorResponse, SimplePrice, SimplePriceResponse};
use super::http::{build_client, send_for_text, DEFAULT_TIMEOUT};
use crate::errors::MarketDataError;
use crate::models::{AssetKind, Quote};
use crate::provider::{MarketDataProvider, ProviderCapabilities, RateLimit};

const BASE_URL: &str = "https://api.coingecko.com/api/v3";
pub const PROVIDER_ID: &str = "COINGECKO";

/// Ticker to CoinGecko coin id.
const COIN_IDS: &[(&str, &str)] = &[
    ("BTC", "bitcoin"),
    ("ETH", "ethereum"),
    ("SOL", "solana"),
    ("ADA", "cardano"),
    ("DOT", "polkadot"),
    ("DOGE", "dogecoin"),
    ("XRP", "ripple"),
    ("LTC", "litecoin"),
    ("BNB", "binancecoin"),
    ("USDT", "tether"),
    ("USDC", "usd-coin"),
    ("MATIC", "matic-network"),
    ("AVAX", "avalanche-2"),
    ("LINK", "chainlink"),
    ("ATOM", "cosmos"),
    ("XLM", "stellar"),
    ("TRX", "tron"),
    ("BCH", "bitcoin-cash"),
    ("UNI", "uniswap"),
    ("XMR", "monero"),
];

/// Resolve a ticker to the coin id CoinGecko expects.
///
/// Falls back to the lower-cased ticker itself when it is not in the table.
pub fn coin_id_for(symbol: &str) -> String {
    let upper = symbol.to_ascii_uppercase();
    COIN_IDS
        .iter()
        .find(|(ticker, _)| *ticker == upper)
        .map(|(_, id)| id.to_string())
        .unwrap_or_else(|| symbol.to_ascii_lowercase())
}

/// CoinGecko market data provider.
///
/// Batch oriented; works without a key on the public tier, and sends the
/// demo key header when one is configured.
pub struct CoinGeckoProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl CoinGeckoProvider {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            client: build_client(DEFAULT_TIMEOUT),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: BASE_URL.to_string(),
        }
    }

    /// Replace the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = build_client(timeout);
        self
    }

    /// Point the provider at a different endpoint (pro API, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fetch `/simple/price` for a set of coin ids.
    async fn fetch_simple_price(&self, ids: &[String]) -> Result<String, MarketDataError> {
        let url = format!("{}/simple/price", self.base_url);
        let joined = ids.join(",");

        let mut request = self.client.get(&url).query(&[
            ("ids", joined.as_str()),
            ("vs_currencies", "usd,btc"),
            ("include_market_cap", "true"),
            ("include_24hr_vol", "true"),
            ("include_24hr_change", "true"),
            ("include_last_updated_at", "true"),
        ]);

        if let Some(ref key) = self.api_key {
            request = request.header("x-cg-demo-api-key", key);
        }

        debug!("CoinGecko request: /simple/price ids={}", joined);

        send_for_text(request, PROVIDER_ID).await
    }

    /// Parse a `/simple/price` body into quotes keyed by the requested symbols.
    ///
    /// `wanted` maps each coin id to the symbols that asked for it. Coins the
    /// body does not mention are left out; a body that is not the expected
    /// shape is a `Parse` error for the whole batch.
    fn parse_simple_price(
        text: &str,
        wanted: &HashMap<String, Vec<String>>,
    ) -> Result<HashMap<String, Quote>, MarketDataError> {
        if let Ok(ErrorResponse {
            status: Some(status),
        }) = serde_json::from_str::<ErrorResponse>(text)
        {
            if status.error_code == Some(429) {
                return Err(MarketDataError::RateLimited {
                    provider: PROVIDER_ID.to_string(),
                });
            }
            return Err(MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: status
                    .error_message
                    .unwrap_or_else(|| "Unknown CoinGecko error".to_string()),
            });
        }

        let response: SimplePriceResponse =
            serde_json::from_str(text).map_err(|e| MarketDataError::Parse {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to parse simple/price response: {}", e),
            })?;

        let mut quotes = HashMap::new();
        for (coin_id, symbols) in wanted {
            let Some(record) = response.get(coin_id) else {
                debug!("CoinGecko: no data for coin id '{}'", coin_id);
                continue;
            };

            let Some(quote_template) = Self::to_quote(record, coin_id) else {
                warn!("CoinGecko: record for '{}' has no usable USD price", coin_id);
                continue;
            };

            for symbol in symbols {
                let mut quote = quote_template.clone();
                quote.symbol = symbol.clone();
                quotes.insert(symbol.clone(), quote);
            }
        }

        Ok(quotes)
    }

    fn to_quote(record: &SimplePrice, coin_id: &str) -> Option<Quote> {
        let price = record.usd?;
        let timestamp = record
            .last_updated_at
            .and_then(epoch_seconds_to_utc)
            .unwrap_or_else(Utc::now);

        Some(
            Quote::new(coin_id, price, timestamp, PROVIDER_ID)
                .with_price_btc(record.btc)
                .with_market_cap(record.usd_market_cap)
                .with_volume_24h(record.usd_24h_vol)
                .with_change_24h(record.usd_24h_change),
        )
    }

    /// Group requested symbols by the coin id they resolve to.
    fn group_by_coin_id(symbols: &[String]) -> HashMap<String, Vec<String>> {
        let mut wanted: HashMap<String, Vec<String>> = HashMap::new();
        for symbol in symbols {
            wanted
                .entry(coin_id_for(symbol))
                .or_default()
                .push(symbol.clone());
        }
        wanted
    }
}

/// Fractional epoch seconds are truncated to whole seconds before conversion.
fn epoch_seconds_to_utc(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    Utc.timestamp_opt(seconds.trunc() as i64, 0).single()
}

#[async_trait]
impl MarketDataProvider for CoinGeckoProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            asset_kinds: &[AssetKind::Crypto],
            supports_batch: true,
            requires_api_key: false,
        }
    }

    fn rate_limit(&self) -> RateLimit {
        RateLimit {
            requests_per_minute: 30,
            requests_per_day: 10_000,
        }
    }

    async fn get_latest_quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
        let mut quotes = self.get_latest_quotes(&[symbol.to_string()]).await?;
        quotes
            .remove(symbol)
            .ok_or_else(|| MarketDataError::NoData(symbol.to_string()))
    }

    async fn get_latest_quotes(
        &self,
        symbols: &[String],
    ) -> Result<HashMap<String, Quote>, MarketDataError> {
        if symbols.is_empty() {
            return Ok(HashMap::new());
        }

        let wanted = Self::group_by_coin_id(symbols);
        let mut ids: Vec<String> = wanted.keys().cloned().collect();
        ids.sort();

        let text = self.fetch_simple_price(&ids).await?;
        let quotes = Self::parse_simple_price(&text, &wanted)?;

        debug!(
            "CoinGecko: priced {} of {} requested symbols",
            quotes.len(),
            symbols.len()
        );

        Ok(quotes)
    }
}
