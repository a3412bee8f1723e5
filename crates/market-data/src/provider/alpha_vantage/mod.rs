//! Alpha Vantage market data provider implementation.
//!
//! Prices equities one symbol at a time through the GLOBAL_QUOTE endpoint.
//!
//! Note: Alpha Vantage free tier is limited to 5 API calls per minute
//! and 25 calls per day.

mod models;

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use rust_decimal::Decimal;
use tracing::{debug, warn};

use self::models::{GlobalQuote, GlobalQuoteResponse};
use super::http::{build_client, excerpt, send_for_text, DEFAULT_TIMEOUT};
use crate::errors::MarketDataError;
use crate::models::{AssetKind, Quote};
use crate::provider::{MarketDataProvider, ProviderCapabilities, RateLimit};

const BASE_URL: &str = "https://www.alphavantage.co/query";
pub const PROVIDER_ID: &str = "ALPHA_VANTAGE";

/// Alpha Vantage market data provider.
///
/// Single-symbol oriented; free tier is limited to 5 calls per minute.
pub struct AlphaVantageProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

impl AlphaVantageProvider {
    /// Create a new Alpha Vantage provider with the given API key.
    pub fn new(api_key: String) -> Self {
        Self {
            client: build_client(DEFAULT_TIMEOUT),
            api_key,
            base_url: BASE_URL.to_string(),
        }
    }

    /// Replace the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = build_client(timeout);
        self
    }

    /// Point the provider at a different endpoint (proxies, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Make a request to the Alpha Vantage API.
    async fn fetch(&self, params: &[(&str, &str)]) -> Result<String, MarketDataError> {
        let mut all_params: Vec<(&str, &str)> = params.to_vec();
        all_params.push(("apikey", &self.api_key));

        let url = reqwest::Url::parse_with_params(&self.base_url, &all_params).map_err(|e| {
            MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to build URL: {}", e),
            }
        })?;

        debug!(
            "Alpha Vantage request: {}",
            url.as_str().replace(&self.api_key, "***")
        );

        send_for_text(self.client.get(url), PROVIDER_ID).await
    }

    /// Check for API-level errors reported inside a successful response.
    fn check_api_error(response: &GlobalQuoteResponse, symbol: &str) -> Result<(), MarketDataError> {
        if let Some(ref msg) = response.error_message {
            if msg.contains("Invalid API call") {
                return Err(MarketDataError::NoData(symbol.to_string()));
            }
            return Err(MarketDataError::ProviderError {
                provider: PROVIDER_ID.to_string(),
                message: excerpt(msg),
            });
        }

        for msg in [&response.note, &response.information].into_iter().flatten() {
            if is_throttle_message(msg) {
                warn!("Alpha Vantage throttled the request: {}", msg);
                return Err(MarketDataError::RateLimited {
                    provider: PROVIDER_ID.to_string(),
                });
            }
            if response.global_quote.is_none() {
                return Err(MarketDataError::ProviderError {
                    provider: PROVIDER_ID.to_string(),
                    message: excerpt(msg),
                });
            }
            warn!("Alpha Vantage note: {}", msg);
        }

        Ok(())
    }

    /// Parse a decimal value from a string, tolerating a trailing percent sign.
    fn parse_decimal(s: &str) -> Option<Decimal> {
        Decimal::from_str(s.trim().trim_end_matches('%')).ok()
    }

    /// Convert a GLOBAL_QUOTE body into a quote.
    fn parse_global_quote(text: &str, symbol: &str) -> Result<Quote, MarketDataError> {
        let response: GlobalQuoteResponse =
            serde_json::from_str(text).map_err(|e| MarketDataError::Parse {
                provider: PROVIDER_ID.to_string(),
                message: format!("Failed to parse GLOBAL_QUOTE response: {}", e),
            })?;

        Self::check_api_error(&response, symbol)?;

        let global_quote: GlobalQuote = match response.global_quote {
            Some(q) if !q.is_empty() => q,
            _ => return Err(MarketDataError::NoData(symbol.to_string())),
        };

        let raw_price = global_quote.price.as_deref().ok_or_else(|| MarketDataError::Parse {
            provider: PROVIDER_ID.to_string(),
            message: format!("Missing price field for {}", symbol),
        })?;

        let price = Self::parse_decimal(raw_price).ok_or_else(|| MarketDataError::Parse {
            provider: PROVIDER_ID.to_string(),
            message: format!("Invalid price '{}' for {}", raw_price, symbol),
        })?;

        let volume = global_quote.volume.as_deref().and_then(Self::parse_decimal);
        let change = global_quote
            .change_percent
            .as_deref()
            .and_then(Self::parse_decimal);

        debug!(
            "Alpha Vantage: {} = {} (trading day {:?})",
            symbol, price, global_quote.latest_trading_day
        );

        Ok(Quote::new(symbol, price, Utc::now(), PROVIDER_ID)
            .with_volume_24h(volume)
            .with_change_24h(change))
    }
}

fn is_throttle_message(msg: &str) -> bool {
    msg.contains("API call frequency")
        || msg.contains("rate limit")
        || msg.contains("requests per day")
        || msg.contains("calls per minute")
}

#[async_trait]
impl MarketDataProvider for AlphaVantageProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            asset_kinds: &[AssetKind::Equity],
            supports_batch: false,
            requires_api_key: true,
        }
    }

    fn rate_limit(&self) -> RateLimit {
        RateLimit {
            requests_per_minute: 5, // Free tier is very limited
            requests_per_day: 25,
        }
    }

    async fn get_latest_quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
        debug!("Fetching latest quote for {} from Alpha Vantage", symbol);
        let params = [("function", "GLOBAL_QUOTE"), ("symbol", symbol)];
        let text = self.fetch(&params).await?;
        Self::parse_global_quote(&text, symbol)
    }
}
