//! Synthetic market data provider.
//!
//! Generates plausible prices without any network access, for environments
//! without live credentials. Known tickers start from a realistic base price
//! and move by at most ±2%; unknown tickers get a stable base between 10 and
//! 500 derived from a digest of the symbol.
//!
//! Output is deterministic per (symbol, minute): the jitter is seeded from
//! the symbol and the minute bucket of the timestamp.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;

use crate::errors::MarketDataError;
use crate::models::{AssetKind, Quote};
use crate::provider::{MarketDataProvider, ProviderCapabilities, RateLimit};

pub const PROVIDER_ID: &str = "SYNTHETIC";

/// Maximum relative move applied to the base price.
const MAX_JITTER: f64 = 0.02;

const UNKNOWN_MIN_PRICE: f64 = 10.0;
const UNKNOWN_MAX_PRICE: f64 = 500.0;

/// (ticker, base USD price, is crypto)
const KNOWN_PRICES: &[(&str, f64, bool)] = &[
    ("AAPL", 190.0, false),
    ("MSFT", 410.0, false),
    ("GOOGL", 140.0, false),
    ("AMZN", 180.0, false),
    ("META", 470.0, false),
    ("NVDA", 120.0, false),
    ("TSLA", 250.0, false),
    ("SPY", 520.0, false),
    ("VTI", 255.0, false),
    ("QQQ", 440.0, false),
    ("BTC", 65_000.0, true),
    ("ETH", 3_200.0, true),
    ("SOL", 150.0, true),
    ("ADA", 0.45, true),
    ("DOGE", 0.15, true),
    ("XRP", 0.52, true),
    ("LTC", 82.0, true),
];

/// Deterministic, always-available price generator.
#[derive(Debug, Default, Clone)]
pub struct SyntheticProvider;

impl SyntheticProvider {
    pub fn new() -> Self {
        Self
    }

    /// Generate the quote for `symbol` as of `now`.
    pub fn quote_at(&self, symbol: &str, now: DateTime<Utc>) -> Quote {
        let (base, is_crypto) = match lookup_known(symbol) {
            Some((base, is_crypto)) => (base, is_crypto),
            None => {
                let mut rng = StdRng::seed_from_u64(digest_seed(symbol));
                (rng.gen_range(UNKNOWN_MIN_PRICE..UNKNOWN_MAX_PRICE), false)
            }
        };

        let minute = now.timestamp().div_euclid(60);
        let mut rng = StdRng::seed_from_u64(digest_seed(&format!("{}:{}", symbol, minute)));
        let jitter = rng.gen_range(-MAX_JITTER..=MAX_JITTER);

        let price = to_decimal(base * (1.0 + jitter), if base < 1.0 { 6 } else { 2 });

        let price_btc = if is_crypto {
            let btc_usd = to_decimal(btc_base_price(), 2);
            (!btc_usd.is_zero()).then(|| (price / btc_usd).round_dp(8))
        } else {
            None
        };

        Quote::new(symbol, price, now, PROVIDER_ID)
            .with_price_btc(price_btc)
            .with_change_24h(Some(to_decimal(jitter * 100.0, 4)))
    }
}

fn lookup_known(symbol: &str) -> Option<(f64, bool)> {
    KNOWN_PRICES
        .iter()
        .find(|(ticker, _, _)| ticker.eq_ignore_ascii_case(symbol))
        .map(|(_, base, is_crypto)| (*base, *is_crypto))
}

fn btc_base_price() -> f64 {
    lookup_known("BTC").map(|(base, _)| base).unwrap_or(65_000.0)
}

/// First eight bytes of the MD5 digest, as a seed.
fn digest_seed(input: &str) -> u64 {
    let digest = md5::compute(input.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest.0[..8]);
    u64::from_le_bytes(bytes)
}

fn to_decimal(value: f64, dp: u32) -> Decimal {
    Decimal::try_from(value)
        .map(|d| d.round_dp(dp))
        .unwrap_or(Decimal::ZERO)
}

#[async_trait]
impl MarketDataProvider for SyntheticProvider {
    fn id(&self) -> &'static str {
        PROVIDER_ID
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            asset_kinds: &[AssetKind::Equity, AssetKind::Crypto],
            supports_batch: true,
            requires_api_key: false,
        }
    }

    fn rate_limit(&self) -> RateLimit {
        RateLimit::unlimited()
    }

    async fn get_latest_quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
        Ok(self.quote_at(symbol, Utc::now()))
    }

    async fn get_latest_quotes(
        &self,
        symbols: &[String],
    ) -> Result<HashMap<String, Quote>, MarketDataError> {
        let now = Utc::now();
        Ok(symbols
            .iter()
            .map(|s| (s.clone(), self.quote_at(s, now)))
            .collect())
    }
}
