//! Environment-driven configuration.
//!
//! Every knob is a `PW_*` variable; a `.env` file in the working directory is
//! loaded first when present.

use std::str::FromStr;

use anyhow::{anyhow, Context};

use pricewatch_core::settings::{MarketSessionSettings, RefreshSettings, Settings};

const DEFAULT_DB_PATH: &str = "./data/pricewatch.db";

/// Which upstream the orchestrator should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Synthetic,
    AlphaVantage,
    CoinGecko,
}

impl FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "synthetic" => Ok(ProviderKind::Synthetic),
            "alpha_vantage" | "alphavantage" => Ok(ProviderKind::AlphaVantage),
            "coingecko" => Ok(ProviderKind::CoinGecko),
            other => Err(anyhow!(
                "Unknown provider '{}' (expected synthetic, alpha_vantage or coingecko)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub provider: ProviderKind,
    pub alpha_vantage_api_key: Option<String>,
    pub coingecko_api_key: Option<String>,
    pub log_format: LogFormat,
    pub settings: Settings,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let provider = match get("PW_PROVIDER") {
            Some(raw) => raw.parse()?,
            None => ProviderKind::Synthetic,
        };

        let log_format = match get("PW_LOG_FORMAT") {
            Some(raw) if raw.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        let session_defaults = MarketSessionSettings::default();
        let market_session = MarketSessionSettings {
            open_time: get("PW_MARKET_OPEN").unwrap_or(session_defaults.open_time),
            close_time: get("PW_MARKET_CLOSE").unwrap_or(session_defaults.close_time),
            timezone: get("PW_MARKET_TZ").unwrap_or(session_defaults.timezone),
            weekend_trading: parse_or("PW_WEEKEND_TRADING", get("PW_WEEKEND_TRADING"), false)?,
        };

        let refresh_defaults = RefreshSettings::default();
        let refresh = RefreshSettings {
            refresh_interval_secs: parse_or(
                "PW_REFRESH_INTERVAL_SECS",
                get("PW_REFRESH_INTERVAL_SECS"),
                refresh_defaults.refresh_interval_secs,
            )?,
            http_timeout_secs: parse_or(
                "PW_HTTP_TIMEOUT_SECS",
                get("PW_HTTP_TIMEOUT_SECS"),
                refresh_defaults.http_timeout_secs,
            )?,
            ..refresh_defaults
        };

        let settings = Settings {
            market_session,
            refresh,
            ..Settings::default()
        };
        settings.validate()?;

        Ok(Self {
            db_path: get("PW_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
            provider,
            alpha_vantage_api_key: get("PW_ALPHA_VANTAGE_API_KEY"),
            coingecko_api_key: get("PW_COINGECKO_API_KEY"),
            log_format,
            settings,
        })
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: '{}'", key, raw)),
        None => Ok(default),
    }
}
