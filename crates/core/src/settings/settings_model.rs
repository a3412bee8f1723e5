//! Typed configuration for the price engine.
//!
//! Every struct deserializes with defaults for missing fields so partial
//! configuration (a `.env` with only an API key, a test fixture) is valid.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::errors::{Error, Result};

/// Trading-session window used to pick the staleness policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketSessionSettings {
    /// Local opening time, `HH:MM`.
    pub open_time: String,
    /// Local closing time, `HH:MM`.
    pub close_time: String,
    /// IANA timezone name.
    pub timezone: String,
    pub weekend_trading: bool,
}

impl Default for MarketSessionSettings {
    fn default() -> Self {
        Self {
            open_time: "09:30".to_string(),
            close_time: "16:00".to_string(),
            timezone: "America/New_York".to_string(),
            weekend_trading: false,
        }
    }
}

/// Call budget for one provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaLimits {
    pub per_minute: u32,
    pub per_day: u32,
}

impl QuotaLimits {
    pub const fn new(per_minute: u32, per_day: u32) -> Self {
        Self {
            per_minute,
            per_day,
        }
    }

    pub const fn unlimited() -> Self {
        Self::new(u32::MAX, u32::MAX)
    }

    pub fn is_unlimited(&self) -> bool {
        self.per_minute == u32::MAX && self.per_day == u32::MAX
    }
}

impl From<pricewatch_market_data::RateLimit> for QuotaLimits {
    fn from(limit: pricewatch_market_data::RateLimit) -> Self {
        Self::new(limit.requests_per_minute, limit.requests_per_day)
    }
}

/// Refresh cadence and cache thresholds, in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshSettings {
    /// Maximum cache age while the market is open.
    pub refresh_interval_secs: u64,
    /// Maximum cache age while the market is closed.
    pub closed_market_threshold_secs: u64,
    /// Freshness window for single crypto lookups.
    pub crypto_cache_ttl_secs: u64,
    pub http_timeout_secs: u64,
    /// `force_refresh_needed` trips once the cache is this many intervals old.
    pub force_refresh_multiplier: u32,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 300,
            closed_market_threshold_secs: 12 * 60 * 60,
            crypto_cache_ttl_secs: 300,
            http_timeout_secs: 30,
            force_refresh_multiplier: 4,
        }
    }
}

impl RefreshSettings {
    pub fn refresh_interval(&self) -> chrono::Duration {
        chrono::Duration::seconds(saturating_secs(self.refresh_interval_secs))
    }

    pub fn closed_market_threshold(&self) -> chrono::Duration {
        chrono::Duration::seconds(saturating_secs(self.closed_market_threshold_secs))
    }

    pub fn crypto_cache_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(saturating_secs(self.crypto_cache_ttl_secs))
    }

    pub fn force_refresh_threshold(&self) -> chrono::Duration {
        chrono::Duration::seconds(
            saturating_secs(self.refresh_interval_secs)
                .saturating_mul(i64::from(self.force_refresh_multiplier)),
        )
    }

    pub fn http_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.http_timeout_secs)
    }
}

fn saturating_secs(secs: u64) -> i64 {
    i64::try_from(secs).unwrap_or(i64::MAX / 1_000)
}

/// Full engine configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub market_session: MarketSessionSettings,
    pub refresh: RefreshSettings,
    /// Per-provider overrides of the limits each provider advertises.
    pub quota_overrides: HashMap<String, QuotaLimits>,
}

impl Settings {
    /// Reject values that would make the refresh policy meaningless.
    pub fn validate(&self) -> Result<()> {
        let refresh = &self.refresh;
        if refresh.refresh_interval_secs == 0 {
            return Err(Error::InvalidConfigValue(
                "refresh_interval_secs must be greater than zero".to_string(),
            ));
        }
        if refresh.closed_market_threshold_secs < refresh.refresh_interval_secs {
            return Err(Error::InvalidConfigValue(format!(
                "closed_market_threshold_secs ({}) must not be shorter than refresh_interval_secs ({})",
                refresh.closed_market_threshold_secs, refresh.refresh_interval_secs
            )));
        }
        if refresh.force_refresh_multiplier == 0 {
            return Err(Error::InvalidConfigValue(
                "force_refresh_multiplier must be at least 1".to_string(),
            ));
        }
        if refresh.http_timeout_secs == 0 {
            return Err(Error::InvalidConfigValue(
                "http_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Limits for `provider_id`, preferring an override over the advertised ones.
    pub fn quota_for(&self, provider_id: &str, advertised: QuotaLimits) -> QuotaLimits {
        self.quota_overrides
            .get(provider_id)
            .copied()
            .unwrap_or(advertised)
    }
}
