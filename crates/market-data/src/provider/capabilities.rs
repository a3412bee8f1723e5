//! Provider capabilities and rate limiting configuration.
//!
//! This module defines structures for describing what a market data provider
//! can do and how often it may be called.

use crate::models::AssetKind;

/// Describes the capabilities of a market data provider.
#[derive(Clone, Debug)]
pub struct ProviderCapabilities {
    /// Asset kinds this provider prices.
    pub asset_kinds: &'static [AssetKind],

    /// Whether many symbols can be priced in one round trip.
    pub supports_batch: bool,

    /// Whether the provider needs credentials to be useful.
    pub requires_api_key: bool,
}

/// Call budget published by a provider.
///
/// Controls how aggressively we can call a provider to avoid
/// hitting their limits and getting blocked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimit {
    /// Maximum calls allowed in any rolling 60 second window.
    pub requests_per_minute: u32,

    /// Maximum calls allowed per calendar day.
    pub requests_per_day: u32,
}

impl RateLimit {
    /// A budget that never denies a call.
    pub fn unlimited() -> Self {
        Self {
            requests_per_minute: u32::MAX,
            requests_per_day: u32::MAX,
        }
    }
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            requests_per_minute: 60,
            requests_per_day: 10_000,
        }
    }
}
