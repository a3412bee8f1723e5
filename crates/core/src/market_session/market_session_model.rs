use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coarse market state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketStatus {
    Open,
    Closed,
    PreMarket,
    AfterHours,
}

impl MarketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarketStatus::Open => "open",
            MarketStatus::Closed => "closed",
            MarketStatus::PreMarket => "pre_market",
            MarketStatus::AfterHours => "after_hours",
        }
    }
}

impl std::fmt::Display for MarketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the session as seen at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub is_open: bool,
    /// Configured local opening time, `HH:MM`.
    pub open_time: String,
    /// Configured local closing time, `HH:MM`.
    pub close_time: String,
    pub timezone: String,
    pub next_open: DateTime<Utc>,
    pub next_close: DateTime<Utc>,
    /// Time until the next open (when closed) or close (when open).
    pub time_to_next: String,
    pub status: MarketStatus,
}
