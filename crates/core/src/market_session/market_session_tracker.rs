use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use log::{debug, warn};

use super::market_session_model::{MarketStatus, SessionStatus};
use crate::settings::MarketSessionSettings;
use crate::utils::time_utils::{format_duration_human, local_to_utc};

/// Closed-market staleness threshold, in hours.
const CLOSED_MARKET_THRESHOLD_HOURS: i64 = 12;

/// Interprets a configured trading window.
///
/// Construction never fails: an unknown timezone falls back to UTC, and an
/// unparsable boundary is replaced by the current local time whenever it is
/// consulted. Both fallbacks are logged.
#[derive(Debug, Clone)]
pub struct MarketSessionTracker {
    open_time: Option<NaiveTime>,
    close_time: Option<NaiveTime>,
    open_label: String,
    close_label: String,
    timezone: Tz,
    weekend_trading: bool,
    closed_market_threshold: Duration,
}

impl MarketSessionTracker {
    pub fn new(settings: &MarketSessionSettings) -> Self {
        let timezone = settings.timezone.trim().parse::<Tz>().unwrap_or_else(|e| {
            warn!(
                "Unknown market timezone '{}' ({}), falling back to UTC",
                settings.timezone, e
            );
            Tz::UTC
        });

        Self {
            open_time: parse_session_time(&settings.open_time, "open"),
            close_time: parse_session_time(&settings.close_time, "close"),
            open_label: settings.open_time.trim().to_string(),
            close_label: settings.close_time.trim().to_string(),
            timezone,
            weekend_trading: settings.weekend_trading,
            closed_market_threshold: Duration::hours(CLOSED_MARKET_THRESHOLD_HOURS),
        }
    }

    /// Replace the 12 hour closed-market threshold.
    pub fn with_closed_market_threshold(mut self, threshold: Duration) -> Self {
        self.closed_market_threshold = threshold;
        self
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn closed_market_threshold(&self) -> Duration {
        self.closed_market_threshold
    }

    fn is_trading_day(&self, date: NaiveDate) -> bool {
        self.weekend_trading || !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
    }

    /// Session boundaries for the local instant, substituting the local time
    /// of day for any boundary that failed to parse.
    fn boundaries(&self, local_time: NaiveTime) -> (NaiveTime, NaiveTime) {
        (
            self.open_time.unwrap_or(local_time),
            self.close_time.unwrap_or(local_time),
        )
    }

    fn next_trading_day(&self, after: NaiveDate) -> NaiveDate {
        let mut date = after;
        for _ in 0..7 {
            match date.succ_opt() {
                Some(next) => date = next,
                None => break,
            }
            if self.is_trading_day(date) {
                return date;
            }
        }
        date
    }

    /// Whether the market trades at `now`.
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        let local = now.with_timezone(&self.timezone);
        if !self.is_trading_day(local.date_naive()) {
            return false;
        }
        let time = local.time();
        let (open, close) = self.boundaries(time);
        open <= time && time < close
    }

    /// Full session picture at `now`, including the next transitions.
    pub fn session_status(&self, now: DateTime<Utc>) -> SessionStatus {
        let local = now.with_timezone(&self.timezone);
        let date = local.date_naive();
        let time = local.time();
        let (open, close) = self.boundaries(time);

        let trading_today = self.is_trading_day(date);
        let is_open = trading_today && open <= time && time < close;
        let before_open_today = trading_today && time < open;

        let status = if is_open {
            MarketStatus::Open
        } else if !trading_today {
            MarketStatus::Closed
        } else if before_open_today {
            MarketStatus::PreMarket
        } else {
            MarketStatus::AfterHours
        };

        let next_open_date = if before_open_today {
            date
        } else {
            self.next_trading_day(date)
        };
        let next_open = local_to_utc(self.timezone, next_open_date, open);
        let next_close = if is_open || before_open_today {
            local_to_utc(self.timezone, date, close)
        } else {
            local_to_utc(self.timezone, next_open_date, close)
        };

        let until = if is_open {
            next_close - now
        } else {
            next_open - now
        };

        SessionStatus {
            is_open,
            open_time: self.open_label.clone(),
            close_time: self.close_label.clone(),
            timezone: self.timezone.name().to_string(),
            next_open,
            next_close,
            time_to_next: format_duration_human(until),
            status,
        }
    }

    /// Whether a cached value last updated at `last_update` should be refetched.
    ///
    /// Absent data always needs a fetch. While open the cache may be at most
    /// `interval` old; while closed it may be up to the closed-market threshold.
    pub fn should_refresh(
        &self,
        last_update: Option<DateTime<Utc>>,
        interval: Duration,
        now: DateTime<Utc>,
    ) -> bool {
        let Some(last_update) = last_update else {
            return true;
        };
        let age = now - last_update;
        let refresh = if self.is_open(now) {
            age > interval
        } else {
            age > self.closed_market_threshold
        };
        debug!(
            "Staleness check: age {}s, open {}, refresh {}",
            age.num_seconds(),
            self.is_open(now),
            refresh
        );
        refresh
    }

    /// Seconds until the open-market interval elapses; zero when closed,
    /// when nothing is cached, or when the interval is already over.
    pub fn seconds_until_next_refresh(
        &self,
        last_update: Option<DateTime<Utc>>,
        interval: Duration,
        now: DateTime<Utc>,
    ) -> i64 {
        if !self.is_open(now) {
            return 0;
        }
        match last_update {
            Some(last_update) => (interval - (now - last_update)).num_seconds().max(0),
            None => 0,
        }
    }
}

fn parse_session_time(raw: &str, boundary: &str) -> Option<NaiveTime> {
    let trimmed = raw.trim();
    match NaiveTime::parse_from_str(trimmed, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
    {
        Ok(time) => Some(time),
        Err(e) => {
            warn!(
                "Invalid market {} time '{}' ({}), using the current time for that boundary",
                boundary, raw, e
            );
            None
        }
    }
}
