//! Property-based integration tests for the staleness policy and refresh
//! summaries.
//!
//! These tests verify that universal properties hold across all valid inputs,
//! using the `proptest` crate for random test case generation.

use std::collections::HashMap;

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;

use pricewatch_core::market_session::MarketSessionTracker;
use pricewatch_core::quotes::{CacheEntry, FetchedQuote};
use pricewatch_core::refresh::{CacheStatus, RefreshResult, RefreshSummary};
use pricewatch_core::settings::MarketSessionSettings;
use pricewatch_market_data::{ErrorKind, Quote};

// =============================================================================
// Generators
// =============================================================================

/// Any instant across 2024, covering weekdays, weekends and DST changes.
fn arb_instant() -> impl Strategy<Value = DateTime<Utc>> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap().timestamp();
    (0i64..366 * 24 * 3600).prop_map(move |offset| {
        Utc.timestamp_opt(start + offset, 0).unwrap()
    })
}

/// Cache age between zero and three days, in seconds.
fn arb_age_secs() -> impl Strategy<Value = i64> {
    0i64..3 * 24 * 3600
}

fn arb_interval_secs() -> impl Strategy<Value = i64> {
    1i64..4 * 3600
}

fn arb_session_settings() -> impl Strategy<Value = MarketSessionSettings> {
    (
        prop_oneof![
            Just("America/New_York"),
            Just("Europe/London"),
            Just("Asia/Tokyo"),
            Just("UTC"),
        ],
        any::<bool>(),
    )
        .prop_map(|(tz, weekend_trading)| MarketSessionSettings {
            timezone: tz.to_string(),
            weekend_trading,
            ..Default::default()
        })
}

fn arb_error_kind() -> impl Strategy<Value = ErrorKind> {
    prop_oneof![
        Just(ErrorKind::NetworkError),
        Just(ErrorKind::HttpStatusError),
        Just(ErrorKind::ParseError),
        Just(ErrorKind::RateLimited),
        Just(ErrorKind::NoData),
        Just(ErrorKind::InvalidSymbol),
        Just(ErrorKind::ProviderError),
    ]
}

/// Outcome of one symbol: fresh, cached, degraded or failed.
fn arb_result() -> impl Strategy<Value = RefreshResult> {
    (0u8..4, 1u32..100_000, arb_error_kind(), "[A-Z]{1,5}").prop_map(
        |(outcome, cents, kind, symbol)| {
            let at = Utc.with_ymd_and_hms(2024, 5, 10, 14, 0, 0).unwrap();
            let price = Decimal::new(i64::from(cents), 2);
            let entry = CacheEntry::new(Quote::new(&symbol, price, at, "TEST"), at);
            match outcome {
                0 => RefreshResult::from_fetched(
                    &symbol,
                    None,
                    &FetchedQuote::fresh(entry.quote.clone(), at),
                    at,
                ),
                1 => RefreshResult::from_fetched(&symbol, Some(&entry), &FetchedQuote::cached(entry.clone()), at),
                2 => RefreshResult::from_fetched(
                    &symbol,
                    Some(&entry),
                    &FetchedQuote::degraded(entry.clone(), kind, "degraded"),
                    at,
                ),
                _ => RefreshResult::failed(&symbol, None, kind, "failed", at),
            }
        },
    )
}

// =============================================================================
// Staleness policy
// =============================================================================

proptest! {
    /// Nothing cached always needs a fetch, whatever the market state.
    #[test]
    fn prop_no_cache_always_refreshes(
        settings in arb_session_settings(),
        now in arb_instant(),
        interval in arb_interval_secs(),
    ) {
        let tracker = MarketSessionTracker::new(&settings);
        prop_assert!(tracker.should_refresh(None, Duration::seconds(interval), now));
    }

    /// Open market compares against the interval; closed against 12 hours.
    #[test]
    fn prop_threshold_follows_market_state(
        settings in arb_session_settings(),
        now in arb_instant(),
        age in arb_age_secs(),
        interval in arb_interval_secs(),
    ) {
        let tracker = MarketSessionTracker::new(&settings);
        let interval = Duration::seconds(interval);
        let last_update = now - Duration::seconds(age);
        let expected = if tracker.is_open(now) {
            Duration::seconds(age) > interval
        } else {
            Duration::seconds(age) > Duration::hours(12)
        };
        prop_assert_eq!(tracker.should_refresh(Some(last_update), interval, now), expected);
    }

    /// Remaining wait never exceeds the interval and is zero whenever a
    /// refresh is due while open.
    #[test]
    fn prop_seconds_until_next_refresh_bounded(
        now in arb_instant(),
        age in arb_age_secs(),
        interval in arb_interval_secs(),
    ) {
        let tracker = MarketSessionTracker::new(&MarketSessionSettings::default());
        let wait = tracker.seconds_until_next_refresh(
            Some(now - Duration::seconds(age)),
            Duration::seconds(interval),
            now,
        );
        prop_assert!(wait >= 0);
        prop_assert!(wait <= interval);
        if !tracker.is_open(now) {
            prop_assert_eq!(wait, 0);
        }
    }

    /// The next open and close always lie ahead and the status agrees with `is_open`.
    #[test]
    fn prop_session_status_consistent(
        settings in arb_session_settings(),
        now in arb_instant(),
    ) {
        let tracker = MarketSessionTracker::new(&settings);
        let status = tracker.session_status(now);
        prop_assert_eq!(status.is_open, tracker.is_open(now));
        prop_assert!(status.next_close > now);
        prop_assert!(status.next_open > now - Duration::hours(1));
    }
}

// =============================================================================
// Summaries and status
// =============================================================================

proptest! {
    /// Updated plus failed always equals total, and every non-updated
    /// result carries an error kind.
    #[test]
    fn prop_summary_counts_add_up(results in prop::collection::vec(arb_result(), 0..40)) {
        let at = Utc.with_ymd_and_hms(2024, 5, 10, 14, 0, 0).unwrap();
        let summary = RefreshSummary::from_results("TEST", at, results, 12);
        prop_assert_eq!(
            summary.updated_symbols + summary.failed_symbols,
            summary.total_symbols
        );
        prop_assert_eq!(summary.results.len(), summary.total_symbols);
        for result in &summary.results {
            prop_assert!(result.updated || result.error_type.is_some());
        }
    }

    /// Without an intervening refresh, later status reads never report a
    /// younger cache.
    #[test]
    fn prop_status_age_non_decreasing(
        ages in prop::collection::vec(0i64..5_000, 0..10),
        later in 0i64..10_000,
    ) {
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 14, 0, 0).unwrap();
        let symbols: Vec<String> = (0..ages.len()).map(|i| format!("S{}", i)).collect();
        let entries: HashMap<String, CacheEntry> = symbols
            .iter()
            .zip(&ages)
            .map(|(symbol, age)| {
                let at = now - Duration::seconds(*age);
                (symbol.clone(), CacheEntry::new(Quote::new(symbol, Decimal::ONE, at, "TEST"), at))
            })
            .collect();

        let status_at = |instant| {
            CacheStatus::compute(
                &symbols,
                &entries,
                "TEST",
                true,
                Duration::minutes(5),
                Duration::minutes(20),
                instant,
            )
        };
        let first = status_at(now);
        let second = status_at(now + Duration::seconds(later));
        prop_assert!(second.cache_age_minutes >= first.cache_age_minutes);
        prop_assert!(second.stale_count >= first.stale_count);
    }
}
