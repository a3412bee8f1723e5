//! Trading-session awareness.
//!
//! [`MarketSessionTracker`] answers whether the configured market is open and
//! turns that into the cache staleness policy: tight while trading, loose
//! while closed.

mod market_session_model;
mod market_session_tracker;

pub use market_session_model::{MarketStatus, SessionStatus};
pub use market_session_tracker::MarketSessionTracker;
