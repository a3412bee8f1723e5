//! Periodic bulk refresh for `pricewatch watch`.

use std::sync::Arc;

use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{info, warn};

use pricewatch_core::refresh::RefreshServiceTrait;
use pricewatch_core::utils::time_utils::format_duration_human;

use crate::main_lib::AppState;

/// Refresh every tracked symbol now and then every `every`, until Ctrl-C.
///
/// Cached symbols that are still fresh are served from the cache, so a tick
/// outside market hours costs no provider calls.
pub async fn run_watch(state: Arc<AppState>, every: Duration) -> anyhow::Result<()> {
    info!(
        "Refresh loop started ({} interval)",
        format_duration_human(chrono::Duration::from_std(every)?)
    );

    // First tick is immediate.
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => run_scheduled_refresh(&state).await,
            _ = tokio::signal::ctrl_c() => {
                info!("Refresh loop stopped");
                return Ok(());
            }
        }
    }
}

async fn run_scheduled_refresh(state: &Arc<AppState>) {
    match state.orchestrator.refresh_all().await {
        Ok(summary) => {
            // No price at all, not even a cached one.
            for failure in summary.results.iter().filter(|r| r.new_price.is_none()) {
                warn!(
                    "{}: {}",
                    failure.symbol,
                    failure.error.as_deref().unwrap_or("no price")
                );
            }
            println!("{}", summary.summary());
        }
        Err(e) => warn!("Scheduled refresh failed: {}", e),
    }
}
