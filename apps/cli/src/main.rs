mod config;
mod main_lib;
mod scheduler;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use serde::Serialize;

use pricewatch_core::holdings::{value_holdings, HoldingsRepositoryTrait, NewHolding};
use pricewatch_core::quotes::PriceCacheStore;
use pricewatch_core::refresh::RefreshServiceTrait;
use pricewatch_market_data::AssetKind;

use config::Config;
use main_lib::{build_state, init_tracing, AppState};

#[derive(Parser)]
#[command(name = "pricewatch")]
#[command(about = "Market-aware price cache for equities and crypto")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Get the current price of one symbol, refreshing it if stale
    Quote { symbol: String },

    /// Refresh every tracked symbol once
    Refresh,

    /// Cache health across tracked symbols
    Status,

    /// Market session state
    Session,

    /// Cached prices recorded for one symbol, newest first
    History {
        symbol: String,
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },

    /// Provider calls charged against the quota recently
    Calls {
        /// Provider id (defaults to the active provider)
        #[arg(long)]
        provider: Option<String>,
        /// How far back to look, in minutes
        #[arg(long, default_value_t = 1440)]
        minutes: i64,
    },

    /// Manage tracked holdings
    #[command(subcommand)]
    Holdings(HoldingsCommands),

    /// Refresh tracked symbols periodically until interrupted
    Watch {
        /// Seconds between refreshes (defaults to PW_REFRESH_INTERVAL_SECS)
        #[arg(long)]
        every: Option<u64>,
    },
}

#[derive(Subcommand)]
enum HoldingsCommands {
    /// Track a position
    Add {
        symbol: String,
        quantity: Decimal,
        /// equity or crypto
        #[arg(long, default_value = "equity")]
        kind: AssetKind,
    },
    /// List positions with their cached prices
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;
    init_tracing(config.log_format);
    let state = build_state(&config).await?;

    match cli.command {
        Commands::Quote { symbol } => print_json(&state.orchestrator.refresh_symbol(&symbol).await),
        Commands::Refresh => print_json(&state.orchestrator.refresh_all().await?),
        Commands::Status => print_status(&state),
        Commands::Session => print_json(&state.orchestrator.session_status()),
        Commands::History { symbol, limit } => print_json(&state.price_history(&symbol, limit)?),
        Commands::Calls { provider, minutes } => print_json(
            &state.recent_calls(provider.as_deref(), chrono::Duration::minutes(minutes.max(0)))?,
        ),
        Commands::Holdings(HoldingsCommands::Add {
            symbol,
            quantity,
            kind,
        }) => {
            let holding = state
                .holdings
                .add(NewHolding {
                    symbol,
                    quantity,
                    asset_kind: kind,
                })
                .await?;
            print_json(&holding)
        }
        Commands::Holdings(HoldingsCommands::List) => {
            let holdings = state.holdings.list()?;
            let symbols = state.holdings.tracked_symbols()?;
            let prices = state.cache.latest_batch(&symbols)?;
            print_json(&value_holdings(&holdings, &prices))
        }
        Commands::Watch { every } => {
            let secs = every.unwrap_or(state.settings.refresh.refresh_interval_secs).max(1);
            scheduler::run_watch(state, std::time::Duration::from_secs(secs)).await
        }
    }
}

/// Cache diagnostics plus the active provider's quota usage.
fn print_status(state: &Arc<AppState>) -> anyhow::Result<()> {
    #[derive(Serialize)]
    struct StatusOutput<T: Serialize, Q: Serialize> {
        #[serde(flatten)]
        cache: T,
        quota: Option<Q>,
    }

    let cache = state.orchestrator.status()?;
    let quota = match &state.quota {
        Some(tracker) => Some(tracker.usage(state.orchestrator.provider_name())?),
        None => None,
    };
    print_json(&StatusOutput { cache, quota })
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
