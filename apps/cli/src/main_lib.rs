use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pricewatch_core::market_session::MarketSessionTracker;
use pricewatch_core::quotes::{
    CacheEntry, CryptoPriceProvider, EquitiesPriceProvider, PriceProvider, ProviderContext, QuotaTracker,
    ProviderCall, SyntheticPriceProvider,
};
use pricewatch_core::refresh::{RefreshOrchestrator, RefreshServiceTrait};
use pricewatch_core::settings::Settings;
use pricewatch_core::utils::time_utils::{Clock, SystemClock};
use pricewatch_market_data::{
    normalize_symbol, AlphaVantageProvider, CoinGeckoProvider, MarketDataProvider,
};
use pricewatch_storage_sqlite::{db, HoldingsRepository, PriceCacheRepository};

use crate::config::{Config, LogFormat, ProviderKind};

/// Everything a subcommand needs.
pub struct AppState {
    pub orchestrator: Arc<RefreshOrchestrator>,
    pub holdings: Arc<HoldingsRepository>,
    pub cache: Arc<PriceCacheRepository>,
    /// Absent for the synthetic provider, which is never rate limited.
    pub quota: Option<Arc<QuotaTracker>>,
    pub settings: Settings,
}

impl AppState {
    /// Cached snapshots of `symbol`, newest first.
    pub fn price_history(&self, symbol: &str, limit: i64) -> anyhow::Result<Vec<CacheEntry>> {
        let symbol = normalize_symbol(symbol)?;
        Ok(self.cache.history(&symbol, limit.max(1))?)
    }

    /// Calls charged to `provider` (the active one by default) over the last
    /// `window`, oldest first.
    pub fn recent_calls(
        &self,
        provider: Option<&str>,
        window: Duration,
    ) -> anyhow::Result<Vec<ProviderCall>> {
        let provider = provider.unwrap_or_else(|| self.orchestrator.provider_name());
        Ok(self.cache.calls_since(provider, Utc::now() - window)?)
    }
}

/// Install the global subscriber. `log` records from the library crates are
/// forwarded through the subscriber's log bridge.
pub fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(false).with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

pub async fn build_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let db_path = db::init(&config.db_path)?;
    info!("Database path in use: {}", db_path);

    let pool = db::create_pool(&db_path)?;
    db::run_migrations(&pool)?;
    let writer = db::spawn_writer((*pool).clone());

    let cache = Arc::new(PriceCacheRepository::new(pool.clone(), writer.clone()));
    let holdings = Arc::new(HoldingsRepository::new(pool.clone(), writer));

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let settings = config.settings.clone();
    let session = Arc::new(
        MarketSessionTracker::new(&settings.market_session)
            .with_closed_market_threshold(settings.refresh.closed_market_threshold()),
    );

    let (provider, quota) =
        build_provider(config, &settings, cache.clone(), session.clone(), clock.clone());
    info!("Price provider: {}", provider.name());

    let orchestrator = Arc::new(RefreshOrchestrator::new(
        provider,
        cache.clone(),
        holdings.clone(),
        session,
        clock,
        settings.refresh.clone(),
    ));

    Ok(Arc::new(AppState {
        orchestrator,
        holdings,
        cache,
        quota,
        settings,
    }))
}

/// Wrap the configured upstream in its cache-aware provider.
///
/// Equities need an API key; without one the synthetic generator is used so
/// the tool stays usable offline.
fn build_provider(
    config: &Config,
    settings: &Settings,
    cache: Arc<PriceCacheRepository>,
    session: Arc<MarketSessionTracker>,
    clock: Arc<dyn Clock>,
) -> (Arc<dyn PriceProvider>, Option<Arc<QuotaTracker>>) {
    let timeout = settings.refresh.http_timeout();

    let upstream: Arc<dyn MarketDataProvider> = match (config.provider, &config.alpha_vantage_api_key) {
        (ProviderKind::Synthetic, _) => {
            return (Arc::new(SyntheticPriceProvider::new(clock)), None);
        }
        (ProviderKind::AlphaVantage, None) => {
            warn!("PW_ALPHA_VANTAGE_API_KEY is not set; falling back to synthetic prices");
            return (Arc::new(SyntheticPriceProvider::new(clock)), None);
        }
        (ProviderKind::AlphaVantage, Some(key)) => {
            Arc::new(AlphaVantageProvider::new(key.clone()).with_timeout(timeout))
        }
        (ProviderKind::CoinGecko, _) => Arc::new(
            CoinGeckoProvider::new(config.coingecko_api_key.clone()).with_timeout(timeout),
        ),
    };

    let limits = settings.quota_for(upstream.id(), upstream.rate_limit().into());
    let quota = Arc::new(
        QuotaTracker::new(cache.clone(), clock.clone()).with_limits(upstream.id(), limits),
    );
    let ctx = ProviderContext::new(cache, quota.clone(), clock, timeout);

    let provider: Arc<dyn PriceProvider> = match config.provider {
        ProviderKind::CoinGecko => Arc::new(CryptoPriceProvider::new(
            upstream,
            ctx,
            settings.refresh.crypto_cache_ttl(),
        )),
        _ => Arc::new(EquitiesPriceProvider::new(
            upstream,
            ctx,
            session,
            settings.refresh.refresh_interval(),
        )),
    };
    (provider, Some(quota))
}
