//! Provider call quotas derived from the persisted call log.
//!
//! There is no counter to drift out of sync: every decision counts the log
//! rows inside the per-minute and per-day windows. To keep two concurrent
//! callers from both taking the last slot, the check is serialized per
//! provider and granted calls are tracked as in-flight reservations until
//! they are written to the log.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use chrono::Duration;
use dashmap::DashMap;
use log::{debug, warn};
use serde::Serialize;
use tokio::sync::Mutex;

use super::model::ProviderCall;
use super::store::CallLogStore;
use crate::errors::Result;
use crate::settings::QuotaLimits;
use crate::utils::time_utils::{start_of_utc_day, Clock};

type PendingCounts = Arc<StdMutex<HashMap<String, u32>>>;

/// Current consumption of one provider's quota.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotaUsage {
    pub provider: String,
    pub minute_count: u64,
    pub day_count: u64,
    /// Calls granted but not yet written to the log.
    pub in_flight: u32,
    pub limits: QuotaLimits,
}

impl QuotaUsage {
    /// Whether one more call fits in both windows.
    pub fn allows_call(&self) -> bool {
        let in_flight = u64::from(self.in_flight);
        self.day_count + in_flight < u64::from(self.limits.per_day)
            && self.minute_count + in_flight < u64::from(self.limits.per_minute)
    }
}

/// Decides whether a provider may be called right now.
pub struct QuotaTracker {
    call_log: Arc<dyn CallLogStore>,
    clock: Arc<dyn Clock>,
    limits: HashMap<String, QuotaLimits>,
    gates: DashMap<String, Arc<Mutex<()>>>,
    pending: PendingCounts,
}

impl QuotaTracker {
    pub fn new(call_log: Arc<dyn CallLogStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            call_log,
            clock,
            limits: HashMap::new(),
            gates: DashMap::new(),
            pending: Arc::new(StdMutex::new(HashMap::new())),
        }
    }

    /// Set the limits for `provider`. Providers without limits are unlimited.
    pub fn with_limits(mut self, provider: &str, limits: QuotaLimits) -> Self {
        self.limits.insert(provider.to_string(), limits);
        self
    }

    pub fn limits_for(&self, provider: &str) -> QuotaLimits {
        self.limits
            .get(provider)
            .copied()
            .unwrap_or_else(QuotaLimits::unlimited)
    }

    fn in_flight(&self, provider: &str) -> u32 {
        let pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.get(provider).copied().unwrap_or(0)
    }

    /// Count the log for `provider` relative to a single "now".
    pub fn usage(&self, provider: &str) -> Result<QuotaUsage> {
        let now = self.clock.now();
        let limits = self.limits_for(provider);

        let (minute_count, day_count) = if limits.is_unlimited() {
            (0, 0)
        } else {
            let minute_count = self
                .call_log
                .count_calls_since(provider, now - Duration::seconds(60))?;
            let day_count = self
                .call_log
                .count_calls_since(provider, start_of_utc_day(now))?;
            (minute_count, day_count)
        };

        Ok(QuotaUsage {
            provider: provider.to_string(),
            minute_count,
            day_count,
            in_flight: self.in_flight(provider),
            limits,
        })
    }

    /// Whether a call to `provider` would currently be permitted.
    pub fn can_call(&self, provider: &str) -> Result<bool> {
        Ok(self.usage(provider)?.allows_call())
    }

    /// Atomically check the quota and claim a slot.
    ///
    /// Returns `None` when the quota is exhausted. The returned permit must be
    /// committed once the provider has answered; dropping it uncommitted
    /// gives the slot back.
    pub async fn try_reserve(&self, provider: &str) -> Result<Option<QuotaPermit>> {
        let gate = self
            .gates
            .entry(provider.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _gate = gate.lock().await;

        let usage = self.usage(provider)?;
        if !usage.allows_call() {
            warn!(
                "Quota exhausted for {}: {}/{} this minute, {}/{} today, {} in flight",
                provider,
                usage.minute_count,
                usage.limits.per_minute,
                usage.day_count,
                usage.limits.per_day,
                usage.in_flight
            );
            return Ok(None);
        }

        {
            let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            *pending.entry(provider.to_string()).or_insert(0) += 1;
        }
        debug!("Reserved quota slot for {}", provider);

        Ok(Some(QuotaPermit {
            provider: provider.to_string(),
            call_log: self.call_log.clone(),
            clock: self.clock.clone(),
            pending: self.pending.clone(),
        }))
    }
}

/// A granted, not yet recorded, provider call.
pub struct QuotaPermit {
    provider: String,
    call_log: Arc<dyn CallLogStore>,
    clock: Arc<dyn Clock>,
    pending: PendingCounts,
}

impl QuotaPermit {
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Charge the call to the log. The reservation is released afterwards,
    /// so the call is never momentarily uncounted.
    pub async fn commit(self, symbols: &[String], succeeded: bool) -> Result<()> {
        let call = ProviderCall {
            provider: self.provider.clone(),
            called_at: self.clock.now(),
            symbols: symbols.to_vec(),
            succeeded,
        };
        self.call_log.record_call(&call).await
    }
}

impl Drop for QuotaPermit {
    fn drop(&mut self) {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(count) = pending.get_mut(&self.provider) {
            *count = count.saturating_sub(1);
        }
    }
}
