//! Per-symbol single flight.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockTable = DashMap<String, Arc<Mutex<()>>>;

/// Async mutex per symbol.
///
/// Holding the guard across "read cache, decide, fetch, write" means a second
/// caller for the same symbol waits for the first and then finds the fresh
/// cache entry. Different symbols never contend.
///
/// An entry lives only while someone holds or waits for it, so the table
/// stays as small as the set of symbols currently being fetched.
#[derive(Debug, Default)]
pub struct SymbolLocks {
    locks: Arc<LockTable>,
}

/// Exclusive access to one symbol, released on drop.
#[derive(Debug)]
pub struct SymbolGuard {
    // Field order matters: the mutex guard must drop before the release hook.
    _guard: OwnedMutexGuard<()>,
    _release: Release,
}

#[derive(Debug)]
struct Release {
    locks: Arc<LockTable>,
    symbol: String,
}

impl Drop for Release {
    fn drop(&mut self) {
        // Only the table itself still references the mutex: no holder, no waiter.
        self.locks
            .remove_if(&self.symbol, |_, handle| Arc::strong_count(handle) == 1);
    }
}

impl SymbolLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(&self, symbol: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(symbol.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Wait for exclusive access to `symbol`.
    pub async fn lock(&self, symbol: &str) -> SymbolGuard {
        let release = Release {
            locks: Arc::clone(&self.locks),
            symbol: symbol.to_string(),
        };
        let guard = self.handle(symbol).lock_owned().await;
        SymbolGuard {
            _guard: guard,
            _release: release,
        }
    }

    /// Lock several symbols at once.
    ///
    /// Locks are taken in sorted order so two overlapping batches cannot
    /// deadlock each other.
    pub async fn lock_many(&self, symbols: &[String]) -> Vec<SymbolGuard> {
        let mut ordered: Vec<&String> = symbols.iter().collect();
        ordered.sort();
        ordered.dedup();

        let mut guards = Vec::with_capacity(ordered.len());
        for symbol in ordered {
            guards.push(self.lock(symbol).await);
        }
        guards
    }

    #[cfg(test)]
    fn is_locked(&self, symbol: &str) -> bool {
        self.locks
            .get(symbol)
            .map(|handle| handle.try_lock().is_err())
            .unwrap_or(false)
    }
}
