//! Repository traits for holdings.

use async_trait::async_trait;

use crate::errors::Result;
use crate::holdings::{Holding, NewHolding};

/// Repository trait for the user's tracked positions.
#[async_trait]
pub trait HoldingsRepositoryTrait: Send + Sync {
    /// All holdings, oldest first.
    fn list(&self) -> Result<Vec<Holding>>;

    /// Distinct symbols across all holdings, in first-seen order.
    fn tracked_symbols(&self) -> Result<Vec<String>>;

    /// Persist a new holding.
    async fn add(&self, holding: NewHolding) -> Result<Holding>;
}
