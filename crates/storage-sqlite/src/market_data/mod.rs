//! Price cache and provider call log persistence.

mod model;
mod repository;

pub use model::{PriceSnapshotDB, ProviderCallDB};
pub use repository::PriceCacheRepository;
