pub mod holdings_model;
pub mod holdings_traits;

pub use holdings_model::*;
pub use holdings_traits::HoldingsRepositoryTrait;
