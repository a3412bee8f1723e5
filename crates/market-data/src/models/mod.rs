//! Market data models
//!
//! This module contains the core data types for market data operations:
//! - `types` - Provider identifiers, asset kinds and symbol normalization
//! - `quote` - The immutable priced snapshot returned by providers

mod quote;
mod types;

pub use quote::Quote;
pub use types::{normalize_symbol, AssetKind, ProviderId};
