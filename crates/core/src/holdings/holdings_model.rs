//! Holdings domain models.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use pricewatch_market_data::{normalize_symbol, AssetKind};

use crate::errors::{Result, ValidationError};
use crate::quotes::CacheEntry;

/// A tracked position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub id: String,
    pub symbol: String,
    pub quantity: Decimal,
    pub asset_kind: AssetKind,
    pub created_at: DateTime<Utc>,
}

/// Input model for creating a holding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewHolding {
    pub symbol: String,
    pub quantity: Decimal,
    #[serde(default)]
    pub asset_kind: AssetKind,
}

impl NewHolding {
    /// Normalize the symbol and check the quantity.
    pub fn validate(self) -> Result<Self> {
        let symbol = normalize_symbol(&self.symbol)
            .map_err(|e| ValidationError::InvalidInput(e.to_string()))?;
        if self.quantity <= Decimal::ZERO {
            return Err(ValidationError::InvalidInput(format!(
                "Quantity for {} must be positive, got {}",
                symbol, self.quantity
            ))
            .into());
        }
        Ok(Self { symbol, ..self })
    }
}

/// A holding priced from the cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoldingValuation {
    pub symbol: String,
    pub quantity: Decimal,
    pub asset_kind: AssetKind,
    pub price: Option<Decimal>,
    pub market_value: Option<Decimal>,
    pub priced_at: Option<DateTime<Utc>>,
}

/// Price each holding from the latest cache entries; holdings without a
/// cached price are returned unpriced.
pub fn value_holdings(
    holdings: &[Holding],
    prices: &HashMap<String, CacheEntry>,
) -> Vec<HoldingValuation> {
    holdings
        .iter()
        .map(|holding| {
            let entry = prices.get(&holding.symbol);
            let price = entry.map(|e| e.quote.price);
            HoldingValuation {
                symbol: holding.symbol.clone(),
                quantity: holding.quantity,
                asset_kind: holding.asset_kind,
                price,
                market_value: price.map(|p| (p * holding.quantity).round_dp(2)),
                priced_at: entry.map(|e| e.fetched_at),
            }
        })
        .collect()
}
