//! Database model for holdings.

use diesel::prelude::*;

use pricewatch_core::holdings::Holding;
use pricewatch_market_data::AssetKind;

use crate::errors::StorageError;
use crate::utils::{decode_decimal, decode_timestamp, encode_decimal, encode_timestamp};

#[derive(Queryable, Selectable, Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = crate::schema::holdings)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct HoldingDB {
    pub id: String,
    pub symbol: String,
    pub quantity: String,
    pub asset_kind: String,
    pub created_at: String,
}

impl From<&Holding> for HoldingDB {
    fn from(holding: &Holding) -> Self {
        Self {
            id: holding.id.clone(),
            symbol: holding.symbol.clone(),
            quantity: encode_decimal(holding.quantity),
            asset_kind: holding.asset_kind.as_str().to_string(),
            created_at: encode_timestamp(holding.created_at),
        }
    }
}

impl TryFrom<HoldingDB> for Holding {
    type Error = StorageError;

    fn try_from(row: HoldingDB) -> Result<Self, Self::Error> {
        let asset_kind = row
            .asset_kind
            .parse::<AssetKind>()
            .map_err(|e: String| StorageError::CorruptRow(format!("asset_kind: {}", e)))?;
        Ok(Holding {
            quantity: decode_decimal("quantity", &row.quantity)?,
            created_at: decode_timestamp("created_at", &row.created_at)?,
            asset_kind,
            id: row.id,
            symbol: row.symbol,
        })
    }
}
