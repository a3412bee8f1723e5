use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sqlite::SqliteConnection;
use log::info;
use uuid::Uuid;

use super::model::HoldingDB;
use crate::db::{get_connection, WriteHandle};
use crate::errors::{IntoCore, StorageError};
use crate::schema::holdings::dsl as holdings_dsl;
use pricewatch_core::holdings::{Holding, HoldingsRepositoryTrait, NewHolding};
use pricewatch_core::Result;

pub struct HoldingsRepository {
    pool: Arc<Pool<ConnectionManager<SqliteConnection>>>,
    writer: WriteHandle,
}

impl HoldingsRepository {
    pub fn new(pool: Arc<Pool<ConnectionManager<SqliteConnection>>>, writer: WriteHandle) -> Self {
        Self { pool, writer }
    }
}

#[async_trait]
impl HoldingsRepositoryTrait for HoldingsRepository {
    fn list(&self) -> Result<Vec<Holding>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = holdings_dsl::holdings
            .order((holdings_dsl::created_at.asc(), holdings_dsl::id.asc()))
            .select(HoldingDB::as_select())
            .load::<HoldingDB>(&mut conn)
            .into_core()?;

        rows.into_iter()
            .map(|row| Holding::try_from(row).map_err(Into::into))
            .collect()
    }

    fn tracked_symbols(&self) -> Result<Vec<String>> {
        let mut seen = std::collections::HashSet::new();
        Ok(self
            .list()?
            .into_iter()
            .filter_map(|h| seen.insert(h.symbol.clone()).then_some(h.symbol))
            .collect())
    }

    async fn add(&self, new_holding: NewHolding) -> Result<Holding> {
        let new_holding = new_holding.validate()?;
        let holding = Holding {
            id: Uuid::now_v7().to_string(),
            symbol: new_holding.symbol,
            quantity: new_holding.quantity,
            asset_kind: new_holding.asset_kind,
            created_at: Utc::now(),
        };
        let row = HoldingDB::from(&holding);
        // Return what a later `list` will decode.
        let stored = Holding::try_from(row.clone())?;

        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<()> {
                diesel::insert_into(holdings_dsl::holdings)
                    .values(&row)
                    .execute(conn)
                    .map_err(StorageError::QueryFailed)?;
                Ok(())
            })
            .await?;

        info!(
            "Tracking {} {} ({})",
            stored.quantity,
            stored.symbol,
            stored.asset_kind.as_str()
        );
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_pool, run_migrations, spawn_writer};
    use pricewatch_core::Error;
    use pricewatch_market_data::AssetKind;
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    async fn create_test_repository() -> (HoldingsRepository, tempfile::TempDir) {
        let temp_dir = tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("holdings.db");
        let db_path = crate::db::init(db_path.to_str().unwrap()).expect("Failed to init db");
        let pool = create_pool(&db_path).expect("Failed to create pool");
        run_migrations(&pool).expect("Failed to run migrations");
        let writer = spawn_writer((*pool).clone());
        (HoldingsRepository::new(pool, writer), temp_dir)
    }

    fn new_holding(symbol: &str, quantity: rust_decimal::Decimal, kind: AssetKind) -> NewHolding {
        NewHolding {
            symbol: symbol.to_string(),
            quantity,
            asset_kind: kind,
        }
    }

    #[tokio::test]
    async fn test_add_normalizes_and_lists() {
        let (repo, _dir) = create_test_repository().await;
        let added = repo
            .add(new_holding(" aapl ", dec!(10.5), AssetKind::Equity))
            .await
            .unwrap();

        assert_eq!(added.symbol, "AAPL");
        assert_eq!(repo.list().unwrap(), vec![added]);
    }

    #[tokio::test]
    async fn test_tracked_symbols_are_distinct_in_first_seen_order() {
        let (repo, _dir) = create_test_repository().await;
        repo.add(new_holding("BTC", dec!(0.5), AssetKind::Crypto))
            .await
            .unwrap();
        repo.add(new_holding("AAPL", dec!(3), AssetKind::Equity))
            .await
            .unwrap();
        repo.add(new_holding("btc", dec!(0.25), AssetKind::Crypto))
            .await
            .unwrap();

        assert_eq!(repo.tracked_symbols().unwrap(), vec!["BTC", "AAPL"]);
        assert_eq!(repo.list().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_add_rejects_non_positive_quantity() {
        let (repo, _dir) = create_test_repository().await;
        let err = repo
            .add(new_holding("AAPL", dec!(0), AssetKind::Equity))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Validation(_)));
        assert!(repo.list().unwrap().is_empty());
    }
}
