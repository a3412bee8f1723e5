//! SQLite storage implementation for Pricewatch.
//!
//! This crate is the only place where Diesel is used. It implements the
//! storage traits defined in `pricewatch-core`:
//! - [`PriceCacheRepository`]: the append-only price cache and the provider
//!   call log that quota decisions read
//! - [`HoldingsRepository`]: the tracked positions that drive bulk refresh
//!
//! ```text
//! core (policy, providers, refresh)
//!                  │
//!                  ▼
//!          storage-sqlite (this crate)
//!                  │
//!                  ▼
//!              SQLite DB
//! ```
//!
//! Reads go through an r2d2 pool; writes go through a single writer task
//! (see [`db::write_actor`]).

pub mod db;
pub mod errors;
pub mod holdings;
pub mod market_data;
pub mod schema;
pub mod utils;

pub use db::{
    create_pool, get_connection, get_db_path, init, open, run_migrations, spawn_writer,
    DbConnection, DbPool, WriteHandle,
};
pub use errors::{IntoCore, StorageError};
pub use holdings::HoldingsRepository;
pub use market_data::PriceCacheRepository;

pub use pricewatch_core::errors::{DatabaseError, Error, Result};
