//! Error types for the price engine.
//!
//! Storage backends convert their own failures into [`DatabaseError`] so this
//! crate never depends on a particular database driver. Provider failures keep
//! their [`MarketDataError`] so callers can still read the failure category.

use thiserror::Error;

use pricewatch_market_data::MarketDataError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Storage failure: {0}")]
    Database(#[from] DatabaseError),

    #[error("Price lookup failed: {0}")]
    MarketData(#[from] MarketDataError),

    #[error("Rejected input: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid configuration value: {0}")]
    InvalidConfigValue(String),

    /// A collaborator (holdings source, call log) could not answer.
    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

/// Driver-independent storage failure.
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("cannot open database: {0}")]
    ConnectionFailed(String),

    #[error("cannot build connection pool: {0}")]
    PoolCreationFailed(String),

    #[error("query failed: {0}")]
    QueryFailed(String),

    #[error("no such record: {0}")]
    NotFound(String),

    #[error("duplicate record: {0}")]
    UniqueViolation(String),

    #[error("migration failed: {0}")]
    MigrationFailed(String),

    /// Writer unavailable, corrupt row or another failure inside the backend.
    #[error("internal storage error: {0}")]
    Internal(String),
}

/// Caller-supplied data that cannot be accepted.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("not a decimal number: {0}")]
    DecimalParse(#[from] rust_decimal::Error),
}

impl From<rust_decimal::Error> for Error {
    fn from(err: rust_decimal::Error) -> Self {
        Error::Validation(ValidationError::DecimalParse(err))
    }
}
