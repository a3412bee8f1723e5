//! Error types and error-kind classification for the market data crate.
//!
//! This module provides:
//! - [`MarketDataError`]: The main error enum for all provider operations
//! - [`ErrorKind`]: The stable, serialisable category reported to callers

mod kind;

pub use kind::ErrorKind;

use thiserror::Error;

/// Errors that can occur while fetching quotes from a provider.
///
/// Each variant maps to an [`ErrorKind`] via [`kind`](Self::kind), which is
/// what refresh results and user-facing surfaces report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarketDataError {
    /// The caller supplied an empty or malformed symbol.
    /// Rejected before any network call.
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    /// The provider answered successfully but the symbol was absent from the payload.
    #[error("No data for symbol: {0}")]
    NoData(String),

    /// Quota exhausted (locally or reported by the provider).
    #[error("Rate limited: {provider}")]
    RateLimited {
        /// The provider that is rate limited
        provider: String,
    },

    /// The request did not complete within the configured timeout.
    #[error("Timeout: {provider}")]
    Timeout {
        /// The provider that timed out
        provider: String,
    },

    /// Connection-level failure; the provider never answered.
    #[error("Network error: {provider} - {message}")]
    Network {
        /// The provider that could not be reached
        provider: String,
        /// Transport error description
        message: String,
    },

    /// The provider answered with a non-success HTTP status.
    #[error("HTTP {status} from {provider}: {message}")]
    HttpStatus {
        /// The provider that returned the status
        provider: String,
        /// The HTTP status code
        status: u16,
        /// Response body excerpt
        message: String,
    },

    /// The response body did not match the expected schema.
    #[error("Parse error: {provider} - {message}")]
    Parse {
        /// The provider whose response failed to parse
        provider: String,
        /// Description of the shape mismatch
        message: String,
    },

    /// Any other provider-reported failure.
    #[error("Provider error: {provider} - {message}")]
    ProviderError {
        /// The provider that returned the error
        provider: String,
        /// The error message from the provider
        message: String,
    },
}

impl MarketDataError {
    /// Returns the reporting category for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use pricewatch_market_data::errors::{ErrorKind, MarketDataError};
    ///
    /// let error = MarketDataError::Timeout { provider: "ALPHA_VANTAGE".to_string() };
    /// assert_eq!(error.kind(), ErrorKind::NetworkError);
    ///
    /// let error = MarketDataError::NoData("ZZZZ".to_string());
    /// assert_eq!(error.kind(), ErrorKind::NoData);
    /// ```
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidSymbol(_) => ErrorKind::InvalidSymbol,
            Self::NoData(_) => ErrorKind::NoData,
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::Timeout { .. } | Self::Network { .. } => ErrorKind::NetworkError,
            Self::HttpStatus { .. } => ErrorKind::HttpStatusError,
            Self::Parse { .. } => ErrorKind::ParseError,
            Self::ProviderError { .. } => ErrorKind::ProviderError,
        }
    }

    /// Whether the provider actually answered the request.
    ///
    /// Answered calls count against the provider's quota; connection
    /// failures, timeouts and locally rejected symbols do not.
    pub fn provider_answered(&self) -> bool {
        !matches!(
            self,
            Self::InvalidSymbol(_) | Self::Timeout { .. } | Self::Network { .. }
        )
    }

    /// Whether a cached value may be served in place of this failure.
    ///
    /// Everything except a malformed symbol degrades to the cache.
    pub fn allows_cache_fallback(&self) -> bool {
        !matches!(self, Self::InvalidSymbol(_))
    }
}
