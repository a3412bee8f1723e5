use serde::{Deserialize, Serialize};

/// Stable error category reported in refresh results.
///
/// The serialised names are part of the refresh response surface
/// (`error_type`), so they must not change.
///
/// # Behavior Summary
///
/// | Kind | Meaning | Suggested user message |
/// |------|---------|------------------------|
/// | `NetworkError` | Connection failure or timeout | Temporarily unavailable |
/// | `HTTPStatusError` | Non-success HTTP status | Temporarily unavailable |
/// | `ParseError` | Unexpected response body | Temporarily unavailable |
/// | `RateLimited` | Quota exhausted | Try again later |
/// | `NoData` | Symbol absent from the response | Symbol not found |
/// | `InvalidSymbol` | Rejected before any call | Symbol not found |
/// | `ProviderError` | Anything else from the provider | Temporarily unavailable |
/// | `CacheFresh` | Not an error: cache was fresh, no refresh needed | - |
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    NetworkError,
    #[serde(rename = "HTTPStatusError")]
    HttpStatusError,
    ParseError,
    RateLimited,
    NoData,
    InvalidSymbol,
    ProviderError,
    CacheFresh,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NetworkError => "NetworkError",
            ErrorKind::HttpStatusError => "HTTPStatusError",
            ErrorKind::ParseError => "ParseError",
            ErrorKind::RateLimited => "RateLimited",
            ErrorKind::NoData => "NoData",
            ErrorKind::InvalidSymbol => "InvalidSymbol",
            ErrorKind::ProviderError => "ProviderError",
            ErrorKind::CacheFresh => "CacheFresh",
        }
    }

    /// Short message a UI can render for this category.
    pub fn user_message(&self) -> &'static str {
        match self {
            ErrorKind::RateLimited => "Rate limit reached, try again later",
            ErrorKind::NoData | ErrorKind::InvalidSymbol => "Symbol not found",
            ErrorKind::CacheFresh => "Price is up to date",
            ErrorKind::NetworkError
            | ErrorKind::HttpStatusError
            | ErrorKind::ParseError
            | ErrorKind::ProviderError => "Price provider temporarily unavailable",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
