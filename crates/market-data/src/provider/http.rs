//! Shared HTTP plumbing for the REST adapters.

use std::time::Duration;

use reqwest::{Client, RequestBuilder, StatusCode};
use tracing::debug;

use crate::errors::MarketDataError;

/// Default bound on any single provider request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest response excerpt carried in error messages.
const BODY_EXCERPT_LEN: usize = 200;

pub(crate) fn build_client(timeout: Duration) -> Client {
    Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Sends a request and returns the body text of a successful response.
///
/// Transport failures become `Timeout`/`Network`, 429 becomes `RateLimited`
/// and any other non-success status becomes `HttpStatus`.
pub(crate) async fn send_for_text(
    request: RequestBuilder,
    provider: &str,
) -> Result<String, MarketDataError> {
    let response = request.send().await.map_err(|e| {
        if e.is_timeout() {
            MarketDataError::Timeout {
                provider: provider.to_string(),
            }
        } else {
            MarketDataError::Network {
                provider: provider.to_string(),
                message: e.to_string(),
            }
        }
    })?;

    let status = response.status();
    debug!("{} responded with {}", provider, status);

    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(MarketDataError::RateLimited {
            provider: provider.to_string(),
        });
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(MarketDataError::HttpStatus {
            provider: provider.to_string(),
            status: status.as_u16(),
            message: excerpt(&body),
        });
    }

    response.text().await.map_err(|e| {
        if e.is_timeout() {
            MarketDataError::Timeout {
                provider: provider.to_string(),
            }
        } else {
            MarketDataError::Network {
                provider: provider.to_string(),
                message: format!("Failed to read response: {}", e),
            }
        }
    })
}

pub(crate) fn excerpt(body: &str) -> String {
    body.chars().take(BODY_EXCERPT_LEN).collect()
}
