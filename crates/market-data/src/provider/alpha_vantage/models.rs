//! Alpha Vantage API response structures.

use serde::Deserialize;

/// GLOBAL_QUOTE response.
///
/// Alpha Vantage reports throttling and bad requests inside a 200 response,
/// through the `Note`, `Information` and `Error Message` keys.
#[derive(Debug, Deserialize)]
pub(super) struct GlobalQuoteResponse {
    #[serde(rename = "Global Quote")]
    pub global_quote: Option<GlobalQuote>,
    #[serde(rename = "Error Message")]
    pub error_message: Option<String>,
    #[serde(rename = "Note")]
    pub note: Option<String>,
    #[serde(rename = "Information")]
    pub information: Option<String>,
}

/// The quote object. Every field is a string in the wire format, and the
/// whole object is `{}` when the symbol is unknown.
#[derive(Debug, Default, Deserialize)]
pub(super) struct GlobalQuote {
    #[serde(rename = "01. symbol")]
    pub symbol: Option<String>,
    #[serde(rename = "05. price")]
    pub price: Option<String>,
    #[serde(rename = "06. volume")]
    pub volume: Option<String>,
    #[serde(rename = "07. latest trading day")]
    pub latest_trading_day: Option<String>,
    #[serde(rename = "10. change percent")]
    pub change_percent: Option<String>,
}

impl GlobalQuote {
    pub fn is_empty(&self) -> bool {
        self.symbol.is_none() && self.price.is_none()
    }
}
