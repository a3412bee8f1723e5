use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::errors::MarketDataError;

/// Provider identifier - mostly static constants
pub type ProviderId = Cow<'static, str>;

/// Classification of tracked instruments.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AssetKind {
    #[default]
    Equity,
    Crypto,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::Equity => "EQUITY",
            AssetKind::Crypto => "CRYPTO",
        }
    }
}

impl std::str::FromStr for AssetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EQUITY" | "STOCK" => Ok(AssetKind::Equity),
            "CRYPTO" => Ok(AssetKind::Crypto),
            other => Err(format!("Unknown asset kind: {}", other)),
        }
    }
}

/// Longest symbol accepted from callers.
const MAX_SYMBOL_LEN: usize = 32;

/// Normalizes a caller-supplied symbol to its canonical upper-case form.
///
/// Rejects empty symbols, embedded whitespace, overly long input and
/// characters that never appear in equity or crypto tickers.
pub fn normalize_symbol(raw: &str) -> Result<String, MarketDataError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.len() > MAX_SYMBOL_LEN {
        return Err(MarketDataError::InvalidSymbol(raw.to_string()));
    }

    let valid = trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '=' | '/' | ':' | '_'));
    if !valid {
        return Err(MarketDataError::InvalidSymbol(raw.to_string()));
    }

    Ok(trimmed.to_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_symbol_uppercases_and_trims() {
        assert_eq!(normalize_symbol(" aapl ").unwrap(), "AAPL");
        assert_eq!(normalize_symbol("brk.b").unwrap(), "BRK.B");
        assert_eq!(normalize_symbol("btc").unwrap(), "BTC");
    }

    #[test]
    fn test_normalize_symbol_rejects_malformed() {
        assert!(matches!(
            normalize_symbol(""),
            Err(MarketDataError::InvalidSymbol(_))
        ));
        assert!(normalize_symbol("   ").is_err());
        assert!(normalize_symbol("AA PL").is_err());
        assert!(normalize_symbol("AAPL;DROP").is_err());
        assert!(normalize_symbol(&"X".repeat(40)).is_err());
    }

    #[test]
    fn test_asset_kind_from_str() {
        assert_eq!("crypto".parse::<AssetKind>().unwrap(), AssetKind::Crypto);
        assert_eq!("Stock".parse::<AssetKind>().unwrap(), AssetKind::Equity);
        assert!("bond".parse::<AssetKind>().is_err());
    }
}
