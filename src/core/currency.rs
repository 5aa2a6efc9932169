//! Currency codes, the supported currency catalog and the rate provider abstraction

use crate::core::rate::{RateError, ResolvedRate};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::ops::Deref;
use std::str::FromStr;

/// A validated currency code such as `USD`.
///
/// Codes are case-sensitive; callers that accept free-form input should
/// upper-case it before parsing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for CurrencyCode {
    type Err = RateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(RateError::InvalidCode(s.to_string()));
        }
        Ok(CurrencyCode(code.to_string()))
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = RateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

impl Deref for CurrencyCode {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Display metadata for a supported currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrencyInfo {
    pub code: &'static str,
    pub name: &'static str,
    pub flag: &'static str,
    pub popular: bool,
}

pub const CURRENCIES: &[CurrencyInfo] = &[
    CurrencyInfo {
        code: "USD",
        name: "US Dollar",
        flag: "🇺🇸",
        popular: true,
    },
    CurrencyInfo {
        code: "CNY",
        name: "Chinese Yuan",
        flag: "🇨🇳",
        popular: true,
    },
    CurrencyInfo {
        code: "EUR",
        name: "Euro",
        flag: "🇪🇺",
        popular: true,
    },
    CurrencyInfo {
        code: "JPY",
        name: "Japanese Yen",
        flag: "🇯🇵",
        popular: true,
    },
    CurrencyInfo {
        code: "GBP",
        name: "British Pound",
        flag: "🇬🇧",
        popular: true,
    },
    CurrencyInfo {
        code: "KRW",
        name: "South Korean Won",
        flag: "🇰🇷",
        popular: false,
    },
    CurrencyInfo {
        code: "AUD",
        name: "Australian Dollar",
        flag: "🇦🇺",
        popular: false,
    },
    CurrencyInfo {
        code: "CAD",
        name: "Canadian Dollar",
        flag: "🇨🇦",
        popular: false,
    },
    CurrencyInfo {
        code: "CHF",
        name: "Swiss Franc",
        flag: "🇨🇭",
        popular: false,
    },
    CurrencyInfo {
        code: "SGD",
        name: "Singapore Dollar",
        flag: "🇸🇬",
        popular: false,
    },
];

/// Looks up catalog metadata for a code. Unknown codes return `None`.
pub fn find_currency(code: &str) -> Option<&'static CurrencyInfo> {
    CURRENCIES.iter().find(|c| c.code == code)
}

pub fn popular_currencies() -> impl Iterator<Item = &'static CurrencyInfo> {
    CURRENCIES.iter().filter(|c| c.popular)
}

#[async_trait]
pub trait CurrencyRateProvider: Send + Sync {
    async fn get_rate(&self, from: &str, to: &str) -> Result<ResolvedRate>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_code_parsing() {
        assert_eq!("USD".parse::<CurrencyCode>().unwrap().as_str(), "USD");
        assert_eq!(" EUR ".parse::<CurrencyCode>().unwrap().as_str(), "EUR");
        // Codes are case-sensitive and kept as given
        assert_eq!("usd".parse::<CurrencyCode>().unwrap().as_str(), "usd");

        assert!("".parse::<CurrencyCode>().is_err());
        assert!("   ".parse::<CurrencyCode>().is_err());
        assert!("US-D".parse::<CurrencyCode>().is_err());
        assert!("U1D".parse::<CurrencyCode>().is_err());
    }

    #[test]
    fn test_catalog_lookup() {
        let cny = find_currency("CNY").expect("CNY should be in the catalog");
        assert_eq!(cny.name, "Chinese Yuan");
        assert!(cny.popular);
        assert!(find_currency("XYZ").is_none());
        assert!(find_currency("usd").is_none());

        let popular: Vec<_> = popular_currencies().map(|c| c.code).collect();
        assert_eq!(popular, vec!["USD", "CNY", "EUR", "JPY", "GBP"]);
        assert_eq!(CURRENCIES.len(), 10);
    }
}
