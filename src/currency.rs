use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Currencies ordered by trading volume. Baskets are taken from the front of this list.
pub const TOP_CURRENCIES: [&str; 50] = [
    "USD", "EUR", "JPY", "GBP", "AUD", "CAD", "CHF", "CNY", "HKD", "NZD",
    "SEK", "KRW", "SGD", "NOK", "MXN", "INR", "RUB", "ZAR", "TRY", "BRL",
    "TWD", "DKK", "PLN", "THB", "IDR", "HUF", "CZK", "ILS", "CLP", "PHP",
    "AED", "COP", "SAR", "MYR", "RON", "PEN", "VND", "EGP", "PKR", "KZT",
    "QAR", "UAH", "KES", "DZD", "ARS", "BDT", "LKR", "IQD", "IRR", "OMR",
];

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn usd() -> Self {
        CurrencyCode("USD".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for CurrencyCode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        if code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase()) {
            Ok(CurrencyCode(code.to_string()))
        } else {
            Err(ConfigError::InvalidCurrency(s.to_string()))
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The ordered set of currencies fetched against `base`.
///
/// The base currency is stripped on construction, so it can never show up as a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Basket {
    base: CurrencyCode,
    currencies: Vec<CurrencyCode>,
}

impl Basket {
    pub fn new(base: CurrencyCode, currencies: impl IntoIterator<Item = CurrencyCode>) -> Self {
        let mut kept: Vec<CurrencyCode> = Vec::new();
        for code in currencies {
            if code != base && !kept.contains(&code) {
                kept.push(code);
            }
        }
        Basket { base, currencies: kept }
    }

    /// First `n` entries of [`TOP_CURRENCIES`], minus the base.
    pub fn top(n: usize, base: CurrencyCode) -> Self {
        let codes = TOP_CURRENCIES
            .iter()
            .take(n)
            .map(|c| CurrencyCode(c.to_string()));
        Basket::new(base, codes)
    }

    pub fn base(&self) -> &CurrencyCode {
        &self.base
    }

    pub fn currencies(&self) -> &[CurrencyCode] {
        &self.currencies
    }

    pub fn len(&self) -> usize {
        self.currencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.currencies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> CurrencyCode {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_currency_code() {
        assert_eq!(code(" EUR ").as_str(), "EUR");
        assert!("eur".parse::<CurrencyCode>().is_err());
        assert!("EURO".parse::<CurrencyCode>().is_err());
        assert!("E1R".parse::<CurrencyCode>().is_err());
        assert!("".parse::<CurrencyCode>().is_err());
    }

    #[test]
    fn test_top_basket_excludes_base() {
        let basket = Basket::top(20, code("USD"));
        assert_eq!(basket.len(), 19);
        assert!(!basket.currencies().contains(&code("USD")));
        assert_eq!(basket.currencies()[0], code("EUR"));
        assert_eq!(basket.currencies()[18], code("BRL"));
    }

    #[test]
    fn test_top_basket_base_outside_list() {
        let basket = Basket::top(5, code("OMR"));
        assert_eq!(basket.len(), 5);
        assert_eq!(basket.base(), &code("OMR"));
    }

    #[test]
    fn test_basket_never_contains_base() {
        for base in TOP_CURRENCIES {
            for n in [1, 10, 50] {
                let basket = Basket::top(n, code(base));
                assert!(!basket.currencies().iter().any(|c| c == basket.base()));
            }
        }
    }

    #[test]
    fn test_basket_drops_duplicates() {
        let basket = Basket::new(code("USD"), [code("EUR"), code("USD"), code("EUR"), code("JPY")]);
        assert_eq!(basket.currencies(), &[code("EUR"), code("JPY")]);
    }
}
