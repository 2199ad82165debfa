//! Type-safe price representation using decimal arithmetic.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., rand, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Create a price in South African rand.
    #[must_use]
    pub const fn zar(amount: Decimal) -> Self {
        Self::new(amount, CurrencyCode::ZAR)
    }

    /// Create a price from minor units (cents).
    #[must_use]
    pub fn from_cents(cents: i64, currency_code: CurrencyCode) -> Self {
        Self::new(Decimal::new(cents, 2), currency_code)
    }

    /// Whether the amount is strictly positive.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    /// Format for display (e.g., "R 199.00").
    #[must_use]
    pub fn display(&self) -> String {
        format!("{}{:.2}", self.currency_code.symbol(), self.amount)
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[allow(clippy::upper_case_acronyms)]
pub enum CurrencyCode {
    #[default]
    ZAR,
    USD,
    EUR,
    GBP,
}

impl CurrencyCode {
    /// Display symbol.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::ZAR => "R ",
            Self::USD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
        }
    }

    /// Parse a currency code, falling back to ZAR for unknown values.
    #[must_use]
    pub fn from_code_or_default(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "USD" => Self::USD,
            "EUR" => Self::EUR,
            "GBP" => Self::GBP,
            _ => Self::ZAR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let price = Price::from_cents(19_999, CurrencyCode::ZAR);
        assert_eq!(price.amount, Decimal::new(19_999, 2));
        assert_eq!(price.display(), "R 199.99");
    }

    #[test]
    fn test_is_positive() {
        assert!(Price::zar(Decimal::ONE).is_positive());
        assert!(!Price::zar(Decimal::ZERO).is_positive());
        assert!(!Price::zar(Decimal::NEGATIVE_ONE).is_positive());
    }

    #[test]
    fn test_currency_fallback() {
        assert_eq!(CurrencyCode::from_code_or_default("usd"), CurrencyCode::USD);
        assert_eq!(CurrencyCode::from_code_or_default("XYZ"), CurrencyCode::ZAR);
    }

    #[test]
    fn test_amount_serializes_as_string() {
        let json = serde_json::to_value(Price::from_cents(1050, CurrencyCode::ZAR)).expect("json");
        assert_eq!(json["amount"], "10.50");
        assert_eq!(json["currencyCode"], "ZAR");
    }
}
