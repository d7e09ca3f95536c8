//! Type-safe money representation using decimal arithmetic.
//!
//! Amounts are stored in the currency's major unit (e.g. dollars) as a
//! [`Decimal`]. Conversion to and from minor units (cents) happens only at
//! the payment-gateway boundary, which bills in integer cents.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Errors that can occur converting money amounts.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoneyError {
    /// The amount does not fit in an i64 number of minor units.
    #[error("amount out of range for minor units")]
    OutOfRange,
    /// The amount is negative where a non-negative amount is required.
    #[error("amount must not be negative")]
    Negative,
}

/// ISO 4217 currency codes supported by the marketplace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
}

impl CurrencyCode {
    /// Uppercase ISO 4217 code (e.g. "USD").
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::USD => "USD",
            Self::EUR => "EUR",
            Self::GBP => "GBP",
            Self::CAD => "CAD",
            Self::AUD => "AUD",
        }
    }

    /// Lowercase code as the payment gateway expects it (e.g. "usd").
    #[must_use]
    pub const fn gateway_code(&self) -> &'static str {
        match self {
            Self::USD => "usd",
            Self::EUR => "eur",
            Self::GBP => "gbp",
            Self::CAD => "cad",
            Self::AUD => "aud",
        }
    }

    /// Parse an uppercase or lowercase ISO code.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "USD" => Some(Self::USD),
            "EUR" => Some(Self::EUR),
            "GBP" => Some(Self::GBP),
            "CAD" => Some(Self::CAD),
            "AUD" => Some(Self::AUD),
            _ => None,
        }
    }

    /// Currency display symbol.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::USD | Self::CAD | Self::AUD => "$",
            Self::EUR => "\u{20ac}",
            Self::GBP => "\u{a3}",
        }
    }
}

impl core::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A monetary amount with currency information.
///
/// All supported currencies use two decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's major unit (e.g. dollars, not cents).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency: CurrencyCode) -> Self {
        Self { amount, currency }
    }

    /// Create a price from an integer number of minor units (cents).
    #[must_use]
    pub fn from_minor_units(minor: i64, currency: CurrencyCode) -> Self {
        Self {
            amount: Decimal::new(minor, 2),
            currency,
        }
    }

    /// Convert to an integer number of minor units (cents), rounding
    /// midpoints away from zero.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::OutOfRange`] if the scaled amount does not fit
    /// in an `i64`.
    pub fn to_minor_units(&self) -> Result<i64, MoneyError> {
        let scaled = (self.amount * Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        scaled.to_i64().ok_or(MoneyError::OutOfRange)
    }

    /// Format for display (e.g. "$19.99").
    #[must_use]
    pub fn display(&self) -> String {
        format!("{}{:.2}", self.currency.symbol(), self.amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minor_unit_roundtrip() {
        let price = Price::from_minor_units(1999, CurrencyCode::USD);
        assert_eq!(price.amount, Decimal::new(1999, 2));
        assert_eq!(price.to_minor_units().expect("in range"), 1999);
    }

    #[test]
    fn fractional_cents_round_away_from_zero() {
        let price = Price::new(Decimal::new(10005, 4), CurrencyCode::USD); // 1.0005
        assert_eq!(price.to_minor_units().expect("in range"), 100);

        let price = Price::new(Decimal::new(10050, 4), CurrencyCode::USD); // 1.0050
        assert_eq!(price.to_minor_units().expect("in range"), 101);
    }

    #[test]
    fn gateway_codes_are_lowercase() {
        assert_eq!(CurrencyCode::USD.gateway_code(), "usd");
        assert_eq!(CurrencyCode::parse("gbp"), Some(CurrencyCode::GBP));
        assert_eq!(CurrencyCode::parse("JPY"), None);
    }

    #[test]
    fn display_includes_symbol() {
        let price = Price::from_minor_units(1250, CurrencyCode::GBP);
        assert_eq!(price.display(), "\u{a3}12.50");
    }
}
