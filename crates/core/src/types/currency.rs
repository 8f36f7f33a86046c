//! Currency codes and per-currency rounding rules.
//!
//! The storefront supports exactly two settlement currencies: US dollars and
//! Kenyan shillings. Every product carries a price in both; every order is
//! tagged with exactly one, which fixes the unit for all of its money fields.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Supported settlement currencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Currency {
    /// United States dollar. Amounts round to two decimal places.
    #[default]
    USD,
    /// Kenyan shilling. Amounts round to whole shillings.
    KES,
}

impl Currency {
    /// ISO 4217 code for this currency.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::USD => "USD",
            Self::KES => "KES",
        }
    }

    /// Display symbol for this currency.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::USD => "$",
            Self::KES => "KSh",
        }
    }

    /// Number of decimal places amounts in this currency are kept to.
    #[must_use]
    pub const fn decimal_places(&self) -> u32 {
        match self {
            Self::USD => 2,
            Self::KES => 0,
        }
    }

    /// Round an amount to this currency's precision.
    ///
    /// Shilling amounts round to whole units, dollar amounts to cents,
    /// midpoints away from zero.
    #[must_use]
    pub fn round(&self, amount: Decimal) -> Decimal {
        amount.round_dp_with_strategy(
            self.decimal_places(),
            RoundingStrategy::MidpointAwayFromZero,
        )
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl std::str::FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USD" => Ok(Self::USD),
            "KES" => Ok(Self::KES),
            _ => Err(format!("unsupported currency: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().expect("decimal literal")
    }

    #[test]
    fn test_usd_rounds_to_cents() {
        assert_eq!(Currency::USD.round(dec("19.994")), dec("19.99"));
        assert_eq!(Currency::USD.round(dec("19.995")), dec("20.00"));
        assert_eq!(Currency::USD.round(dec("19.9")), dec("19.90"));
    }

    #[test]
    fn test_kes_rounds_to_whole_shillings() {
        assert_eq!(Currency::KES.round(dec("129.4")), dec("129"));
        assert_eq!(Currency::KES.round(dec("129.5")), dec("130"));
        assert_eq!(Currency::KES.round(dec("130.0")), dec("130"));
    }

    #[test]
    fn test_code_parse_roundtrip() {
        for currency in [Currency::USD, Currency::KES] {
            let parsed: Currency = currency.code().parse().expect("parse");
            assert_eq!(parsed, currency);
        }
        assert!("EUR".parse::<Currency>().is_err());
    }

    #[test]
    fn test_serde_uses_codes() {
        assert_eq!(
            serde_json::to_string(&Currency::KES).expect("serialize"),
            "\"KES\""
        );
        let parsed: Currency = serde_json::from_str("\"USD\"").expect("deserialize");
        assert_eq!(parsed, Currency::USD);
    }
}
