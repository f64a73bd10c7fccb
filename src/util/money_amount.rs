//! Human-readable currency amount parsing.
//!
//! [`MoneyAmount`] is the display-unit side of every price in this crate. Conversion to and
//! from on-chain base units happens through [`MoneyAmount::to_base_units`] and
//! [`MoneyAmount::from_base_units`], so arithmetic never mixes the two scales.
//!
//! # Supported Formats
//!
//! - Plain numbers: `"100"`, `"0.01"`
//! - With currency symbols: `"$10.50"`
//! - With thousand separators: `"1,000"`, `"1,000,000.50"`
//!
//! # Example
//!
//! ```rust
//! use x402_solana_gate::util::money_amount::MoneyAmount;
//!
//! let amount = MoneyAmount::parse("$10.50").unwrap();
//! assert_eq!(amount.scale(), 2);
//! assert_eq!(amount.mantissa(), 1050);
//! assert_eq!(amount.to_base_units(6).unwrap(), 10_500_000);
//! ```

use regex::Regex;
use rust_decimal::Decimal;
use std::fmt;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::LazyLock;

/// A parsed, non-negative monetary amount in display units.
///
/// The original precision is preserved: `"10.50"` has scale 2 and mantissa 1050.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoneyAmount(pub Decimal);

/// Errors that can occur when parsing a monetary amount.
#[derive(Debug, thiserror::Error)]
pub enum MoneyAmountParseError {
    /// The input string could not be parsed as a number.
    #[error("Invalid number format")]
    InvalidFormat,
    /// The value is outside the allowed range.
    #[error("Amount must be above 0 and at most {}", constants::MAX_STR)]
    OutOfRange,
    /// Negative values are not allowed.
    #[error("Negative value is not allowed")]
    Negative,
    /// The input has more decimal places than the asset supports.
    #[error("Too big of a precision: {money} vs {token} on token")]
    WrongPrecision {
        /// Decimal places in the input.
        money: u32,
        /// Decimal places supported by the asset.
        token: u32,
    },
}

mod constants {
    use super::*;

    pub const MAX_STR: &str = "999999999";

    pub static MAX: LazyLock<Decimal> =
        LazyLock::new(|| Decimal::from_str(MAX_STR).expect("valid decimal"));
    pub static NOISE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[^\d\.\-]+").expect("valid regex"));
}

impl MoneyAmount {
    /// Parses a human-readable currency string into a [`MoneyAmount`].
    ///
    /// Currency symbols, thousand separators, and whitespace are stripped before parsing.
    pub fn parse(input: &str) -> Result<Self, MoneyAmountParseError> {
        let cleaned = constants::NOISE.replace_all(input, "").to_string();
        let parsed =
            Decimal::from_str(&cleaned).map_err(|_| MoneyAmountParseError::InvalidFormat)?;
        Self::checked(parsed)
    }

    fn checked(value: Decimal) -> Result<Self, MoneyAmountParseError> {
        if value.is_sign_negative() {
            return Err(MoneyAmountParseError::Negative);
        }
        // The smallest representable amount depends on the asset; `to_base_units` enforces it.
        if value.is_zero() || value > *constants::MAX {
            return Err(MoneyAmountParseError::OutOfRange);
        }
        Ok(MoneyAmount(value))
    }

    /// Number of decimal places in the original input.
    pub fn scale(&self) -> u32 {
        self.0.scale()
    }

    /// The value as an unsigned integer without the decimal point: `"12.34"` is `1234`.
    pub fn mantissa(&self) -> u128 {
        self.0.mantissa().unsigned_abs()
    }

    /// Converts the display amount into base units of an asset with `decimals` places.
    ///
    /// Fails if the amount carries more precision than the asset can represent.
    pub fn to_base_units(&self, decimals: u8) -> Result<u64, MoneyAmountParseError> {
        // Trailing zeros ("1.50" on a 1-decimal asset) are not real precision.
        let normalized = self.0.normalize();
        let scale = normalized.scale();
        let token_scale = decimals as u32;
        if scale > token_scale {
            return Err(MoneyAmountParseError::WrongPrecision {
                money: scale,
                token: token_scale,
            });
        }
        let multiplier = 10u64
            .checked_pow(token_scale - scale)
            .ok_or(MoneyAmountParseError::OutOfRange)?;
        let digits = u64::try_from(normalized.mantissa().unsigned_abs())
            .map_err(|_| MoneyAmountParseError::OutOfRange)?;
        digits
            .checked_mul(multiplier)
            .ok_or(MoneyAmountParseError::OutOfRange)
    }

    /// Builds a display amount from base units of an asset with `decimals` places.
    ///
    /// No range check against [`MoneyAmount::parse`] limits: ledger values are taken as they are.
    pub fn from_base_units(amount: u64, decimals: u8) -> Result<Self, MoneyAmountParseError> {
        let value = Decimal::try_from_i128_with_scale(amount as i128, decimals as u32)
            .map_err(|_| MoneyAmountParseError::OutOfRange)?;
        Ok(MoneyAmount(value.normalize()))
    }
}

impl FromStr for MoneyAmount {
    type Err = MoneyAmountParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MoneyAmount::parse(s)
    }
}

impl TryFrom<&str> for MoneyAmount {
    type Error = MoneyAmountParseError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        MoneyAmount::from_str(value)
    }
}

impl TryFrom<f64> for MoneyAmount {
    type Error = MoneyAmountParseError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        // Shortest round-trip representation: 0.01 stays 0.01.
        let decimal = Decimal::from_str(&value.to_string())
            .map_err(|_| MoneyAmountParseError::InvalidFormat)?;
        Self::checked(decimal)
    }
}

impl Display for MoneyAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strips_symbols_and_separators() {
        let amount = MoneyAmount::parse("$1,000.50").unwrap();
        assert_eq!(amount.to_string(), "1000.5");
    }

    #[test]
    fn test_parse_rejects_negative() {
        assert!(matches!(
            MoneyAmount::parse("-1"),
            Err(MoneyAmountParseError::Negative)
        ));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            MoneyAmount::parse("abc"),
            Err(MoneyAmountParseError::InvalidFormat)
        ));
    }

    #[test]
    fn test_parse_range() {
        assert!(matches!(
            MoneyAmount::parse("0"),
            Err(MoneyAmountParseError::OutOfRange)
        ));
        assert!(matches!(
            MoneyAmount::parse("1000000000"),
            Err(MoneyAmountParseError::OutOfRange)
        ));
        let tiny = MoneyAmount::parse("0.000000000000000001").unwrap();
        assert_eq!(tiny.to_base_units(18).unwrap(), 1);
        assert!(matches!(
            tiny.to_base_units(9),
            Err(MoneyAmountParseError::WrongPrecision { money: 18, token: 9 })
        ));
    }

    #[test]
    fn test_to_base_units() {
        let amount = MoneyAmount::parse("0.01").unwrap();
        assert_eq!(amount.to_base_units(6).unwrap(), 10_000);
        assert_eq!(amount.to_base_units(9).unwrap(), 10_000_000);
    }

    #[test]
    fn test_to_base_units_ignores_trailing_zeros() {
        let amount = MoneyAmount::parse("1.50").unwrap();
        assert_eq!(amount.to_base_units(1).unwrap(), 15);
    }

    #[test]
    fn test_to_base_units_precision_too_high() {
        let amount = MoneyAmount::parse("1.234").unwrap();
        assert!(matches!(
            amount.to_base_units(2),
            Err(MoneyAmountParseError::WrongPrecision { money: 3, token: 2 })
        ));
    }

    #[test]
    fn test_to_base_units_overflow() {
        let amount = MoneyAmount::parse("999999999").unwrap();
        assert!(matches!(
            amount.to_base_units(19),
            Err(MoneyAmountParseError::OutOfRange)
        ));
    }

    #[test]
    fn test_from_base_units() {
        let display = |amount, decimals| {
            MoneyAmount::from_base_units(amount, decimals)
                .unwrap()
                .to_string()
        };
        assert_eq!(display(15_000, 6), "0.015");
        assert_eq!(display(10_000_000, 9), "0.01");
        assert_eq!(display(42, 0), "42");
    }

    #[test]
    fn test_from_f64_keeps_short_representation() {
        let amount = MoneyAmount::try_from(0.01f64).unwrap();
        assert_eq!(amount.to_string(), "0.01");
        assert_eq!(amount.to_base_units(6).unwrap(), 10_000);
    }
}
