//! Fixed-point decimal numbers.
//!
//! A [`Decimal`] is the exact triple `(sign, magnitude, exponent)` with
//! `value = (-1)^sign * magnitude * 10^exponent`. Trailing zeros are kept:
//! `12.3400` and `12.34` are different decimals that compare unequal, which
//! keeps byte-exact round trips through the big-number extension.

use std::fmt;
use std::str::FromStr;

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::Zero;
use thiserror::Error;

/// Error returned when parsing a [`Decimal`] from a string fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid decimal literal: {input:?}")]
pub struct ParseDecimalError {
    pub input: String,
}

/// Arbitrary-precision fixed-point decimal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Decimal {
    negative: bool,
    exponent: i32,
    magnitude: BigUint,
}

impl Decimal {
    /// Creates a decimal from its sign, exponent and magnitude.
    pub fn new(negative: bool, exponent: i32, magnitude: BigUint) -> Self {
        Self {
            negative,
            exponent,
            magnitude,
        }
    }

    /// Creates a decimal with exponent 0 holding the given integer.
    pub fn from_bigint(value: &BigInt) -> Self {
        Self {
            negative: value.sign() == Sign::Minus,
            exponent: 0,
            magnitude: value.magnitude().clone(),
        }
    }

    /// Returns true if the sign bit is set (this includes negative zero).
    pub fn is_negative(&self) -> bool {
        self.negative
    }

    /// Returns the base-10 exponent.
    pub fn exponent(&self) -> i32 {
        self.exponent
    }

    /// Returns the unsigned coefficient.
    pub fn magnitude(&self) -> &BigUint {
        &self.magnitude
    }

    /// Returns the integer value, or `None` if the exponent is negative.
    pub fn to_bigint(&self) -> Option<BigInt> {
        if self.exponent < 0 {
            return None;
        }
        let scaled = &self.magnitude * BigUint::from(10u32).pow(self.exponent as u32);
        let sign = if self.negative { Sign::Minus } else { Sign::Plus };
        Some(BigInt::from_biguint(sign, scaled))
    }
}

impl From<BigInt> for Decimal {
    fn from(value: BigInt) -> Self {
        Decimal::from_bigint(&value)
    }
}

impl FromStr for Decimal {
    type Err = ParseDecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseDecimalError {
            input: s.to_string(),
        };

        let (negative, rest) = match s.as_bytes().first() {
            Some(b'-') => (true, &s[1..]),
            Some(b'+') => (false, &s[1..]),
            _ => (false, s),
        };

        let (number, exp_part) = match rest.find(['e', 'E']) {
            Some(idx) => (&rest[..idx], Some(&rest[idx + 1..])),
            None => (rest, None),
        };

        let (int_digits, frac_digits) = match number.split_once('.') {
            Some((i, f)) => (i, f),
            None => (number, ""),
        };

        if int_digits.is_empty() && frac_digits.is_empty() {
            return Err(err());
        }
        let all_digits = |d: &str| d.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(int_digits) || !all_digits(frac_digits) {
            return Err(err());
        }

        let mut exponent: i64 = match exp_part {
            Some(e) => e.parse::<i64>().map_err(|_| err())?,
            None => 0,
        };
        exponent -= frac_digits.len() as i64;
        let exponent = i32::try_from(exponent).map_err(|_| err())?;

        let digits = format!("{int_digits}{frac_digits}");
        let magnitude = BigUint::parse_bytes(digits.as_bytes(), 10).ok_or_else(err)?;

        Ok(Decimal {
            negative,
            exponent,
            magnitude,
        })
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            f.write_str("-")?;
        }
        let digits = self.magnitude.to_string();
        if self.exponent >= 0 {
            f.write_str(&digits)?;
            if !self.magnitude.is_zero() {
                for _ in 0..self.exponent {
                    f.write_str("0")?;
                }
            }
            return Ok(());
        }

        let scale = self.exponent.unsigned_abs() as usize;
        if digits.len() > scale {
            let (int_part, frac_part) = digits.split_at(digits.len() - scale);
            write!(f, "{int_part}.{frac_part}")
        } else {
            write!(f, "0.{}{}", "0".repeat(scale - digits.len()), digits)
        }
    }
}
