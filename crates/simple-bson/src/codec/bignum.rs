//! Big-number extension stored under binary subtype 0x80.
//!
//! Integers outside the 64-bit range and fixed-point decimals are encoded as
//!
//! ```text
//! sign:u8 (0 = positive, 1 = negative)
//! exponent:i8
//! magnitude: base-256 digits, most significant first (none for zero)
//! ```
//!
//! with `value = (-1)^sign * magnitude * 10^exponent`.

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::Zero;

use crate::error::{DecodeError, EncodeError};
use crate::model::{Decimal, Value};

/// Decoded big-number payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BigNum {
    pub negative: bool,
    pub exponent: i8,
    pub magnitude: BigUint,
}

impl BigNum {
    /// Converts to an integer (exponent >= 0) or a decimal (exponent < 0).
    ///
    /// Integers take the narrowest variant that holds them, so a decimal
    /// written with a non-negative exponent comes back as a plain integer.
    pub fn into_value(self) -> Value {
        if self.exponent < 0 {
            return Value::Decimal(Decimal::new(
                self.negative,
                i32::from(self.exponent),
                self.magnitude,
            ));
        }
        let scaled = self.magnitude * BigUint::from(10u32).pow(self.exponent as u32);
        let sign = if self.negative { Sign::Minus } else { Sign::Plus };
        Value::integer(BigInt::from_biguint(sign, scaled))
    }
}

/// Encodes a big-number payload.
///
/// Fails with [`EncodeError::ExponentOverflow`] if `exponent` does not fit
/// in a signed byte.
pub fn encode_bignum(
    negative: bool,
    exponent: i64,
    magnitude: &BigUint,
) -> Result<Vec<u8>, EncodeError> {
    let exp = i8::try_from(exponent).map_err(|_| EncodeError::ExponentOverflow { exponent })?;

    let digits = if magnitude.is_zero() {
        Vec::new()
    } else {
        magnitude.to_bytes_be()
    };

    let mut buf = Vec::with_capacity(2 + digits.len());
    buf.push(u8::from(negative));
    buf.push(exp as u8);
    buf.extend_from_slice(&digits);
    Ok(buf)
}

/// Decodes a big-number payload.
pub fn decode_bignum(bytes: &[u8]) -> Result<BigNum, DecodeError> {
    let [sign, exp, digits @ ..] = bytes else {
        return Err(DecodeError::Truncated {
            context: "big-number header",
        });
    };
    let negative = match *sign {
        0 => false,
        1 => true,
        _ => {
            return Err(DecodeError::MalformedDocument {
                context: "big-number sign must be 0 or 1",
            });
        }
    };
    Ok(BigNum {
        negative,
        exponent: *exp as i8,
        magnitude: BigUint::from_bytes_be(digits),
    })
}

/// Encodes an integer with exponent 0.
pub fn encode_bigint(value: &BigInt) -> Result<Vec<u8>, EncodeError> {
    encode_bignum(value.sign() == Sign::Minus, 0, value.magnitude())
}

/// Encodes a decimal, keeping its exponent.
pub fn encode_decimal(value: &Decimal) -> Result<Vec<u8>, EncodeError> {
    encode_bignum(
        value.is_negative(),
        i64::from(value.exponent()),
        value.magnitude(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bigint_layout() {
        let value = BigInt::from(2).pow(73);
        let bytes = encode_bigint(&value).unwrap();

        let mut expected = vec![0x00, 0x00, 0x02];
        expected.extend_from_slice(&[0u8; 9]);
        assert_eq!(bytes, expected);

        let decoded = decode_bignum(&bytes).unwrap().into_value();
        assert!(matches!(&decoded, Value::BigInt(v) if *v == value));
    }

    #[test]
    fn test_negative_bigint() {
        let value = -BigInt::from(2).pow(64);
        let bytes = encode_bigint(&value).unwrap();
        assert_eq!(bytes[0], 1);
        assert_eq!(decode_bignum(&bytes).unwrap().into_value(), Value::BigInt(value));
    }

    #[test]
    fn test_decimal_layout() {
        let value: Decimal = "-12.34567890".parse().unwrap();
        let bytes = encode_decimal(&value).unwrap();
        assert_eq!(bytes, [0x01, 0xF8, 0x49, 0x96, 0x02, 0xD2]);

        let decoded = decode_bignum(&bytes).unwrap().into_value();
        assert_eq!(decoded, Value::Decimal(value));
    }

    #[test]
    fn test_positive_exponent_decodes_as_integer() {
        let value: Decimal = "1.5E+3".parse().unwrap();
        let bytes = encode_decimal(&value).unwrap();
        let decoded = decode_bignum(&bytes).unwrap().into_value();
        assert!(matches!(decoded, Value::Int32(1500)));
    }

    #[test]
    fn test_small_integer_payload_narrows() {
        let bytes = encode_bignum(true, 0, &BigUint::from(1500u32)).unwrap();
        let once = decode_bignum(&bytes).unwrap().into_value();
        assert!(matches!(once, Value::Int32(-1500)));

        let bytes = encode_bignum(false, 0, &BigUint::from(1u64 << 40)).unwrap();
        let decoded = decode_bignum(&bytes).unwrap().into_value();
        assert!(matches!(decoded, Value::Int64(v) if v == 1 << 40));
    }

    #[test]
    fn test_zero_has_no_digits() {
        let bytes = encode_bignum(false, 0, &BigUint::zero()).unwrap();
        assert_eq!(bytes, [0x00, 0x00]);
        let num = decode_bignum(&bytes).unwrap();
        assert!(num.magnitude.is_zero());
    }

    #[test]
    fn test_exponent_overflow() {
        let one = BigUint::from(1u32);
        assert!(encode_bignum(false, -128, &one).is_ok());
        assert!(encode_bignum(false, 127, &one).is_ok());
        assert_eq!(
            encode_bignum(false, -129, &one),
            Err(EncodeError::ExponentOverflow { exponent: -129 })
        );
        assert_eq!(
            encode_bignum(true, 128, &one),
            Err(EncodeError::ExponentOverflow { exponent: 128 })
        );
    }

    #[test]
    fn test_decode_rejects_short_and_bad_sign() {
        assert!(matches!(decode_bignum(&[0x00]), Err(DecodeError::Truncated { .. })));
        assert!(matches!(
            decode_bignum(&[0x02, 0x00, 0x01]),
            Err(DecodeError::MalformedDocument { .. })
        ));
    }
}
