//! Shared helpers for turning provider payloads into fractions.

use crate::{Error, Result};

/// Read a string of decimal digits as the fractional part of a number, so
/// `"0317"` becomes `0.0317`.
pub(super) fn fraction_from_digits(source_name: &'static str, digits: &str) -> Result<f64> {
    let digits = digits.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::bad_response(
            source_name,
            format!("expected decimal digits, got {digits:?}"),
        ));
    }

    let value: f64 = format!("0.{digits}")
        .parse()
        .map_err(|e| Error::bad_response(source_name, format!("bad digits {digits:?}: {e}")))?;

    // a long enough run of nines rounds up to exactly 1.0
    check_fraction(source_name, value)
}

/// Read a hex string as an integer, then read that integer's decimal digits
/// as a fraction, so `"1f"` becomes `0.31`.
pub(super) fn fraction_from_hex(source_name: &'static str, hex: &str) -> Result<f64> {
    let hex = hex.trim();
    let n = u128::from_str_radix(hex, 16)
        .map_err(|e| Error::bad_response(source_name, format!("bad hex block {hex:?}: {e}")))?;

    fraction_from_digits(source_name, &n.to_string())
}

/// Parse a decimal fraction, rejecting anything outside of `[0, 1)`.
pub(super) fn fraction_from_decimal(source_name: &'static str, s: &str) -> Result<f64> {
    let s = s.trim();
    let value: f64 = s
        .parse()
        .map_err(|e| Error::bad_response(source_name, format!("bad decimal {s:?}: {e}")))?;

    check_fraction(source_name, value)
}

fn check_fraction(source_name: &'static str, value: f64) -> Result<f64> {
    if !(0.0..1.0).contains(&value) {
        return Err(Error::bad_response(
            source_name,
            format!("{value} is not in [0, 1)"),
        ));
    }
    Ok(value)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_digits() {
        assert_eq!(fraction_from_digits("test", "5").unwrap(), 0.5);
        assert_eq!(fraction_from_digits("test", "0317").unwrap(), 0.0317);
        assert_eq!(fraction_from_digits("test", " 25\n").unwrap(), 0.25);
        assert_eq!(fraction_from_digits("test", "0").unwrap(), 0.0);
    }

    #[test]
    fn test_bad_digits() {
        for bad in ["", "  ", "12a", "-1", "0.5", "1e3"] {
            assert!(
                fraction_from_digits("test", bad).is_err(),
                "{bad:?} should not parse",
            );
        }

        // rounds to 1.0
        assert!(fraction_from_digits("test", &"9".repeat(40)).is_err());
    }

    #[test]
    fn test_hex() {
        assert_eq!(fraction_from_hex("test", "1f").unwrap(), 0.31);
        assert_eq!(fraction_from_hex("test", "FF").unwrap(), 0.255);
        assert_eq!(fraction_from_hex("test", "0000a").unwrap(), 0.1);
        assert_eq!(fraction_from_hex("test", "00000").unwrap(), 0.0);
    }

    #[test]
    fn test_bad_hex() {
        let too_long = "f".repeat(33);
        for bad in ["", "xyz", "-1", too_long.as_str()] {
            assert!(fraction_from_hex("test", bad).is_err(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn test_decimal() {
        assert_eq!(fraction_from_decimal("test", "0.123456").unwrap(), 0.123456);
        assert_eq!(fraction_from_decimal("test", "0").unwrap(), 0.0);

        for bad in ["1", "1.0", "-0.5", "abc", "NaN", "inf"] {
            assert!(
                fraction_from_decimal("test", bad).is_err(),
                "{bad:?} should not parse",
            );
        }
    }
}
