//! Numeric literals as written in assembly source.
//!
//! `_` may separate digit groups anywhere. A `0b`/`0B` prefix selects unsigned
//! binary; otherwise an optional sign is followed by `0x`/`0X`/`#` (hex), a
//! leading `0` (octal) or plain decimal digits.

use crate::error::IsaError;

pub fn parse_number(text: &str) -> Result<i32, IsaError> {
    let bad = || IsaError::BadNumber(text.to_string());
    let cleaned: String = text.chars().filter(|&c| c != '_').collect();

    if let Some(bits) = cleaned
        .strip_prefix("0b")
        .or_else(|| cleaned.strip_prefix("0B"))
    {
        if bits.is_empty() || !bits.chars().all(|c| c == '0' || c == '1') {
            return Err(bad());
        }
        // Unsigned 32-bit pattern, reinterpreted as i32.
        return u32::from_str_radix(bits, 2).map(|v| v as i32).map_err(|_| bad());
    }

    let (negative, rest) = match cleaned.as_bytes().first() {
        Some(b'-') => (true, &cleaned[1..]),
        Some(b'+') => (false, &cleaned[1..]),
        _ => (false, cleaned.as_str()),
    };

    let (radix, digits) = if let Some(h) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
        (16, h)
    } else if let Some(h) = rest.strip_prefix('#') {
        (16, h)
    } else if rest.len() > 1 && rest.starts_with('0') {
        (8, &rest[1..])
    } else {
        (10, rest)
    };

    if digits.is_empty() || digits.starts_with(['-', '+']) {
        return Err(bad());
    }

    let magnitude = i64::from_str_radix(digits, radix).map_err(|_| bad())?;
    let value = if negative { -magnitude } else { magnitude };
    i32::try_from(value).map_err(|_| bad())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_hex_octal() {
        assert_eq!(parse_number("42").unwrap(), 42);
        assert_eq!(parse_number("-42").unwrap(), -42);
        assert_eq!(parse_number("+7").unwrap(), 7);
        assert_eq!(parse_number("0x1F").unwrap(), 31);
        assert_eq!(parse_number("-0x10").unwrap(), -16);
        assert_eq!(parse_number("#ff").unwrap(), 255);
        assert_eq!(parse_number("017").unwrap(), 15);
        assert_eq!(parse_number("0").unwrap(), 0);
    }

    #[test]
    fn binary_and_separators() {
        assert_eq!(parse_number("0b1010").unwrap(), 10);
        assert_eq!(parse_number("0B1111_0000").unwrap(), 0xF0);
        assert_eq!(parse_number("1_000").unwrap(), 1000);
        assert_eq!(parse_number("0x00_ff").unwrap(), 255);
    }

    #[test]
    fn rejects_garbage() {
        for s in ["", "abc", "0x", "08", "0b2", "-0b1", "--1", "r1", ".loop", "0x-1"] {
            assert!(parse_number(s).is_err(), "{s} should not parse");
        }
    }

    #[test]
    fn rejects_out_of_i32_range() {
        assert!(parse_number("2147483648").is_err());
        assert_eq!(parse_number("-2147483648").unwrap(), i32::MIN);
    }
}
