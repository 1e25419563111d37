//! Zero-padded decimal rendering for chain quantities.
//!
//! Chain quantities are stored as fixed-width decimal strings so that they
//! keep full 256-bit precision and compare correctly as text. 79 digits holds
//! any `U256`.

use alloy::primitives::U256;

/// Width of every padded decimal column.
pub const DECIMAL_WIDTH: usize = 79;

/// A padded decimal or hex quantity could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecimalParseError {
    /// The input was not a valid number in the expected radix.
    #[error("invalid {radix} quantity {input:?}")]
    Invalid {
        /// The radix that was expected.
        radix: &'static str,
        /// The rejected input.
        input: String,
    },
    /// The value is larger than the target integer type.
    #[error("quantity {0} does not fit in 64 bits")]
    TooLarge(U256),
}

/// Render a value as a [`DECIMAL_WIDTH`]-digit zero-padded decimal.
pub fn pad_decimal(value: U256) -> String {
    format!("{:0>width$}", value.to_string(), width = DECIMAL_WIDTH)
}

/// Render a `u64` as a [`DECIMAL_WIDTH`]-digit zero-padded decimal.
pub fn pad_u64(value: u64) -> String {
    format!("{value:0>width$}", width = DECIMAL_WIDTH)
}

/// Parse a `0x`-prefixed hex quantity into a padded decimal.
///
/// `"0x"` is treated as zero.
pub fn hex_to_padded_decimal(hex: &str) -> Result<String, DecimalParseError> {
    let digits = hex.strip_prefix("0x").or_else(|| hex.strip_prefix("0X")).unwrap_or(hex);
    if digits.is_empty() {
        return Ok(pad_decimal(U256::ZERO));
    }
    U256::from_str_radix(digits, 16)
        .map(pad_decimal)
        .map_err(|_| DecimalParseError::Invalid { radix: "hex", input: hex.to_owned() })
}

/// Parse a padded (or unpadded) decimal back into a `U256`.
pub fn parse_padded_decimal(s: &str) -> Result<U256, DecimalParseError> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DecimalParseError::Invalid { radix: "decimal", input: s.to_owned() });
    }
    U256::from_str_radix(s, 10)
        .map_err(|_| DecimalParseError::Invalid { radix: "decimal", input: s.to_owned() })
}

/// Parse a padded decimal back into a `u64`.
pub fn parse_padded_u64(s: &str) -> Result<u64, DecimalParseError> {
    let value = parse_padded_decimal(s)?;
    u64::try_from(value).map_err(|_| DecimalParseError::TooLarge(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_to_width() {
        let s = pad_u64(8453);
        assert_eq!(s.len(), DECIMAL_WIDTH);
        assert!(s.ends_with("8453"));
        assert!(s[..DECIMAL_WIDTH - 4].bytes().all(|b| b == b'0'));

        assert_eq!(pad_decimal(U256::MAX).len(), DECIMAL_WIDTH);
        assert_eq!(pad_decimal(U256::from(8453)), s);
    }

    #[test]
    fn padded_order_is_numeric_order() {
        let mut values = [0u64, 9, 10, 99, 100, 12_345, u64::MAX];
        let mut padded: Vec<_> = values.iter().map(|v| pad_u64(*v)).collect();
        padded.sort();
        values.sort();
        let back: Vec<_> = padded.iter().map(|s| parse_padded_u64(s).unwrap()).collect();
        assert_eq!(back, values);
    }

    #[test]
    fn hex_quantities() {
        assert_eq!(hex_to_padded_decimal("0x00").unwrap(), pad_u64(0));
        assert_eq!(hex_to_padded_decimal("0x").unwrap(), pad_u64(0));
        assert_eq!(hex_to_padded_decimal("0x1c9c380").unwrap(), pad_u64(30_000_000));
        assert!(hex_to_padded_decimal("0xzz").is_err());
    }

    #[test]
    fn rejects_non_decimal() {
        assert!(parse_padded_decimal("").is_err());
        assert!(parse_padded_decimal("12a").is_err());
        assert!(matches!(
            parse_padded_u64(&pad_decimal(U256::MAX)),
            Err(DecimalParseError::TooLarge(_))
        ));
    }
}
