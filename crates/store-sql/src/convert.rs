//! Conversion helpers between Rust types and SQL column values.
//!
//! Hashes, addresses and byte strings are stored as lowercase `0x`-prefixed
//! hex TEXT. Chain quantities (U256 and block-level u64s) are stored as
//! zero-padded decimal TEXT so text order matches numeric order. Small
//! indexes that fit in SQL INTEGER are stored as i64.

use crate::SqlStoreError;
use alloy::{
    eips::eip2930::AccessList,
    primitives::{B256, U256, hex},
};
use chainsync_types::{pad_decimal, pad_u64, parse_padded_decimal, parse_padded_u64};
use core::{fmt::Display, str::FromStr};

// ============================================================================
// Integer conversions
// ============================================================================

/// Convert u64 to i64 for SQL storage.
pub(crate) const fn to_i64(v: u64) -> i64 {
    v as i64
}

/// Convert i64 from SQL back to u64.
pub(crate) const fn from_i64(v: i64) -> u64 {
    v as u64
}

/// Convert a row limit to i64, saturating. Negative limits mean "no limit"
/// in SQLite but are rejected by PostgreSQL.
pub(crate) fn limit_to_i64(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

// ============================================================================
// Padded decimal quantities
// ============================================================================

/// Encode a U256 as a padded decimal.
pub(crate) fn encode_u256(v: &U256) -> String {
    pad_decimal(*v)
}

/// Decode a U256 from a padded decimal.
pub(crate) fn decode_u256(s: &str) -> Result<U256, SqlStoreError> {
    parse_padded_decimal(s).map_err(|e| SqlStoreError::Convert(e.to_string()))
}

/// Encode a u64 chain quantity as a padded decimal.
pub(crate) fn encode_u64(v: u64) -> String {
    pad_u64(v)
}

/// Decode a u64 chain quantity from a padded decimal.
pub(crate) fn decode_u64(s: &str) -> Result<u64, SqlStoreError> {
    parse_padded_u64(s).map_err(|e| SqlStoreError::Convert(e.to_string()))
}

// ============================================================================
// Hex encoding
// ============================================================================

/// Encode bytes as lowercase `0x`-prefixed hex.
pub(crate) fn encode_hex(bytes: impl AsRef<[u8]>) -> String {
    hex::encode_prefixed(bytes)
}

/// Decode a hex column into any type parseable from hex, such as `B256`,
/// `Address`, `Bloom` or `Bytes`.
pub(crate) fn decode_hex<T>(s: &str, col: &str) -> Result<T, SqlStoreError>
where
    T: FromStr,
    T::Err: Display,
{
    s.parse().map_err(|e| SqlStoreError::Convert(format!("column {col}: {e}")))
}

/// Encode an optional topic. Absent topics are the empty string.
pub(crate) fn encode_topic(topic: Option<B256>) -> String {
    topic.map(encode_hex).unwrap_or_default()
}

/// Decode an optional topic.
pub(crate) fn decode_topic(s: &str, col: &str) -> Result<Option<B256>, SqlStoreError> {
    if s.is_empty() { Ok(None) } else { decode_hex(s, col).map(Some) }
}

// ============================================================================
// Access lists
// ============================================================================

/// Encode an access list as JSON.
pub(crate) fn encode_access_list(list: &AccessList) -> Result<String, SqlStoreError> {
    serde_json::to_string(list).map_err(|e| SqlStoreError::Convert(e.to_string()))
}

/// Decode an access list from JSON. An empty column decodes to an empty
/// list.
pub(crate) fn decode_access_list(s: &str) -> Result<AccessList, SqlStoreError> {
    if s.is_empty() {
        return Ok(AccessList::default());
    }
    serde_json::from_str(s).map_err(|e| SqlStoreError::Convert(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::{
        eips::eip2930::AccessListItem,
        primitives::{Address, Bloom, Bytes},
    };

    #[test]
    fn hex_roundtrip() {
        let hash = B256::repeat_byte(0xab);
        let encoded = encode_hex(hash);
        assert_eq!(encoded, format!("0x{}", "ab".repeat(32)));
        assert_eq!(decode_hex::<B256>(&encoded, "hash").unwrap(), hash);

        let addr = Address::repeat_byte(0xcd);
        assert_eq!(decode_hex::<Address>(&encode_hex(addr), "address").unwrap(), addr);

        let bloom = Bloom::repeat_byte(0x01);
        assert_eq!(decode_hex::<Bloom>(&encode_hex(bloom), "logs_bloom").unwrap(), bloom);

        let empty = Bytes::new();
        assert_eq!(encode_hex(&empty), "0x");
        assert_eq!(decode_hex::<Bytes>("0x", "data").unwrap(), empty);
    }

    #[test]
    fn bad_hex_names_the_column() {
        let err = decode_hex::<B256>("0x12", "parent_hash").unwrap_err();
        assert!(err.to_string().contains("parent_hash"));
    }

    #[test]
    fn topics() {
        assert_eq!(encode_topic(None), "");
        assert_eq!(decode_topic("", "topic1").unwrap(), None);
        let t = B256::repeat_byte(7);
        assert_eq!(decode_topic(&encode_topic(Some(t)), "topic1").unwrap(), Some(t));
    }

    #[test]
    fn quantities() {
        assert_eq!(decode_u256(&encode_u256(&U256::MAX)).unwrap(), U256::MAX);
        assert_eq!(decode_u64(&encode_u64(42)).unwrap(), 42);
        assert!(encode_u64(9) < encode_u64(10));
        assert_eq!(limit_to_i64(usize::MAX), i64::MAX);
    }

    #[test]
    fn access_lists() {
        let list = AccessList(vec![AccessListItem {
            address: Address::repeat_byte(1),
            storage_keys: vec![B256::repeat_byte(2)],
        }]);
        let json = encode_access_list(&list).unwrap();
        assert_eq!(decode_access_list(&json).unwrap(), list);
        assert_eq!(decode_access_list("").unwrap(), AccessList::default());
        assert_eq!(decode_access_list("[]").unwrap(), AccessList::default());
    }
}
