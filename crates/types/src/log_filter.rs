//! Logical log filters and their stable identifiers.

use alloy::primitives::{Address, B256};
use core::fmt::LowerHex;

/// Filter describing which logs are ingested.
///
/// # Topic Matching
///
/// Each topic position is independently filtered:
/// - `None` matches any value at that position.
/// - `Some(vec![a, b])` matches if the topic at that position equals
///   `a` **or** `b` (OR within a position).
///
/// Positions are combined with AND: a log must satisfy *all* non-`None`
/// topic filters simultaneously.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFilter {
    /// Chain the filter applies to.
    pub chain_id: u64,
    /// Filter by emitting contract address. `None` matches any address.
    pub address: Option<Vec<Address>>,
    /// Topic filters for positions 0–3.
    pub topics: [Option<Vec<B256>>; 4],
    /// Whether transaction receipts are materialized alongside logs.
    pub include_receipts: bool,
}

impl LogFilter {
    /// Create an unconstrained filter for `chain_id`.
    pub fn new(chain_id: u64) -> Self {
        Self { chain_id, ..Default::default() }
    }

    /// Restrict the filter to the given emitting contracts.
    pub fn with_addresses(mut self, addresses: impl IntoIterator<Item = Address>) -> Self {
        self.address = Some(addresses.into_iter().collect());
        self
    }

    /// Restrict topic position `index` to the given values.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not in `0..4`.
    pub fn with_topic(mut self, index: usize, values: impl IntoIterator<Item = B256>) -> Self {
        self.topics[index] = Some(values.into_iter().collect());
        self
    }

    /// Returns `true` if a log with the given address and topics matches this
    /// filter's address and topic criteria.
    pub fn matches(&self, address: &Address, topics: &[B256]) -> bool {
        self.matches_by(address, |i| topics.get(i).copied())
    }

    /// Like [`matches`](Self::matches), over upstream topics where a `None`
    /// ends the run of present topics.
    pub fn matches_upstream(&self, address: &Address, topics: &[Option<B256>]) -> bool {
        let present = topics.iter().position(Option::is_none).unwrap_or(topics.len());
        self.matches_by(address, |i| topics[..present].get(i).copied().flatten())
    }

    fn matches_by(&self, address: &Address, topic: impl Fn(usize) -> Option<B256>) -> bool {
        if let Some(ref addrs) = self.address
            && !addrs.contains(address)
        {
            return false;
        }
        self.topics.iter().enumerate().all(|(i, topic_filter)| {
            let Some(acceptable) = topic_filter else { return true };
            topic(i).is_some_and(|actual| acceptable.contains(&actual))
        })
    }

    /// Stable identifier used to key scan intervals.
    ///
    /// Format: `{chain}_{address}_{topic0}_{topic1}_{topic2}_{topic3}_{receipts}`
    /// where an unconstrained dimension is `null`, a single value is its
    /// lowercase hex, and several values are `[a,b]` in sorted order.
    pub fn id(&self) -> String {
        let mut id = self.chain_id.to_string();
        id.push('_');
        id.push_str(&dimension(self.address.as_deref()));
        for topic in &self.topics {
            id.push('_');
            id.push_str(&dimension(topic.as_deref()));
        }
        id.push('_');
        id.push(if self.include_receipts { '1' } else { '0' });
        id
    }
}

fn dimension<T: LowerHex>(values: Option<&[T]>) -> String {
    let Some(values) = values else { return "null".to_owned() };
    let mut rendered: Vec<String> = values.iter().map(|v| format!("{v:#x}")).collect();
    rendered.sort();
    rendered.dedup();
    match rendered.as_slice() {
        [single] => single.clone(),
        many => format!("[{}]", many.join(",")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{address, b256};

    const FRIENDTECH: Address = address!("0xCF205808Ed36593aa40a44F10c7f7C2F67d4A4d4");
    const TRADE: B256 = b256!("0x2c76e7a47fd53e2854856ac3f0a5f3ee40d15cfaa82266357ea9779c486ab9c3");

    #[test]
    fn single_filter_id() {
        let filter = LogFilter::new(8453).with_addresses([FRIENDTECH]).with_topic(0, [TRADE]);
        assert_eq!(
            filter.id(),
            "8453_0xcf205808ed36593aa40a44f10c7f7c2f67d4a4d4_\
             0x2c76e7a47fd53e2854856ac3f0a5f3ee40d15cfaa82266357ea9779c486ab9c3_null_null_null_0"
        );
    }

    #[test]
    fn multi_value_id_is_order_independent() {
        let a = Address::repeat_byte(1);
        let b = Address::repeat_byte(2);
        let ab = LogFilter::new(1).with_addresses([a, b]);
        let ba = LogFilter::new(1).with_addresses([b, a]);
        assert_eq!(ab.id(), ba.id());
        assert!(ab.id().starts_with(&format!("1_[{a:#x},{b:#x}]_null")));
    }

    #[test]
    fn matching() {
        let filter = LogFilter::new(8453).with_addresses([FRIENDTECH]).with_topic(0, [TRADE]);
        assert!(filter.matches(&FRIENDTECH, &[TRADE, B256::ZERO]));
        assert!(!filter.matches(&Address::ZERO, &[TRADE]));
        assert!(!filter.matches(&FRIENDTECH, &[B256::ZERO]));
        assert!(!filter.matches(&FRIENDTECH, &[]));
        assert!(LogFilter::new(1).matches(&Address::ZERO, &[]));
    }

    #[test]
    fn upstream_topics_stop_at_first_gap() {
        let filter = LogFilter::new(8453).with_topic(0, [TRADE]).with_topic(2, [B256::ZERO]);
        let full = [Some(TRADE), Some(TRADE), Some(B256::ZERO)];
        assert!(filter.matches_upstream(&FRIENDTECH, &full));
        assert!(!filter.matches_upstream(&FRIENDTECH, &[Some(TRADE), None, Some(B256::ZERO)]));
        assert!(!filter.matches_upstream(&FRIENDTECH, &[None, Some(TRADE)]));
        assert!(LogFilter::new(1).matches_upstream(&Address::ZERO, &[]));
    }
}
