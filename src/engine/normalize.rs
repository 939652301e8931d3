//! Identifier normalization across the three id dialects.
//!
//! The same purchase shows up as `1404930428916-01` in VTEX, `1404930428916-1`
//! in the gateway (sequence without leading zeros, and `-2` for the second
//! record of a split payment), and bare `1404930428916` in the fulfilment
//! center export.

/// Map a VTEX order id to the gateway transaction id: keep the order number,
/// re-render the sequence suffix without leading zeros. `None` when the id
/// has no parseable `-<seq>` suffix; such ids simply never match the gateway.
pub fn payway_key(order_id: &str) -> Option<String> {
    let (order, seq) = order_id.split_once('-')?;
    let seq: u32 = seq.trim().parse().ok()?;
    Some(format!("{order}-{seq}"))
}

/// The second record of a split payment: same key with every `-1` swapped
/// for `-2`. Sequence suffixes never carry leading zeros here, so the only
/// `-1` a well-formed key contains is the suffix itself.
pub fn split_key(payway_key: &str) -> String {
    payway_key.replace("-1", "-2")
}

/// The fulfilment center drops the sequence suffix entirely.
pub fn cdp_key(order_id: &str) -> &str {
    match order_id.split_once('-') {
        Some((order, _)) => order,
        None => order_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payway_key_drops_leading_zeros() {
        assert_eq!(
            payway_key("1234567890123-01").as_deref(),
            Some("1234567890123-1")
        );
        assert_eq!(
            payway_key("9876543210123-02").as_deref(),
            Some("9876543210123-2")
        );
    }

    #[test]
    fn payway_key_keeps_multi_digit_sequences() {
        assert_eq!(
            payway_key("1234567890123-10").as_deref(),
            Some("1234567890123-10")
        );
        assert_eq!(
            payway_key("1234567890123-5").as_deref(),
            Some("1234567890123-5")
        );
    }

    #[test]
    fn payway_key_rejects_malformed_ids() {
        assert_eq!(payway_key("1234567890123"), None);
        assert_eq!(payway_key("1234567890123-"), None);
        assert_eq!(payway_key("1234567890123-ab"), None);
    }

    #[test]
    fn split_key_swaps_every_suffix_occurrence() {
        assert_eq!(split_key("1234567890123-1"), "1234567890123-2");
        assert_eq!(split_key("9-1-1"), "9-2-2");
        assert_eq!(split_key("1234567890123-3"), "1234567890123-3");
    }

    #[test]
    fn cdp_key_truncates_at_dash() {
        assert_eq!(cdp_key("1234567890123-01"), "1234567890123");
        assert_eq!(cdp_key("1234567890123"), "1234567890123");
    }
}
