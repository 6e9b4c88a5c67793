//! Subnet parsing and immutable subnet sets.
//!
//! # Responsibilities
//! - Turn raw list entries into canonical CIDR blocks. A bare IP becomes its
//!   full-host network, `203.0.113.7` is `203.0.113.7/32` and `2001:db8::1`
//!   is `2001:db8::1/128`. Host bits below the prefix are masked off, so
//!   `192.168.1.1/16` and `192.168.0.0/16` end up as the same block.
//! - Hold a parsed list as an immutable [`SubnetSet`] that answers
//!   membership questions without locking or allocation.
//!
//! Sets are never mutated after construction. Refresh builds a complete new
//! set and publishes it wholesale, so a reader observes either the old list
//! or the new one, never a mix.

use std::borrow::Cow;
use std::net::IpAddr;

use ipnet::IpNet;

/// Normalize a raw list entry at the string level. Bare IPs get their
/// full-host prefix appended, everything else passes through trimmed. The
/// result is only meaningful as a comparison key; validity is decided by
/// [`parse_subnet`].
pub fn normalize_entry(raw: &str) -> Cow<'_, str> {
    let raw = raw.trim();
    if raw.contains('/') {
        return Cow::Borrowed(raw);
    }
    match raw.parse::<IpAddr>() {
        Ok(IpAddr::V4(_)) => Cow::Owned(format!("{raw}/32")),
        Ok(IpAddr::V6(_)) => Cow::Owned(format!("{raw}/128")),
        Err(_) => Cow::Borrowed(raw),
    }
}

/// Parse one entry, either a bare IP or an `address/prefix` pair, into its
/// canonical network. Returns `None` for anything malformed, including
/// prefixes out of range for the address family.
pub fn parse_subnet(raw: &str) -> Option<IpNet> {
    let raw = raw.trim();
    if let Ok(addr) = raw.parse::<IpAddr>() {
        return Some(IpNet::from(addr));
    }
    raw.parse::<IpNet>().ok().map(|net| net.trunc())
}

/// An immutable, ordered collection of CIDR blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubnetSet {
    nets: Vec<IpNet>,
}

impl SubnetSet {
    pub fn new(nets: Vec<IpNet>) -> Self {
        Self { nets }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether any block in the set contains the address.
    pub fn contains(&self, ip: IpAddr) -> bool {
        self.nets.iter().any(|net| net.contains(&ip))
    }

    /// Duplicate check used by refresh: exact match against the canonical
    /// string form of an already-parsed block. Distinct spellings of the
    /// same network compare equal because both sides are canonical, but a
    /// narrower block inside a wider one does not.
    pub fn has_entry(&self, normalized: &str) -> bool {
        self.nets.iter().any(|net| net.to_string() == normalized)
    }

    pub fn len(&self) -> usize {
        self.nets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn must_parse(raw: &str) -> IpNet {
        parse_subnet(raw).unwrap_or_else(|| panic!("{raw:?} should parse"))
    }

    #[test]
    fn test_bare_ips_become_full_host_networks() {
        assert_eq!(must_parse("127.0.0.1").to_string(), "127.0.0.1/32");
        assert_eq!(must_parse("2001:db8::1").to_string(), "2001:db8::1/128");
    }

    #[test]
    fn test_host_bits_are_masked_to_the_canonical_network() {
        assert_eq!(must_parse("192.168.1.1/16").to_string(), "192.168.0.0/16");
        assert_eq!(must_parse("10.1.2.3/8").to_string(), "10.0.0.0/8");
        assert_eq!(must_parse("2001:db8::1/32").to_string(), "2001:db8::/32");
    }

    #[test]
    fn test_whitespace_is_trimmed_before_parsing() {
        assert_eq!(must_parse("  172.16.0.0/12\t").to_string(), "172.16.0.0/12");
    }

    #[test]
    fn test_malformed_entries_are_rejected() {
        for raw in [
            "127.0.0./33",
            "10.0.0.0/33",
            "2001:db8::/129",
            "1.2.3.4/",
            "/32",
            "not-an-ip",
            "",
        ] {
            assert!(parse_subnet(raw).is_none(), "{raw:?} should be rejected");
        }
    }

    #[test]
    fn test_normalize_entry_appends_the_family_prefix() {
        assert_eq!(normalize_entry("203.0.113.7"), "203.0.113.7/32");
        assert_eq!(normalize_entry("2001:db8::1"), "2001:db8::1/128");
        assert_eq!(normalize_entry("10.0.0.0/8"), "10.0.0.0/8");
        assert_eq!(normalize_entry(" garbage "), "garbage");
    }

    #[test]
    fn test_contains_checks_every_block() {
        let set = SubnetSet::new(vec![must_parse("10.0.0.0/8"), must_parse("2001:db8::/32")]);
        assert!(set.contains("10.200.0.1".parse().unwrap()));
        assert!(set.contains("2001:db8:1::5".parse().unwrap()));
        assert!(!set.contains("11.0.0.1".parse().unwrap()));
        assert!(!set.contains("2001:db9::1".parse().unwrap()));
    }

    #[test]
    fn test_has_entry_matches_canonical_strings_only() {
        let set = SubnetSet::new(vec![must_parse("10.0.0.0/8"), must_parse("203.0.113.7")]);
        assert!(set.has_entry("10.0.0.0/8"));
        assert!(set.has_entry("203.0.113.7/32"));
        // Contained in 10.0.0.0/8, but not the same block.
        assert!(!set.has_entry("10.1.0.0/16"));
        assert!(!set.has_entry("203.0.113.7"));
    }

    #[test]
    fn test_empty_set_matches_nothing() {
        let set = SubnetSet::empty();
        assert!(set.is_empty());
        assert!(!set.contains("127.0.0.1".parse().unwrap()));
    }
}
