//! Versioned cache identities.
//!
//! A cache identity is `<prefix>-v<version>`. Only the identity whose
//! version equals the configured one is live; every other identity with the
//! same prefix is stale and gets deleted on activation.

use std::fmt;

use regex::Regex;

/// Identity of a cache store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheName {
    prefix: String,
    version: u32,
}

impl CacheName {
    pub fn new(prefix: impl Into<String>, version: u32) -> Self {
        Self { prefix: prefix.into(), version }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Whether `other` belongs to this cache family but carries a different
    /// version. Names outside the family are never stale.
    ///
    /// Versions compare numerically on their digits, so `v007` is version 7
    /// and versions too large for any integer type are still stale.
    pub fn is_stale(&self, other: &str) -> bool {
        match version_digits(&family_pattern(&self.prefix), other) {
            Some(digits) => digits != self.version.to_string(),
            None => false,
        }
    }
}

fn family_pattern(prefix: &str) -> Regex {
    Regex::new(&format!(r"^{}-v(\d+)$", regex::escape(prefix))).expect("escaped prefix forms a valid pattern")
}

/// The version digits of `name` without leading zeros, if it is in the family.
fn version_digits<'a>(pattern: &Regex, name: &'a str) -> Option<&'a str> {
    let digits = pattern.captures(name)?.get(1)?.as_str().trim_start_matches('0');
    Some(if digits.is_empty() { "0" } else { digits })
}

impl fmt::Display for CacheName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-v{}", self.prefix, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(CacheName::new("hngr", 7).to_string(), "hngr-v7");
    }

    #[test]
    fn test_accessors() {
        let name = CacheName::new("hngr", 12);
        assert_eq!(name.version(), 12);
    }

    #[test]
    fn test_stale_versions_in_family() {
        let current = CacheName::new("hngr", 3);
        assert!(current.is_stale("hngr-v1"));
        assert!(current.is_stale("hngr-v2"));
        assert!(current.is_stale("hngr-v0"));
        assert!(!current.is_stale("hngr-v3"));
    }

    #[test]
    fn test_out_of_range_versions_are_stale() {
        let current = CacheName::new("hngr", 7);
        assert!(current.is_stale("hngr-v4294967296"));
        assert!(current.is_stale("hngr-v99999999999999999999999999"));
        assert!(!current.is_stale("hngr-v0000000000000000000000007"));
    }

    #[test]
    fn test_leading_zeros_compare_numerically() {
        assert!(!CacheName::new("hngr", 7).is_stale("hngr-v07"));
        assert!(!CacheName::new("hngr", 0).is_stale("hngr-v000"));
        assert!(CacheName::new("hngr", 0).is_stale("hngr-v10"));
    }

    #[test]
    fn test_other_families_never_stale() {
        let current = CacheName::new("hngr", 3);
        assert!(!current.is_stale("other-v1"));
        assert!(!current.is_stale("hngr-v1-extra"));
        assert!(!current.is_stale("xhngr-v1"));
        assert!(!current.is_stale("hngr-images"));
    }

    #[test]
    fn test_prefix_is_escaped() {
        let current = CacheName::new("app.v2", 1);
        assert!(current.is_stale("app.v2-v0"));
        assert!(!current.is_stale("appxv2-v0"));
    }
}
