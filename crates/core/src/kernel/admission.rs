//! Target admission: `Admit(target, scope)` (spec.md §4.1).

use ipnet::IpNet;
use std::net::IpAddr;
use std::str::FromStr;

use crate::types::{Admission, DenyReason, ScopePattern, ScopePolicy, Target};

/// Tenant-level blocklist consulted before scope patterns (spec.md §4.1 step 3).
/// Shared, read-only across missions (spec.md §3 Ownership).
#[derive(Debug, Clone)]
pub struct GlobalBlocklist {
    /// Hostname suffixes that are always denied, e.g. `.gov`, `.mil`.
    pub hostname_suffixes: Vec<String>,
    /// Exact or glob hostname patterns for named major platforms.
    pub hostname_patterns: Vec<String>,
}

impl Default for GlobalBlocklist {
    fn default() -> Self {
        Self {
            hostname_suffixes: vec![".gov".to_string(), ".mil".to_string()],
            hostname_patterns: vec![
                "google.com".to_string(),
                "*.google.com".to_string(),
                "facebook.com".to_string(),
                "*.facebook.com".to_string(),
                "amazon.com".to_string(),
                "*.amazon.com".to_string(),
                "microsoft.com".to_string(),
                "*.microsoft.com".to_string(),
                "apple.com".to_string(),
                "*.apple.com".to_string(),
            ],
        }
    }
}

impl GlobalBlocklist {
    pub fn matches_hostname(&self, host: &str) -> bool {
        let host = host.to_lowercase();
        if self
            .hostname_suffixes
            .iter()
            .any(|suffix| host.ends_with(suffix.as_str()))
        {
            return true;
        }
        self.hostname_patterns
            .iter()
            .any(|p| hostname_glob_matches(p, &host))
    }
}

/// Parse a raw target string into a `Target`, rejecting malformed input
/// (spec.md §4.1 step 1).
pub fn parse_target(raw: &str) -> Option<Target> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ip) = IpAddr::from_str(raw) {
        return Some(Target::Ip(ip));
    }
    if is_valid_hostname(raw) {
        return Some(Target::Hostname(raw.to_lowercase()));
    }
    None
}

fn is_valid_hostname(raw: &str) -> bool {
    if raw.len() > 253 || !raw.contains('.') {
        return false;
    }
    raw.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && label
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '*')
            && !label.starts_with('-')
            && !label.ends_with('-')
    })
}

/// Standard reserved (private/link-local/loopback) IP ranges, applied unless
/// the scope policy sets `allow_private_ips` (spec.md §4.1 step 2).
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_private()
                || v4.is_loopback()
                || v4.is_link_local()
                || v4.is_broadcast()
                || v4.is_unspecified()
        }
        IpAddr::V6(v6) => {
            v6.is_loopback() || v6.is_unspecified() || (v6.segments()[0] & 0xfe00) == 0xfc00
        }
    }
}

/// Hostname glob matcher. A pattern of the form `*.suffix` matches any
/// hostname ending in `.suffix` at any depth (so `*.example.com` admits both
/// `a.example.com` and `deep.b.example.com`, per spec.md §8's boundary
/// behaviour, but never the bare apex `example.com`). A `*` anywhere else in
/// the pattern matches exactly one DNS label (spec.md §4.1: "matches any
/// label segment except `.`").
pub fn hostname_glob_matches(pattern: &str, host: &str) -> bool {
    let pattern = pattern.to_lowercase();
    let host = host.to_lowercase();
    if let Some(suffix) = pattern.strip_prefix("*.") {
        return host != suffix && host.ends_with(&format!(".{suffix}"));
    }
    let pattern_labels: Vec<&str> = pattern.split('.').collect();
    let host_labels: Vec<&str> = host.split('.').collect();
    if pattern_labels.len() != host_labels.len() {
        return false;
    }
    pattern_labels
        .iter()
        .zip(host_labels.iter())
        .all(|(p, h)| *p == "*" || p == h)
}

fn target_matches_pattern(target: &Target, pattern: &ScopePattern) -> bool {
    match (target, pattern) {
        (Target::Hostname(h), ScopePattern::Hostname(p)) => hostname_glob_matches(p, h),
        (Target::Ip(ip), ScopePattern::Cidr(net)) => net.contains(ip),
        _ => false,
    }
}

/// Run the ordered admission algorithm (spec.md §4.1): first failing rule wins.
pub fn admit(raw_target: &str, scope: &ScopePolicy, blocklist: &GlobalBlocklist) -> Admission {
    let target = match parse_target(raw_target) {
        Some(t) => t,
        None => return Admission::Deny(DenyReason::Malformed),
    };

    if let Target::Ip(ip) = &target {
        if is_private_ip(ip) && !scope.allow_private_ips {
            return Admission::Deny(DenyReason::PrivateIpDisallowed);
        }
    }

    if let Target::Hostname(h) = &target {
        if blocklist.matches_hostname(h) {
            return Admission::Deny(DenyReason::GlobalBlocklist);
        }
    }

    if scope
        .excluded
        .iter()
        .any(|p| target_matches_pattern(&target, p))
    {
        return Admission::Deny(DenyReason::ExplicitlyExcluded);
    }

    if scope
        .allowed
        .iter()
        .any(|p| target_matches_pattern(&target, p))
    {
        Admission::Allow
    } else {
        Admission::Deny(DenyReason::OutOfScope)
    }
}

/// Parse a CIDR pattern string into a `ScopePattern`, used by policy loaders.
pub fn cidr_pattern(cidr: &str) -> Result<ScopePattern, ipnet::AddrParseError> {
    Ok(ScopePattern::Cidr(IpNet::from_str(cidr)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ScopePattern;

    fn scope(allowed: &[&str]) -> ScopePolicy {
        ScopePolicy::new(
            allowed
                .iter()
                .map(|p| ScopePattern::Hostname(p.to_string()))
                .collect(),
        )
    }

    #[test]
    fn wildcard_admits_nested_subdomains() {
        let s = scope(&["*.example.com"]);
        let bl = GlobalBlocklist::default();
        assert_eq!(admit("a.example.com", &s, &bl), Admission::Allow);
        assert_eq!(admit("deep.b.example.com", &s, &bl), Admission::Allow);
    }

    #[test]
    fn wildcard_denies_bare_apex_and_lookalike() {
        let s = scope(&["*.example.com"]);
        let bl = GlobalBlocklist::default();
        assert_eq!(
            admit("example.com", &s, &bl),
            Admission::Deny(DenyReason::OutOfScope)
        );
        assert_eq!(
            admit("evil-example.com", &s, &bl),
            Admission::Deny(DenyReason::OutOfScope)
        );
    }

    #[test]
    fn private_ip_denied_by_default_admitted_with_override() {
        let mut s = ScopePolicy::new(vec![cidr_pattern("10.0.0.0/24").unwrap()]);
        let bl = GlobalBlocklist::default();
        assert_eq!(
            admit("10.0.0.5", &s, &bl),
            Admission::Deny(DenyReason::PrivateIpDisallowed)
        );
        s.allow_private_ips = true;
        assert_eq!(admit("10.0.0.5", &s, &bl), Admission::Allow);
    }

    #[test]
    fn global_blocklist_denies_gov_and_named_platforms() {
        let s = scope(&["*.gov", "google.com"]);
        let bl = GlobalBlocklist::default();
        assert_eq!(
            admit("agency.gov", &s, &bl),
            Admission::Deny(DenyReason::GlobalBlocklist)
        );
        assert_eq!(
            admit("google.com", &s, &bl),
            Admission::Deny(DenyReason::GlobalBlocklist)
        );
    }

    #[test]
    fn explicit_exclusion_wins_over_allowed_match() {
        let mut s = scope(&["*.example.com"]);
        s.excluded = vec![ScopePattern::Hostname("internal.example.com".to_string())];
        let bl = GlobalBlocklist::default();
        assert_eq!(
            admit("internal.example.com", &s, &bl),
            Admission::Deny(DenyReason::ExplicitlyExcluded)
        );
        assert_eq!(admit("a.example.com", &s, &bl), Admission::Allow);
    }

    #[test]
    fn malformed_target_rejected() {
        let s = scope(&["*.example.com"]);
        let bl = GlobalBlocklist::default();
        assert_eq!(admit("", &s, &bl), Admission::Deny(DenyReason::Malformed));
        assert_eq!(
            admit("not a host!", &s, &bl),
            Admission::Deny(DenyReason::Malformed)
        );
    }
}
