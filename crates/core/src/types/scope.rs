//! Scope policy types (spec.md §3, §4.1).

use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// A single scope pattern: a hostname glob or an IP CIDR.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScopePattern {
    /// Hostname glob, e.g. `*.example.com`. `*` matches exactly one label.
    Hostname(String),
    /// IP CIDR, e.g. `10.0.0.0/24`.
    Cidr(IpNet),
}

/// Per-mission scope policy (immutable once the mission starts; spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScopePolicy {
    pub allowed: Vec<ScopePattern>,
    pub excluded: Vec<ScopePattern>,
    pub allow_private_ips: bool,
}

impl ScopePolicy {
    pub fn new(allowed: Vec<ScopePattern>) -> Self {
        Self {
            allowed,
            excluded: Vec::new(),
            allow_private_ips: false,
        }
    }

    pub fn with_excluded(mut self, excluded: Vec<ScopePattern>) -> Self {
        self.excluded = excluded;
        self
    }

    pub fn with_allow_private_ips(mut self, allow: bool) -> Self {
        self.allow_private_ips = allow;
        self
    }
}

/// Reason a target was denied admission (spec.md §4.1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DenyReason {
    OutOfScope,
    ExplicitlyExcluded,
    GlobalBlocklist,
    PrivateIpDisallowed,
    Malformed,
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DenyReason::OutOfScope => "out-of-scope",
            DenyReason::ExplicitlyExcluded => "explicitly-excluded",
            DenyReason::GlobalBlocklist => "global-blocklist",
            DenyReason::PrivateIpDisallowed => "private-ip-disallowed",
            DenyReason::Malformed => "malformed",
        };
        write!(f, "{s}")
    }
}

/// Outcome of `Admit(target, scope)` (spec.md §4.1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Admission {
    Allow,
    Deny(DenyReason),
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allow)
    }
}

/// A parsed target is either a hostname or an IP address.
#[derive(Debug, Clone)]
pub enum Target {
    Hostname(String),
    Ip(IpAddr),
}
