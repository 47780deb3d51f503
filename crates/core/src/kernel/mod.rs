//! Scope & Budget Kernel (spec.md §4.1): pure functions over a mission's
//! policy — target admission, step/cost/time accounting, and an
//! action-similarity loop detector. Called only from the workflow's single
//! logical thread (spec.md §5), so usage counters need no lock contention.

pub mod admission;
pub mod budget;
pub mod loop_detect;

pub use admission::{admit, cidr_pattern, hostname_glob_matches, parse_target, GlobalBlocklist};
pub use budget::charge;
pub use loop_detect::{loop_check, LoopVerdict, DEFAULT_SIMILARITY_THRESHOLD, DEFAULT_WINDOW};

use serde::{Deserialize, Serialize};

/// Tenant-configurability of these is an open question per spec.md §9;
/// exposed here as a per-mission setting rather than hard-coded constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopDetectorConfig {
    pub window: usize,
    pub similarity_threshold: f64,
}

impl Default for LoopDetectorConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}
