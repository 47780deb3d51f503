//! Budget policy and usage tracking (spec.md §3, §4.1).

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{Duration, SystemTime};

/// Immutable per-mission budget policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetPolicy {
    pub max_steps: u32,
    pub max_cost_cents: u64,
    pub max_wall_clock: Duration,
}

impl Default for BudgetPolicy {
    fn default() -> Self {
        Self {
            max_steps: 25,
            max_cost_cents: 500,
            max_wall_clock: Duration::from_secs(600),
        }
    }
}

/// A canonicalised action fingerprint used by the loop detector
/// (tool name, normalised arguments).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub tool: String,
    pub normalised_args: String,
}

impl Fingerprint {
    pub fn new(tool: impl Into<String>, args: &str) -> Self {
        let normalised_args = args
            .to_lowercase()
            .replace(['"', '\''], "")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            tool: tool.into(),
            normalised_args,
        }
    }

    /// Token set used for Jaccard similarity, shared between insertion and
    /// comparison so behaviour is deterministic (spec.md §9).
    pub fn token_set(&self) -> std::collections::HashSet<String> {
        self.normalised_args
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }
}

/// Why resource exhaustion occurred (spec.md §4.4, §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExhaustionKind {
    Steps,
    Cost,
    Time,
}

/// Result of `Charge(step-cost, monetary-cost, now)` (spec.md §4.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChargeResult {
    Ok,
    Exhausted(ExhaustionKind),
}

/// Mutable, monotonically-advancing budget usage (spec.md §3, invariant I2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetUsage {
    pub steps_consumed: u32,
    pub cost_accumulated_cents: u64,
    pub start: SystemTime,
    /// Bounded deque of the last N action fingerprints for loop detection.
    #[serde(skip)]
    pub recent_actions: VecDeque<Fingerprint>,
}

impl BudgetUsage {
    pub fn new() -> Self {
        Self {
            steps_consumed: 0,
            cost_accumulated_cents: 0,
            start: SystemTime::now(),
            recent_actions: VecDeque::new(),
        }
    }
}

impl Default for BudgetUsage {
    fn default() -> Self {
        Self::new()
    }
}
