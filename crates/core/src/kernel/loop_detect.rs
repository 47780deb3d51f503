//! Action-similarity loop detector: `LoopCheck(fingerprint)` (spec.md §4.1).

use std::collections::VecDeque;

use crate::types::{BudgetUsage, Fingerprint};

/// Default window size (spec.md §4.1).
pub const DEFAULT_WINDOW: usize = 10;
/// Default similarity threshold (spec.md §4.1).
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.8;
/// Identical-occurrence repetition count that marks an action repetitive.
const REPETITION_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopVerdict {
    Repetitive,
    Novel,
}

/// Jaccard similarity over the two fingerprints' token sets.
fn similarity(a: &Fingerprint, b: &Fingerprint) -> f64 {
    if a.tool != b.tool {
        return 0.0;
    }
    let ta = a.token_set();
    let tb = b.token_set();
    if ta.is_empty() && tb.is_empty() {
        return 1.0;
    }
    let intersection = ta.intersection(&tb).count();
    let union = ta.union(&tb).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// `LoopCheck(fingerprint)`: repetitive iff identical occurrences in the last
/// `window` entries are `>= 3`, or similarity to any window entry is
/// `>= threshold` (spec.md §4.1). Inserts the fingerprint into the window
/// regardless of verdict, so a later, different action still sees this one.
pub fn loop_check(
    usage: &mut BudgetUsage,
    fingerprint: Fingerprint,
    window: usize,
    threshold: f64,
) -> LoopVerdict {
    let identical_count = usage
        .recent_actions
        .iter()
        .filter(|f| **f == fingerprint)
        .count();
    // Exact repeats are governed by `identical_count`/`REPETITION_COUNT`
    // below; the threshold check exists to catch near-duplicates (same tool,
    // slightly varied arguments) that would otherwise never compare equal.
    let similar = usage
        .recent_actions
        .iter()
        .any(|f| f != &fingerprint && similarity(f, &fingerprint) >= threshold);

    push_bounded(&mut usage.recent_actions, fingerprint, window);

    // `identical_count` only counts occurrences already in the window,
    // before this one is inserted above, so the current action itself
    // contributes the "+1" toward `REPETITION_COUNT`.
    if identical_count + 1 >= REPETITION_COUNT || similar {
        LoopVerdict::Repetitive
    } else {
        LoopVerdict::Novel
    }
}

fn push_bounded(deque: &mut VecDeque<Fingerprint>, item: Fingerprint, window: usize) {
    deque.push_back(item);
    while deque.len() > window {
        deque.pop_front();
    }
}
