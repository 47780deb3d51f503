//! Mission control signals and queries (spec.md §4.4 "Signals and queries").
//! Signals are observed at the workflow's next suspension point, never
//! interrupting an in-flight activity (spec.md §9).

use std::collections::VecDeque;
use tokio::sync::{Mutex, Notify};

use crate::types::{MissionStatus, StepId};

#[derive(Debug, Clone)]
pub enum Signal {
    ApprovePlan(Vec<StepId>),
    Pause,
    Resume,
    Cancel,
}

/// `get-status` query result (spec.md §4.4).
#[derive(Debug, Clone)]
pub struct MissionSnapshot {
    pub status: MissionStatus,
    pub step: usize,
    pub findings_count: usize,
    pub steps_consumed: u32,
    pub cost_accumulated_cents: u64,
}

/// Shared, cooperative signal inbox. A single producer (the API layer) and
/// a single consumer (the workflow loop); FIFO so signals apply in the
/// order they were issued.
#[derive(Default)]
pub struct SignalQueue {
    pending: Mutex<VecDeque<Signal>>,
    notify: Notify,
}

impl SignalQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push(&self, signal: Signal) {
        self.pending.lock().await.push_back(signal);
        self.notify.notify_one();
    }

    /// Drain everything queued since the last suspension point, without
    /// blocking (used at the top of each running-loop iteration).
    pub async fn drain(&self) -> Vec<Signal> {
        let mut guard = self.pending.lock().await;
        guard.drain(..).collect()
    }

    /// Block until a signal is available, then pop and return it (used at
    /// suspension points that must wait: awaiting-approval, paused).
    pub async fn next_signal(&self) -> Signal {
        loop {
            if let Some(signal) = self.pending.lock().await.pop_front() {
                return signal;
            }
            self.notify.notified().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn drains_in_fifo_order() {
        let queue = SignalQueue::new();
        queue.push(Signal::Pause).await;
        queue.push(Signal::Resume).await;
        let drained = queue.drain().await;
        assert!(matches!(drained[0], Signal::Pause));
        assert!(matches!(drained[1], Signal::Resume));
        assert!(queue.drain().await.is_empty());
    }
}
