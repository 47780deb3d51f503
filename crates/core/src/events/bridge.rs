//! Event Bridge (spec.md §4.5): fans mission log records and status
//! transitions out to any number of subscribers, each owning a bounded
//! channel. A subscriber that can't keep up is closed with `overflow` —
//! other subscribers and the publishing mission are unaffected.

use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::types::{LogRecord, MissionId, MissionStatus, SubscriptionId};

use super::subscription::{CloseCause, EventFrame, Subscription};

/// Default per-subscription channel capacity (spec.md §4.5 Delivery model).
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

struct Slot {
    sender: mpsc::Sender<EventFrame>,
}

/// Per-mission fan-out registry. Each subscription is single-producer
/// (the publishing workflow) / single-consumer (the subscriber), matching
/// spec.md §5's shared-resource policy.
#[derive(Default)]
pub struct EventBridge {
    subscriptions: DashMap<MissionId, Vec<(SubscriptionId, Slot)>>,
    capacity: usize,
}

impl EventBridge {
    pub fn new(capacity: usize) -> Self {
        Self {
            subscriptions: DashMap::new(),
            capacity,
        }
    }

    /// Attach a new subscriber to a mission; returns the consuming half.
    pub fn subscribe(&self, mission_id: MissionId) -> Subscription {
        // One slot of headroom beyond `capacity` so a full channel can still
        // be given its final `Closed` frame rather than losing it silently.
        let (tx, rx) = mpsc::channel(self.capacity.max(1) + 1);
        let id = SubscriptionId::new();
        self.subscriptions
            .entry(mission_id)
            .or_default()
            .push((id, Slot { sender: tx }));
        Subscription {
            id,
            mission_id,
            receiver: rx,
        }
    }

    /// Detach a subscription; idempotent (spec.md §4.5 Cancellation).
    pub fn unsubscribe(&self, mission_id: MissionId, subscription_id: SubscriptionId) {
        if let Some(mut slots) = self.subscriptions.get_mut(&mission_id) {
            slots.retain(|(id, _)| *id != subscription_id);
        }
    }

    pub fn publish_log(&self, mission_id: MissionId, record: LogRecord) {
        self.publish(mission_id, EventFrame::Log(record));
    }

    pub fn publish_status(&self, mission_id: MissionId, status: MissionStatus) {
        let terminal = status.is_terminal();
        self.publish(mission_id, EventFrame::Status(status));
        if terminal {
            self.close_all(mission_id, CloseCause::Terminal);
        }
    }

    /// Non-blocking fan-out. A full or closed channel closes that
    /// subscription with `overflow`; other subscriptions are unaffected
    /// (spec.md §4.5 Delivery model).
    fn publish(&self, mission_id: MissionId, frame: EventFrame) {
        let Some(mut slots) = self.subscriptions.get_mut(&mission_id) else {
            return;
        };
        slots.retain(|(id, slot)| {
            // The channel's real capacity is `self.capacity + 1`: one slot
            // of headroom reserved so the overflow close can always be
            // delivered instead of racing the last regular frame for the
            // final buffer slot.
            if slot.sender.capacity() <= 1 {
                tracing::warn!(%mission_id, subscription = %id, "subscriber overflow, closing");
                let _ = slot.sender.try_send(EventFrame::Closed(CloseCause::Overflow));
                return false;
            }
            match slot.sender.try_send(frame.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(%mission_id, subscription = %id, "subscriber overflow, closing");
                    let _ = slot.sender.try_send(EventFrame::Closed(CloseCause::Overflow));
                    false
                }
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            }
        });
    }

    fn close_all(&self, mission_id: MissionId, cause: CloseCause) {
        if let Some((_, slots)) = self.subscriptions.remove(&mission_id) {
            for (_, slot) in slots {
                let _ = slot.sender.try_send(EventFrame::Closed(cause));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LogPayload, TerminalCause};

    #[tokio::test]
    async fn delivers_in_order() {
        let bridge = EventBridge::new(DEFAULT_CHANNEL_CAPACITY);
        let mission_id = MissionId::new();
        let mut sub = bridge.subscribe(mission_id);
        for i in 0..3 {
            bridge.publish_log(mission_id, LogRecord::new(i, LogPayload::Control(format!("e{i}"))));
        }
        for i in 0..3 {
            match sub.receiver.recv().await.unwrap() {
                EventFrame::Log(r) => assert_eq!(r.index, i),
                _ => panic!("expected log frame"),
            }
        }
    }

    #[tokio::test]
    async fn overflow_closes_subscription_without_affecting_others() {
        let bridge = EventBridge::new(2);
        let mission_id = MissionId::new();
        let mut slow = bridge.subscribe(mission_id);
        let mut fast = bridge.subscribe(mission_id);

        for i in 0..5 {
            bridge.publish_log(mission_id, LogRecord::new(i, LogPayload::Control(format!("e{i}"))));
        }

        // drain `fast` fully; it should see everything plus no overflow close
        let mut fast_logs = 0;
        while let Ok(frame) = fast.receiver.try_recv() {
            if matches!(frame, EventFrame::Log(_)) {
                fast_logs += 1;
            }
        }
        assert!(fast_logs >= 2);

        // slow never read; eventually sees an overflow close
        let mut saw_overflow = false;
        while let Ok(frame) = slow.receiver.try_recv() {
            if matches!(frame, EventFrame::Closed(CloseCause::Overflow)) {
                saw_overflow = true;
            }
        }
        assert!(saw_overflow);
    }

    #[tokio::test]
    async fn terminal_status_closes_all_subscriptions() {
        let bridge = EventBridge::new(DEFAULT_CHANNEL_CAPACITY);
        let mission_id = MissionId::new();
        let mut sub = bridge.subscribe(mission_id);
        bridge.publish_status(mission_id, MissionStatus::Failed { cause: TerminalCause::Normal });

        let mut saw_terminal_close = false;
        while let Ok(frame) = sub.receiver.try_recv() {
            if matches!(frame, EventFrame::Closed(CloseCause::Terminal)) {
                saw_terminal_close = true;
            }
        }
        assert!(saw_terminal_close);
    }

    #[tokio::test]
    async fn unsubscribe_is_idempotent() {
        let bridge = EventBridge::new(DEFAULT_CHANNEL_CAPACITY);
        let mission_id = MissionId::new();
        let sub = bridge.subscribe(mission_id);
        bridge.unsubscribe(mission_id, sub.id);
        bridge.unsubscribe(mission_id, sub.id);
    }
}
