//! Subscriber-facing event frames (spec.md §4.5).

use crate::types::{LogRecord, MissionId, MissionStatus, SubscriptionId};

/// Why a subscription was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseCause {
    /// The subscriber's bounded channel was full; never a silent drop
    /// (spec.md §4.5).
    Overflow,
    /// The mission reached a terminal status.
    Terminal,
    /// The caller detached explicitly.
    Detached,
}

/// A single event delivered to a subscriber, FIFO per mission per
/// subscription (spec.md §4.5 Ordering).
#[derive(Debug, Clone)]
#[allow(clippy::large_enum_variant)]
pub enum EventFrame {
    Log(LogRecord),
    Status(MissionStatus),
    Closed(CloseCause),
}

/// A live subscription handle returned to a caller of `EventBridge::subscribe`.
pub struct Subscription {
    pub id: SubscriptionId,
    pub mission_id: MissionId,
    pub receiver: tokio::sync::mpsc::Receiver<EventFrame>,
}
