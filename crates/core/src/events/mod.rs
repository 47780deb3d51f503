//! Event Bridge (spec.md §4.5): pub/sub fan-out of mission log records and
//! status transitions, with bounded per-subscription channels and
//! overflow-closes-subscription semantics.

pub mod bridge;
pub mod subscription;

pub use bridge::{EventBridge, DEFAULT_CHANNEL_CAPACITY};
pub use subscription::{CloseCause, EventFrame, Subscription};
