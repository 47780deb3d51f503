//! Finding and topology sinks (spec.md §3, §5, §7): at-least-once writers
//! with idempotence keyed on (mission-id, log-index).

pub mod finding_sink;
pub mod notifier;
pub mod topology_sink;

pub use finding_sink::{FindingSink, InMemoryFindingSink, SinkError};
pub use notifier::retry_with_backoff;
pub use topology_sink::{InMemoryTopologySink, TopologySink};
