//! Mission Workflow (spec.md §4.4): durable state machine execution,
//! append-only journal, and cooperative control signals.

pub mod journal;
pub mod mission_workflow;
pub mod signals;

pub use journal::{JournalError, JournalStorage, MemoryJournalStorage, MissionJournal};
pub use mission_workflow::{MissionWorkflow, WorkflowError};
pub use signals::{MissionSnapshot, Signal, SignalQueue};
