//! SentryAI mission orchestration core: a durable workflow state machine, a
//! cognitive reason-act-observe loop with safety guardrails, a sandboxed
//! tool dispatcher, and a pub/sub event bridge for streaming mission
//! progress to subscribers.

pub mod cognitive;
pub mod config;
pub mod events;
pub mod kernel;
pub mod registry;
pub mod runtime;
pub mod sandbox;
pub mod sinks;
pub mod types;
pub mod workflow;

#[cfg(feature = "http-api")]
pub mod api;

pub use config::{Config, ConfigError};
pub use runtime::{Runtime, RuntimeError};

/// Aggregate error type for callers that don't need to match on the
/// originating component.
#[derive(Debug, thiserror::Error)]
pub enum SentryError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Cognitive(#[from] cognitive::CognitiveError),
    #[error(transparent)]
    Sandbox(#[from] sandbox::SandboxError),
    #[error(transparent)]
    Workflow(#[from] workflow::WorkflowError),
    #[error(transparent)]
    Registry(#[from] registry::RegistryError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}
