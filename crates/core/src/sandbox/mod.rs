//! Tool Sandbox (spec.md §4.2): launches an ephemeral, resource-capped
//! process per tool invocation, captures stdout/stderr, enforces timeouts,
//! and returns a structured observation.

pub mod native;
pub mod parsers;
pub mod template;

pub use native::{NativeSandbox, SandboxConfig};
pub use parsers::{parse_observation, RawExecution};

use std::collections::HashMap;
use std::time::Duration;

use crate::sinks::retry_with_backoff;
use crate::types::{Observation, ToolDefinition};

#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("command template error: {0}")]
    Template(#[from] template::TemplateError),
    #[error("sandbox launch failed: {0}")]
    Launch(String),
    #[error("sandbox timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// `Execute(tool-name, arguments, mission-context) -> observation | failure`
/// (spec.md §4.2 public contract). Resolves the tool, renders and validates
/// the command, and hands it to the sandbox runner.
#[async_trait::async_trait]
pub trait SandboxRunner: Send + Sync {
    async fn run(
        &self,
        tool: &ToolDefinition,
        command: &str,
        config: &SandboxConfig,
    ) -> Result<RawExecution, SandboxError>;
}

pub async fn execute(
    runner: &dyn SandboxRunner,
    registry: &HashMap<String, ToolDefinition>,
    tool_name: &str,
    arguments: &HashMap<String, String>,
    config: &SandboxConfig,
) -> Result<Observation, SandboxError> {
    let tool = registry
        .get(tool_name)
        .ok_or_else(|| SandboxError::UnknownTool(tool_name.to_string()))?;

    let command = template::render_command(tool, arguments)?;

    // Launch failures (image pull, container create) are transient and get
    // the sinks' bounded exponential backoff (spec.md §7: "1 s, 2 s, 4 s,
    // capped at 3 tries"); a timeout is not retried — it already ran the
    // command to completion's activity-timeout limit, so retrying would
    // just repeat the hang.
    let attempt = retry_with_backoff(|| async {
        match runner.run(tool, &command, config).await {
            Ok(raw) => Ok(SandboxAttempt::Output(raw)),
            Err(SandboxError::Timeout(d)) => Ok(SandboxAttempt::TimedOut(d)),
            Err(e) => Err(e),
        }
    })
    .await;

    match attempt {
        Ok(SandboxAttempt::Output(raw)) => Ok(parse_observation(tool.family, tool_name, raw)),
        Ok(SandboxAttempt::TimedOut(d)) => Ok(Observation::error(
            crate::types::ObservationKind::SandboxError,
            format!("timed out after {d:?}"),
        )),
        Err(e @ SandboxError::Launch(_)) => {
            Ok(Observation::error(crate::types::ObservationKind::SandboxError, e.to_string()))
        }
        Err(e) => Err(e),
    }
}

/// Outcome of one `runner.run` attempt, distinguishing a timeout (terminal,
/// never retried) from a successful launch (retryable `Err` is the only
/// other case `retry_with_backoff` sees).
enum SandboxAttempt {
    Output(RawExecution),
    TimedOut(Duration),
}
