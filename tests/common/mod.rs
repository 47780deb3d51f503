//! Fakes shared by the end-to-end scenario tests (spec.md §10.4): an
//! `InferenceProvider` that replays a scripted sequence of raw completions,
//! and a `SandboxRunner` that returns canned stdout per tool with no real
//! process launched.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use sentryai_core::cognitive::{CognitiveEngine, CompletionResponse, InferenceError, InferenceProvider};
use sentryai_core::kernel::{GlobalBlocklist, LoopDetectorConfig};
use sentryai_core::registry::builtin_tools;
use sentryai_core::runtime::Runtime;
use sentryai_core::sandbox::{RawExecution, SandboxConfig, SandboxError, SandboxRunner};
use sentryai_core::types::ToolDefinition;

/// Replays a fixed script of raw LLM completions: the first call answers
/// `CognitiveEngine::plan`, each call after answers a `think` iteration.
pub struct ScriptedInference {
    script: Mutex<VecDeque<String>>,
}

impl ScriptedInference {
    pub fn new(script: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().map(Into::into).collect()),
        }
    }
}

#[async_trait]
impl InferenceProvider for ScriptedInference {
    async fn complete(&self, _prompt: &str) -> Result<CompletionResponse, InferenceError> {
        let mut script = self.script.lock().await;
        let content = script
            .pop_front()
            .expect("scripted inference exhausted — test scripted too few responses");
        Ok(CompletionResponse { content })
    }
}

/// Returns a fixed stdout per tool name, with an optional per-call delay so
/// tests can interleave control signals between dispatches. Never spawns a
/// real process.
pub struct FakeSandbox {
    outputs: HashMap<String, String>,
    delay: Duration,
    pub dispatch_count: AtomicUsize,
}

impl FakeSandbox {
    pub fn new(outputs: impl IntoIterator<Item = (&'static str, &'static str)>) -> Self {
        Self {
            outputs: outputs.into_iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            delay: Duration::ZERO,
            dispatch_count: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
impl SandboxRunner for FakeSandbox {
    async fn run(
        &self,
        tool: &ToolDefinition,
        _command: &str,
        _config: &SandboxConfig,
    ) -> Result<RawExecution, SandboxError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.dispatch_count.fetch_add(1, Ordering::SeqCst);
        let stdout = self.outputs.get(&tool.name).cloned().unwrap_or_default();
        Ok(RawExecution {
            stdout,
            stderr: String::new(),
            exit_code: 0,
            truncated: false,
        })
    }
}

/// Build a `Runtime` wired to the given fakes with a small, test-friendly
/// event-bridge capacity and the default built-in tool registry.
pub fn test_runtime(inference: ScriptedInference, sandbox: Arc<FakeSandbox>, event_capacity: usize) -> Runtime {
    Runtime::new(
        builtin_tools(),
        sandbox,
        SandboxConfig::default(),
        CognitiveEngine::new(inference),
        GlobalBlocklist::default(),
        LoopDetectorConfig::default(),
        event_capacity,
    )
}

/// Poll `runtime.status` until the mission reaches a terminal status, or
/// panic after `timeout`.
pub async fn wait_for_terminal(
    runtime: &Runtime,
    mission_id: sentryai_core::types::MissionId,
    timeout: Duration,
) -> sentryai_core::workflow::MissionSnapshot {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let snapshot = runtime.status(mission_id).await.expect("mission not found");
        if snapshot.status.is_terminal() {
            return snapshot;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("mission did not reach a terminal status in time; last status: {:?}", snapshot.status);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Poll until `runtime.status` reports the given status, or panic after
/// `timeout`.
pub async fn wait_for_status(
    runtime: &Runtime,
    mission_id: sentryai_core::types::MissionId,
    predicate: impl Fn(&sentryai_core::types::MissionStatus) -> bool,
    timeout: Duration,
) {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let snapshot = runtime.status(mission_id).await.expect("mission not found");
        if predicate(&snapshot.status) {
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("mission did not reach expected status in time; last status: {:?}", snapshot.status);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// A plan-response JSON body for `CognitiveEngine::plan`.
pub fn plan_json(reasoning: &str, steps: &[(&str, &str, &str)]) -> String {
    let steps_json: Vec<String> = steps
        .iter()
        .map(|(id, tool, argument)| {
            format!(
                r#"{{"id":"{id}","tool":"{tool}","argument":"{argument}","description":"step","enabled":true}}"#
            )
        })
        .collect();
    format!(r#"{{"reasoning":"{reasoning}","steps":[{}]}}"#, steps_json.join(","))
}

/// A `decision_type: complete` JSON body for `CognitiveEngine::think`.
pub fn complete_json(reasoning: &str) -> String {
    format!(r#"{{"decision_type":"complete","reasoning":"{reasoning}","status_update":"done"}}"#)
}

/// A `decision_type: tool_call` JSON body for `CognitiveEngine::think`.
pub fn tool_call_json(tool: &str, param: &str, value: &str, reasoning: &str) -> String {
    let arguments = format!(r#"{{\"{param}\":\"{value}\"}}"#);
    format!(
        r#"{{"decision_type":"tool_call","tool":"{tool}","arguments":"{arguments}","reasoning":"{reasoning}","status_update":"dispatching"}}"#
    )
}
