//! Mission Workflow (spec.md §4.4): the durable state machine driving a
//! mission from `pending` to a terminal status, executing plan steps and
//! cognitive decisions with cooperative pause/resume/cancel.

use std::collections::HashMap;
use std::sync::Arc;

use crate::cognitive::{CognitiveEngine, CognitiveError, Decision};
use crate::events::EventBridge;
use crate::kernel::{admit, charge, loop_check, GlobalBlocklist, LoopDetectorConfig};
use crate::sandbox::{self, SandboxConfig, SandboxError, SandboxRunner};
use crate::sinks::{InMemoryFindingSink, InMemoryTopologySink};
use crate::types::{
    Admission, Finding, Fingerprint, LogPayload, Mission,
    MissionStatus, Plan, StepId, TerminalCause, ToolDefinition,
};

use super::journal::{JournalError, MissionJournal};
use super::signals::{MissionSnapshot, Signal, SignalQueue};

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Journal(#[from] JournalError),
    #[error(transparent)]
    Cognitive(#[from] CognitiveError),
    #[error(transparent)]
    Sandbox(#[from] SandboxError),
    #[error("illegal status transition: {from:?} -> {to:?}")]
    IllegalTransition { from: MissionStatus, to: MissionStatus },
}

/// A single target extracted from a plan step or tool-call argument, tried
/// as the whole string first and then token-by-token — the cognitive engine
/// and the plan both speak in loosely-structured argument strings rather
/// than a typed target field (spec.md §4.4 step 3/4 both just say "admit
/// target(s)").
fn extract_target(argument: &str) -> Option<String> {
    let trimmed = argument.trim();
    if crate::kernel::parse_target(trimmed).is_some() {
        return Some(trimmed.to_string());
    }
    trimmed
        .split_whitespace()
        .find(|tok| crate::kernel::parse_target(tok).is_some())
        .map(str::to_string)
}

/// The cognitive engine's `arguments` field is a JSON-encoded parameter map
/// (validated as such in `validation::validate_decision`), unlike a plan
/// step's single free-text `argument`. Reduce it to the same loosely
/// structured string the rest of this module expects, preferring the
/// tool's first declared parameter, so `extract_target`/fingerprinting see
/// an actual value instead of raw JSON syntax.
fn primary_argument_value(tool: Option<&ToolDefinition>, arguments_json: &str) -> String {
    let Ok(parsed) = serde_json::from_str::<HashMap<String, String>>(arguments_json) else {
        return arguments_json.to_string();
    };
    if let Some(value) = tool
        .and_then(|t| t.parameters.first())
        .and_then(|p| parsed.get(&p.name))
    {
        return value.clone();
    }
    parsed.values().next().cloned().unwrap_or_default()
}

fn dispatch_arguments(tool: &ToolDefinition, argument: &str, target: Option<&str>) -> HashMap<String, String> {
    let value = target.unwrap_or(argument).to_string();
    let mut map = HashMap::new();
    if let Some(first_param) = tool.parameters.first() {
        map.insert(first_param.name.clone(), value);
    }
    map
}

pub struct MissionWorkflow {
    pub mission: Mission,
    journal: MissionJournal,
    signals: Arc<SignalQueue>,
    tools: Arc<HashMap<String, ToolDefinition>>,
    sandbox: Arc<dyn SandboxRunner>,
    sandbox_config: SandboxConfig,
    cognitive: Arc<CognitiveEngine>,
    blocklist: GlobalBlocklist,
    loop_config: LoopDetectorConfig,
    events: Arc<EventBridge>,
    finding_sink: Arc<InMemoryFindingSink>,
    topology_sink: Arc<InMemoryTopologySink>,
    /// Live projection of the mission's status for `get-status` queries
    /// (spec.md §4.4). The journal remains authoritative; this is a cache
    /// kept current at the same choke points that persist to it.
    snapshot: Arc<tokio::sync::RwLock<MissionSnapshot>>,
    /// Mirrors `mission.plan` for callers (e.g. the streaming API) that need
    /// the step list outside the workflow task, such as rendering a
    /// `plan_proposal` frame.
    plan_mirror: Arc<tokio::sync::RwLock<Option<Plan>>>,
    /// Whether the mission's first target has already been run through
    /// admission. Only that first check is fatal (spec.md §4.4:
    /// `running -scope-fatal-> scope-violation`, "only if initial target
    /// fails admission"); every later denial just skips its step.
    initial_target_checked: bool,
}

impl MissionWorkflow {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        mission: Mission,
        journal: MissionJournal,
        signals: Arc<SignalQueue>,
        tools: Arc<HashMap<String, ToolDefinition>>,
        sandbox: Arc<dyn SandboxRunner>,
        sandbox_config: SandboxConfig,
        cognitive: Arc<CognitiveEngine>,
        blocklist: GlobalBlocklist,
        loop_config: LoopDetectorConfig,
        events: Arc<EventBridge>,
        finding_sink: Arc<InMemoryFindingSink>,
        topology_sink: Arc<InMemoryTopologySink>,
        snapshot: Arc<tokio::sync::RwLock<MissionSnapshot>>,
        plan_mirror: Arc<tokio::sync::RwLock<Option<Plan>>>,
    ) -> Self {
        Self {
            mission,
            journal,
            signals,
            tools,
            sandbox,
            sandbox_config,
            cognitive,
            blocklist,
            loop_config,
            events,
            finding_sink,
            topology_sink,
            snapshot,
            plan_mirror,
            initial_target_checked: false,
        }
    }

    async fn refresh_snapshot(&self) {
        let mut guard = self.snapshot.write().await;
        guard.status = self.mission.status.clone();
        guard.step = self.mission.plan.as_ref().map(|p| p.cursor).unwrap_or(0);
        guard.findings_count = self.mission.findings.len();
        guard.steps_consumed = self.mission.usage.steps_consumed;
        guard.cost_accumulated_cents = self.mission.usage.cost_accumulated_cents;
    }

    async fn append(&mut self, payload: LogPayload) -> Result<(), WorkflowError> {
        let record = self.journal.append(payload).await?;
        self.mission.log.push(record.clone());
        self.events.publish_log(self.mission.id, record);
        self.refresh_snapshot().await;
        Ok(())
    }

    async fn transition(&mut self, next: MissionStatus) -> Result<(), WorkflowError> {
        if !self.mission.status.can_transition_to(&next) {
            return Err(WorkflowError::IllegalTransition {
                from: self.mission.status.clone(),
                to: next,
            });
        }
        self.mission.status = next.clone();
        self.append(LogPayload::Status(next.clone())).await?;
        self.events.publish_status(self.mission.id, next);
        Ok(())
    }

    /// Drive the mission from `pending` to a terminal status (spec.md §4.4).
    pub async fn run(&mut self) -> Result<(), WorkflowError> {
        self.journal.initialize().await?;
        self.transition(MissionStatus::Planning).await?;

        match self.cognitive.plan(&self.mission, &self.tools).await {
            Ok((reasoning, steps)) => {
                self.append(LogPayload::Plan {
                    reasoning: reasoning.clone(),
                    step_count: steps.len(),
                })
                .await?;
                let plan = Plan::new(reasoning, steps);
                *self.plan_mirror.write().await = Some(plan.clone());
                self.mission.plan = Some(plan);
            }
            Err(e) => {
                self.append(LogPayload::Error {
                    code: "plan-failed".to_string(),
                    message: e.to_string(),
                })
                .await?;
                self.transition(MissionStatus::Failed { cause: TerminalCause::PlanFailed }).await?;
                return Ok(());
            }
        }

        self.transition(MissionStatus::AwaitingApproval).await?;

        loop {
            match self.signals.next_signal().await {
                Signal::ApprovePlan(approved) => {
                    if let Some(plan) = self.mission.plan.as_mut() {
                        plan.apply_approval(&approved);
                    }
                    self.transition(MissionStatus::Running).await?;
                    break;
                }
                Signal::Cancel => {
                    self.transition(MissionStatus::Cancelled).await?;
                    return Ok(());
                }
                Signal::Pause | Signal::Resume => continue,
            }
        }

        self.run_loop().await
    }

    async fn run_loop(&mut self) -> Result<(), WorkflowError> {
        loop {
            for signal in self.signals.drain().await {
                match signal {
                    Signal::Cancel => {
                        self.transition(MissionStatus::Cancelled).await?;
                        return Ok(());
                    }
                    Signal::Pause => {
                        self.transition(MissionStatus::Paused).await?;
                        loop {
                            match self.signals.next_signal().await {
                                Signal::Resume => {
                                    self.transition(MissionStatus::Running).await?;
                                    break;
                                }
                                Signal::Cancel => {
                                    self.transition(MissionStatus::Cancelled).await?;
                                    return Ok(());
                                }
                                _ => continue,
                            }
                        }
                    }
                    Signal::Resume | Signal::ApprovePlan(_) => {}
                }
            }

            // Gate on usage already at/over a limit *before* charging, so the
            // step this charge pays for still runs — matching spec.md §8's
            // worked example ("max_steps=1 with a plan of two steps: exactly
            // one tool dispatch occurs, terminates as budget-exhausted").
            // Charging post-facto-only (per spec.md §4.1's literal "exhausted
            // after charging") would instead terminate one dispatch short in
            // every such example, since the charge for step N would already
            // report exhaustion before step N is taken.
            if self.mission.usage.steps_consumed >= self.mission.budget_policy.max_steps
                || self.mission.usage.cost_accumulated_cents >= self.mission.budget_policy.max_cost_cents
                || self.mission.wall_clock_elapsed() >= self.mission.budget_policy.max_wall_clock
            {
                let cause = if self.mission.usage.steps_consumed >= self.mission.budget_policy.max_steps {
                    TerminalCause::Steps
                } else if self.mission.usage.cost_accumulated_cents >= self.mission.budget_policy.max_cost_cents {
                    TerminalCause::Cost
                } else {
                    TerminalCause::Time
                };
                self.transition(MissionStatus::BudgetExhausted { cause }).await?;
                return Ok(());
            }

            charge(&mut self.mission.usage, &self.mission.budget_policy, 1, 0);

            let has_plan_step = self.mission.plan.as_ref().is_some_and(Plan::has_more);
            if has_plan_step {
                if self.step_from_plan().await? {
                    return Ok(());
                }
                continue;
            }

            match self.cognitive.think(&self.mission, &self.tools).await {
                Ok(Decision::Complete { .. }) => {
                    self.transition(MissionStatus::Completed).await?;
                    return Ok(());
                }
                Ok(Decision::Findings { findings, .. }) => {
                    for finding in findings {
                        self.record_finding(finding).await?;
                    }
                }
                Ok(Decision::ToolCall { tool, arguments, .. }) => {
                    let argument = primary_argument_value(self.tools.get(&tool), &arguments);
                    let target = extract_target(&argument);
                    if self.admit_and_dispatch(&tool, &argument, target).await? {
                        return Ok(());
                    }
                }
                Err(e) => {
                    self.append(LogPayload::Error {
                        code: "think-failed".to_string(),
                        message: e.to_string(),
                    })
                    .await?;
                }
            }
        }
    }

    /// Returns `Ok(true)` if the mission reached a terminal status.
    async fn step_from_plan(&mut self) -> Result<bool, WorkflowError> {
        let step = {
            let plan = self.mission.plan.as_ref().expect("checked has_more");
            plan.current_step().cloned().expect("checked has_more")
        };

        if !step.enabled {
            self.append(LogPayload::Control(format!("step {} skipped: not approved", step.id))).await?;
            self.mission.plan.as_mut().unwrap().advance();
            return Ok(false);
        }

        let target = extract_target(&step.argument);
        let terminal = self.admit_and_dispatch(&step.tool, &step.argument, target).await?;
        self.mission.plan.as_mut().unwrap().advance();
        Ok(terminal)
    }

    /// Shared admit + loop-check + dispatch path for both plan steps and
    /// cognitive tool calls (spec.md §4.4 steps 3 and 4).
    async fn admit_and_dispatch(
        &mut self,
        tool_name: &str,
        argument: &str,
        target: Option<String>,
    ) -> Result<bool, WorkflowError> {
        let Some(target) = target else {
            self.append(LogPayload::Control(format!("no target extractable from argument for {tool_name}")))
                .await?;
            return Ok(false);
        };

        let admission = admit(&target, &self.mission.scope, &self.blocklist);
        self.append(LogPayload::Control(format!("admission: {target} -> {admission:?}"))).await?;
        let is_initial_target = !self.initial_target_checked;
        self.initial_target_checked = true;
        if let Admission::Deny(reason) = &admission {
            self.append(LogPayload::Error {
                code: "scope-violation".to_string(),
                message: format!("{target} denied: {reason}"),
            })
            .await?;
            if is_initial_target {
                self.transition(MissionStatus::ScopeViolation).await?;
                return Ok(true);
            }
            return Ok(false);
        }

        let fingerprint = Fingerprint::new(tool_name, argument);
        let verdict = loop_check(
            &mut self.mission.usage,
            fingerprint,
            self.loop_config.window,
            self.loop_config.similarity_threshold,
        );
        if verdict == crate::kernel::LoopVerdict::Repetitive {
            // `loop_check` itself already requires 3 identical occurrences
            // (or a near-duplicate above the similarity threshold) before
            // returning `Repetitive` (spec.md §4.1); that single verdict is
            // sufficient to fail the mission outright rather than tolerating
            // further repeats of the same action.
            self.append(LogPayload::Control(format!("loop detected for {tool_name}, skipping"))).await?;
            self.transition(MissionStatus::Failed { cause: TerminalCause::Loop }).await?;
            return Ok(true);
        }

        let Some(tool) = self.tools.get(tool_name).cloned() else {
            self.append(LogPayload::Error {
                code: "unknown-tool".to_string(),
                message: tool_name.to_string(),
            })
            .await?;
            return Ok(false);
        };

        let step_id = StepId(format!("{}-{}", tool_name, self.mission.usage.steps_consumed));
        self.append(LogPayload::ToolDispatch {
            step_id: step_id.to_string(),
            tool: tool_name.to_string(),
            argument: argument.to_string(),
        })
        .await?;

        let args = dispatch_arguments(&tool, argument, Some(target.as_str()));
        let observation = sandbox::execute(self.sandbox.as_ref(), &self.tools, tool_name, &args, &self.sandbox_config).await?;

        let topology_index = self.mission.log.len() as u64;
        self.append(LogPayload::ToolOutput {
            step_id: step_id.to_string(),
            summary: observation.summary(),
        })
        .await?;

        if !observation.topology.hosts.is_empty() || !observation.topology.ports.is_empty() {
            self.topology_sink.write_with_retry(self.mission.id, topology_index, observation.topology).await;
        }

        // Each finding gets its own `Finding` log record at a distinct index,
        // the same index the sink is keyed on — so the finding sink's
        // contents are always reachable via the mission log (spec.md §8).
        for finding in observation.findings {
            self.record_finding(finding).await?;
        }

        Ok(false)
    }

    async fn record_finding(&mut self, finding: Finding) -> Result<(), WorkflowError> {
        let log_index = self.mission.log.len() as u64;
        self.finding_sink.write_with_retry(self.mission.id, log_index, finding.clone()).await.ok();
        self.mission.findings.push(finding.clone());
        self.append(LogPayload::Finding(finding)).await
    }
}
