//! Process-wide orchestrator: holds the immutable, initialised-once
//! configuration (tool registry, scope defaults, sandbox/LLM clients) and
//! spawns one `MissionWorkflow` task per mission (spec.md §5 "a pool of
//! workers picks up mission workflows").

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::RwLock;

use crate::cognitive::CognitiveEngine;
use crate::events::EventBridge;
use crate::kernel::{GlobalBlocklist, LoopDetectorConfig};
use crate::sandbox::{SandboxConfig, SandboxRunner};
use crate::sinks::{InMemoryFindingSink, InMemoryTopologySink};
use crate::types::{BudgetPolicy, LogRecord, Mission, MissionId, MissionStatus, Plan, ScopePolicy, StepId, ToolDefinition};
use crate::workflow::journal::JournalStorage;
use crate::workflow::{MemoryJournalStorage, MissionJournal, MissionSnapshot, MissionWorkflow, Signal, SignalQueue};

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("mission not found: {0}")]
    NotFound(MissionId),
}

struct MissionHandle {
    signals: Arc<SignalQueue>,
    snapshot: Arc<RwLock<MissionSnapshot>>,
    plan_mirror: Arc<RwLock<Option<Plan>>>,
}

pub struct Runtime {
    tools: Arc<HashMap<String, ToolDefinition>>,
    sandbox: Arc<dyn SandboxRunner>,
    sandbox_config: SandboxConfig,
    cognitive: Arc<CognitiveEngine>,
    blocklist: GlobalBlocklist,
    loop_config: LoopDetectorConfig,
    pub events: Arc<EventBridge>,
    finding_sink: Arc<InMemoryFindingSink>,
    topology_sink: Arc<InMemoryTopologySink>,
    journal_storage: Arc<dyn JournalStorage>,
    missions: DashMap<MissionId, MissionHandle>,
}

impl Runtime {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tools: HashMap<String, ToolDefinition>,
        sandbox: Arc<dyn SandboxRunner>,
        sandbox_config: SandboxConfig,
        cognitive: CognitiveEngine,
        blocklist: GlobalBlocklist,
        loop_config: LoopDetectorConfig,
        event_bridge_capacity: usize,
    ) -> Self {
        Self {
            tools: Arc::new(tools),
            sandbox,
            sandbox_config,
            cognitive: Arc::new(cognitive),
            blocklist,
            loop_config,
            events: Arc::new(EventBridge::new(event_bridge_capacity)),
            finding_sink: Arc::new(InMemoryFindingSink::new()),
            topology_sink: Arc::new(InMemoryTopologySink::new()),
            journal_storage: Arc::new(MemoryJournalStorage::new()),
            missions: DashMap::new(),
        }
    }

    /// `POST /missions/start`: create a mission and spawn its workflow task,
    /// returning immediately (spec.md §6.1).
    pub fn start_mission(&self, objective: String, scope: ScopePolicy, budget: BudgetPolicy) -> MissionId {
        let mission = Mission::new(objective, scope, budget);
        let mission_id = mission.id;

        let signals = Arc::new(SignalQueue::new());
        let snapshot = Arc::new(RwLock::new(MissionSnapshot {
            status: MissionStatus::Pending,
            step: 0,
            findings_count: 0,
            steps_consumed: 0,
            cost_accumulated_cents: 0,
        }));

        let plan_mirror = Arc::new(RwLock::new(None));

        self.missions.insert(
            mission_id,
            MissionHandle {
                signals: signals.clone(),
                snapshot: snapshot.clone(),
                plan_mirror: plan_mirror.clone(),
            },
        );

        let journal = MissionJournal::new(self.journal_storage.clone(), mission_id);
        let mut workflow = MissionWorkflow::new(
            mission,
            journal,
            signals,
            self.tools.clone(),
            self.sandbox.clone(),
            self.sandbox_config.clone(),
            self.cognitive.clone(),
            self.blocklist.clone(),
            self.loop_config.clone(),
            self.events.clone(),
            self.finding_sink.clone(),
            self.topology_sink.clone(),
            snapshot,
            plan_mirror,
        );

        tokio::spawn(async move {
            if let Err(e) = workflow.run().await {
                tracing::error!(%mission_id, error = %e, "mission workflow terminated with an error");
            }
        });

        mission_id
    }

    async fn signal(&self, mission_id: MissionId, signal: Signal) -> Result<(), RuntimeError> {
        let handle = self.missions.get(&mission_id).ok_or(RuntimeError::NotFound(mission_id))?;
        handle.signals.push(signal).await;
        Ok(())
    }

    pub async fn approve_plan(&self, mission_id: MissionId, approved_step_ids: Vec<StepId>) -> Result<(), RuntimeError> {
        self.signal(mission_id, Signal::ApprovePlan(approved_step_ids)).await
    }

    pub async fn pause(&self, mission_id: MissionId) -> Result<(), RuntimeError> {
        self.signal(mission_id, Signal::Pause).await
    }

    pub async fn resume(&self, mission_id: MissionId) -> Result<(), RuntimeError> {
        self.signal(mission_id, Signal::Resume).await
    }

    pub async fn cancel(&self, mission_id: MissionId) -> Result<(), RuntimeError> {
        self.signal(mission_id, Signal::Cancel).await
    }

    /// `get-status` query (spec.md §4.4).
    pub async fn status(&self, mission_id: MissionId) -> Result<MissionSnapshot, RuntimeError> {
        let handle = self.missions.get(&mission_id).ok_or(RuntimeError::NotFound(mission_id))?;
        let snapshot = handle.snapshot.read().await.clone();
        Ok(snapshot)
    }

    /// `get-log(since-index)` query (spec.md §4.4); reads the authoritative
    /// journal, not the in-memory mission struct.
    pub async fn log(&self, mission_id: MissionId, since_index: u64) -> Result<Vec<LogRecord>, RuntimeError> {
        if !self.missions.contains_key(&mission_id) {
            return Err(RuntimeError::NotFound(mission_id));
        }
        self.journal_storage
            .read_from(mission_id, since_index)
            .await
            .map_err(|_| RuntimeError::NotFound(mission_id))
    }

    pub fn subscribe(&self, mission_id: MissionId) -> crate::events::Subscription {
        self.events.subscribe(mission_id)
    }

    /// The proposed plan, if the cognitive engine has produced one yet
    /// (used to render a `server:plan_proposal` frame on the streaming API).
    pub async fn plan(&self, mission_id: MissionId) -> Result<Option<Plan>, RuntimeError> {
        let handle = self.missions.get(&mission_id).ok_or(RuntimeError::NotFound(mission_id))?;
        let plan = handle.plan_mirror.read().await.clone();
        Ok(plan)
    }
}
