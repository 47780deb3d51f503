//! Mission entity and status DAG (spec.md §3, invariant I1).

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{BudgetPolicy, BudgetUsage, Finding, LogRecord, MissionId, Plan, ScopePolicy};

/// Cause attached to a terminal or budget-exhaustion transition, surfaced in
/// the final status log record (spec.md §7).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminalCause {
    Steps,
    Cost,
    Time,
    Loop,
    PlanFailed,
    Rejected,
    CancelledByClient,
    Normal,
}

/// A mission's lifecycle status. Transitions form a DAG with no reversions
/// (invariant I1); see `MissionStatus::can_transition_to`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissionStatus {
    Pending,
    Planning,
    AwaitingApproval,
    Running,
    Paused,
    Completed,
    Failed { cause: TerminalCause },
    BudgetExhausted { cause: TerminalCause },
    Cancelled,
    ScopeViolation,
}

impl MissionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MissionStatus::Completed
                | MissionStatus::Failed { .. }
                | MissionStatus::BudgetExhausted { .. }
                | MissionStatus::Cancelled
                | MissionStatus::ScopeViolation
        )
    }

    /// Whether `self -> next` is a legal edge in the status DAG (spec.md §4.4).
    pub fn can_transition_to(&self, next: &MissionStatus) -> bool {
        use MissionStatus::*;
        if self.is_terminal() {
            return false; // terminal statuses are sticky
        }
        match (self, next) {
            (Pending, Planning) => true,
            (Planning, AwaitingApproval) => true,
            (Planning, Failed { .. }) => true,
            (AwaitingApproval, Running) => true,
            (AwaitingApproval, Cancelled) => true,
            (Running, Paused) => true,
            (Paused, Running) => true,
            (Running, Completed) => true,
            (Running, BudgetExhausted { .. }) => true,
            (Running, ScopeViolation) => true,
            (Running, Failed { .. }) => true,
            // cancel is reachable from any non-terminal status
            (_, Cancelled) => true,
            _ => false,
        }
    }
}

/// A mission: a single security-assessment execution bound to an objective,
/// scope, and budgets (spec.md Glossary).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mission {
    pub id: MissionId,
    pub objective: String,
    pub scope: ScopePolicy,
    pub budget_policy: BudgetPolicy,
    pub status: MissionStatus,
    pub log: Vec<LogRecord>,
    pub usage: BudgetUsage,
    pub plan: Option<Plan>,
    pub findings: Vec<Finding>,
}

impl Mission {
    pub fn new(objective: String, scope: ScopePolicy, budget_policy: BudgetPolicy) -> Self {
        Self {
            id: MissionId::new(),
            objective,
            scope,
            budget_policy,
            status: MissionStatus::Pending,
            log: Vec::new(),
            usage: BudgetUsage::new(),
            plan: None,
            findings: Vec::new(),
        }
    }

    pub fn wall_clock_elapsed(&self) -> Duration {
        self.usage.start.elapsed().unwrap_or_default()
    }
}
