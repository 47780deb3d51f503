//! Plan and plan-step types (spec.md §3, §4.3).

use serde::{Deserialize, Serialize};

use super::StepId;

/// A single proposed step in a mission plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    pub id: StepId,
    pub tool: String,
    pub argument: String,
    pub description: String,
    pub enabled: bool,
}

/// An ordered sequence of plan steps produced by `Plan(objective, tools)`
/// (spec.md §4.3). Once approved, the exclusive source of executable steps
/// (invariant I6), consumed in order by execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    pub reasoning: String,
    pub steps: Vec<PlanStep>,
    /// Index of the next unexecuted step; advances monotonically.
    pub cursor: usize,
}

impl Plan {
    pub fn new(reasoning: String, steps: Vec<PlanStep>) -> Self {
        Self {
            reasoning,
            steps,
            cursor: 0,
        }
    }

    pub fn current_step(&self) -> Option<&PlanStep> {
        self.steps.get(self.cursor)
    }

    pub fn has_more(&self) -> bool {
        self.cursor < self.steps.len()
    }

    pub fn advance(&mut self) {
        self.cursor += 1;
    }

    /// Apply an approval signal's subset: steps not in `approved_step_ids`
    /// are disabled, never executed (spec.md §4.4 signals, §6.1 `approve`).
    pub fn apply_approval(&mut self, approved_step_ids: &[StepId]) {
        for step in &mut self.steps {
            step.enabled = approved_step_ids.contains(&step.id);
        }
    }
}
