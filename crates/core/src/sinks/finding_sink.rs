//! Finding sink (spec.md §3, §5, §7): at-least-once, idempotent on
//! (mission-id, log-index). Failures are retried until mission end rather
//! than dropped — findings are the system's primary deliverable.

use dashmap::{DashMap, DashSet};

use crate::types::{Finding, MissionId};

use super::notifier::retry_with_backoff;

#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("sink write failed: {0}")]
    Write(String),
}

#[async_trait::async_trait]
pub trait FindingSink: Send + Sync {
    async fn write(&self, mission_id: MissionId, log_index: u64, finding: Finding) -> Result<(), SinkError>;
}

/// In-memory sink keyed by (mission-id, log-index); a workflow replay that
/// re-issues the same write is a no-op (spec.md §9 Idempotence of writes).
/// Writes that exhaust the retry budget move to a per-mission dead-letter
/// rather than being dropped (spec.md §7).
#[derive(Default)]
pub struct InMemoryFindingSink {
    written_keys: DashSet<(MissionId, u64)>,
    findings: DashMap<MissionId, Vec<Finding>>,
    dead_letter: DashMap<MissionId, Vec<(u64, Finding)>>,
}

impl InMemoryFindingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn findings_for(&self, mission_id: MissionId) -> Vec<Finding> {
        self.findings.get(&mission_id).map(|v| v.clone()).unwrap_or_default()
    }

    pub fn dead_letter_for(&self, mission_id: MissionId) -> Vec<(u64, Finding)> {
        self.dead_letter.get(&mission_id).map(|v| v.clone()).unwrap_or_default()
    }

    /// Write with the backoff-then-dead-letter policy (spec.md §7); the raw
    /// `FindingSink::write` call itself never fails in this in-memory
    /// implementation, so this wrapper exists to model the policy for
    /// backends where it can.
    pub async fn write_with_retry(
        &self,
        mission_id: MissionId,
        log_index: u64,
        finding: Finding,
    ) -> Result<(), SinkError> {
        let result = retry_with_backoff(|| async { self.write(mission_id, log_index, finding.clone()).await }).await;
        if result.is_err() {
            self.dead_letter
                .entry(mission_id)
                .or_default()
                .push((log_index, finding));
            return Ok(());
        }
        result
    }
}

#[async_trait::async_trait]
impl FindingSink for InMemoryFindingSink {
    async fn write(&self, mission_id: MissionId, log_index: u64, finding: Finding) -> Result<(), SinkError> {
        if !self.written_keys.insert((mission_id, log_index)) {
            return Ok(()); // already written; idempotent no-op
        }
        self.findings.entry(mission_id).or_default().push(finding);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Severity;

    fn finding() -> Finding {
        Finding {
            severity: Severity::High,
            kind: "exposed-git".into(),
            host: "a.example.com".into(),
            location: "http://a.example.com/.git/".into(),
            evidence: "HEAD found".into(),
            remediation: String::new(),
            source_tool: "nuclei".into(),
        }
    }

    #[tokio::test]
    async fn duplicate_index_is_idempotent() {
        let sink = InMemoryFindingSink::new();
        let mission_id = MissionId::new();
        sink.write(mission_id, 3, finding()).await.unwrap();
        sink.write(mission_id, 3, finding()).await.unwrap();
        assert_eq!(sink.findings_for(mission_id).len(), 1);
    }

    #[tokio::test]
    async fn distinct_indices_both_recorded() {
        let sink = InMemoryFindingSink::new();
        let mission_id = MissionId::new();
        sink.write(mission_id, 3, finding()).await.unwrap();
        sink.write(mission_id, 4, finding()).await.unwrap();
        assert_eq!(sink.findings_for(mission_id).len(), 2);
    }
}
