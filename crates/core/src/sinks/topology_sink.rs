//! Topology sink (spec.md §3, §5, §7): at-least-once, idempotent on
//! (mission-id, log-index). Unlike the finding sink, writes that exhaust the
//! retry budget are logged and dropped rather than dead-lettered (spec.md §7).

use dashmap::{DashMap, DashSet};

use crate::types::{MissionId, TopologyDelta};

use super::finding_sink::SinkError;
use super::notifier::retry_with_backoff;

#[async_trait::async_trait]
pub trait TopologySink: Send + Sync {
    async fn write(&self, mission_id: MissionId, log_index: u64, delta: TopologyDelta) -> Result<(), SinkError>;
}

#[derive(Default)]
pub struct InMemoryTopologySink {
    written_keys: DashSet<(MissionId, u64)>,
    deltas: DashMap<MissionId, Vec<TopologyDelta>>,
}

impl InMemoryTopologySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deltas_for(&self, mission_id: MissionId) -> Vec<TopologyDelta> {
        self.deltas.get(&mission_id).map(|v| v.clone()).unwrap_or_default()
    }

    pub async fn write_with_retry(&self, mission_id: MissionId, log_index: u64, delta: TopologyDelta) {
        let result =
            retry_with_backoff(|| async { self.write(mission_id, log_index, delta.clone()).await }).await;
        if let Err(e) = result {
            tracing::error!(%mission_id, log_index, error = %e, "topology sink write dropped after retry budget");
        }
    }
}

#[async_trait::async_trait]
impl TopologySink for InMemoryTopologySink {
    async fn write(&self, mission_id: MissionId, log_index: u64, delta: TopologyDelta) -> Result<(), SinkError> {
        if !self.written_keys.insert((mission_id, log_index)) {
            return Ok(());
        }
        self.deltas.entry(mission_id).or_default().push(delta);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HostRecord;

    #[tokio::test]
    async fn duplicate_index_is_idempotent() {
        let sink = InMemoryTopologySink::new();
        let mission_id = MissionId::new();
        let delta = TopologyDelta {
            hosts: vec![HostRecord {
                hostname: "a.example.com".into(),
                source_tool: "subfinder".into(),
            }],
            ports: Vec::new(),
        };
        sink.write(mission_id, 5, delta.clone()).await.unwrap();
        sink.write(mission_id, 5, delta).await.unwrap();
        assert_eq!(sink.deltas_for(mission_id).len(), 1);
    }
}
