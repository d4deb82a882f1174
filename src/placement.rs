//! Storage-node registry and chunk placement policy (§4.5, §4.7).
use crate::ids::StorageNodeId;
use crate::model::node_record::{Liveness, StorageNodeRecord};
use dashmap::DashMap;
use std::collections::HashSet;
use std::net::SocketAddr;

/// The in-memory storage-node registry, upserted by heartbeat receipt and
/// scanned by the health monitor (§4.7, §4.8). Other loops read a
/// snapshot and never block on gossip to settle.
#[derive(Default)]
pub struct StorageRegistry {
    nodes: DashMap<StorageNodeId, StorageNodeRecord>,
}

impl StorageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert_heartbeat(
        &self,
        id: StorageNodeId,
        address: SocketAddr,
        capacity_bytes: u64,
        used_bytes: u64,
    ) -> Liveness {
        let record = StorageNodeRecord::from_heartbeat(id, address, capacity_bytes, used_bytes);
        let previous = self.nodes.insert(record.id, record);
        previous.map(|p| p.liveness).unwrap_or(Liveness::Failed)
    }

    pub fn get(&self, id: &StorageNodeId) -> Option<StorageNodeRecord> {
        self.nodes.get(id).map(|e| e.clone())
    }

    pub fn remove(&self, id: &StorageNodeId) -> bool {
        self.nodes.remove(id).is_some()
    }

    /// All nodes currently marked [`Liveness::Active`] (the placement
    /// target for new chunks, §4.5).
    pub fn active_set(&self) -> HashSet<StorageNodeId> {
        self.nodes
            .iter()
            .filter(|e| e.liveness == Liveness::Active)
            .map(|e| *e.key())
            .collect()
    }

    pub fn all(&self) -> Vec<StorageNodeRecord> {
        self.nodes.iter().map(|e| e.clone()).collect()
    }

    /// Scan for heartbeat-timeout transitions (§4.7). Returns the ids that
    /// flipped to [`Liveness::Failed`] this pass, for logging/gossiping.
    pub fn sweep_timeouts(&self, timeout: chrono::Duration) -> Vec<StorageNodeId> {
        let mut transitioned = Vec::new();
        for mut entry in self.nodes.iter_mut() {
            if entry.liveness == Liveness::Active && !entry.is_fresh(timeout) {
                entry.liveness = Liveness::Failed;
                transitioned.push(entry.id);
            }
        }
        transitioned
    }
}

/// The write-path target for a new chunk: every currently active SN
/// (§4.5 "Placement policy": no upper replication cap).
pub fn placement_targets(registry: &StorageRegistry) -> Vec<StorageNodeRecord> {
    registry
        .all()
        .into_iter()
        .filter(|n| n.liveness == Liveness::Active)
        .collect()
}

/// Order candidate holders for a read (§4.5 "Read path" step 2): healthy
/// replicas first, then any remaining (possibly stale) ones, so a read can
/// still try a node the health monitor hasn't yet confirmed failed.
pub fn order_for_read(
    registry: &StorageRegistry,
    holders: &HashSet<StorageNodeId>,
) -> Vec<StorageNodeRecord> {
    let mut healthy = Vec::new();
    let mut rest = Vec::new();
    for id in holders {
        match registry.get(id) {
            Some(record) if record.liveness == Liveness::Active => healthy.push(record),
            Some(record) => rest.push(record),
            None => {}
        }
    }
    healthy.extend(rest);
    healthy
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> SocketAddr {
        "127.0.0.1:9100".parse().unwrap()
    }

    #[test]
    fn active_set_excludes_failed_nodes() {
        let registry = StorageRegistry::new();
        let a = StorageNodeId::new();
        let b = StorageNodeId::new();
        registry.upsert_heartbeat(a, addr(), 100, 0);
        registry.upsert_heartbeat(b, addr(), 100, 0);
        registry.sweep_timeouts(chrono::Duration::seconds(-1));
        let active = registry.active_set();
        assert!(active.is_empty());
    }

    #[test]
    fn read_order_prefers_healthy_replicas() {
        let registry = StorageRegistry::new();
        let healthy = StorageNodeId::new();
        let failed = StorageNodeId::new();
        registry.upsert_heartbeat(healthy, addr(), 100, 0);
        registry.upsert_heartbeat(failed, addr(), 100, 0);
        registry.sweep_timeouts(chrono::Duration::seconds(-1));
        registry.upsert_heartbeat(healthy, addr(), 100, 0);

        let holders: HashSet<_> = [healthy, failed].into_iter().collect();
        let ordered = order_for_read(&registry, &holders);
        assert_eq!(ordered[0].id, healthy);
    }
}
