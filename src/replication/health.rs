//! The storage-node health monitor (§4.7).
use crate::ids::MetadataNodeId;
use crate::metadata_store::{MetadataStore, SharedMetadataStore, Transaction};
use crate::model::gossip_log::{EntityKind, OpKind};
use crate::model::GossipEntry;
use crate::placement::StorageRegistry;
use tracing::info;

/// Scan the SN registry for heartbeat-timeout transitions and gossip each
/// one so peer MNs converge on liveness without waiting for anti-entropy
/// (§4.7: "Transitions are logged and gossiped").
pub async fn sweep_once(
    self_id: &MetadataNodeId,
    store: &SharedMetadataStore,
    registry: &StorageRegistry,
    timeout: chrono::Duration,
) {
    let transitioned = registry.sweep_timeouts(timeout);
    for id in transitioned {
        info!(storage_node = %id, "storage node transitioned to failed (heartbeat timeout)");
        let Some(record) = registry.get(&id) else {
            continue;
        };

        let mut tx = Transaction::new();
        tx.gossip_entries.push(GossipEntry::new(
            store.next_sequence(),
            EntityKind::StorageNode,
            id.to_string(),
            OpKind::Update,
            serde_json::json!(record),
            crate::vector_clock::VectorClock::new().increment(self_id),
        ));
        tx.storage_nodes.push(record);
        if let Err(e) = store.commit(tx).await {
            tracing::warn!(storage_node = %id, error = %e, "failed to gossip liveness transition");
        }
    }
}
