//! Heartbeat handling (§4.8).
//!
//! The MN-side receive path lives here; the SN-side send loop lives in
//! [`crate::storage_node`].
use crate::control_protocol::HeartbeatRequest;
use crate::ids::MetadataNodeId;
use crate::metadata_store::{MetadataStore, SharedMetadataStore, Transaction};
use crate::model::gossip_log::{EntityKind, OpKind};
use crate::model::GossipEntry;
use crate::placement::StorageRegistry;
use crate::vector_clock::VectorClock;

/// Handle one SN heartbeat (§4.8): upsert the SN registry and emit a
/// "heartbeat-relay" gossip entry so peer MNs converge on liveness without
/// waiting for anti-entropy.
pub async fn receive_heartbeat(
    self_id: &MetadataNodeId,
    store: &SharedMetadataStore,
    registry: &StorageRegistry,
    request: HeartbeatRequest,
) -> crate::error::RedCloudResult<()> {
    registry.upsert_heartbeat(
        request.node_id,
        request.address,
        request.capacity_bytes,
        request.used_bytes,
    );
    let Some(record) = registry.get(&request.node_id) else {
        return Ok(());
    };

    let mut tx = Transaction::new();
    tx.gossip_entries.push(GossipEntry::new(
        store.next_sequence(),
        EntityKind::StorageNode,
        request.node_id.to_string(),
        OpKind::HeartbeatRelay,
        serde_json::to_value(&record)?,
        VectorClock::new().increment(self_id),
    ));
    tx.storage_nodes.push(record);
    store.commit(tx).await
}
