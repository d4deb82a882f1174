//! The push-gossip loop (§4.3 "Push loop").
use crate::control_client::ControlClient;
use crate::control_protocol::{GossipEntryDto, GossipReceiveRequest};
use crate::discovery::PeerRegistry;
use crate::ids::MetadataNodeId;
use crate::metadata_store::SharedMetadataStore;
use rand::seq::SliceRandom;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Run one push-gossip round (§4.3 steps 1–4):
///
/// 1. select up to `fanout` distinct peers uniformly at random;
/// 2. for each, send every gossip-log entry it hasn't acknowledged yet;
/// 3. on success, record the peer against each sent entry;
/// 4. on failure, leave acknowledgement state untouched and log; liveness
///    is the health monitor's job, not gossip's (§4.7).
pub async fn push_round(
    self_id: &MetadataNodeId,
    store: &SharedMetadataStore,
    registry: &Arc<PeerRegistry>,
    client: &ControlClient,
    fanout: usize,
    deadline: Duration,
) {
    let entries = store.all_gossip_entries().await;
    if entries.is_empty() {
        return;
    }

    let mut peers = registry.snapshot(self_id);
    peers.shuffle(&mut rand::thread_rng());
    peers.truncate(fanout);

    for peer in peers {
        let pending: Vec<_> = entries
            .iter()
            .filter(|e| e.needs_push_to(&peer.id))
            .collect();
        if pending.is_empty() {
            continue;
        }

        let dtos: Vec<GossipEntryDto> = pending
            .iter()
            .map(|e| GossipEntryDto {
                entity_kind: e.entity_kind,
                entity_id: e.entity_id.clone(),
                op: e.op,
                payload: e.payload.clone(),
                vector_clock: e.originator_clock.clone(),
                stamp: e.emitted_at,
            })
            .collect();
        let sequences: Vec<u64> = pending.iter().map(|e| e.sequence).collect();

        let request = GossipReceiveRequest {
            sender_id: self_id.clone(),
            entries: dtos,
        };

        match client.gossip_send(peer.address, request, deadline).await {
            Ok(_) => {
                store.acknowledge_gossip(&peer.id, &sequences).await;
            }
            Err(e) => {
                warn!(peer = %peer.id, error = %e, "gossip push failed, retrying next round");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata_store::{in_memory_store, Transaction};
    use crate::model::gossip_log::{EntityKind, OpKind};
    use crate::model::{GossipEntry, User};
    use crate::vector_clock::VectorClock;

    #[tokio::test]
    async fn push_round_with_no_peers_is_a_no_op() {
        let store = in_memory_store();
        let self_id = MetadataNodeId::new("m1", 0);
        let registry = Arc::new(PeerRegistry::new());
        let client = ControlClient::new();

        let user = User::create("alice", "v", "t", &self_id);
        let mut tx = Transaction::new();
        tx.gossip_entries.push(GossipEntry::new(
            store.next_sequence(),
            EntityKind::User,
            user.id.to_string(),
            OpKind::Create,
            serde_json::to_value(&user).unwrap(),
            VectorClock::new(),
        ));
        store.commit(tx).await.unwrap();

        push_round(
            &self_id,
            &store,
            &registry,
            &client,
            2,
            Duration::from_millis(100),
        )
        .await;
    }
}
