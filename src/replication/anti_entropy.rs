//! The anti-entropy loop (§4.3 "Anti-entropy loop").
//!
//! Only vector-clocked entities (users, files, chunks; §3) participate
//! in the state-summary exchange; storage-node and metadata-node records
//! converge via heartbeat-relay/peer-register gossip instead (§4.7, §4.4).
use crate::control_client::ControlClient;
use crate::control_protocol::{
    FetchEntitiesRequest, GossipEntryDto, GossipReceiveRequest, StateSummaryResponse,
};
use crate::discovery::PeerRegistry;
use crate::ids::MetadataNodeId;
use crate::metadata_store::SharedMetadataStore;
use crate::model::gossip_log::{EntityKind, OpKind};
use crate::replication::apply::apply_entry;
use crate::vector_clock::{ClockOrdering, VectorClock};
use rand::seq::IteratorRandom;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Build this node's state summary (§4.3 step 2): for each vector-clocked
/// entity kind, a digest mapping entity id to vector clock.
pub async fn build_state_summary(store: &SharedMetadataStore) -> StateSummaryResponse {
    let mut digest: HashMap<EntityKind, HashMap<String, VectorClock>> = HashMap::new();

    for user in store.all_users().await {
        digest
            .entry(EntityKind::User)
            .or_default()
            .insert(user.id.to_string(), user.revision.vector_clock.clone());
    }
    for file in store.all_files().await {
        digest
            .entry(EntityKind::File)
            .or_default()
            .insert(file.id.to_string(), file.revision.vector_clock.clone());
    }
    for chunk in store.all_chunks().await {
        digest
            .entry(EntityKind::Chunk)
            .or_default()
            .insert(chunk.id.to_string(), chunk.revision.vector_clock.clone());
    }

    StateSummaryResponse { digest }
}

/// Compute, for one entity kind, which ids this node should push (it
/// strictly dominates or is concurrent with the remote) and which it
/// should pull (the remote strictly dominates); see §4.3 step 3.
fn diff_one_kind(
    local: &HashMap<String, VectorClock>,
    remote: &HashMap<String, VectorClock>,
) -> (Vec<String>, Vec<String>) {
    let mut to_push = Vec::new();
    let mut to_pull = Vec::new();

    for (id, local_clock) in local {
        match remote.get(id) {
            None => to_push.push(id.clone()),
            Some(remote_clock) => match local_clock.compare(remote_clock) {
                ClockOrdering::After | ClockOrdering::Concurrent => to_push.push(id.clone()),
                ClockOrdering::Before => to_pull.push(id.clone()),
                ClockOrdering::Equal => {}
            },
        }
    }
    for id in remote.keys() {
        if !local.contains_key(id) {
            to_pull.push(id.clone());
        }
    }
    (to_push, to_pull)
}

/// Run one anti-entropy exchange against `peer` (§4.3 steps 1–5): compare
/// state summaries, push what we have that the peer doesn't (or that
/// dominates/conflicts with its version), pull what it has that we lack,
/// and apply pulled payloads through the shared receive-side path.
pub async fn exchange_once(
    self_id: &MetadataNodeId,
    store: &SharedMetadataStore,
    client: &ControlClient,
    peer_addr: std::net::SocketAddr,
    deadline: Duration,
) {
    let remote_summary = match client.state_summary(peer_addr, deadline).await {
        Ok(s) => s,
        Err(e) => {
            warn!(%peer_addr, error = %e, "anti-entropy state-summary request failed");
            return;
        }
    };
    let local_summary = build_state_summary(store).await;

    for kind in [EntityKind::User, EntityKind::File, EntityKind::Chunk] {
        let empty = HashMap::new();
        let local = local_summary.digest.get(&kind).unwrap_or(&empty);
        let remote = remote_summary.digest.get(&kind).unwrap_or(&empty);
        let (to_push, to_pull) = diff_one_kind(local, remote);

        if !to_push.is_empty() {
            push_full_payloads(self_id, store, client, peer_addr, kind, &to_push, deadline).await;
        }
        if !to_pull.is_empty() {
            pull_full_payloads(self_id, store, client, peer_addr, kind, &to_pull, deadline).await;
        }
    }
}

async fn push_full_payloads(
    self_id: &MetadataNodeId,
    store: &SharedMetadataStore,
    client: &ControlClient,
    peer_addr: std::net::SocketAddr,
    kind: EntityKind,
    ids: &[String],
    deadline: Duration,
) {
    let mut entries = Vec::new();
    for id in ids {
        let Some((payload, clock)) = lookup_payload(store, kind, id).await else {
            continue;
        };
        entries.push(GossipEntryDto {
            entity_kind: kind,
            entity_id: id.clone(),
            op: OpKind::Update,
            payload,
            vector_clock: clock,
            stamp: chrono::Utc::now(),
        });
    }
    if entries.is_empty() {
        return;
    }
    let request = GossipReceiveRequest {
        sender_id: self_id.clone(),
        entries,
    };
    if let Err(e) = client.gossip_send(peer_addr, request, deadline).await {
        warn!(%peer_addr, error = %e, "anti-entropy push failed");
    }
}

async fn pull_full_payloads(
    self_id: &MetadataNodeId,
    store: &SharedMetadataStore,
    client: &ControlClient,
    peer_addr: std::net::SocketAddr,
    kind: EntityKind,
    ids: &[String],
    deadline: Duration,
) {
    let request = FetchEntitiesRequest {
        kind,
        ids: ids.to_vec(),
    };
    let response = match client.fetch_entities(peer_addr, request, deadline).await {
        Ok(r) => r,
        Err(e) => {
            warn!(%peer_addr, error = %e, "anti-entropy pull failed");
            return;
        }
    };

    for payload in response.payloads {
        let clock = extract_vector_clock(kind, &payload);
        let entry = GossipEntryDto {
            entity_kind: kind,
            entity_id: String::new(),
            op: OpKind::Update,
            payload,
            vector_clock: clock,
            stamp: chrono::Utc::now(),
        };
        if let Err(e) = apply_entry(store.as_ref(), self_id, &entry).await {
            warn!(error = %e, "failed to apply pulled entity during anti-entropy");
        }
    }
}

async fn lookup_payload(
    store: &SharedMetadataStore,
    kind: EntityKind,
    id: &str,
) -> Option<(serde_json::Value, VectorClock)> {
    match kind {
        EntityKind::User => {
            let user = store
                .all_users()
                .await
                .into_iter()
                .find(|u| u.id.to_string() == id)?;
            let clock = user.revision.vector_clock.clone();
            Some((serde_json::to_value(&user).ok()?, clock))
        }
        EntityKind::File => {
            let file = store
                .all_files()
                .await
                .into_iter()
                .find(|f| f.id.to_string() == id)?;
            let clock = file.revision.vector_clock.clone();
            Some((serde_json::to_value(&file).ok()?, clock))
        }
        EntityKind::Chunk => {
            let chunk = store
                .all_chunks()
                .await
                .into_iter()
                .find(|c| c.id.to_string() == id)?;
            let clock = chunk.revision.vector_clock.clone();
            Some((serde_json::to_value(&chunk).ok()?, clock))
        }
        _ => None,
    }
}

fn extract_vector_clock(kind: EntityKind, payload: &serde_json::Value) -> VectorClock {
    let pointer = match kind {
        EntityKind::File | EntityKind::Chunk | EntityKind::User => {
            "/revision/vector_clock"
        }
        _ => return VectorClock::new(),
    };
    payload
        .pointer(pointer)
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_else(VectorClock::new)
}

/// Select one random peer for this round (§4.3 step 1).
pub fn pick_peer(registry: &Arc<PeerRegistry>, self_id: &MetadataNodeId) -> Option<std::net::SocketAddr> {
    registry
        .snapshot(self_id)
        .into_iter()
        .choose(&mut rand::thread_rng())
        .map(|p| p.address)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diff_marks_local_only_entries_as_to_push() {
        let mut local = HashMap::new();
        local.insert("a".to_string(), VectorClock::new());
        let remote = HashMap::new();
        let (push, pull) = diff_one_kind(&local, &remote);
        assert_eq!(push, vec!["a".to_string()]);
        assert!(pull.is_empty());
    }

    #[test]
    fn diff_marks_remote_only_entries_as_to_pull() {
        let local = HashMap::new();
        let mut remote = HashMap::new();
        remote.insert("b".to_string(), VectorClock::new());
        let (push, pull) = diff_one_kind(&local, &remote);
        assert!(push.is_empty());
        assert_eq!(pull, vec!["b".to_string()]);
    }

    #[test]
    fn diff_pulls_entries_where_remote_dominates() {
        let m1 = MetadataNodeId::new("m1", 0);
        let base = VectorClock::new().increment(&m1);
        let ahead = base.increment(&m1);

        let mut local = HashMap::new();
        local.insert("c".to_string(), base);
        let mut remote = HashMap::new();
        remote.insert("c".to_string(), ahead);

        let (push, pull) = diff_one_kind(&local, &remote);
        assert!(push.is_empty());
        assert_eq!(pull, vec!["c".to_string()]);
    }
}
