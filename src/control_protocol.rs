//! Wire DTOs for the MN-to-MN control surface (§6, §6.1 of SPEC_FULL.md).
//!
//! JSON-shaped request/response bodies exchanged over HTTP between
//! metadata nodes: list-peers, register-peer, gossip-receive,
//! state-summary, fetch-entities, plus the SN-to-MN heartbeat.
use crate::ids::{MetadataNodeId, StorageNodeId};
use crate::model::gossip_log::{EntityKind, OpKind};
use crate::vector_clock::VectorClock;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::net::SocketAddr;

/// A peer identity as advertised over the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerInfoDto {
    pub id: MetadataNodeId,
    pub address: SocketAddr,
}

/// `list-peers` response (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListPeersResponse {
    #[serde(rename = "self")]
    pub self_info: PeerInfoDto,
    pub peers: Vec<PeerInfoDto>,
}

/// `register-peer` request (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterPeerRequest {
    pub id: MetadataNodeId,
    pub address: SocketAddr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub fn ok() -> Self {
        Self { ok: true }
    }
}

/// One gossip-log entry as carried over the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GossipEntryDto {
    pub entity_kind: EntityKind,
    pub entity_id: String,
    pub op: OpKind,
    pub payload: JsonValue,
    pub vector_clock: VectorClock,
    pub stamp: chrono::DateTime<chrono::Utc>,
}

/// `gossip-receive` request (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GossipReceiveRequest {
    pub sender_id: MetadataNodeId,
    pub entries: Vec<GossipEntryDto>,
}

/// `state-summary` response: for each entity kind, a digest of
/// entity-id to vector-clock (§6, §4.3 step 2).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StateSummaryResponse {
    pub digest: std::collections::HashMap<EntityKind, std::collections::HashMap<String, VectorClock>>,
}

/// `fetch-entities` request (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchEntitiesRequest {
    pub kind: EntityKind,
    pub ids: Vec<String>,
}

/// `fetch-entities` response: raw JSON payloads, one per requested id that
/// the responder actually holds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchEntitiesResponse {
    pub payloads: Vec<JsonValue>,
}

/// SN-to-MN `heartbeat` request (§6, §4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatRequest {
    pub node_id: StorageNodeId,
    pub address: SocketAddr,
    pub capacity_bytes: u64,
    pub used_bytes: u64,
}
