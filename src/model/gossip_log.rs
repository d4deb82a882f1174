//! The gossip log: the append-only record each metadata node replays to
//! its peers (§3, §4.3).
use crate::ids::MetadataNodeId;
use crate::vector_clock::VectorClock;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::HashSet;

/// The kind of entity a gossip-log entry describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// A [`super::User`].
    User,
    /// A [`super::File`].
    File,
    /// A [`super::Chunk`] descriptor.
    Chunk,
    /// A chunk's [`super::LocationFact`] set.
    ChunkLocation,
    /// A [`super::StorageNodeRecord`].
    StorageNode,
    /// A [`super::MetadataNodeRecord`].
    MetadataNode,
}

/// The operation a gossip-log entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OpKind {
    /// A brand-new entity.
    Create,
    /// A mutation to an existing entity.
    Update,
    /// A file's soft-delete flag flipped to `true`.
    SoftDelete,
    /// A tag tombstone was recorded.
    TombstoneTag,
    /// A peer metadata node registered itself.
    PeerRegister,
    /// A storage-node heartbeat was relayed (§4.8).
    HeartbeatRelay,
}

/// One entry in a metadata node's local gossip log.
///
/// Entries are appended in one monotonically-increasing local sequence
/// per node; sequence order is never shared across nodes (§5: "across MNs,
/// no global ordering is promised").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GossipEntry {
    /// Monotonic local sequence number, assigned by the node that
    /// appended this entry.
    pub sequence: u64,
    /// The kind of entity this entry describes.
    pub entity_kind: EntityKind,
    /// The affected entity's stable id, as its canonical string form
    /// (the concrete id type depends on `entity_kind`).
    pub entity_id: String,
    /// The operation this entry records.
    pub op: OpKind,
    /// A full snapshot of the entity after the operation (conflict
    /// resolution always operates on full snapshots, never diffs).
    pub payload: JsonValue,
    /// The vector clock of the originating node at emission time.
    pub originator_clock: VectorClock,
    /// When this entry was emitted.
    pub emitted_at: DateTime<Utc>,
    /// Peers that have acknowledged this entry (push gossip stops
    /// resending to a peer once it is in this set).
    pub acknowledged_by: HashSet<MetadataNodeId>,
}

impl GossipEntry {
    /// Construct a fresh entry; `sequence` must be supplied by the log
    /// owner (monotonic per-node counter).
    pub fn new(
        sequence: u64,
        entity_kind: EntityKind,
        entity_id: impl Into<String>,
        op: OpKind,
        payload: JsonValue,
        originator_clock: VectorClock,
    ) -> Self {
        Self {
            sequence,
            entity_kind,
            entity_id: entity_id.into(),
            op,
            payload,
            originator_clock,
            emitted_at: Utc::now(),
            acknowledged_by: HashSet::new(),
        }
    }

    /// Record that `peer` has received this entry.
    pub fn acknowledge(&mut self, peer: MetadataNodeId) {
        self.acknowledged_by.insert(peer);
    }

    /// Whether `peer` still needs this entry pushed to it.
    pub fn needs_push_to(&self, peer: &MetadataNodeId) -> bool {
        !self.acknowledged_by.contains(peer)
    }
}
