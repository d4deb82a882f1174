//! Chunk descriptors and location facts (§3, I2–I4).
use super::Revision;
use crate::ids::{ChunkId, FileId, StorageNodeId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// An immutable, fixed-size, content-checksummed byte range of a file.
///
/// Chunk descriptors are immutable once created (I2): only the location
/// fact set (tracked separately as [`LocationFact`]s) and the owning
/// file's soft-delete flag ever change after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Stable identifier.
    pub id: ChunkId,
    /// The file this chunk belongs to.
    pub file_id: FileId,
    /// Zero-based position within the file's chunk sequence (I4: the
    /// full sequence for a file is contiguous from 0).
    pub ordinal: u32,
    /// Byte length of this chunk.
    pub size_bytes: u32,
    /// 256-bit content checksum (BLAKE3), hex-encoded.
    pub checksum: String,
    /// When this chunk was created.
    pub created_at: DateTime<Utc>,
    /// Replication bookkeeping (chunk descriptors never mutate after
    /// creation, so this effectively just records provenance).
    pub revision: Revision,
}

impl Chunk {
    /// Create a new, immutable chunk descriptor.
    pub fn create(
        file_id: FileId,
        ordinal: u32,
        size_bytes: u32,
        checksum: impl Into<String>,
        origin: &crate::ids::MetadataNodeId,
    ) -> Self {
        Self {
            id: ChunkId::new(),
            file_id,
            ordinal,
            size_bytes,
            checksum: checksum.into(),
            created_at: Utc::now(),
            revision: Revision::initial(origin),
        }
    }
}

/// A replicated assertion that `storage_node` currently holds `chunk_id`
/// (I3). Set-valued per chunk and set-convergent under conflict
/// resolution (§4.2): the union of both sides' location facts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocationFact {
    /// The chunk this fact is about.
    pub chunk_id: ChunkId,
    /// The storage node asserted to hold it.
    pub storage_node: StorageNodeId,
    /// When this node discovered/recorded the fact.
    pub discovered_at: DateTime<Utc>,
}

impl LocationFact {
    /// Record a new location fact.
    pub fn new(chunk_id: ChunkId, storage_node: StorageNodeId) -> Self {
        Self {
            chunk_id,
            storage_node,
            discovered_at: Utc::now(),
        }
    }
}

/// The set of storage nodes currently believed to hold one chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationSet {
    facts: HashSet<StorageNodeId>,
}

impl LocationSet {
    /// An empty location set.
    pub fn new() -> Self {
        Self::default()
    }

    /// The storage nodes currently holding the chunk.
    pub fn holders(&self) -> &HashSet<StorageNodeId> {
        &self.facts
    }

    /// Record that `node` holds this chunk.
    pub fn insert(&mut self, node: StorageNodeId) {
        self.facts.insert(node);
    }

    /// Clear a location fact. Only valid when the node has been removed
    /// from the storage-node registry or the chunk has been tombstoned
    /// (I3).
    pub fn remove(&mut self, node: &StorageNodeId) {
        self.facts.remove(node);
    }

    /// `true` once every holder has acknowledged removal (I5's GC gate).
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    /// Set-convergent union merge (§4.2).
    pub fn merge(&self, other: &Self) -> Self {
        Self {
            facts: self.facts.union(&other.facts).cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_set_merge_is_union() {
        let mut a = LocationSet::new();
        let n1 = StorageNodeId::new();
        let n2 = StorageNodeId::new();
        a.insert(n1);

        let mut b = LocationSet::new();
        b.insert(n2);

        let merged = a.merge(&b);
        assert!(merged.holders().contains(&n1));
        assert!(merged.holders().contains(&n2));
    }
}
