//! The `File` entity and its tag set (§3).
use super::Revision;
use crate::ids::{FileId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// The tag set attached to one file.
///
/// Tags are set-convergent (§4.2): a concurrent add on one replica and a
/// concurrent add of a different tag on another both survive a merge.
/// Removal is represented as a per-tag tombstone rather than a deletion,
/// so a tag removed on one replica cannot be resurrected by a concurrent
/// anti-entropy exchange that still carries the old add.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagSet {
    /// Tags currently attached to the file.
    active: HashSet<String>,
    /// Tags that have been removed, keyed by tag text to the wall-clock
    /// stamp of the removal (latest tombstone wins if removed twice).
    tombstoned: HashMap<String, DateTime<Utc>>,
}

impl TagSet {
    /// An empty tag set.
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently-active tags.
    pub fn active(&self) -> &HashSet<String> {
        &self.active
    }

    /// Add a tag. A no-op if the tag carries a tombstone newer than now
    /// would never happen (tombstones are stamped at removal time), but
    /// re-adding a previously-removed tag always clears its tombstone ,
    /// that is a fresh, causally later add, not a resurrection.
    pub fn add(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        self.tombstoned.remove(&tag);
        self.active.insert(tag);
    }

    /// Remove a tag, recording a tombstone so a stale concurrent add
    /// cannot bring it back through further anti-entropy.
    pub fn remove(&mut self, tag: &str) {
        self.active.remove(tag);
        self.tombstoned.insert(tag.to_string(), Utc::now());
    }

    /// Set-convergent merge: union of active tags, tombstones win over an
    /// add only when the tombstone is the side performing the merge's
    /// most recent knowledge (we keep the newest tombstone stamp and drop
    /// the tag from `active` if tombstoned on either side).
    pub fn merge(&self, other: &Self) -> Self {
        let mut active: HashSet<String> = self.active.union(&other.active).cloned().collect();
        let mut tombstoned = self.tombstoned.clone();
        for (tag, stamp) in &other.tombstoned {
            tombstoned
                .entry(tag.clone())
                .and_modify(|existing| {
                    if *stamp > *existing {
                        *existing = *stamp;
                    }
                })
                .or_insert(*stamp);
        }
        active.retain(|tag| !tombstoned.contains_key(tag));
        Self { active, tombstoned }
    }
}

/// A user-owned file, split into fixed-size chunks elsewhere ([`super::Chunk`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct File {
    /// Stable identifier, immutable for the life of the file record.
    pub id: FileId,
    /// The user that owns this file.
    pub owner: UserId,
    /// Human-chosen name, unique per owner at write time on the owning
    /// node. Collisions across a partition resolve per DESIGN.md, O1.
    pub name: String,
    /// Total byte size across all chunks.
    pub size_bytes: u64,
    /// Tags attached to this file.
    pub tags: TagSet,
    /// When the file was first created.
    pub created_at: DateTime<Utc>,
    /// Soft-delete flag (I5): sticky: once true on either side of a
    /// merge, true on both.
    pub deleted: bool,
    /// When the file was soft-deleted, if it has been.
    pub deleted_at: Option<DateTime<Utc>>,
    /// Replication bookkeeping.
    pub revision: Revision,
}

impl File {
    /// Create a new file record on the node that received the upload.
    pub fn create(
        owner: UserId,
        name: impl Into<String>,
        size_bytes: u64,
        tags: impl IntoIterator<Item = String>,
        origin: &crate::ids::MetadataNodeId,
    ) -> Self {
        let mut tag_set = TagSet::new();
        for tag in tags {
            tag_set.add(tag);
        }
        Self {
            id: FileId::new(),
            owner,
            name: name.into(),
            size_bytes,
            tags: tag_set,
            created_at: Utc::now(),
            deleted: false,
            deleted_at: None,
            revision: Revision::initial(origin),
        }
    }

    /// Mark this file as soft-deleted (I5), producing the next revision.
    pub fn soft_delete(&self, origin: &crate::ids::MetadataNodeId) -> Self {
        let mut next = self.clone();
        next.deleted = true;
        next.deleted_at = Some(Utc::now());
        next.revision = self.revision.advance(origin);
        next
    }

    /// Whether this file should be visible to query paths (I5).
    pub fn is_visible(&self) -> bool {
        !self.deleted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_merge_is_commutative_and_resurrection_proof() {
        let mut a = TagSet::new();
        a.add("x");
        let mut b = a.clone();
        b.add("y");
        a.remove("x");

        let merged_ab = a.merge(&b);
        let merged_ba = b.merge(&a);

        assert_eq!(merged_ab.active(), merged_ba.active());
        assert!(!merged_ab.active().contains("x"));
        assert!(merged_ab.active().contains("y"));
    }

    #[test]
    fn removed_tag_never_resurrects_through_further_merges() {
        let mut a = TagSet::new();
        a.add("x");
        let stale_add = a.clone();

        a.remove("x");
        let merged = a.merge(&stale_add);
        assert!(!merged.active().contains("x"));
    }
}
