//! The `MetadataStore` contract (§3, out of scope per spec.md §1: only the
//! contract is fixed here).
//!
//! A real deployment backs this with a transactional relational store
//! (users/files/tags/chunks/chunk-locations/storage-nodes/metadata-
//! nodes/gossip-log tables, each carrying vector-clock/last-modified-by/
//! version columns per §6). [`InMemoryMetadataStore`] is a runnable
//! reference implementation used by the rest of this crate and by its
//! tests: `DashMap`s for lock-free reads, with a single `tokio::sync::Mutex`
//! taken only around [`MetadataStore::commit`] to give multi-row changes
//! (chunk descriptor + location facts + gossip-log append) atomicity ,
//! the "single writer's serialization point" required by §5.
use crate::error::{RedCloudError, RedCloudResult};
use crate::ids::{ChunkId, FileId, MetadataNodeId, StorageNodeId, UserId};
use crate::model::{
    Chunk, File, GossipEntry, LocationSet, MetadataNodeRecord, StorageNodeRecord, User,
};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// A batch of entity upserts plus the gossip-log entries they produce,
/// applied atomically by [`MetadataStore::commit`].
#[derive(Debug, Clone, Default)]
pub struct Transaction {
    /// Users to upsert.
    pub users: Vec<User>,
    /// Files to upsert.
    pub files: Vec<File>,
    /// Chunk descriptors to upsert.
    pub chunks: Vec<Chunk>,
    /// Location-fact sets to upsert, keyed by chunk.
    pub locations: Vec<(ChunkId, LocationSet)>,
    /// Storage-node records to upsert.
    pub storage_nodes: Vec<StorageNodeRecord>,
    /// Metadata-node records to upsert.
    pub metadata_nodes: Vec<MetadataNodeRecord>,
    /// Gossip-log entries to append as part of this transaction. Left
    /// empty when applying a remote update that is itself a replay of
    /// gossip already seen (§4.3: "append a gossip-log entry on first
    /// observation"; callers only include an entry the first time).
    pub gossip_entries: Vec<GossipEntry>,
}

impl Transaction {
    /// An empty transaction.
    pub fn new() -> Self {
        Self::default()
    }
}

/// The metadata-store contract (§3, §6 "Persisted metadata layout").
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Apply a transaction atomically. On failure, no partial state is
    /// visible and no gossip entry is emitted (§7).
    async fn commit(&self, tx: Transaction) -> RedCloudResult<()>;

    /// Fetch a user by id.
    async fn get_user(&self, id: &UserId) -> Option<User>;
    /// Fetch a user by username.
    async fn get_user_by_username(&self, username: &str) -> Option<User>;
    /// Every known user (anti-entropy state-summary enumeration, §4.3).
    async fn all_users(&self) -> Vec<User>;

    /// Fetch a file by id.
    async fn get_file(&self, id: &FileId) -> Option<File>;
    /// Fetch a file by (owner, name), honoring soft-delete invisibility.
    async fn get_file_by_name(&self, owner: &UserId, name: &str) -> Option<File>;
    /// List every visible file id owned by `owner`, optionally filtered
    /// to files carrying `tag`.
    async fn list_files(&self, owner: &UserId, tag: Option<&str>) -> Vec<File>;
    /// All files, visible or not; used by the repair and GC loops, which
    /// must also see soft-deleted files.
    async fn all_files(&self) -> Vec<File>;

    /// Fetch a chunk descriptor by id.
    async fn get_chunk(&self, id: &ChunkId) -> Option<Chunk>;
    /// The chunks of one file, ordered by ordinal (I4).
    async fn chunks_of_file(&self, file_id: &FileId) -> Vec<Chunk>;
    /// Every chunk descriptor in the cluster (repair loop, §4.6).
    async fn all_chunks(&self) -> Vec<Chunk>;

    /// The location-fact set for one chunk.
    async fn locations_of(&self, chunk_id: &ChunkId) -> LocationSet;

    /// Every known storage node.
    async fn storage_nodes(&self) -> Vec<StorageNodeRecord>;
    /// One storage node by id.
    async fn get_storage_node(&self, id: &StorageNodeId) -> Option<StorageNodeRecord>;

    /// Every known metadata-node peer.
    async fn metadata_nodes(&self) -> Vec<MetadataNodeRecord>;
    /// Remove a metadata-node peer (registry TTL eviction, §4.4).
    async fn remove_metadata_node(&self, id: &MetadataNodeId);

    /// Gossip-log entries with `sequence > after`, for push fanout or
    /// anti-entropy delta application.
    async fn gossip_entries_since(&self, after: u64) -> Vec<GossipEntry>;
    /// All gossip-log entries currently retained.
    async fn all_gossip_entries(&self) -> Vec<GossipEntry>;
    /// Record that `peer` has acknowledged a set of sequence numbers.
    async fn acknowledge_gossip(&self, peer: &MetadataNodeId, sequences: &[u64]);
    /// Allocate the next local gossip-log sequence number.
    fn next_sequence(&self) -> u64;

    /// Remove a chunk descriptor and its location-fact set once GC has
    /// confirmed every former holder acknowledged its deletion (§4.10,
    /// I5: "chunks remain eligible for garbage collection only when every
    /// SN has acknowledged the tombstone").
    async fn gc_chunk(&self, chunk_id: &ChunkId);
}

/// In-memory reference implementation of [`MetadataStore`].
pub struct InMemoryMetadataStore {
    users: DashMap<UserId, User>,
    username_index: DashMap<String, UserId>,
    files: DashMap<FileId, File>,
    owner_name_index: DashMap<(UserId, String), FileId>,
    chunks: DashMap<ChunkId, Chunk>,
    file_chunk_index: DashMap<FileId, Vec<ChunkId>>,
    locations: DashMap<ChunkId, LocationSet>,
    storage_nodes: DashMap<StorageNodeId, StorageNodeRecord>,
    metadata_nodes: DashMap<MetadataNodeId, MetadataNodeRecord>,
    gossip_log: DashMap<u64, GossipEntry>,
    sequence: AtomicU64,
    commit_lock: Mutex<()>,
}

impl Default for InMemoryMetadataStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMetadataStore {
    /// An empty store.
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            username_index: DashMap::new(),
            files: DashMap::new(),
            owner_name_index: DashMap::new(),
            chunks: DashMap::new(),
            file_chunk_index: DashMap::new(),
            locations: DashMap::new(),
            storage_nodes: DashMap::new(),
            metadata_nodes: DashMap::new(),
            gossip_log: DashMap::new(),
            sequence: AtomicU64::new(0),
            commit_lock: Mutex::new(()),
        }
    }

    fn insert_chunk_index(&self, chunk: &Chunk) {
        let mut ordinals = self.file_chunk_index.entry(chunk.file_id).or_default();
        if !ordinals.contains(&chunk.id) {
            ordinals.push(chunk.id);
            ordinals.sort_by_key(|id| self.chunks.get(id).map(|c| c.ordinal).unwrap_or(0));
        }
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn commit(&self, tx: Transaction) -> RedCloudResult<()> {
        let _guard = self.commit_lock.lock().await;

        for user in &tx.users {
            self.username_index
                .insert(user.username.clone(), user.id);
        }
        for user in tx.users {
            self.users.insert(user.id, user);
        }

        for file in &tx.files {
            self.owner_name_index
                .insert((file.owner, file.name.clone()), file.id);
        }
        for file in tx.files {
            self.files.insert(file.id, file);
        }

        for chunk in &tx.chunks {
            self.insert_chunk_index(chunk);
        }
        for chunk in tx.chunks {
            self.chunks.insert(chunk.id, chunk);
        }

        for (chunk_id, location_set) in tx.locations {
            self.locations.insert(chunk_id, location_set);
        }

        for sn in tx.storage_nodes {
            self.storage_nodes.insert(sn.id, sn);
        }

        for mn in tx.metadata_nodes {
            self.metadata_nodes.insert(mn.id.clone(), mn);
        }

        for entry in tx.gossip_entries {
            self.gossip_log.insert(entry.sequence, entry);
        }

        Ok(())
    }

    async fn get_user(&self, id: &UserId) -> Option<User> {
        self.users.get(id).map(|r| r.clone())
    }

    async fn get_user_by_username(&self, username: &str) -> Option<User> {
        let id = self.username_index.get(username)?;
        self.users.get(id.value()).map(|r| r.clone())
    }

    async fn all_users(&self) -> Vec<User> {
        self.users.iter().map(|r| r.clone()).collect()
    }

    async fn get_file(&self, id: &FileId) -> Option<File> {
        self.files.get(id).map(|r| r.clone())
    }

    async fn get_file_by_name(&self, owner: &UserId, name: &str) -> Option<File> {
        let id = self.owner_name_index.get(&(*owner, name.to_string()))?;
        self.files
            .get(id.value())
            .map(|r| r.clone())
            .filter(|f| f.is_visible())
    }

    async fn list_files(&self, owner: &UserId, tag: Option<&str>) -> Vec<File> {
        self.files
            .iter()
            .map(|r| r.clone())
            .filter(|f| &f.owner == owner && f.is_visible())
            .filter(|f| tag.map(|t| f.tags.active().contains(t)).unwrap_or(true))
            .collect()
    }

    async fn all_files(&self) -> Vec<File> {
        self.files.iter().map(|r| r.clone()).collect()
    }

    async fn get_chunk(&self, id: &ChunkId) -> Option<Chunk> {
        self.chunks.get(id).map(|r| r.clone())
    }

    async fn chunks_of_file(&self, file_id: &FileId) -> Vec<Chunk> {
        let Some(ordinals) = self.file_chunk_index.get(file_id) else {
            return Vec::new();
        };
        ordinals
            .iter()
            .filter_map(|id| self.chunks.get(id).map(|r| r.clone()))
            .collect()
    }

    async fn all_chunks(&self) -> Vec<Chunk> {
        self.chunks.iter().map(|r| r.clone()).collect()
    }

    async fn locations_of(&self, chunk_id: &ChunkId) -> LocationSet {
        self.locations
            .get(chunk_id)
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    async fn storage_nodes(&self) -> Vec<StorageNodeRecord> {
        self.storage_nodes.iter().map(|r| r.clone()).collect()
    }

    async fn get_storage_node(&self, id: &StorageNodeId) -> Option<StorageNodeRecord> {
        self.storage_nodes.get(id).map(|r| r.clone())
    }

    async fn metadata_nodes(&self) -> Vec<MetadataNodeRecord> {
        self.metadata_nodes.iter().map(|r| r.clone()).collect()
    }

    async fn remove_metadata_node(&self, id: &MetadataNodeId) {
        self.metadata_nodes.remove(id);
    }

    async fn gossip_entries_since(&self, after: u64) -> Vec<GossipEntry> {
        let mut entries: Vec<_> = self
            .gossip_log
            .iter()
            .filter(|e| e.sequence > after)
            .map(|e| e.clone())
            .collect();
        entries.sort_by_key(|e| e.sequence);
        entries
    }

    async fn all_gossip_entries(&self) -> Vec<GossipEntry> {
        let mut entries: Vec<_> = self.gossip_log.iter().map(|e| e.clone()).collect();
        entries.sort_by_key(|e| e.sequence);
        entries
    }

    async fn acknowledge_gossip(&self, peer: &MetadataNodeId, sequences: &[u64]) {
        for seq in sequences {
            if let Some(mut entry) = self.gossip_log.get_mut(seq) {
                entry.acknowledge(peer.clone());
            }
        }
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn gc_chunk(&self, chunk_id: &ChunkId) {
        if let Some((_, chunk)) = self.chunks.remove(chunk_id) {
            if let Some(mut ordinals) = self.file_chunk_index.get_mut(&chunk.file_id) {
                ordinals.retain(|id| id != chunk_id);
            }
        }
        self.locations.remove(chunk_id);
    }
}

/// Shared handle to a metadata store, convenient for cloning across tasks.
pub type SharedMetadataStore = Arc<dyn MetadataStore>;

/// Build a fresh in-memory store behind the shared-handle type.
pub fn in_memory_store() -> SharedMetadataStore {
    Arc::new(InMemoryMetadataStore::new())
}

/// Helper used by write paths to turn a "name already taken" lookup into
/// the client-visible error (§7 does not define a bespoke "name conflict"
/// client error; callers typically disambiguate instead, see DESIGN.md O1).
pub fn name_conflict(name: &str) -> RedCloudError {
    RedCloudError::NameConflict {
        name: name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::MetadataNodeId;

    fn origin() -> MetadataNodeId {
        MetadataNodeId::new("m1", 0)
    }

    #[tokio::test]
    async fn commit_is_atomic_across_entity_kinds() {
        let store = InMemoryMetadataStore::new();
        let user = User::create("alice", "v", "t", &origin());
        let file = File::create(user.id, "a.txt", 10, [], &origin());

        let mut tx = Transaction::new();
        tx.users.push(user.clone());
        tx.files.push(file.clone());
        store.commit(tx).await.unwrap();

        assert!(store.get_user(&user.id).await.is_some());
        assert!(store.get_file(&file.id).await.is_some());
    }

    #[tokio::test]
    async fn name_lookup_respects_soft_delete() {
        let store = InMemoryMetadataStore::new();
        let origin = origin();
        let user = User::create("alice", "v", "t", &origin);
        let file = File::create(user.id, "a.txt", 10, [], &origin);

        let mut tx = Transaction::new();
        tx.files.push(file.clone());
        store.commit(tx).await.unwrap();
        assert!(store.get_file_by_name(&user.id, "a.txt").await.is_some());

        let deleted = file.soft_delete(&origin);
        let mut tx = Transaction::new();
        tx.files.push(deleted);
        store.commit(tx).await.unwrap();
        assert!(store.get_file_by_name(&user.id, "a.txt").await.is_none());
    }

    #[tokio::test]
    async fn gossip_sequence_allocation_is_monotonic() {
        let store = InMemoryMetadataStore::new();
        let a = store.next_sequence();
        let b = store.next_sequence();
        assert!(b > a);
    }
}
