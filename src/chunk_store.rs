//! The `ChunkStore` contract (§1, §6: the on-disk chunk store is an
//! external collaborator; only its write/read/delete/list contract is
//! fixed here).
//!
//! A real deployment backs this with a content-addressed blob store on
//! local disk. [`InMemoryChunkStore`] is the reference implementation a
//! [`crate::storage_node::StorageNode`] uses by default, enforcing the
//! idempotent-overwrite rule from §5: writing the same chunk id with the
//! same bytes is a no-op, writing it with different bytes is a protocol
//! error rejected after checksum comparison.
use crate::error::{RedCloudError, RedCloudResult};
use crate::ids::{ChunkId, FileId};
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use std::sync::Arc;

/// One stored chunk's header, returned by [`ChunkStore::list`].
#[derive(Debug, Clone)]
pub struct ChunkListing {
    /// The chunk's id.
    pub chunk_id: ChunkId,
    /// The file it belongs to.
    pub file_id: FileId,
    /// Its ordinal within the file.
    pub ordinal: u32,
    /// Its byte length.
    pub size_bytes: u32,
    /// Its content checksum, hex-encoded.
    pub checksum: String,
}

/// The storage-node-local chunk blob contract (§6 MN-to-SN data surface).
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Durably store `bytes` under `chunk_id`, first verifying `checksum`.
    /// Idempotent: re-writing identical bytes under the same id succeeds
    /// silently; writing different bytes under an id already in use is
    /// rejected as [`RedCloudError::ChunkConflict`].
    async fn write(
        &self,
        chunk_id: ChunkId,
        file_id: FileId,
        ordinal: u32,
        checksum: &str,
        bytes: Bytes,
    ) -> RedCloudResult<()>;

    /// Read back a chunk's bytes, or `None` if this node doesn't have it.
    async fn read(&self, chunk_id: &ChunkId) -> Option<Bytes>;

    /// Delete a chunk. `true` if it was present.
    async fn delete(&self, chunk_id: &ChunkId) -> bool;

    /// List every chunk this node currently holds.
    async fn list(&self) -> Vec<ChunkListing>;

    /// Whether this node holds `chunk_id`.
    async fn contains(&self, chunk_id: &ChunkId) -> bool;

    /// Reported capacity, in bytes (for heartbeats, §4.8).
    fn capacity_bytes(&self) -> u64;

    /// Reported used space, in bytes (for heartbeats, §4.8).
    async fn used_bytes(&self) -> u64;
}

struct StoredChunk {
    file_id: FileId,
    ordinal: u32,
    checksum: String,
    bytes: Bytes,
}

/// In-memory reference implementation of [`ChunkStore`].
pub struct InMemoryChunkStore {
    chunks: DashMap<ChunkId, StoredChunk>,
    capacity_bytes: u64,
}

impl InMemoryChunkStore {
    /// A store reporting `capacity_bytes` of total capacity.
    pub fn new(capacity_bytes: u64) -> Self {
        Self {
            chunks: DashMap::new(),
            capacity_bytes,
        }
    }
}

impl Default for InMemoryChunkStore {
    fn default() -> Self {
        // 64 GiB default, matching a generously-provisioned demo node.
        Self::new(64 * 1024 * 1024 * 1024)
    }
}

fn verify_checksum(bytes: &[u8], expected: &str) -> bool {
    hex::encode(blake3::hash(bytes).as_bytes()) == expected
}

#[async_trait]
impl ChunkStore for InMemoryChunkStore {
    async fn write(
        &self,
        chunk_id: ChunkId,
        file_id: FileId,
        ordinal: u32,
        checksum: &str,
        bytes: Bytes,
    ) -> RedCloudResult<()> {
        if !verify_checksum(&bytes, checksum) {
            return Err(RedCloudError::ChecksumMismatch {
                chunk_id: chunk_id.to_string(),
            });
        }

        if let Some(existing) = self.chunks.get(&chunk_id) {
            if existing.bytes == bytes {
                return Ok(());
            }
            return Err(RedCloudError::ChunkConflict {
                chunk_id: chunk_id.to_string(),
            });
        }

        self.chunks.insert(
            chunk_id,
            StoredChunk {
                file_id,
                ordinal,
                checksum: checksum.to_string(),
                bytes,
            },
        );
        Ok(())
    }

    async fn read(&self, chunk_id: &ChunkId) -> Option<Bytes> {
        self.chunks.get(chunk_id).map(|c| c.bytes.clone())
    }

    async fn delete(&self, chunk_id: &ChunkId) -> bool {
        self.chunks.remove(chunk_id).is_some()
    }

    async fn list(&self) -> Vec<ChunkListing> {
        self.chunks
            .iter()
            .map(|entry| ChunkListing {
                chunk_id: *entry.key(),
                file_id: entry.file_id,
                ordinal: entry.ordinal,
                size_bytes: entry.bytes.len() as u32,
                checksum: entry.checksum.clone(),
            })
            .collect()
    }

    async fn contains(&self, chunk_id: &ChunkId) -> bool {
        self.chunks.contains_key(chunk_id)
    }

    fn capacity_bytes(&self) -> u64 {
        self.capacity_bytes
    }

    async fn used_bytes(&self) -> u64 {
        self.chunks.iter().map(|c| c.bytes.len() as u64).sum()
    }
}

/// Shared handle to a chunk store.
pub type SharedChunkStore = Arc<dyn ChunkStore>;

#[cfg(test)]
mod tests {
    use super::*;

    fn checksum_of(bytes: &[u8]) -> String {
        hex::encode(blake3::hash(bytes).as_bytes())
    }

    #[tokio::test]
    async fn rewriting_identical_bytes_is_a_no_op() {
        let store = InMemoryChunkStore::default();
        let id = ChunkId::new();
        let bytes = Bytes::from_static(b"hello world");
        let checksum = checksum_of(&bytes);

        store
            .write(id, FileId::new(), 0, &checksum, bytes.clone())
            .await
            .unwrap();
        store
            .write(id, FileId::new(), 0, &checksum, bytes.clone())
            .await
            .unwrap();

        assert_eq!(store.list().await.len(), 1);
    }

    #[tokio::test]
    async fn rewriting_divergent_bytes_is_rejected() {
        let store = InMemoryChunkStore::default();
        let id = ChunkId::new();
        let first = Bytes::from_static(b"hello world");
        store
            .write(id, FileId::new(), 0, &checksum_of(&first), first)
            .await
            .unwrap();

        let second = Bytes::from_static(b"goodbye world");
        let result = store
            .write(id, FileId::new(), 0, &checksum_of(&second), second)
            .await;
        assert!(matches!(result, Err(RedCloudError::ChunkConflict { .. })));
    }

    #[tokio::test]
    async fn checksum_mismatch_is_rejected_before_storing() {
        let store = InMemoryChunkStore::default();
        let id = ChunkId::new();
        let bytes = Bytes::from_static(b"hello world");
        let result = store
            .write(id, FileId::new(), 0, "0000", bytes)
            .await;
        assert!(matches!(
            result,
            Err(RedCloudError::ChecksumMismatch { .. })
        ));
        assert!(!store.contains(&id).await);
    }
}
