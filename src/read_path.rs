//! The chunk read path (§4.5 "Read path").
use crate::error::{RedCloudError, RedCloudResult};
use crate::ids::{ChunkId, UserId};
use crate::metadata_store::SharedMetadataStore;
use crate::placement::{order_for_read, StorageRegistry};
use crate::sn_client::StorageClient;
use bytes::Bytes;
use std::time::Duration;
use tracing::warn;

/// Download a whole file: fetch its chunk descriptors in ordinal order,
/// try each chunk's healthy holders first (§4.5 step 2), stream bytes
/// through with checksum verification, and concatenate (§4.5 steps 1–4).
pub async fn read_file(
    store: &SharedMetadataStore,
    storage_registry: &StorageRegistry,
    storage_client: &StorageClient,
    owner: &UserId,
    name: &str,
    deadline: Duration,
) -> RedCloudResult<Bytes> {
    let file = store
        .get_file_by_name(owner, name)
        .await
        .ok_or_else(|| RedCloudError::NotFound(name.to_string()))?;

    let chunks = store.chunks_of_file(&file.id).await;
    let mut assembled = Vec::with_capacity(file.size_bytes as usize);
    for chunk in chunks {
        let bytes = read_chunk(store, storage_registry, storage_client, chunk.id, deadline).await?;
        assembled.extend_from_slice(&bytes);
    }
    Ok(Bytes::from(assembled))
}

/// Read one chunk, trying its holders in health order (§4.5 step 2–4).
pub async fn read_chunk(
    store: &SharedMetadataStore,
    storage_registry: &StorageRegistry,
    storage_client: &StorageClient,
    chunk_id: ChunkId,
    deadline: Duration,
) -> RedCloudResult<Bytes> {
    let locations = store.locations_of(&chunk_id).await;
    let candidates = order_for_read(storage_registry, locations.holders());

    if candidates.is_empty() {
        return Err(RedCloudError::Unavailable(chunk_id.to_string()));
    }

    for candidate in candidates {
        match storage_client
            .read_chunk(candidate.address, chunk_id, deadline)
            .await
        {
            Ok(bytes) => return Ok(bytes),
            Err(e) => {
                warn!(storage_node = %candidate.id, chunk = %chunk_id, error = %e, "chunk read attempt failed, trying next holder");
            }
        }
    }

    // All locations failed; do not remove location facts, the owning SNs
    // may be temporarily unreachable (§4.5 step 4).
    Err(RedCloudError::Unavailable(chunk_id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata_store::in_memory_store;

    #[tokio::test]
    async fn read_of_unknown_file_is_not_found() {
        let store = in_memory_store();
        let registry = StorageRegistry::new();
        let client = StorageClient::new();
        let result = read_file(
            &store,
            &registry,
            &client,
            &UserId::new(),
            "missing.txt",
            Duration::from_secs(1),
        )
        .await;
        assert!(matches!(result, Err(RedCloudError::NotFound(_))));
    }

    #[tokio::test]
    async fn read_of_chunk_with_no_locations_is_unavailable() {
        let store = in_memory_store();
        let registry = StorageRegistry::new();
        let client = StorageClient::new();
        let result = read_chunk(&store, &registry, &client, ChunkId::new(), Duration::from_secs(1)).await;
        assert!(matches!(result, Err(RedCloudError::Unavailable(_))));
    }
}
