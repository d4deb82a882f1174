//! The chunk write path (§4.5 "Write path").
use crate::chunking::split_into_chunks;
use crate::error::{RedCloudError, RedCloudResult};
use crate::ids::{ChunkId, FileId, MetadataNodeId, UserId};
use crate::metadata_store::{MetadataStore, SharedMetadataStore, Transaction};
use crate::model::gossip_log::{EntityKind, OpKind};
use crate::model::{Chunk, File, GossipEntry, LocationSet};
use crate::placement::{placement_targets, StorageRegistry};
use crate::sn_client::StorageClient;
use bytes::Bytes;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::warn;

/// Upload a whole file: split into chunks, fan each out to every active
/// SN concurrently, and commit metadata with whatever chunks got at least
/// one acknowledgement (§4.5 steps 1–6).
#[allow(clippy::too_many_arguments)]
pub async fn write_file(
    self_id: &MetadataNodeId,
    store: &SharedMetadataStore,
    storage_registry: &StorageRegistry,
    storage_client: &StorageClient,
    owner: UserId,
    name: impl Into<String>,
    tags: Vec<String>,
    bytes: Bytes,
    chunk_size: usize,
    min_write_acks: usize,
    inflight_per_sn: usize,
    deadline: Duration,
) -> RedCloudResult<FileId> {
    let name = name.into();
    if store.get_file_by_name(&owner, &name).await.is_some() {
        return Err(crate::metadata_store::name_conflict(&name));
    }

    let targets = placement_targets(storage_registry);
    if targets.is_empty() {
        return Err(RedCloudError::NoCapacity);
    }

    let pieces = split_into_chunks(bytes, chunk_size);
    let file = File::create(owner, name, pieces.iter().map(|p| p.bytes.len() as u64).sum(), tags, self_id);

    let semaphore = Arc::new(Semaphore::new(inflight_per_sn * targets.len().max(1)));
    let mut chunk_descriptors = Vec::with_capacity(pieces.len());
    let mut location_updates = Vec::with_capacity(pieces.len());
    let mut written: Vec<(ChunkId, std::net::SocketAddr)> = Vec::new();

    for piece in pieces {
        let chunk = Chunk::create(file.id, piece.ordinal, piece.bytes.len() as u32, piece.checksum.clone(), self_id);

        let mut write_futures = Vec::with_capacity(targets.len());
        for target in &targets {
            let semaphore = semaphore.clone();
            let client = storage_client.clone();
            let addr = target.address;
            let chunk_id = chunk.id;
            let file_id = file.id;
            let ordinal = piece.ordinal;
            let checksum = piece.checksum.clone();
            let bytes = piece.bytes.clone();
            let node_id = target.id;
            write_futures.push(async move {
                let _permit = semaphore.acquire_owned().await.ok()?;
                match client
                    .write_chunk(addr, chunk_id, file_id, ordinal, &checksum, bytes, deadline)
                    .await
                {
                    Ok(()) => Some((node_id, addr)),
                    Err(e) => {
                        warn!(storage_node = %node_id, chunk = %chunk_id, error = %e, "chunk write failed");
                        None
                    }
                }
            });
        }

        let results = join_all(write_futures).await;
        let mut locations = LocationSet::new();
        for (holder, addr) in results.into_iter().flatten() {
            locations.insert(holder);
            written.push((chunk.id, addr));
        }

        if locations.holders().len() < min_write_acks {
            compensate_partial_writes(storage_client, &written, deadline).await;
            return Err(RedCloudError::Unavailable(format!(
                "chunk {} got {} acknowledgements, need {min_write_acks}",
                chunk.id,
                locations.holders().len()
            )));
        }

        location_updates.push((chunk.id, locations));
        chunk_descriptors.push(chunk);
    }

    let mut tx = Transaction::new();
    tx.gossip_entries.push(GossipEntry::new(
        store.next_sequence(),
        EntityKind::File,
        file.id.to_string(),
        OpKind::Create,
        serde_json::to_value(&file)?,
        file.revision.vector_clock.clone(),
    ));
    for chunk in &chunk_descriptors {
        tx.gossip_entries.push(GossipEntry::new(
            store.next_sequence(),
            EntityKind::Chunk,
            chunk.id.to_string(),
            OpKind::Create,
            serde_json::to_value(chunk)?,
            chunk.revision.vector_clock.clone(),
        ));
    }
    for (chunk_id, locations) in &location_updates {
        tx.gossip_entries.push(GossipEntry::new(
            store.next_sequence(),
            EntityKind::ChunkLocation,
            chunk_id.to_string(),
            OpKind::Update,
            serde_json::json!({ "chunk_id": chunk_id, "locations": locations }),
            file.revision.vector_clock.clone(),
        ));
    }
    let file_id = file.id;
    tx.files.push(file);
    tx.chunks.extend(chunk_descriptors);
    tx.locations.extend(location_updates);

    store.commit(tx).await?;
    Ok(file_id)
}

/// Best-effort cleanup for an aborted upload (§4.5 step 6). No chunk
/// descriptor is ever committed for a failed file, so every blob already
/// written to an SN, for this chunk and any earlier ones, would otherwise
/// sit as an orphan no repair or GC path can reach.
async fn compensate_partial_writes(
    storage_client: &StorageClient,
    written: &[(ChunkId, std::net::SocketAddr)],
    deadline: Duration,
) {
    let deletes = written.iter().map(|(chunk_id, addr)| {
        let client = storage_client.clone();
        let chunk_id = *chunk_id;
        let addr = *addr;
        async move {
            if let Err(e) = client.delete_chunk(addr, chunk_id, deadline).await {
                warn!(storage_node = %addr, chunk = %chunk_id, error = %e, "compensating delete failed");
            }
        }
    });
    join_all(deletes).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata_store::in_memory_store;

    #[tokio::test]
    async fn write_with_no_active_storage_nodes_fails_with_no_capacity() {
        let self_id = MetadataNodeId::new("m1", 0);
        let store = in_memory_store();
        let registry = StorageRegistry::new();
        let client = StorageClient::new();

        let result = write_file(
            &self_id,
            &store,
            &registry,
            &client,
            UserId::new(),
            "a.txt",
            vec![],
            Bytes::from_static(b"hello"),
            4 * 1024 * 1024,
            1,
            16,
            Duration::from_secs(1),
        )
        .await;

        assert!(matches!(result, Err(RedCloudError::NoCapacity)));
    }

    #[tokio::test]
    async fn duplicate_name_is_rejected() {
        let self_id = MetadataNodeId::new("m1", 0);
        let store = in_memory_store();
        let owner = UserId::new();
        let existing = File::create(owner, "dup.txt", 1, [], &self_id);
        let mut tx = Transaction::new();
        tx.files.push(existing);
        store.commit(tx).await.unwrap();

        let registry = StorageRegistry::new();
        let client = StorageClient::new();
        let result = write_file(
            &self_id,
            &store,
            &registry,
            &client,
            owner,
            "dup.txt",
            vec![],
            Bytes::from_static(b"x"),
            4 * 1024 * 1024,
            1,
            16,
            Duration::from_secs(1),
        )
        .await;
        assert!(matches!(result, Err(RedCloudError::NameConflict { .. })));
    }
}
