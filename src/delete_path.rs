//! The file delete path (§4.5 "Delete path").
use crate::error::{RedCloudError, RedCloudResult};
use crate::ids::{MetadataNodeId, UserId};
use crate::metadata_store::{MetadataStore, SharedMetadataStore, Transaction};
use crate::model::gossip_log::{EntityKind, OpKind};
use crate::model::GossipEntry;
use crate::placement::StorageRegistry;
use crate::sn_client::StorageClient;
use std::time::Duration;
use tracing::warn;

/// Soft-delete a file and enqueue delete requests to every SN holding any
/// of its chunks (§4.5 "Delete path"). SN acknowledgements remove that SN
/// from each chunk's location-fact set; when a chunk's set empties it
/// becomes eligible for GC (§4.10).
pub async fn delete_file(
    self_id: &MetadataNodeId,
    store: &SharedMetadataStore,
    storage_registry: &StorageRegistry,
    storage_client: &StorageClient,
    owner: &UserId,
    name: &str,
    deadline: Duration,
) -> RedCloudResult<()> {
    let file = store
        .get_file_by_name(owner, name)
        .await
        .ok_or_else(|| RedCloudError::NotFound(name.to_string()))?;

    let tombstoned = file.soft_delete(self_id);
    let mut tx = Transaction::new();
    tx.gossip_entries.push(GossipEntry::new(
        store.next_sequence(),
        EntityKind::File,
        tombstoned.id.to_string(),
        OpKind::SoftDelete,
        serde_json::to_value(&tombstoned)?,
        tombstoned.revision.vector_clock.clone(),
    ));
    let file_id = tombstoned.id;
    tx.files.push(tombstoned);
    store.commit(tx).await?;

    for chunk in store.chunks_of_file(&file_id).await {
        let locations = store.locations_of(&chunk.id).await;
        for holder in locations.holders().clone() {
            let Some(record) = storage_registry.get(&holder) else {
                continue;
            };
            match storage_client
                .delete_chunk(record.address, chunk.id, deadline)
                .await
            {
                Ok(_) => {
                    acknowledge_deletion(self_id, store, chunk.id, holder).await;
                }
                Err(e) => {
                    warn!(storage_node = %holder, chunk = %chunk.id, error = %e, "delete request failed, will not retry inline");
                }
            }
        }
    }

    Ok(())
}

async fn acknowledge_deletion(
    self_id: &MetadataNodeId,
    store: &SharedMetadataStore,
    chunk_id: crate::ids::ChunkId,
    holder: crate::ids::StorageNodeId,
) {
    let mut locations = store.locations_of(&chunk_id).await;
    locations.remove(&holder);

    let mut tx = Transaction::new();
    tx.gossip_entries.push(GossipEntry::new(
        store.next_sequence(),
        EntityKind::ChunkLocation,
        chunk_id.to_string(),
        OpKind::Update,
        serde_json::json!({ "chunk_id": chunk_id, "locations": locations }),
        crate::vector_clock::VectorClock::new().increment(self_id),
    ));
    tx.locations.push((chunk_id, locations));
    if let Err(e) = store.commit(tx).await {
        warn!(chunk = %chunk_id, error = %e, "failed to record deletion acknowledgement");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata_store::in_memory_store;

    #[tokio::test]
    async fn deleting_unknown_file_is_not_found() {
        let self_id = MetadataNodeId::new("m1", 0);
        let store = in_memory_store();
        let registry = StorageRegistry::new();
        let client = StorageClient::new();

        let result = delete_file(
            &self_id,
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
    async fn deleting_a_file_with_no_chunks_soft_deletes_it() {
        let self_id = MetadataNodeId::new("m1", 0);
        let store = in_memory_store();
        let owner = UserId::new();
        let file = crate::model::File::create(owner, "a.txt", 0, [], &self_id);
        let mut tx = Transaction::new();
        tx.files.push(file.clone());
        store.commit(tx).await.unwrap();

        let registry = StorageRegistry::new();
        let client = StorageClient::new();
        delete_file(&self_id, &store, &registry, &client, &owner, "a.txt", Duration::from_secs(1))
            .await
            .unwrap();

        assert!(store.get_file_by_name(&owner, "a.txt").await.is_none());
        let stored = store.get_file(&file.id).await.unwrap();
        assert!(stored.deleted);
    }
}
