//! Shared gossip/anti-entropy receive-side apply path (§4.3 "Receive
//! side", shared by push-gossip receipt and anti-entropy delta pull).
use crate::conflict::{resolve_chunk, resolve_file, resolve_user};
use crate::control_protocol::GossipEntryDto;
use crate::error::RedCloudResult;
use crate::ids::{ChunkId, MetadataNodeId};
use crate::metadata_store::{MetadataStore, Transaction};
use crate::model::gossip_log::EntityKind;
use crate::model::{Chunk, File, GossipEntry, LocationSet, MetadataNodeRecord, StorageNodeRecord, User};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tracing::warn;

/// Deserialize payload, warning and skipping on a malformed entry rather
/// than poisoning the apply loop for every other entry in the batch.
fn parse<T: DeserializeOwned>(payload: &JsonValue, what: &str) -> Option<T> {
    match serde_json::from_value(payload.clone()) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(what, error = %e, "dropping gossip entry with malformed payload");
            None
        }
    }
}

/// Apply one incoming update. Returns `true` if local state actually
/// changed (i.e. this node should re-propagate the entry via its own
/// gossip log); re-applying an entry this node already reflects is a
/// no-op (R2).
pub async fn apply_entry(
    store: &dyn MetadataStore,
    self_id: &MetadataNodeId,
    entry: &GossipEntryDto,
) -> RedCloudResult<bool> {
    match entry.entity_kind {
        EntityKind::User => apply_user(store, self_id, entry).await,
        EntityKind::File => apply_file(store, self_id, entry).await,
        EntityKind::Chunk => apply_chunk(store, self_id, entry).await,
        EntityKind::ChunkLocation => apply_chunk_location(store, entry).await,
        EntityKind::StorageNode => apply_storage_node(store, entry).await,
        EntityKind::MetadataNode => apply_metadata_node(store, self_id, entry).await,
    }
}

async fn apply_user(
    store: &dyn MetadataStore,
    self_id: &MetadataNodeId,
    entry: &GossipEntryDto,
) -> RedCloudResult<bool> {
    let Some(remote) = parse::<User>(&entry.payload, "user") else {
        return Ok(false);
    };
    let resolved = match store.get_user(&remote.id).await {
        Some(local) if local.revision == remote.revision => return Ok(false),
        Some(local) => resolve_user(&local, &remote),
        None => remote,
    };

    let mut tx = Transaction::new();
    tx.gossip_entries.push(GossipEntry::new(
        store.next_sequence(),
        EntityKind::User,
        resolved.id.to_string(),
        entry.op,
        serde_json::to_value(&resolved)?,
        resolved.revision.vector_clock.clone(),
    ));
    tx.users.push(resolved);
    store.commit(tx).await?;
    let _ = self_id;
    Ok(true)
}

async fn apply_file(
    store: &dyn MetadataStore,
    self_id: &MetadataNodeId,
    entry: &GossipEntryDto,
) -> RedCloudResult<bool> {
    let Some(remote) = parse::<File>(&entry.payload, "file") else {
        return Ok(false);
    };
    let resolved = match store.get_file(&remote.id).await {
        Some(local) if local.revision == remote.revision => return Ok(false),
        Some(local) => resolve_file(&local, &remote),
        None => remote,
    };

    let mut tx = Transaction::new();
    tx.gossip_entries.push(GossipEntry::new(
        store.next_sequence(),
        EntityKind::File,
        resolved.id.to_string(),
        entry.op,
        serde_json::to_value(&resolved)?,
        resolved.revision.vector_clock.clone(),
    ));
    tx.files.push(resolved);
    store.commit(tx).await?;
    let _ = self_id;
    Ok(true)
}

async fn apply_chunk(
    store: &dyn MetadataStore,
    self_id: &MetadataNodeId,
    entry: &GossipEntryDto,
) -> RedCloudResult<bool> {
    let Some(remote) = parse::<Chunk>(&entry.payload, "chunk") else {
        return Ok(false);
    };
    let resolved = match store.get_chunk(&remote.id).await {
        Some(local) if local.revision == remote.revision => return Ok(false),
        Some(local) => resolve_chunk(&local, &remote),
        None => remote,
    };

    let mut tx = Transaction::new();
    tx.gossip_entries.push(GossipEntry::new(
        store.next_sequence(),
        EntityKind::Chunk,
        resolved.id.to_string(),
        entry.op,
        serde_json::to_value(&resolved)?,
        resolved.revision.vector_clock.clone(),
    ));
    tx.chunks.push(resolved);
    store.commit(tx).await?;
    let _ = self_id;
    Ok(true)
}

/// Wire payload for a chunk-location gossip entry: the chunk id plus its
/// full location set at the time of emission (union-merged on apply, so
/// shipping the full set rather than a delta is always safe).
#[derive(serde::Serialize, serde::Deserialize)]
struct ChunkLocationPayload {
    chunk_id: ChunkId,
    locations: LocationSet,
}

async fn apply_chunk_location(
    store: &dyn MetadataStore,
    entry: &GossipEntryDto,
) -> RedCloudResult<bool> {
    let Some(remote) = parse::<ChunkLocationPayload>(&entry.payload, "chunk-location") else {
        return Ok(false);
    };
    let local = store.locations_of(&remote.chunk_id).await;
    let merged = local.merge(&remote.locations);
    if merged == local {
        return Ok(false);
    }

    let mut tx = Transaction::new();
    tx.gossip_entries.push(GossipEntry::new(
        store.next_sequence(),
        EntityKind::ChunkLocation,
        remote.chunk_id.to_string(),
        entry.op,
        serde_json::to_value(&ChunkLocationPayload {
            chunk_id: remote.chunk_id,
            locations: merged.clone(),
        })?,
        entry.vector_clock.clone(),
    ));
    tx.locations.push((remote.chunk_id, merged));
    store.commit(tx).await?;
    Ok(true)
}

async fn apply_storage_node(
    store: &dyn MetadataStore,
    entry: &GossipEntryDto,
) -> RedCloudResult<bool> {
    let Some(remote) = parse::<StorageNodeRecord>(&entry.payload, "storage-node") else {
        return Ok(false);
    };
    if let Some(local) = store.get_storage_node(&remote.id).await {
        if local.last_heartbeat >= remote.last_heartbeat {
            return Ok(false);
        }
    }

    let mut tx = Transaction::new();
    tx.gossip_entries.push(GossipEntry::new(
        store.next_sequence(),
        EntityKind::StorageNode,
        remote.id.to_string(),
        entry.op,
        serde_json::to_value(&remote)?,
        entry.vector_clock.clone(),
    ));
    tx.storage_nodes.push(remote);
    store.commit(tx).await?;
    Ok(true)
}

async fn apply_metadata_node(
    store: &dyn MetadataStore,
    self_id: &MetadataNodeId,
    entry: &GossipEntryDto,
) -> RedCloudResult<bool> {
    let Some(remote) = parse::<MetadataNodeRecord>(&entry.payload, "metadata-node") else {
        return Ok(false);
    };
    if remote.id == *self_id {
        return Ok(false);
    }
    if let Some(local) = store
        .metadata_nodes()
        .await
        .into_iter()
        .find(|r| r.id == remote.id)
    {
        if local.last_seen >= remote.last_seen {
            return Ok(false);
        }
    }

    let mut tx = Transaction::new();
    tx.gossip_entries.push(GossipEntry::new(
        store.next_sequence(),
        EntityKind::MetadataNode,
        remote.id.to_string(),
        entry.op,
        serde_json::to_value(&remote)?,
        entry.vector_clock.clone(),
    ));
    tx.metadata_nodes.push(remote);
    store.commit(tx).await?;
    Ok(true)
}
