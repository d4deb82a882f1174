//! The repair loop (§4.6 "Repair (Anti-Entropy for Data)").
use crate::ids::{ChunkId, MetadataNodeId, StorageNodeId};
use crate::metadata_store::{MetadataStore, SharedMetadataStore, Transaction};
use crate::model::gossip_log::{EntityKind, OpKind};
use crate::model::{Chunk, GossipEntry};
use crate::placement::StorageRegistry;
use crate::sn_client::StorageClient;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{info, warn};

/// One (chunk, target-SN) repair job.
struct RepairJob {
    chunk: Chunk,
    target: StorageNodeId,
    target_addr: std::net::SocketAddr,
    source_addr: std::net::SocketAddr,
}

/// Round-robin counter for source selection, spreading replication load
/// across a chunk's holders rather than always reading from the first one
/// (§4.6 step 3: "round-robin across chunks to spread source load").
#[derive(Default)]
pub struct SourceRotation {
    counter: AtomicUsize,
}

impl SourceRotation {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        self.counter.fetch_add(1, Ordering::Relaxed) % len
    }
}

/// Run one repair pass (§4.6 steps 1–6): enumerate chunks, compute the
/// missing-replica set against the active-SN registry, and ask each
/// target to pull from a healthy source. Repair is idempotent: concurrent
/// MNs racing to repair the same chunk is safe (SN writes are idempotent
/// by chunk-id, location facts are set-valued).
pub async fn repair_once(
    self_id: &MetadataNodeId,
    store: &SharedMetadataStore,
    storage_registry: &StorageRegistry,
    storage_client: &StorageClient,
    rotation: &SourceRotation,
    max_concurrent: usize,
    deadline: Duration,
) {
    let active = storage_registry.active_set();
    if active.is_empty() {
        return;
    }

    let mut jobs = Vec::new();
    for chunk in store.all_chunks().await {
        let locations = store.locations_of(&chunk.id).await;
        let holders = locations.holders().clone();
        let missing: Vec<StorageNodeId> = active.difference(&holders).cloned().collect();
        if missing.is_empty() {
            continue;
        }
        let sources: Vec<StorageNodeId> = holders
            .iter()
            .filter(|id| active.contains(id))
            .cloned()
            .collect();
        if sources.is_empty() {
            continue;
        }
        let source = sources[rotation.next(sources.len())];
        let Some(source_record) = storage_registry.get(&source) else {
            continue;
        };
        for target in missing {
            let Some(target_record) = storage_registry.get(&target) else {
                continue;
            };
            jobs.push(RepairJob {
                chunk: chunk.clone(),
                target,
                target_addr: target_record.address,
                source_addr: source_record.address,
            });
        }
    }

    if jobs.is_empty() {
        return;
    }

    let semaphore = Arc::new(Semaphore::new(max_concurrent));
    let mut handles = Vec::with_capacity(jobs.len());
    for job in jobs {
        let permit = semaphore.clone().acquire_owned().await.unwrap();
        let client = storage_client.clone();
        let store = store.clone();
        let self_id = self_id.clone();
        handles.push(tokio::spawn(async move {
            let _permit = permit;
            run_one(&self_id, &store, &client, job, deadline).await;
        }));
    }
    for handle in handles {
        let _ = handle.await;
    }
}

async fn run_one(
    self_id: &MetadataNodeId,
    store: &SharedMetadataStore,
    client: &StorageClient,
    job: RepairJob,
    deadline: Duration,
) {
    let result = client
        .replicate_chunk(job.target_addr, job.chunk.id, job.source_addr, deadline)
        .await;

    match result {
        Ok(()) => {
            if let Err(e) = record_new_location(self_id, store, job.chunk.id, job.target).await {
                warn!(chunk = %job.chunk.id, error = %e, "failed to record repaired location fact");
            } else {
                info!(chunk = %job.chunk.id, target = %job.target, "repaired chunk replica");
            }
        }
        Err(e) => {
            warn!(chunk = %job.chunk.id, target = %job.target, error = %e, "repair replication failed, deferring to next cycle");
        }
    }
}

async fn record_new_location(
    self_id: &MetadataNodeId,
    store: &SharedMetadataStore,
    chunk_id: ChunkId,
    target: StorageNodeId,
) -> crate::error::RedCloudResult<()> {
    let mut locations = store.locations_of(&chunk_id).await;
    locations.insert(target);

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
    store.commit(tx).await
}
