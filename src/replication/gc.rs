//! Tombstone garbage collection (§4.10 of SPEC_FULL.md, O2).
use crate::metadata_store::{MetadataStore, SharedMetadataStore};
use tracing::info;

/// Scan tombstoned files whose chunks have been acknowledged deleted by
/// every storage node that ever held them, and reclaim the chunk
/// descriptors and any residual location facts (I5).
///
/// A file is only a GC candidate once its soft-delete stamp is older than
/// `retention`; the default retention window is the node's own process
/// lifetime, so this mostly matters for operators who shorten it (O2).
pub async fn gc_once(store: &SharedMetadataStore, retention: chrono::Duration) {
    let now = chrono::Utc::now();
    for file in store.all_files().await {
        if !file.deleted {
            continue;
        }
        let Some(deleted_at) = file.deleted_at else {
            continue;
        };
        if now - deleted_at < retention {
            continue;
        }

        for chunk in store.chunks_of_file(&file.id).await {
            let locations = store.locations_of(&chunk.id).await;
            if !locations.is_empty() {
                continue;
            }
            store.gc_chunk(&chunk.id).await;
            info!(chunk = %chunk.id, file = %file.id, "garbage-collected tombstoned chunk");
        }
    }
}
