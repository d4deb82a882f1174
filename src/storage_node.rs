//! The Storage Node (SN) orchestrator (§2 "Storage Node (SN)", §4.8).
use crate::chunk_store::SharedChunkStore;
use crate::control_client::ControlClient;
use crate::control_protocol::HeartbeatRequest;
use crate::discovery::AliasResolver;
use crate::error::{RedCloudError, RedCloudResult};
use crate::ids::{ChunkId, StorageNodeId};
use crate::sn_client::StorageClient;
use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::interval;
use tracing::{info, warn};

/// A running storage node. Construct with [`StorageNode::new`], then
/// [`StorageNode::start`] to spawn its heartbeat loop.
pub struct StorageNode {
    pub id: StorageNodeId,
    pub address: SocketAddr,
    pub store: SharedChunkStore,
    metadata_alias: String,
    heartbeat_period: Duration,
    heartbeat_deadline: Duration,
    resolver: Arc<dyn AliasResolver>,
    control_client: ControlClient,
    storage_client: StorageClient,
    shutdown_tx: broadcast::Sender<()>,
}

impl StorageNode {
    pub fn new(
        id: StorageNodeId,
        address: SocketAddr,
        store: SharedChunkStore,
        metadata_alias: impl Into<String>,
        heartbeat_period: Duration,
        resolver: Arc<dyn AliasResolver>,
    ) -> Arc<Self> {
        let (shutdown_tx, _) = broadcast::channel(1);
        Arc::new(Self {
            id,
            address,
            store,
            metadata_alias: metadata_alias.into(),
            heartbeat_period,
            heartbeat_deadline: Duration::from_secs(5),
            resolver,
            control_client: ControlClient::new(),
            storage_client: StorageClient::new(),
            shutdown_tx,
        })
    }

    /// Spawn the periodic heartbeat-send loop (§4.8): every `T_hb`, resolve
    /// the metadata-service alias and POST our (id, address, capacity,
    /// used) to every address currently behind it.
    pub fn start(self: &Arc<Self>) {
        let node = self.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        tokio::spawn(async move {
            let mut ticker = interval(node.heartbeat_period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => node.send_heartbeats().await,
                    _ = shutdown_rx.recv() => break,
                }
            }
        });
        info!(node = %self.id, %self.address, "storage node started");
    }

    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(());
    }

    async fn send_heartbeats(&self) {
        let addrs = match self.resolver.resolve(&self.metadata_alias).await {
            Ok(addrs) => addrs,
            Err(e) => {
                warn!(alias = %self.metadata_alias, error = %e, "failed to resolve metadata alias for heartbeat");
                return;
            }
        };
        let request = HeartbeatRequest {
            node_id: self.id,
            address: self.address,
            capacity_bytes: self.store.capacity_bytes(),
            used_bytes: self.store.used_bytes().await,
        };
        for addr in addrs {
            if let Err(e) = self
                .control_client
                .heartbeat(addr, request.clone(), self.heartbeat_deadline)
                .await
            {
                warn!(%addr, error = %e, "heartbeat delivery failed");
            }
        }
    }

    // -- data-surface handlers (§6.1), called by axum routes in sn_api --

    pub async fn write_chunk(
        &self,
        chunk_id: ChunkId,
        file_id: crate::ids::FileId,
        ordinal: u32,
        checksum: &str,
        bytes: Bytes,
    ) -> RedCloudResult<()> {
        self.store.write(chunk_id, file_id, ordinal, checksum, bytes).await
    }

    pub async fn read_chunk(&self, chunk_id: &ChunkId) -> Option<Bytes> {
        self.store.read(chunk_id).await
    }

    pub async fn delete_chunk(&self, chunk_id: &ChunkId) -> bool {
        self.store.delete(chunk_id).await
    }

    pub async fn list_chunks(&self) -> Vec<crate::chunk_store::ChunkListing> {
        self.store.list().await
    }

    /// Pull a chunk's bytes from `source_addr` and store it locally
    /// (§4.6 repair: the target SN pulls, rather than the source pushing).
    pub async fn replicate_from(&self, chunk_id: ChunkId, source_addr: SocketAddr) -> RedCloudResult<()> {
        let bytes = self
            .storage_client
            .read_chunk(source_addr, chunk_id, Duration::from_secs(60))
            .await?;
        let checksum = crate::chunking::checksum_of(&bytes);

        let listing = self
            .storage_client
            .list_chunks(source_addr, Duration::from_secs(60))
            .await?
            .into_iter()
            .find(|c| c.chunk_id == chunk_id)
            .ok_or_else(|| RedCloudError::NotFound(chunk_id.to_string()))?;

        self.store
            .write(chunk_id, listing.file_id, listing.ordinal, &checksum, bytes)
            .await
    }
}
