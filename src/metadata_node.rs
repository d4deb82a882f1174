//! The Metadata Node orchestrator (§2 "Metadata Node (MN)").
//!
//! Wires the registries, stores, and background loops into one long-lived
//! node: an explicit construction graph handed collaborators as
//! parameters, one `tokio::spawn` per cooperative loop, and a shared
//! shutdown broadcast. There are no global singletons. A process can run
//! several nodes at once against independent stores.
use crate::config::NodeConfig;
use crate::control_client::ControlClient;
use crate::control_protocol::{
    FetchEntitiesResponse, GossipReceiveRequest, HeartbeatRequest, ListPeersResponse, OkResponse,
    PeerInfoDto, RegisterPeerRequest, StateSummaryResponse,
};
use crate::discovery::{AliasResolver, PeerRegistry};
use crate::error::RedCloudResult;
use crate::ids::{MetadataNodeId, UserId};
use crate::metadata_store::{MetadataStore, SharedMetadataStore, Transaction};
use crate::model::gossip_log::{EntityKind, OpKind};
use crate::model::{GossipEntry, MetadataNodeRecord};
use crate::placement::StorageRegistry;
use crate::replication::{anti_entropy, apply, gc, gossip, health, heartbeat, repair};
use crate::sn_client::StorageClient;
use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::interval;
use tracing::{info, warn};

/// A running metadata node. Construct with [`MetadataNode::new`], then
/// [`MetadataNode::start`] to spawn its background loops.
pub struct MetadataNode {
    pub id: MetadataNodeId,
    pub address: SocketAddr,
    pub config: NodeConfig,
    pub store: SharedMetadataStore,
    pub storage_registry: Arc<StorageRegistry>,
    pub peer_registry: Arc<PeerRegistry>,
    resolver: Arc<dyn AliasResolver>,
    control_client: ControlClient,
    storage_client: StorageClient,
    rotation: Arc<repair::SourceRotation>,
    shutdown_tx: broadcast::Sender<()>,
}

impl MetadataNode {
    pub fn new(
        id: MetadataNodeId,
        address: SocketAddr,
        config: NodeConfig,
        store: SharedMetadataStore,
        resolver: Arc<dyn AliasResolver>,
    ) -> Arc<Self> {
        let (shutdown_tx, _) = broadcast::channel(1);
        Arc::new(Self {
            id,
            address,
            config,
            store,
            storage_registry: Arc::new(StorageRegistry::new()),
            peer_registry: Arc::new(PeerRegistry::new()),
            resolver,
            control_client: ControlClient::new(),
            storage_client: StorageClient::new(),
            rotation: Arc::new(repair::SourceRotation::new()),
            shutdown_tx,
        })
    }

    /// Bootstrap against the metadata-service alias, then spawn every
    /// background loop (§4.3, §4.4, §4.6, §4.7, §4.10).
    pub async fn start(self: &Arc<Self>) {
        crate::discovery::bootstrap(
            self.resolver.as_ref(),
            &self.config.metadata_alias,
            &self.control_client,
            &self.peer_registry,
            &self.id,
            self.address,
        )
        .await;

        self.spawn_loop(self.config.gossip_period(), {
            let node = self.clone();
            move || {
                let node = node.clone();
                async move {
                    gossip::push_round(
                        &node.id,
                        &node.store,
                        &node.peer_registry,
                        &node.control_client,
                        node.config.fanout,
                        node.config.write_deadline(),
                    )
                    .await;
                }
            }
        });

        self.spawn_loop(self.config.anti_entropy_period(), {
            let node = self.clone();
            move || {
                let node = node.clone();
                async move {
                    if let Some(peer_addr) = anti_entropy::pick_peer(&node.peer_registry, &node.id) {
                        anti_entropy::exchange_once(
                            &node.id,
                            &node.store,
                            &node.control_client,
                            peer_addr,
                            node.config.read_deadline(),
                        )
                        .await;
                    }
                }
            }
        });

        self.spawn_loop(self.config.repair_period(), {
            let node = self.clone();
            move || {
                let node = node.clone();
                async move {
                    repair::repair_once(
                        &node.id,
                        &node.store,
                        &node.storage_registry,
                        &node.storage_client,
                        &node.rotation,
                        node.config.inflight_repairs,
                        node.config.write_deadline(),
                    )
                    .await;
                }
            }
        });

        self.spawn_loop(std::time::Duration::from_secs(10), {
            let node = self.clone();
            move || {
                let node = node.clone();
                async move {
                    health::sweep_once(
                        &node.id,
                        &node.store,
                        &node.storage_registry,
                        node.config.heartbeat_timeout_chrono(),
                    )
                    .await;
                }
            }
        });

        self.spawn_loop(self.config.reconcile_period(), {
            let node = self.clone();
            move || {
                let node = node.clone();
                async move {
                    crate::discovery::reconcile_once(
                        node.resolver.as_ref(),
                        &node.config.metadata_alias,
                        &node.control_client,
                        &node.peer_registry,
                        &node.id,
                        node.address,
                        node.config.peer_ttl(),
                    )
                    .await;
                }
            }
        });

        self.spawn_loop(node_gc_period(&self.config), {
            let node = self.clone();
            move || {
                let node = node.clone();
                async move {
                    gc::gc_once(&node.store, node.config.tombstone_retention()).await;
                }
            }
        });

        info!(node = %self.id, %self.address, "metadata node started");
    }

    fn spawn_loop<F, Fut>(&self, period: std::time::Duration, mut make_tick: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send,
    {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        tokio::spawn(async move {
            let mut ticker = interval(period);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        make_tick().await;
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }
        });
    }

    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(());
    }

    // -- control-surface handlers (§6), called by axum routes in control_api --

    pub fn list_peers(&self) -> ListPeersResponse {
        ListPeersResponse {
            self_info: PeerInfoDto {
                id: self.id.clone(),
                address: self.address,
            },
            peers: self
                .peer_registry
                .snapshot(&self.id)
                .into_iter()
                .map(|p| PeerInfoDto {
                    id: p.id,
                    address: p.address,
                })
                .collect(),
        }
    }

    pub async fn register_peer(&self, request: RegisterPeerRequest) -> RedCloudResult<ListPeersResponse> {
        let is_new = self
            .peer_registry
            .upsert(MetadataNodeRecord::new(request.id.clone(), request.address));

        if is_new {
            let mut tx = Transaction::new();
            tx.gossip_entries.push(GossipEntry::new(
                self.store.next_sequence(),
                EntityKind::MetadataNode,
                request.id.to_string(),
                OpKind::PeerRegister,
                serde_json::to_value(MetadataNodeRecord::new(request.id.clone(), request.address))?,
                crate::vector_clock::VectorClock::new().increment(&self.id),
            ));
            self.store.commit(tx).await?;
        }

        Ok(self.list_peers())
    }

    pub async fn gossip_receive(&self, request: GossipReceiveRequest) -> RedCloudResult<OkResponse> {
        for entry in &request.entries {
            if let Err(e) = apply::apply_entry(self.store.as_ref(), &self.id, entry).await {
                warn!(sender = %request.sender_id, error = %e, "failed to apply gossip entry");
            }
        }
        self.peer_registry.touch(&request.sender_id);
        Ok(OkResponse::ok())
    }

    pub async fn state_summary(&self) -> StateSummaryResponse {
        anti_entropy::build_state_summary(&self.store).await
    }

    pub async fn fetch_entities(
        &self,
        kind: EntityKind,
        ids: &[String],
    ) -> RedCloudResult<FetchEntitiesResponse> {
        let mut payloads = Vec::new();
        match kind {
            EntityKind::User => {
                for user in self.store.all_users().await {
                    if ids.contains(&user.id.to_string()) {
                        payloads.push(serde_json::to_value(&user)?);
                    }
                }
            }
            EntityKind::File => {
                for file in self.store.all_files().await {
                    if ids.contains(&file.id.to_string()) {
                        payloads.push(serde_json::to_value(&file)?);
                    }
                }
            }
            EntityKind::Chunk => {
                for chunk in self.store.all_chunks().await {
                    if ids.contains(&chunk.id.to_string()) {
                        payloads.push(serde_json::to_value(&chunk)?);
                    }
                }
            }
            _ => {}
        }
        Ok(FetchEntitiesResponse { payloads })
    }

    pub async fn heartbeat(&self, request: HeartbeatRequest) -> RedCloudResult<OkResponse> {
        heartbeat::receive_heartbeat(&self.id, &self.store, &self.storage_registry, request).await?;
        Ok(OkResponse::ok())
    }

    // -- client-facing demo surface (§6.2 of SPEC_FULL.md) --

    pub async fn upload(
        &self,
        owner: UserId,
        name: String,
        tags: Vec<String>,
        bytes: Bytes,
    ) -> RedCloudResult<crate::ids::FileId> {
        crate::write_path::write_file(
            &self.id,
            &self.store,
            &self.storage_registry,
            &self.storage_client,
            owner,
            name,
            tags,
            bytes,
            self.config.chunk_size_bytes,
            self.config.min_write_acks,
            self.config.inflight_writes_per_sn,
            self.config.write_deadline(),
        )
        .await
    }

    pub async fn download(&self, owner: &UserId, name: &str) -> RedCloudResult<Bytes> {
        crate::read_path::read_file(
            &self.store,
            &self.storage_registry,
            &self.storage_client,
            owner,
            name,
            self.config.read_deadline(),
        )
        .await
    }

    pub async fn delete(&self, owner: &UserId, name: &str) -> RedCloudResult<()> {
        crate::delete_path::delete_file(
            &self.id,
            &self.store,
            &self.storage_registry,
            &self.storage_client,
            owner,
            name,
            self.config.write_deadline(),
        )
        .await
    }

    pub async fn list_by_tag(&self, owner: &UserId, tag: Option<&str>) -> Vec<crate::model::File> {
        self.store.list_files(owner, tag).await
    }
}

fn node_gc_period(config: &NodeConfig) -> std::time::Duration {
    (config.tombstone_retention() / 4)
        .to_std()
        .unwrap_or(std::time::Duration::from_secs(60))
}
