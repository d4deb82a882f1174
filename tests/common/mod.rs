//! Shared harness for spinning up real metadata/storage nodes on
//! ephemeral loopback ports, used by the integration tests in this
//! directory.
use redcloud_files::chunk_store::InMemoryChunkStore;
use redcloud_files::config::NodeConfig;
use redcloud_files::discovery::StaticAliasResolver;
use redcloud_files::ids::{MetadataNodeId, StorageNodeId};
use redcloud_files::metadata_store::InMemoryMetadataStore;
use redcloud_files::{MetadataNode, StorageNode};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// Start a metadata node bound to an ephemeral port, with its background
/// loops ticking fast enough for tests to observe convergence quickly.
pub async fn spawn_metadata_node(host_id: &str, peers: Vec<SocketAddr>) -> (Arc<MetadataNode>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let config = NodeConfig {
        gossip_period_secs: 1,
        anti_entropy_period_secs: 1,
        repair_period_secs: 1,
        reconcile_period_secs: 1,
        ..NodeConfig::default()
    };

    let id = MetadataNodeId::new(host_id, 0);
    let store = Arc::new(InMemoryMetadataStore::new());
    let resolver = Arc::new(StaticAliasResolver::new(peers));
    let node = MetadataNode::new(id, addr, config, store, resolver);
    node.start().await;

    let app = redcloud_files::control_api::router(node.clone())
        .merge(redcloud_files::client_api::router(node.clone()));
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (node, addr)
}

/// Start a storage node bound to an ephemeral port, heartbeating against
/// `metadata_addrs` every 200ms.
pub async fn spawn_storage_node(metadata_addrs: Vec<SocketAddr>, capacity_bytes: u64) -> (Arc<StorageNode>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let id = StorageNodeId::new();
    let store = Arc::new(InMemoryChunkStore::new(capacity_bytes));
    let resolver = Arc::new(StaticAliasResolver::new(metadata_addrs));
    let node = StorageNode::new(id, addr, store, "metadata-service", Duration::from_millis(200), resolver);
    node.start();

    let app = redcloud_files::sn_api::router(node.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (node, addr)
}

/// Poll `mn`'s storage registry until at least `count` storage nodes are
/// active, or `timeout` elapses.
pub async fn wait_for_active_storage_nodes(mn: &Arc<MetadataNode>, count: usize, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if mn.storage_registry.active_set().len() >= count {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

/// Poll until `condition` returns true, or `timeout` elapses. Returns
/// whether it converged.
pub async fn wait_until<F: Fn() -> bool>(condition: F, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}
