//! Storage-node binary entrypoint: heartbeats capacity to the metadata
//! service alias and serves the chunk data surface.
use anyhow::{Context, Result};
use clap::Parser;
use redcloud_files::chunk_store::InMemoryChunkStore;
use redcloud_files::discovery::DnsAliasResolver;
use redcloud_files::ids::StorageNodeId;
use redcloud_files::StorageNode;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::info;

#[derive(Parser)]
#[command(name = "redcloud-storage-node", about = "RedCloud Files storage node")]
struct Cli {
    /// Address to bind and advertise, e.g. 0.0.0.0:8000.
    #[arg(long, env = "REDCLOUD_BIND_ADDRESS", default_value = "0.0.0.0:8000")]
    bind_address: SocketAddr,

    /// DNS alias of the metadata service to heartbeat against.
    #[arg(long, env = "REDCLOUD_METADATA_ALIAS", default_value = "metadata-service")]
    metadata_alias: String,

    /// Heartbeat send period, in seconds (§4.8, default 10s).
    #[arg(long, env = "REDCLOUD_HEARTBEAT_PERIOD_SECS", default_value_t = 10)]
    heartbeat_period_secs: u64,

    /// Advertised storage capacity, in bytes (default 100 GiB).
    #[arg(long, env = "REDCLOUD_CAPACITY_BYTES", default_value_t = 100 * 1024 * 1024 * 1024)]
    capacity_bytes: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    redcloud_files::init_logging();

    let cli = Cli::parse();
    let id = StorageNodeId::new();
    let store = Arc::new(InMemoryChunkStore::new(cli.capacity_bytes));
    let resolver = Arc::new(DnsAliasResolver);

    let node = StorageNode::new(
        id,
        cli.bind_address,
        store,
        cli.metadata_alias,
        std::time::Duration::from_secs(cli.heartbeat_period_secs),
        resolver,
    );
    node.start();

    let app = redcloud_files::sn_api::router(node.clone());

    let listener = tokio::net::TcpListener::bind(cli.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", cli.bind_address))?;

    info!(node = %id, address = %cli.bind_address, "storage node listening");

    tokio::select! {
        result = axum::serve(listener, app) => {
            result.context("storage node server error")?;
        }
        _ = signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    node.stop();
    Ok(())
}
