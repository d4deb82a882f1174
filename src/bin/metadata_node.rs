//! Metadata-node binary entrypoint: bootstraps against the metadata-alias
//! DNS name, starts the replication background loops, and serves the
//! control surface and the demo client-facing surface on one listener.
use anyhow::{Context, Result};
use clap::Parser;
use redcloud_files::config::NodeConfig;
use redcloud_files::discovery::DnsAliasResolver;
use redcloud_files::ids::MetadataNodeId;
use redcloud_files::metadata_store::InMemoryMetadataStore;
use redcloud_files::MetadataNode;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::info;

#[derive(Parser)]
#[command(name = "redcloud-metadata-node", about = "RedCloud Files metadata node")]
struct Cli {
    #[command(flatten)]
    config: NodeConfig,

    /// Address to bind and advertise, e.g. 0.0.0.0:7000.
    #[arg(long, env = "REDCLOUD_BIND_ADDRESS", default_value = "0.0.0.0:7000")]
    bind_address: SocketAddr,
}

#[tokio::main]
async fn main() -> Result<()> {
    redcloud_files::init_logging();

    let cli = Cli::parse();
    let host_id = cli
        .config
        .own_node_id
        .clone()
        .unwrap_or_else(|| std::env::var("HOSTNAME").unwrap_or_else(|_| "localhost".to_string()));
    let id = MetadataNodeId::generate(host_id);

    let store = Arc::new(InMemoryMetadataStore::new());
    let resolver = Arc::new(DnsAliasResolver);

    let node = MetadataNode::new(id.clone(), cli.bind_address, cli.config, store, resolver);
    node.start().await;

    let control_router = redcloud_files::control_api::router(node.clone());
    let client_router = redcloud_files::client_api::router(node.clone());
    let app = control_router.merge(client_router);

    let listener = tokio::net::TcpListener::bind(cli.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", cli.bind_address))?;

    info!(node = %id, address = %cli.bind_address, "metadata node listening");

    tokio::select! {
        result = axum::serve(listener, app) => {
            result.context("metadata node server error")?;
        }
        _ = signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    node.stop();
    Ok(())
}
