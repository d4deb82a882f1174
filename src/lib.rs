//! # RedCloud Files
//!
//! A tag-based, AP-distributed file store. Files are owned by users,
//! tagged rather than hierarchically pathed, and chunked into
//! content-addressed, fixed-size pieces that are spread across a pool of
//! storage nodes. Metadata (users, files, chunk location facts) is
//! replicated across a small cluster of metadata nodes by gossip and
//! anti-entropy, converging under the usual AP tradeoffs: every node
//! accepts writes during a partition, and conflicting concurrent edits
//! are resolved deterministically rather than rejected.
//!
//! ## Cluster roles
//!
//! - **Metadata Node (MN)** ([`metadata_node`]): owns the replicated
//!   metadata store, gossips and anti-entropies with its peers, tracks
//!   storage-node liveness, and drives chunk placement and repair.
//! - **Storage Node (SN)** ([`storage_node`]): holds chunk bytes,
//!   heartbeats its capacity to the metadata service, and serves reads,
//!   writes, and replication pulls.
//!
//! Both roles are plain `Arc<Self>` structs built from injected
//! collaborators (a [`metadata_store::MetadataStore`], a
//! [`chunk_store::ChunkStore`], a [`discovery::AliasResolver`]). There
//! is no global state, so a test can spin up several nodes in one
//! process against in-memory stores.
//!
//! ## Data model and replication
//!
//! [`model`] defines the replicated entities (`User`, `File`, `Chunk`,
//! location facts) and [`vector_clock`] the causal versioning that
//! orders their revisions. [`conflict`] resolves concurrent edits the
//! entities can't avoid: last-write-wins for scalar fields, set-union
//! merges (with tombstones) for tags and chunk locations. [`replication`]
//! hosts the background loops that keep the cluster converging: gossip
//! push, anti-entropy pull, storage-node health sweeps, chunk repair,
//! and tombstone garbage collection.
//!
//! ## Wire surfaces
//!
//! [`control_api`]/[`control_client`] carry the MN-to-MN control plane
//! (gossip, anti-entropy, peer registration) and the SN-to-MN heartbeat.
//! [`sn_api`]/[`sn_client`] carry the MN-to-SN data plane (chunk read,
//! write, delete, replication pull). [`client_api`] is a thin,
//! unauthenticated demo surface for upload/download/delete/list, so the
//! whole control plane is exercisable end to end without a real client.
//!
//! ## Quick start
//!
//! ```ignore
//! use redcloud_files::metadata_node::MetadataNode;
//! use redcloud_files::metadata_store::InMemoryMetadataStore;
//! use redcloud_files::discovery::StaticAliasResolver;
//! use redcloud_files::ids::MetadataNodeId;
//! use redcloud_files::config::NodeConfig;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     redcloud_files::init_logging();
//!
//!     let id = MetadataNodeId::generate("node-a");
//!     let address = "127.0.0.1:7000".parse().unwrap();
//!     let store = Arc::new(InMemoryMetadataStore::new());
//!     let resolver = Arc::new(StaticAliasResolver::new(vec![]));
//!     let node = MetadataNode::new(id, address, NodeConfig::default(), store, resolver);
//!     node.start().await;
//! }
//! ```

pub mod ids;
pub mod error;
pub mod vector_clock;
pub mod model;
pub mod conflict;
pub mod config;
pub mod metadata_store;
pub mod chunk_store;
pub mod chunking;
pub mod discovery;
pub mod placement;
pub mod control_protocol;
pub mod control_client;
pub mod sn_protocol;
pub mod sn_client;
pub mod write_path;
pub mod read_path;
pub mod delete_path;
pub mod replication;
pub mod metadata_node;
pub mod storage_node;
pub mod control_api;
pub mod sn_api;
pub mod client_api;

pub use config::NodeConfig;
pub use error::{RedCloudError, RedCloudResult};
pub use ids::{ChunkId, FileId, MetadataNodeId, StorageNodeId, UserId};
pub use metadata_node::MetadataNode;
pub use storage_node::StorageNode;
pub use vector_clock::{ClockOrdering, VectorClock};

/// Prelude module for convenient imports.
///
/// ```ignore
/// use redcloud_files::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::NodeConfig;
    pub use crate::error::{RedCloudError, RedCloudResult};
    pub use crate::ids::{ChunkId, FileId, MetadataNodeId, StorageNodeId, UserId};
    pub use crate::metadata_node::MetadataNode;
    pub use crate::model::{Chunk, File, User};
    pub use crate::storage_node::StorageNode;
    pub use crate::vector_clock::{ClockOrdering, VectorClock};
}

/// Initialize the tracing subscriber with an environment filter.
///
/// Call once at process startup. The log level is controlled by the
/// `RUST_LOG` environment variable (`RUST_LOG=redcloud_files=debug`),
/// falling back to `info` when unset.
pub fn init_logging() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
