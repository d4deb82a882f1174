//! Node configuration (§6 "Configuration", §5.2 of SPEC_FULL.md).
//!
//! All configuration is optional; nodes self-configure from the defaults
//! below. Both binaries layer CLI flags and environment variables over
//! this struct via `clap`'s `env` attribute.
use clap::Args;
use std::time::Duration;

/// Configuration shared by metadata nodes and storage nodes.
#[derive(Debug, Clone, Args)]
pub struct NodeConfig {
    /// This node's identity (host portion of the metadata-node id, or the
    /// storage-node id). Defaults to the local hostname.
    #[arg(long, env = "REDCLOUD_NODE_ID")]
    pub own_node_id: Option<String>,

    /// Address this node advertises to peers.
    #[arg(long, env = "REDCLOUD_ADVERTISE_ADDRESS")]
    pub own_advertise_address: Option<String>,

    /// DNS alias used to bootstrap the metadata-node registry.
    #[arg(long, env = "REDCLOUD_METADATA_ALIAS", default_value = "metadata-service")]
    pub metadata_alias: String,

    /// DNS alias used to bootstrap the storage-node registry.
    #[arg(long, env = "REDCLOUD_STORAGE_ALIAS", default_value = "storage-service")]
    pub storage_alias: String,

    /// Gossip push-loop period (§4.3, default 5s).
    #[arg(long, env = "REDCLOUD_GOSSIP_PERIOD_SECS", default_value_t = 5)]
    pub gossip_period_secs: u64,

    /// Anti-entropy loop period (§4.3, default 30s).
    #[arg(long, env = "REDCLOUD_ANTI_ENTROPY_PERIOD_SECS", default_value_t = 30)]
    pub anti_entropy_period_secs: u64,

    /// Repair loop period (§4.6, default 60s).
    #[arg(long, env = "REDCLOUD_REPAIR_PERIOD_SECS", default_value_t = 60)]
    pub repair_period_secs: u64,

    /// Storage-node heartbeat send period (§4.8, default 10s).
    #[arg(long, env = "REDCLOUD_HEARTBEAT_PERIOD_SECS", default_value_t = 10)]
    pub heartbeat_period_secs: u64,

    /// Storage-node heartbeat timeout before "failed" (§4.7, default 30s).
    #[arg(long, env = "REDCLOUD_HEARTBEAT_TIMEOUT_SECS", default_value_t = 30)]
    pub heartbeat_timeout_secs: u64,

    /// Gossip fanout: peers contacted per push round (§4.3, default 2).
    #[arg(long, env = "REDCLOUD_FANOUT", default_value_t = 2)]
    pub fanout: usize,

    /// Minimum successful chunk-write acknowledgements to commit (§4.5,
    /// default 1, see DESIGN.md O3).
    #[arg(long, env = "REDCLOUD_MIN_WRITE_ACKS", default_value_t = 1)]
    pub min_write_acks: usize,

    /// Deadline for a chunk write, in seconds (§5, default 60s).
    #[arg(long, env = "REDCLOUD_WRITE_DEADLINE_SECS", default_value_t = 60)]
    pub write_deadline_secs: u64,

    /// Deadline for a chunk read, in seconds (§5, default 60s).
    #[arg(long, env = "REDCLOUD_READ_DEADLINE_SECS", default_value_t = 60)]
    pub read_deadline_secs: u64,

    /// Max concurrent in-flight chunk writes per storage node (§5,
    /// default 16).
    #[arg(long, env = "REDCLOUD_INFLIGHT_WRITES_PER_SN", default_value_t = 16)]
    pub inflight_writes_per_sn: usize,

    /// Max concurrent repair tasks cluster-wide per node (§5, default 32).
    #[arg(long, env = "REDCLOUD_INFLIGHT_REPAIRS", default_value_t = 32)]
    pub inflight_repairs: usize,

    /// Fixed chunk size in bytes (§4.9 of SPEC_FULL.md, default 4 MiB).
    #[arg(long, env = "REDCLOUD_CHUNK_SIZE_BYTES", default_value_t = 4 * 1024 * 1024)]
    pub chunk_size_bytes: usize,

    /// Peer-registry TTL before a stale entry is eligible for eviction
    /// (§4.4, default 5 minutes).
    #[arg(long, env = "REDCLOUD_PEER_TTL_SECS", default_value_t = 300)]
    pub peer_ttl_secs: u64,

    /// Peer-registry reconciliation period (§4.4, default 5 minutes).
    #[arg(long, env = "REDCLOUD_RECONCILE_PERIOD_SECS", default_value_t = 300)]
    pub reconcile_period_secs: u64,

    /// Tombstone retention window, in seconds, before GC may reclaim a
    /// chunk whose file was soft-deleted (§4.10 of SPEC_FULL.md, O2).
    /// Defaults to one week; operators running short-lived clusters
    /// should lower this.
    #[arg(long, env = "REDCLOUD_TOMBSTONE_RETENTION_SECS", default_value_t = 7 * 24 * 3600)]
    pub tombstone_retention_secs: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            own_node_id: None,
            own_advertise_address: None,
            metadata_alias: "metadata-service".to_string(),
            storage_alias: "storage-service".to_string(),
            gossip_period_secs: 5,
            anti_entropy_period_secs: 30,
            repair_period_secs: 60,
            heartbeat_period_secs: 10,
            heartbeat_timeout_secs: 30,
            fanout: 2,
            min_write_acks: 1,
            write_deadline_secs: 60,
            read_deadline_secs: 60,
            inflight_writes_per_sn: 16,
            inflight_repairs: 32,
            chunk_size_bytes: 4 * 1024 * 1024,
            peer_ttl_secs: 300,
            reconcile_period_secs: 300,
            tombstone_retention_secs: 7 * 24 * 3600,
        }
    }
}

impl NodeConfig {
    /// `gossip_period_secs` as a [`Duration`].
    pub fn gossip_period(&self) -> Duration {
        Duration::from_secs(self.gossip_period_secs)
    }
    /// `anti_entropy_period_secs` as a [`Duration`].
    pub fn anti_entropy_period(&self) -> Duration {
        Duration::from_secs(self.anti_entropy_period_secs)
    }
    /// `repair_period_secs` as a [`Duration`].
    pub fn repair_period(&self) -> Duration {
        Duration::from_secs(self.repair_period_secs)
    }
    /// `heartbeat_period_secs` as a [`Duration`].
    pub fn heartbeat_period(&self) -> Duration {
        Duration::from_secs(self.heartbeat_period_secs)
    }
    /// `heartbeat_timeout_secs` as a [`Duration`].
    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_secs)
    }
    /// `heartbeat_timeout_secs` as a [`chrono::Duration`], for comparison
    /// against entity wall-clock stamps.
    pub fn heartbeat_timeout_chrono(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.heartbeat_timeout_secs as i64)
    }
    /// `write_deadline_secs` as a [`Duration`].
    pub fn write_deadline(&self) -> Duration {
        Duration::from_secs(self.write_deadline_secs)
    }
    /// `read_deadline_secs` as a [`Duration`].
    pub fn read_deadline(&self) -> Duration {
        Duration::from_secs(self.read_deadline_secs)
    }
    /// `peer_ttl_secs` as a [`chrono::Duration`].
    pub fn peer_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.peer_ttl_secs as i64)
    }
    /// `reconcile_period_secs` as a [`Duration`].
    pub fn reconcile_period(&self) -> Duration {
        Duration::from_secs(self.reconcile_period_secs)
    }
    /// `tombstone_retention_secs` as a [`chrono::Duration`].
    pub fn tombstone_retention(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.tombstone_retention_secs as i64)
    }
}
