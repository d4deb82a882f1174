//! Storage-node and metadata-node registry records (§3).
use crate::ids::{MetadataNodeId, StorageNodeId};
use crate::vector_clock::VectorClock;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Liveness as tracked by the health monitor (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Liveness {
    /// Heartbeat received within the timeout window.
    Active,
    /// No heartbeat within `T_hb_timeout`.
    Failed,
}

/// A storage node known to the cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageNodeRecord {
    /// Stable identifier.
    pub id: StorageNodeId,
    /// Reachable network address.
    pub address: SocketAddr,
    /// Most recent heartbeat timestamp.
    pub last_heartbeat: DateTime<Utc>,
    /// Last-reported total capacity, in bytes.
    pub capacity_bytes: u64,
    /// Last-reported used space, in bytes.
    pub used_bytes: u64,
    /// Current liveness as locally observed (§4.7: read-path ordering and
    /// placement consult only this local view, never waiting on gossip).
    pub liveness: Liveness,
}

impl StorageNodeRecord {
    /// Construct a record from a fresh heartbeat (§4.8).
    pub fn from_heartbeat(
        id: StorageNodeId,
        address: SocketAddr,
        capacity_bytes: u64,
        used_bytes: u64,
    ) -> Self {
        Self {
            id,
            address,
            last_heartbeat: Utc::now(),
            capacity_bytes,
            used_bytes,
            liveness: Liveness::Active,
        }
    }

    /// `true` if the last heartbeat is within `timeout` of now.
    pub fn is_fresh(&self, timeout: chrono::Duration) -> bool {
        Utc::now() - self.last_heartbeat <= timeout
    }
}

/// A metadata node known to the peer registry (§4.4).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataNodeRecord {
    /// Stable identifier (host identity + session epoch).
    pub id: MetadataNodeId,
    /// Reachable network address.
    pub address: SocketAddr,
    /// Last time this peer was observed (heartbeat, gossip, or
    /// anti-entropy contact).
    pub last_seen: DateTime<Utc>,
    /// The most recent vector clock we've observed this peer claim for
    /// itself, from its last anti-entropy state summary. Used only as a
    /// diagnostic hint; never consulted by the conflict resolver.
    pub last_known_clock: VectorClock,
}

impl MetadataNodeRecord {
    /// Register a freshly-seen peer.
    pub fn new(id: MetadataNodeId, address: SocketAddr) -> Self {
        Self {
            id,
            address,
            last_seen: Utc::now(),
            last_known_clock: VectorClock::new(),
        }
    }

    /// Refresh the last-seen stamp.
    pub fn touch(&mut self) {
        self.last_seen = Utc::now();
    }

    /// Refresh the last-seen stamp and recorded clock.
    pub fn touch_with_clock(&mut self, clock: VectorClock) {
        self.last_seen = Utc::now();
        self.last_known_clock = clock;
    }

    /// Whether this peer is eligible for eviction under the registry TTL
    /// (§4.4, default 5 minutes).
    pub fn is_stale(&self, ttl: chrono::Duration) -> bool {
        Utc::now() - self.last_seen > ttl
    }
}
