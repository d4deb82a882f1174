//! Peer and storage-node discovery (§4.4, §4.4.1 of SPEC_FULL.md).
//!
//! Bootstrap resolves a well-known DNS alias to a set of addresses, then
//! issues a list-peers + self-registration request against each distinct
//! address. Steady state is a TTL-evicted registry reconciled on a
//! background period.
use crate::control_client::ControlClient;
use crate::error::RedCloudResult;
use crate::ids::MetadataNodeId;
use crate::model::MetadataNodeRecord;
use async_trait::async_trait;
use dashmap::DashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{info, warn};

/// Resolves a DNS alias to the set of addresses currently behind it.
///
/// Production nodes resolve real DNS; tests substitute a fixed address
/// list so bootstrap and reconciliation are exercisable without a
/// resolver (§4.4.1).
#[async_trait]
pub trait AliasResolver: Send + Sync {
    async fn resolve(&self, alias: &str) -> RedCloudResult<Vec<SocketAddr>>;
}

/// Production resolver backed by the system resolver.
pub struct DnsAliasResolver;

#[async_trait]
impl AliasResolver for DnsAliasResolver {
    async fn resolve(&self, alias: &str) -> RedCloudResult<Vec<SocketAddr>> {
        let lookup = format!("{alias}:0");
        let addrs = tokio::net::lookup_host(&lookup)
            .await
            .map_err(|e| crate::error::RedCloudError::AliasUnresolvable(e.to_string()))?;
        Ok(addrs.collect())
    }
}

/// A resolver that always returns a fixed, test-configured address list.
pub struct StaticAliasResolver {
    addresses: Vec<SocketAddr>,
}

impl StaticAliasResolver {
    pub fn new(addresses: Vec<SocketAddr>) -> Self {
        Self { addresses }
    }
}

#[async_trait]
impl AliasResolver for StaticAliasResolver {
    async fn resolve(&self, _alias: &str) -> RedCloudResult<Vec<SocketAddr>> {
        Ok(self.addresses.clone())
    }
}

/// The in-memory metadata-node peer registry (§4.4 "steady state").
///
/// Mutated only by the discovery/reconciliation loop; other loops (gossip,
/// anti-entropy) read a snapshot via [`PeerRegistry::snapshot`].
#[derive(Default)]
pub struct PeerRegistry {
    peers: DashMap<MetadataNodeId, MetadataNodeRecord>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or refresh a peer record. Returns `true` if this is a newly
    /// observed peer (R3: registering the same peer twice is a no-op
    /// beyond refreshing its last-seen stamp).
    pub fn upsert(&self, record: MetadataNodeRecord) -> bool {
        self.peers.insert(record.id.clone(), record).is_none()
    }

    pub fn touch(&self, id: &MetadataNodeId) {
        if let Some(mut entry) = self.peers.get_mut(id) {
            entry.touch();
        }
    }

    pub fn remove(&self, id: &MetadataNodeId) -> bool {
        self.peers.remove(id).is_some()
    }

    pub fn contains(&self, id: &MetadataNodeId) -> bool {
        self.peers.contains_key(id)
    }

    /// All known peers, excluding `self_id`.
    pub fn snapshot(&self, self_id: &MetadataNodeId) -> Vec<MetadataNodeRecord> {
        self.peers
            .iter()
            .filter(|e| e.id != *self_id)
            .map(|e| e.clone())
            .collect()
    }

    /// Evict entries whose last-seen stamp exceeds `ttl` (§4.4 default 5
    /// minutes).
    pub fn evict_stale(&self, ttl: chrono::Duration) -> Vec<MetadataNodeId> {
        let stale: Vec<MetadataNodeId> = self
            .peers
            .iter()
            .filter(|e| e.is_stale(ttl))
            .map(|e| e.id.clone())
            .collect();
        for id in &stale {
            self.peers.remove(id);
        }
        stale
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

/// Resolve `alias`, and for each distinct address, fetch its peer list and
/// register ourselves with it (§4.4 "Bootstrap"). Self-registration at the
/// remote is appended to its own gossip log by the remote handler, so it
/// propagates from there; this function only needs to seed our local
/// registry with whatever peers we learn about.
pub async fn bootstrap(
    resolver: &dyn AliasResolver,
    alias: &str,
    client: &ControlClient,
    registry: &Arc<PeerRegistry>,
    self_id: &MetadataNodeId,
    self_addr: SocketAddr,
) {
    let addresses = match resolver.resolve(alias).await {
        Ok(addrs) => addrs,
        Err(e) => {
            warn!(%alias, error = %e, "failed to resolve metadata-service alias at bootstrap");
            return;
        }
    };

    for addr in addresses {
        if addr == self_addr {
            continue;
        }
        match client.register_peer(addr, self_id.clone(), self_addr).await {
            Ok(response) => {
                if registry.upsert(MetadataNodeRecord::new(response.self_info.id.clone(), addr)) {
                    info!(peer = %response.self_info.id, %addr, "discovered peer at bootstrap");
                }
                for peer in response.peers {
                    if peer.id != *self_id {
                        registry.upsert(MetadataNodeRecord::new(peer.id, peer.address));
                    }
                }
            }
            Err(e) => {
                warn!(%addr, error = %e, "bootstrap contact failed, will retry next reconciliation cycle");
            }
        }
    }
}

/// Background reconciliation task (§4.4 "steady state", default period 5
/// minutes): evict stale entries and re-resolve the alias to heal drift in
/// either direction.
pub async fn reconcile_once(
    resolver: &dyn AliasResolver,
    alias: &str,
    client: &ControlClient,
    registry: &Arc<PeerRegistry>,
    self_id: &MetadataNodeId,
    self_addr: SocketAddr,
    ttl: chrono::Duration,
) {
    let evicted = registry.evict_stale(ttl);
    for id in evicted {
        info!(peer = %id, "evicted stale peer from registry");
    }
    bootstrap(resolver, alias, client, registry, self_id, self_addr).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_resolver_returns_fixed_list() {
        let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let resolver = StaticAliasResolver::new(vec![addr]);
        assert_eq!(resolver.resolve("anything").await.unwrap(), vec![addr]);
    }

    #[test]
    fn upsert_reports_whether_peer_was_new() {
        let registry = PeerRegistry::new();
        let id = MetadataNodeId::new("m1", 0);
        let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        assert!(registry.upsert(MetadataNodeRecord::new(id.clone(), addr)));
        assert!(!registry.upsert(MetadataNodeRecord::new(id, addr)));
    }

    #[test]
    fn evict_stale_removes_old_entries_only() {
        let registry = PeerRegistry::new();
        let fresh = MetadataNodeId::new("fresh", 0);
        let stale = MetadataNodeId::new("stale", 0);
        let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        registry.upsert(MetadataNodeRecord::new(fresh.clone(), addr));
        let mut stale_record = MetadataNodeRecord::new(stale.clone(), addr);
        stale_record.last_seen = chrono::Utc::now() - chrono::Duration::hours(1);
        registry.upsert(stale_record);

        let evicted = registry.evict_stale(chrono::Duration::minutes(5));
        assert_eq!(evicted, vec![stale]);
        assert!(registry.contains(&fresh));
    }
}
