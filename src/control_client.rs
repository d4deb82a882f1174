//! `reqwest`-based client for the MN-to-MN control surface (§6.1).
use crate::control_protocol::*;
use crate::error::{RedCloudError, RedCloudResult};
use crate::ids::MetadataNodeId;
use std::net::SocketAddr;
use std::time::Duration;

/// Thin wrapper around a [`reqwest::Client`] with per-call deadlines
/// matching §5 ("every outbound RPC has a deadline").
#[derive(Clone)]
pub struct ControlClient {
    http: reqwest::Client,
}

impl ControlClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    fn base_url(addr: SocketAddr) -> String {
        format!("http://{addr}")
    }

    fn transport_err(e: reqwest::Error) -> RedCloudError {
        if e.is_timeout() {
            RedCloudError::DeadlineExceeded
        } else {
            RedCloudError::PeerUnreachable(e.to_string())
        }
    }

    pub async fn list_peers(
        &self,
        addr: SocketAddr,
        deadline: Duration,
    ) -> RedCloudResult<ListPeersResponse> {
        self.http
            .get(format!("{}/control/peers", Self::base_url(addr)))
            .timeout(deadline)
            .send()
            .await
            .map_err(Self::transport_err)?
            .json()
            .await
            .map_err(Self::transport_err)
    }

    pub async fn register_peer(
        &self,
        addr: SocketAddr,
        self_id: MetadataNodeId,
        self_addr: SocketAddr,
    ) -> RedCloudResult<ListPeersResponse> {
        self.http
            .post(format!("{}/control/peers", Self::base_url(addr)))
            .json(&RegisterPeerRequest {
                id: self_id,
                address: self_addr,
            })
            .send()
            .await
            .map_err(Self::transport_err)?
            .json()
            .await
            .map_err(Self::transport_err)
    }

    pub async fn gossip_send(
        &self,
        addr: SocketAddr,
        request: GossipReceiveRequest,
        deadline: Duration,
    ) -> RedCloudResult<OkResponse> {
        self.http
            .post(format!("{}/control/gossip", Self::base_url(addr)))
            .timeout(deadline)
            .json(&request)
            .send()
            .await
            .map_err(Self::transport_err)?
            .json()
            .await
            .map_err(Self::transport_err)
    }

    pub async fn state_summary(
        &self,
        addr: SocketAddr,
        deadline: Duration,
    ) -> RedCloudResult<StateSummaryResponse> {
        self.http
            .get(format!("{}/control/state-summary", Self::base_url(addr)))
            .timeout(deadline)
            .send()
            .await
            .map_err(Self::transport_err)?
            .json()
            .await
            .map_err(Self::transport_err)
    }

    pub async fn fetch_entities(
        &self,
        addr: SocketAddr,
        request: FetchEntitiesRequest,
        deadline: Duration,
    ) -> RedCloudResult<FetchEntitiesResponse> {
        self.http
            .post(format!("{}/control/fetch-entities", Self::base_url(addr)))
            .timeout(deadline)
            .json(&request)
            .send()
            .await
            .map_err(Self::transport_err)?
            .json()
            .await
            .map_err(Self::transport_err)
    }

    pub async fn heartbeat(
        &self,
        addr: SocketAddr,
        request: HeartbeatRequest,
        deadline: Duration,
    ) -> RedCloudResult<OkResponse> {
        self.http
            .post(format!("{}/control/heartbeat", Self::base_url(addr)))
            .timeout(deadline)
            .json(&request)
            .send()
            .await
            .map_err(Self::transport_err)?
            .json()
            .await
            .map_err(Self::transport_err)
    }
}

impl Default for ControlClient {
    fn default() -> Self {
        Self::new()
    }
}
