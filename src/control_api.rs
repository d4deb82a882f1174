//! Axum router for the MN-to-MN control surface, plus the SN-to-MN
//! heartbeat route (§6, §6.1 of SPEC_FULL.md).
use crate::control_protocol::{
    FetchEntitiesRequest, FetchEntitiesResponse, GossipReceiveRequest, HeartbeatRequest,
    ListPeersResponse, OkResponse, RegisterPeerRequest, StateSummaryResponse,
};
use crate::metadata_node::MetadataNode;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tracing::warn;

/// Build the control-surface router, bound to one running [`MetadataNode`].
pub fn router(node: Arc<MetadataNode>) -> Router {
    Router::new()
        .route("/control/peers", get(handle_list_peers))
        .route("/control/peers", post(handle_register_peer))
        .route("/control/gossip", post(handle_gossip_receive))
        .route("/control/state-summary", get(handle_state_summary))
        .route("/control/fetch-entities", post(handle_fetch_entities))
        .route("/control/heartbeat", post(handle_heartbeat))
        .with_state(node)
}

async fn handle_list_peers(State(node): State<Arc<MetadataNode>>) -> Json<ListPeersResponse> {
    Json(node.list_peers())
}

async fn handle_register_peer(
    State(node): State<Arc<MetadataNode>>,
    Json(request): Json<RegisterPeerRequest>,
) -> Result<Json<ListPeersResponse>, StatusCode> {
    node.register_peer(request)
        .await
        .map(Json)
        .map_err(internal_error)
}

async fn handle_gossip_receive(
    State(node): State<Arc<MetadataNode>>,
    Json(request): Json<GossipReceiveRequest>,
) -> Result<Json<OkResponse>, StatusCode> {
    node.gossip_receive(request)
        .await
        .map(Json)
        .map_err(internal_error)
}

async fn handle_state_summary(
    State(node): State<Arc<MetadataNode>>,
) -> Json<StateSummaryResponse> {
    Json(node.state_summary().await)
}

async fn handle_fetch_entities(
    State(node): State<Arc<MetadataNode>>,
    Json(request): Json<FetchEntitiesRequest>,
) -> Result<Json<FetchEntitiesResponse>, StatusCode> {
    node.fetch_entities(request.kind, &request.ids)
        .await
        .map(Json)
        .map_err(internal_error)
}

async fn handle_heartbeat(
    State(node): State<Arc<MetadataNode>>,
    Json(request): Json<HeartbeatRequest>,
) -> Result<Json<OkResponse>, StatusCode> {
    node.heartbeat(request).await.map(Json).map_err(internal_error)
}

fn internal_error(e: crate::error::RedCloudError) -> StatusCode {
    warn!(error = %e, "control request failed");
    StatusCode::INTERNAL_SERVER_ERROR
}
