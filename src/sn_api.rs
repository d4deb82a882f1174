//! Axum router for the MN-to-SN data surface (§6, §6.1 of SPEC_FULL.md).
use crate::ids::ChunkId;
use crate::sn_protocol::{
    ChunkListingDto, DeleteChunkResponse, ListChunksResponse, PingResponse, ReplicateChunkRequest,
    ReplicateChunkResponse, CHECKSUM_HEADER, FILE_ID_HEADER, ORDINAL_HEADER,
};
use crate::storage_node::StorageNode;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use std::sync::Arc;
use tracing::warn;

pub fn router(node: Arc<StorageNode>) -> Router {
    Router::new()
        .route("/chunks/:chunk_id", put(handle_write).get(handle_read).delete(handle_delete))
        .route("/chunks", get(handle_list))
        .route("/chunks/replicate", post(handle_replicate))
        .route("/ping", get(handle_ping))
        .with_state(node)
}

async fn handle_write(
    State(node): State<Arc<StorageNode>>,
    Path(chunk_id): Path<ChunkId>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let Some(checksum) = header_str(&headers, CHECKSUM_HEADER) else {
        return StatusCode::BAD_REQUEST;
    };
    let Some(file_id) = header_str(&headers, FILE_ID_HEADER).and_then(|v| v.parse().ok()) else {
        return StatusCode::BAD_REQUEST;
    };
    let Some(ordinal) = header_str(&headers, ORDINAL_HEADER).and_then(|v| v.parse().ok()) else {
        return StatusCode::BAD_REQUEST;
    };

    match node.write_chunk(chunk_id, file_id, ordinal, &checksum, body).await {
        Ok(()) => StatusCode::OK,
        Err(crate::error::RedCloudError::ChecksumMismatch { .. }) => StatusCode::CONFLICT,
        Err(crate::error::RedCloudError::ChunkConflict { .. }) => StatusCode::CONFLICT,
        Err(e) => {
            warn!(%chunk_id, error = %e, "chunk write rejected");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

async fn handle_read(
    State(node): State<Arc<StorageNode>>,
    Path(chunk_id): Path<ChunkId>,
) -> Result<(HeaderMap, Bytes), StatusCode> {
    let Some(bytes) = node.read_chunk(&chunk_id).await else {
        return Err(StatusCode::NOT_FOUND);
    };
    let mut headers = HeaderMap::new();
    let checksum = crate::chunking::checksum_of(&bytes);
    if let Ok(value) = checksum.parse() {
        headers.insert(CHECKSUM_HEADER, value);
    }
    Ok((headers, bytes))
}

async fn handle_delete(
    State(node): State<Arc<StorageNode>>,
    Path(chunk_id): Path<ChunkId>,
) -> Json<DeleteChunkResponse> {
    let found = node.delete_chunk(&chunk_id).await;
    Json(DeleteChunkResponse { found })
}

async fn handle_list(State(node): State<Arc<StorageNode>>) -> Json<ListChunksResponse> {
    let chunks = node
        .list_chunks()
        .await
        .into_iter()
        .map(|c| ChunkListingDto {
            chunk_id: c.chunk_id,
            file_id: c.file_id,
            ordinal: c.ordinal,
            size_bytes: c.size_bytes,
            checksum: c.checksum,
        })
        .collect();
    Json(ListChunksResponse { chunks })
}

async fn handle_replicate(
    State(node): State<Arc<StorageNode>>,
    Json(request): Json<ReplicateChunkRequest>,
) -> Result<Json<ReplicateChunkResponse>, StatusCode> {
    node.replicate_from(request.chunk_id, request.source_address)
        .await
        .map(|_| Json(ReplicateChunkResponse { ok: true }))
        .map_err(|e| {
            warn!(chunk_id = %request.chunk_id, error = %e, "replication pull failed");
            StatusCode::INTERNAL_SERVER_ERROR
        })
}

async fn handle_ping() -> Json<PingResponse> {
    Json(PingResponse { ok: true })
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<String> {
    headers.get(name)?.to_str().ok().map(str::to_string)
}
