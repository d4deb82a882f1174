//! A thin, unauthenticated client-facing HTTP surface (§6.2 of
//! SPEC_FULL.md): `upload`, `download`, `delete`, `list-by-tag`. Exists
//! only so the control plane is exercisable end-to-end; it is explicitly
//! not the real client-facing request API, which production deployments
//! are expected to front this crate with.
use crate::ids::UserId;
use crate::metadata_node::MetadataNode;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

pub fn router(node: Arc<MetadataNode>) -> Router {
    Router::new()
        .route("/files/:owner/:name", put(handle_upload).get(handle_download).delete(handle_delete))
        .route("/files/:owner", get(handle_list))
        .with_state(node)
}

#[derive(Debug, Deserialize)]
struct UploadQuery {
    #[serde(default)]
    tags: String,
}

#[derive(Debug, Serialize)]
struct UploadResponse {
    file_id: String,
}

async fn handle_upload(
    State(node): State<Arc<MetadataNode>>,
    Path((owner, name)): Path<(UserId, String)>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<Json<UploadResponse>, StatusCode> {
    let tags: Vec<String> = query
        .tags
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();

    node.upload(owner, name, tags, body)
        .await
        .map(|file_id| {
            Json(UploadResponse {
                file_id: file_id.to_string(),
            })
        })
        .map_err(client_error)
}

async fn handle_download(
    State(node): State<Arc<MetadataNode>>,
    Path((owner, name)): Path<(UserId, String)>,
) -> Result<Bytes, StatusCode> {
    node.download(&owner, &name).await.map_err(client_error)
}

async fn handle_delete(
    State(node): State<Arc<MetadataNode>>,
    Path((owner, name)): Path<(UserId, String)>,
) -> StatusCode {
    match node.delete(&owner, &name).await {
        Ok(()) => StatusCode::NO_CONTENT,
        Err(e) => client_error(e),
    }
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    tag: Option<String>,
}

#[derive(Debug, Serialize)]
struct ListedFile {
    file_id: String,
    name: String,
    size_bytes: u64,
    tags: Vec<String>,
}

async fn handle_list(
    State(node): State<Arc<MetadataNode>>,
    Path(owner): Path<UserId>,
    Query(query): Query<ListQuery>,
) -> Json<Vec<ListedFile>> {
    let files = node.list_by_tag(&owner, query.tag.as_deref()).await;
    Json(
        files
            .into_iter()
            .map(|f| ListedFile {
                file_id: f.id.to_string(),
                name: f.name,
                size_bytes: f.size_bytes,
                tags: f.tags.active().into_iter().cloned().collect(),
            })
            .collect(),
    )
}

fn client_error(e: crate::error::RedCloudError) -> StatusCode {
    use crate::error::RedCloudError::*;
    match e {
        NotFound(_) => StatusCode::NOT_FOUND,
        NameConflict { .. } => StatusCode::CONFLICT,
        NoCapacity | Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
        other => {
            warn!(error = %other, "client request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}
