//! Wire DTOs and headers for the MN-to-SN data surface (§6, §6.1).
use crate::ids::{ChunkId, FileId};
use serde::{Deserialize, Serialize};

/// HTTP header carrying a chunk's checksum, used in place of the in-band
/// trailer the byte-stream framing in §6 describes (§6.1).
pub const CHECKSUM_HEADER: &str = "x-redcloud-checksum";
/// HTTP header carrying a chunk write's ordinal and file-id metadata.
pub const FILE_ID_HEADER: &str = "x-redcloud-file-id";
pub const ORDINAL_HEADER: &str = "x-redcloud-ordinal";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteChunkResponse {
    pub ok: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteChunkResponse {
    pub found: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkListingDto {
    pub chunk_id: ChunkId,
    pub file_id: FileId,
    pub ordinal: u32,
    pub size_bytes: u32,
    pub checksum: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListChunksResponse {
    pub chunks: Vec<ChunkListingDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicateChunkRequest {
    pub chunk_id: ChunkId,
    pub source_address: std::net::SocketAddr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplicateChunkResponse {
    pub ok: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingResponse {
    pub ok: bool,
}
