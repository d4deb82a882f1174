//! `reqwest`-based client for the MN-to-SN data surface (§6.1).
use crate::error::{RedCloudError, RedCloudResult};
use crate::ids::{ChunkId, FileId};
use crate::sn_protocol::*;
use bytes::Bytes;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Clone)]
pub struct StorageClient {
    http: reqwest::Client,
}

impl StorageClient {
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

    /// `write-chunk`: carries bytes as the request body, metadata as
    /// headers (§6.1).
    pub async fn write_chunk(
        &self,
        addr: SocketAddr,
        chunk_id: ChunkId,
        file_id: FileId,
        ordinal: u32,
        checksum: &str,
        bytes: Bytes,
        deadline: Duration,
    ) -> RedCloudResult<()> {
        let response = self
            .http
            .put(format!("{}/chunks/{chunk_id}", Self::base_url(addr)))
            .header(CHECKSUM_HEADER, checksum)
            .header(FILE_ID_HEADER, file_id.to_string())
            .header(ORDINAL_HEADER, ordinal.to_string())
            .timeout(deadline)
            .body(bytes)
            .send()
            .await
            .map_err(Self::transport_err)?;

        if response.status() == reqwest::StatusCode::CONFLICT {
            return Err(RedCloudError::ChecksumMismatch {
                chunk_id: chunk_id.to_string(),
            });
        }
        if !response.status().is_success() {
            return Err(RedCloudError::Transport(format!(
                "storage node rejected write: {}",
                response.status()
            )));
        }
        Ok(())
    }

    /// `read-chunk`: streams bytes back with the checksum in a trailing
    /// header.
    pub async fn read_chunk(
        &self,
        addr: SocketAddr,
        chunk_id: ChunkId,
        deadline: Duration,
    ) -> RedCloudResult<Bytes> {
        let response = self
            .http
            .get(format!("{}/chunks/{chunk_id}", Self::base_url(addr)))
            .timeout(deadline)
            .send()
            .await
            .map_err(Self::transport_err)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(RedCloudError::NotFound(chunk_id.to_string()));
        }
        if !response.status().is_success() {
            return Err(RedCloudError::Transport(format!(
                "storage node read failed: {}",
                response.status()
            )));
        }
        let checksum = response
            .headers()
            .get(CHECKSUM_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await.map_err(Self::transport_err)?;

        if let Some(expected) = checksum {
            if crate::chunking::checksum_of(&bytes) != expected {
                return Err(RedCloudError::ChecksumMismatch {
                    chunk_id: chunk_id.to_string(),
                });
            }
        }
        Ok(bytes)
    }

    pub async fn delete_chunk(
        &self,
        addr: SocketAddr,
        chunk_id: ChunkId,
        deadline: Duration,
    ) -> RedCloudResult<bool> {
        let response = self
            .http
            .delete(format!("{}/chunks/{chunk_id}", Self::base_url(addr)))
            .timeout(deadline)
            .send()
            .await
            .map_err(Self::transport_err)?;
        let body: DeleteChunkResponse = response.json().await.map_err(Self::transport_err)?;
        Ok(body.found)
    }

    pub async fn list_chunks(
        &self,
        addr: SocketAddr,
        deadline: Duration,
    ) -> RedCloudResult<Vec<ChunkListingDto>> {
        let response: ListChunksResponse = self
            .http
            .get(format!("{}/chunks", Self::base_url(addr)))
            .timeout(deadline)
            .send()
            .await
            .map_err(Self::transport_err)?
            .json()
            .await
            .map_err(Self::transport_err)?;
        Ok(response.chunks)
    }

    pub async fn replicate_chunk(
        &self,
        target_addr: SocketAddr,
        chunk_id: ChunkId,
        source_addr: SocketAddr,
        deadline: Duration,
    ) -> RedCloudResult<()> {
        let response = self
            .http
            .post(format!("{}/chunks/replicate", Self::base_url(target_addr)))
            .timeout(deadline)
            .json(&ReplicateChunkRequest {
                chunk_id,
                source_address: source_addr,
            })
            .send()
            .await
            .map_err(Self::transport_err)?;
        if !response.status().is_success() {
            return Err(RedCloudError::Transport(format!(
                "replication rejected: {}",
                response.status()
            )));
        }
        Ok(())
    }

    pub async fn ping(&self, addr: SocketAddr, deadline: Duration) -> RedCloudResult<()> {
        self.http
            .get(format!("{}/ping", Self::base_url(addr)))
            .timeout(deadline)
            .send()
            .await
            .map_err(Self::transport_err)?;
        Ok(())
    }
}

impl Default for StorageClient {
    fn default() -> Self {
        Self::new()
    }
}
