//! End-to-end scenarios against real HTTP-served nodes (spec scenarios
//! S1 and S6, plus the chunk-write idempotence property R1).
mod common;

use bytes::Bytes;
use redcloud_files::error::RedCloudError;
use redcloud_files::ids::{ChunkId, FileId, UserId};
use redcloud_files::metadata_store::in_memory_store;
use redcloud_files::placement::StorageRegistry;
use redcloud_files::sn_client::StorageClient;
use std::time::Duration;

#[tokio::test]
async fn single_mn_three_sn_upload_and_download_round_trips() {
    let (mn, mn_addr) = common::spawn_metadata_node("m1", vec![]).await;
    let (_s1, _) = common::spawn_storage_node(vec![mn_addr], 10 * 1024 * 1024 * 1024).await;
    let (_s2, _) = common::spawn_storage_node(vec![mn_addr], 10 * 1024 * 1024 * 1024).await;
    let (_s3, _) = common::spawn_storage_node(vec![mn_addr], 10 * 1024 * 1024 * 1024).await;

    assert!(
        common::wait_for_active_storage_nodes(&mn, 3, Duration::from_secs(10)).await,
        "storage nodes never became active"
    );

    let owner = UserId::new();
    let payload = Bytes::from(vec![b'x'; 9 * 1024 * 1024]);
    let file_id = mn
        .upload(owner, "a.txt".to_string(), vec!["t1".to_string()], payload.clone())
        .await
        .unwrap();

    let chunks = mn.store.chunks_of_file(&file_id).await;
    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[0].ordinal, 0);
    assert_eq!(chunks[0].size_bytes, 4 * 1024 * 1024);
    assert_eq!(chunks[1].size_bytes, 4 * 1024 * 1024);
    assert_eq!(chunks[2].size_bytes, 1024 * 1024);

    for chunk in &chunks {
        let locations = mn.store.locations_of(&chunk.id).await;
        assert_eq!(locations.holders().len(), 3, "chunk {} under-replicated", chunk.id);
    }

    let downloaded = mn.download(&owner, "a.txt").await.unwrap();
    assert_eq!(downloaded, payload);
}

#[tokio::test]
async fn upload_with_no_active_storage_nodes_fails_immediately() {
    let (mn, _mn_addr) = common::spawn_metadata_node("m1", vec![]).await;

    let owner = UserId::new();
    let result = mn.upload(owner, "b.txt".to_string(), vec![], Bytes::from_static(b"x")).await;

    assert!(matches!(result, Err(RedCloudError::NoCapacity)));
    assert!(mn.store.get_file_by_name(&owner, "b.txt").await.is_none());
    assert!(mn.store.all_gossip_entries().await.is_empty());
}

#[tokio::test]
async fn writing_same_chunk_twice_leaves_a_single_listing() {
    let (_mn, mn_addr) = common::spawn_metadata_node("m1", vec![]).await;
    let (_s1, s1_addr) = common::spawn_storage_node(vec![mn_addr], 1024 * 1024 * 1024).await;

    let client = StorageClient::new();
    let chunk_id = ChunkId::new();
    let file_id = FileId::new();
    let bytes = Bytes::from_static(b"hello world");
    let checksum = redcloud_files::chunking::checksum_of(&bytes);

    client
        .write_chunk(s1_addr, chunk_id, file_id, 0, &checksum, bytes.clone(), Duration::from_secs(5))
        .await
        .unwrap();
    client
        .write_chunk(s1_addr, chunk_id, file_id, 0, &checksum, bytes.clone(), Duration::from_secs(5))
        .await
        .unwrap();

    let listing = client.list_chunks(s1_addr, Duration::from_secs(5)).await.unwrap();
    assert_eq!(listing.iter().filter(|c| c.chunk_id == chunk_id).count(), 1);

    let readback = client.read_chunk(s1_addr, chunk_id, Duration::from_secs(5)).await.unwrap();
    assert_eq!(readback, bytes);
}

#[tokio::test]
async fn writing_same_chunk_id_with_different_bytes_is_rejected() {
    let (_mn, mn_addr) = common::spawn_metadata_node("m1", vec![]).await;
    let (_s1, s1_addr) = common::spawn_storage_node(vec![mn_addr], 1024 * 1024 * 1024).await;

    let client = StorageClient::new();
    let chunk_id = ChunkId::new();
    let file_id = FileId::new();
    let first = Bytes::from_static(b"hello world");
    let checksum = redcloud_files::chunking::checksum_of(&first);

    client
        .write_chunk(s1_addr, chunk_id, file_id, 0, &checksum, first, Duration::from_secs(5))
        .await
        .unwrap();

    let second = Bytes::from_static(b"goodbye world");
    let second_checksum = redcloud_files::chunking::checksum_of(&second);
    let result = client
        .write_chunk(s1_addr, chunk_id, file_id, 0, &second_checksum, second, Duration::from_secs(5))
        .await;

    assert!(matches!(result, Err(RedCloudError::ChecksumMismatch { .. } | RedCloudError::Transport(_))));
}

#[tokio::test]
async fn upload_failing_min_acks_deletes_already_written_blobs() {
    let (_mn, mn_addr) = common::spawn_metadata_node("m1", vec![]).await;
    let (sn, sn_addr) = common::spawn_storage_node(vec![mn_addr], 1024 * 1024 * 1024).await;

    let store = in_memory_store();
    let registry = StorageRegistry::new();
    registry.upsert_heartbeat(sn.id, sn_addr, 1024 * 1024 * 1024, 0);
    let client = StorageClient::new();
    let self_id = redcloud_files::ids::MetadataNodeId::new("m1", 0);

    let owner = UserId::new();
    let payload = Bytes::from(vec![b'x'; 5 * 1024 * 1024]);
    let result = redcloud_files::write_path::write_file(
        &self_id,
        &store,
        &registry,
        &client,
        owner,
        "a.txt".to_string(),
        vec![],
        payload,
        4 * 1024 * 1024,
        2,
        16,
        Duration::from_secs(5),
    )
    .await;

    assert!(matches!(result, Err(RedCloudError::Unavailable(_))));
    assert!(store.all_files().await.is_empty());
    assert!(store.all_chunks().await.is_empty());

    let listing = client.list_chunks(sn_addr, Duration::from_secs(5)).await.unwrap();
    assert!(listing.is_empty(), "compensating delete left a blob behind: {listing:?}");
}
