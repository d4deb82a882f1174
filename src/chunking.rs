//! Fixed-size chunk splitting (§4.9 of SPEC_FULL.md).
//!
//! Splits a whole file's bytes into contiguous, ordinal-indexed pieces of
//! at most `chunk_size` bytes, each carrying a BLAKE3 content checksum
//! computed while splitting. The same checksum is re-verified by the
//! accepting storage node and again on every read (I4: ordinals are
//! contiguous from 0).

use bytes::Bytes;

/// One piece produced by [`split_into_chunks`], ready to hand to the write
/// path.
#[derive(Debug, Clone)]
pub struct ChunkPiece {
    /// Position of this piece within the file, starting at 0.
    pub ordinal: u32,
    /// The piece's bytes.
    pub bytes: Bytes,
    /// Hex-encoded BLAKE3 checksum of `bytes`.
    pub checksum: String,
}

/// Split `data` into pieces of at most `chunk_size` bytes. The final piece
/// may be shorter. An empty file yields a single empty piece at ordinal 0,
/// so every file has at least one chunk descriptor.
pub fn split_into_chunks(data: Bytes, chunk_size: usize) -> Vec<ChunkPiece> {
    assert!(chunk_size > 0, "chunk_size must be positive");

    if data.is_empty() {
        return vec![ChunkPiece {
            ordinal: 0,
            checksum: checksum_of(&data),
            bytes: data,
        }];
    }

    let mut pieces = Vec::with_capacity(data.len().div_ceil(chunk_size));
    let mut ordinal = 0u32;
    let mut rest = data;
    while !rest.is_empty() {
        let take = chunk_size.min(rest.len());
        let piece = rest.split_to(take);
        pieces.push(ChunkPiece {
            ordinal,
            checksum: checksum_of(&piece),
            bytes: piece,
        });
        ordinal += 1;
    }
    pieces
}

/// Hex-encoded BLAKE3 checksum of `bytes`, the chunk's 256-bit content
/// checksum (§3).
pub fn checksum_of(bytes: &[u8]) -> String {
    hex::encode(blake3::hash(bytes).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_into_contiguous_ordinals_with_final_short_piece() {
        let data = Bytes::from(vec![7u8; 9 * 1024 * 1024]);
        let pieces = split_into_chunks(data.clone(), 4 * 1024 * 1024);

        assert_eq!(pieces.len(), 3);
        assert_eq!(pieces[0].ordinal, 0);
        assert_eq!(pieces[1].ordinal, 1);
        assert_eq!(pieces[2].ordinal, 2);
        assert_eq!(pieces[0].bytes.len(), 4 * 1024 * 1024);
        assert_eq!(pieces[1].bytes.len(), 4 * 1024 * 1024);
        assert_eq!(pieces[2].bytes.len(), 1024 * 1024);

        let reassembled: Vec<u8> = pieces.iter().flat_map(|p| p.bytes.to_vec()).collect();
        assert_eq!(reassembled, data.to_vec());
    }

    #[test]
    fn empty_file_yields_one_empty_chunk() {
        let pieces = split_into_chunks(Bytes::new(), 4 * 1024 * 1024);
        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0].bytes.len(), 0);
    }

    #[test]
    fn checksum_changes_with_content() {
        let a = checksum_of(b"hello");
        let b = checksum_of(b"hellp");
        assert_ne!(a, b);
    }
}
