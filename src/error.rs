/// Error types for RedCloud Files operations.
///
/// This module provides the error hierarchy used across the replication
/// engine, the chunk placement/repair machinery, and the discovery
/// substrate. All fallible operations return `Result<T, RedCloudError>`.
///
/// Background loops (gossip, anti-entropy, repair, health monitor) never
/// propagate these errors out of their task; they log and retry on the
/// next tick. Foreground request handlers map internal errors onto one of
/// the client-visible kinds below and never leak peer identities,
/// addresses, or vector-clock contents.
use thiserror::Error;

/// The main error type for RedCloud Files operations.
#[derive(Error, Debug)]
pub enum RedCloudError {
    /// Metadata has no record of the requested entity.
    #[error("not found: {0}")]
    NotFound(String),

    /// Metadata knows of the entity but every holder is unreachable.
    /// Distinct from `NotFound`: this is retriable.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// No active storage node could accept a write.
    #[error("no capacity: no active storage node available")]
    NoCapacity,

    /// A chunk write's checksum did not match its declared bytes.
    #[error("checksum mismatch for chunk {chunk_id}")]
    ChecksumMismatch {
        /// The chunk whose bytes failed verification.
        chunk_id: String,
    },

    /// A storage node rejected an overwrite of a chunk id with different
    /// bytes than it already holds (chunks are content-immutable).
    #[error("chunk {chunk_id} already holds different bytes")]
    ChunkConflict {
        /// The chunk id whose bytes diverged.
        chunk_id: String,
    },

    /// A name collision within one owner that survived conflict
    /// resolution as two distinct files (see DESIGN.md, O1).
    #[error("name '{name}' already in use for this owner")]
    NameConflict {
        /// The file name that collided.
        name: String,
    },

    /// The local metadata store failed to commit a transaction. No gossip
    /// entry is emitted when this occurs.
    #[error("local store transaction failed: {0}")]
    StoreTransactionFailed(String),

    /// A peer or storage node did not respond before its deadline.
    #[error("deadline exceeded contacting peer")]
    DeadlineExceeded,

    /// Transient failure reaching a peer; retried by the next periodic
    /// cycle and never surfaced to a client beyond the current attempt.
    #[error("peer unreachable: {0}")]
    PeerUnreachable(String),

    /// The DNS alias used for bootstrap could not be resolved.
    #[error("could not resolve alias '{0}'")]
    AliasUnresolvable(String),

    /// A newly-registered peer collides with an address already
    /// registered under a different node id.
    #[error("address collision with an already-registered peer")]
    AddressCollision,

    /// A backpressure limit (inflight writes per SN, concurrent repairs)
    /// was exceeded and the request was rejected rather than queued
    /// indefinitely.
    #[error("transient overload: {0}")]
    Overloaded(String),

    /// Serialization error converting to/from the wire format.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Transport-level failure (HTTP client/server).
    #[error("transport error: {0}")]
    Transport(String),

    /// Catch-all for invariant violations that should never be reachable
    /// from valid input.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias for RedCloud Files operations.
pub type RedCloudResult<T> = Result<T, RedCloudError>;

impl RedCloudError {
    /// Whether this error represents a condition the next periodic cycle
    /// should simply retry, as opposed to one that must be surfaced.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RedCloudError::PeerUnreachable(_)
                | RedCloudError::DeadlineExceeded
                | RedCloudError::Unavailable(_)
                | RedCloudError::Overloaded(_)
        )
    }
}
