//! The replicated data model (§3).
//!
//! Every mutable entity embeds a [`Revision`]: a vector clock, the
//! identifier of the node that last modified it, a monotonic version
//! counter, and a wall-clock stamp used as a deterministic tiebreaker by
//! the conflict resolver (§4.2). Entities reference each other only by the
//! stable ids in [`crate::ids`], never by pointer, so the file↔chunk
//! back-reference cycle never needs anything more than a map lookup.
mod chunk;
mod file;
mod gossip_log;
mod node_record;
mod user;

pub use chunk::{Chunk, LocationFact, LocationSet};
pub use file::File;
pub use gossip_log::{EntityKind, GossipEntry, OpKind};
pub use node_record::{MetadataNodeRecord, Liveness, StorageNodeRecord};
pub use user::User;

use crate::ids::MetadataNodeId;
use crate::vector_clock::VectorClock;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Replication bookkeeping shared by every mutable entity (§3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    /// Causal version of this entity.
    pub vector_clock: VectorClock,
    /// The metadata node that produced this version.
    pub last_modified_by: MetadataNodeId,
    /// Monotonically increasing per-entity version counter, bumped on
    /// every local mutation (including conflict-resolution merges).
    pub version: u64,
    /// Wall-clock stamp of this version, used as a deterministic
    /// tiebreaker for concurrent scalar-field writes (§4.2).
    pub stamp: DateTime<Utc>,
}

impl Revision {
    /// The first revision of a freshly created entity.
    pub fn initial(origin: &MetadataNodeId) -> Self {
        Self {
            vector_clock: VectorClock::new().increment(origin),
            last_modified_by: origin.clone(),
            version: 1,
            stamp: Utc::now(),
        }
    }

    /// The next revision after a local mutation by `origin`.
    pub fn advance(&self, origin: &MetadataNodeId) -> Self {
        Self {
            vector_clock: self.vector_clock.increment(origin),
            last_modified_by: origin.clone(),
            version: self.version + 1,
            stamp: Utc::now(),
        }
    }
}
