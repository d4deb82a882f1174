//! Stable identifiers used throughout the replicated data model.
//!
//! Entities reference each other only by these opaque ids (never by
//! in-memory pointer) so that cycles such as file ↔ chunk back-references
//! never require anything more than a `HashMap` lookup.
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! stable_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Generate a new random id.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

stable_id!(UserId, "Stable identifier for a `User`.");
stable_id!(FileId, "Stable identifier for a `File`.");
stable_id!(ChunkId, "Stable identifier for a `Chunk` descriptor.");
stable_id!(StorageNodeId, "Stable identifier for a storage node.");

/// Stable identifier for a metadata node.
///
/// Composes host identity with a *session epoch*: the process-start
/// timestamp in milliseconds since the Unix epoch, so that a restarted
/// process never reuses a vector-clock slot a prior incarnation occupied
/// (P3). Two processes on the same host that start at different times get
/// distinct ids even if an operator reuses a hostname or config file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MetadataNodeId {
    /// Operator-assigned or hostname-derived identity.
    pub host_id: String,
    /// Milliseconds since the Unix epoch at process start.
    pub session_epoch: i64,
}

impl MetadataNodeId {
    /// Construct an id from a host identity and an explicit session epoch.
    ///
    /// Exposed separately from [`MetadataNodeId::generate`] so tests can
    /// construct deterministic ids without racing the wall clock.
    pub fn new(host_id: impl Into<String>, session_epoch: i64) -> Self {
        Self {
            host_id: host_id.into(),
            session_epoch,
        }
    }

    /// Generate an id for the current process: `host_id` as given, session
    /// epoch taken from the current wall-clock time.
    pub fn generate(host_id: impl Into<String>) -> Self {
        Self::new(host_id, chrono::Utc::now().timestamp_millis())
    }
}

impl fmt::Display for MetadataNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.host_id, self.session_epoch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restart_with_fresh_epoch_never_reuses_slot() {
        let before = MetadataNodeId::new("node-a", 1_000);
        let after = MetadataNodeId::new("node-a", 2_000);
        assert_ne!(before, after);
        assert_eq!(before.host_id, after.host_id);
    }

    #[test]
    fn display_is_stable_and_readable() {
        let id = MetadataNodeId::new("node-a", 42);
        assert_eq!(id.to_string(), "node-a@42");
    }
}
