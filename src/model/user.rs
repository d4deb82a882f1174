//! The `User` entity (§3).
use super::Revision;
use crate::ids::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered user. Usernames are unique cluster-wide; uniqueness is
/// enforced by the owning metadata node at write time and, like file
/// names, can only be guaranteed locally under partition (see DESIGN.md,
/// O1, for the analogous file-name case).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Stable identifier, immutable for the life of the account.
    pub id: UserId,
    /// Unique username chosen at registration.
    pub username: String,
    /// Password verifier (never the plaintext password: a salted hash
    /// produced by the client-facing auth layer, out of scope here).
    pub password_verifier: String,
    /// Current bearer token, rotated on demand.
    pub bearer_token: String,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// When the bearer token was last rotated.
    pub token_rotated_at: DateTime<Utc>,
    /// Replication bookkeeping.
    pub revision: Revision,
}

impl User {
    /// Register a new user on the node that received the request.
    pub fn create(
        username: impl Into<String>,
        password_verifier: impl Into<String>,
        bearer_token: impl Into<String>,
        origin: &crate::ids::MetadataNodeId,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: UserId::new(),
            username: username.into(),
            password_verifier: password_verifier.into(),
            bearer_token: bearer_token.into(),
            created_at: now,
            token_rotated_at: now,
            revision: Revision::initial(origin),
        }
    }

    /// Rotate the bearer token, producing the next causal revision.
    pub fn rotate_token(
        &self,
        new_token: impl Into<String>,
        origin: &crate::ids::MetadataNodeId,
    ) -> Self {
        let mut next = self.clone();
        next.bearer_token = new_token.into();
        next.token_rotated_at = Utc::now();
        next.revision = self.revision.advance(origin);
        next
    }
}
