use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Candidate, Pairing, Preferences, ProfileField, QueueEntry, User, UserId};

/// Errors that can occur in the profile store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),

    #[error("Not found: {0}")]
    NotFound(String),

    /// A multi-row transition was refused because its preconditions no longer hold
    #[error("State conflict: {0}")]
    Conflict(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Persistence for profiles, queue membership and pairing links.
///
/// Every method that touches more than one row runs as a single transaction
/// and re-checks its preconditions inside it, so callers never observe a
/// half-applied transition.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, user_id: UserId) -> Result<Option<User>, StoreError>;

    /// Create an idle profile with the given preferences, or return the existing one
    async fn create_default_profile(
        &self,
        user_id: UserId,
        preferences: Preferences,
    ) -> Result<User, StoreError>;

    async fn upsert_profile_field(
        &self,
        user_id: UserId,
        field: ProfileField,
    ) -> Result<(), StoreError>;

    /// Insert or replace a queue entry and mark the user `searching`.
    ///
    /// A replaced entry moves to the back of the queue. Fails with
    /// `Conflict` when the user is chatting.
    async fn insert_queue_entry(&self, entry: &QueueEntry) -> Result<(), StoreError>;

    /// Remove a queue entry and mark the user `idle`; `false` if none existed
    async fn remove_queue_entry(&self, user_id: UserId) -> Result<bool, StoreError>;

    async fn is_queued(&self, user_id: UserId) -> Result<bool, StoreError>;

    /// Queued users located in `city`, joined with their live profile, in queue order
    async fn queued_in_city(
        &self,
        city: &str,
        exclude: UserId,
    ) -> Result<Vec<Candidate>, StoreError>;

    /// All queue entries in queue order
    async fn queue_entries(&self) -> Result<Vec<QueueEntry>, StoreError>;

    /// Link two searching users.
    ///
    /// Writes both reciprocal records, marks both `chatting` with each other
    /// as partner, and drops both queue entries. Fails with `Conflict` unless
    /// both users exist, are distinct and are currently `searching`.
    async fn insert_pairing(
        &self,
        a: UserId,
        b: UserId,
        session_id: Uuid,
        paired_at: DateTime<Utc>,
    ) -> Result<Pairing, StoreError>;

    /// Remove the pairing of `user_id` and its reciprocal, reset both users to
    /// `idle` and drop any queue entries they hold. `None` without mutation
    /// when the user has no pairing.
    async fn remove_pairing(&self, user_id: UserId) -> Result<Option<Pairing>, StoreError>;

    async fn find_pairing(&self, user_id: UserId) -> Result<Option<Pairing>, StoreError>;

    /// Number of active pairings, each reciprocal pair counted once
    async fn count_pairings(&self) -> Result<u64, StoreError>;

    async fn health_check(&self) -> Result<bool, StoreError>;
}
