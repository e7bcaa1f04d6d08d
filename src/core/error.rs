use thiserror::Error;

use crate::models::UserId;
use crate::services::store::StoreError;

/// Errors reported by the matchmaking core
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Profile not found for user {0}")]
    ProfileNotFound(UserId),

    #[error("Profile is incomplete: gender, age and location are required")]
    ProfileIncomplete,

    #[error("User is already in a chat")]
    AlreadyPaired,

    #[error("User is already searching")]
    AlreadyQueued,

    /// A commit whose preconditions no longer hold; the caller may retry
    #[error("State conflict: {0}")]
    StateConflict(String),

    #[error("Store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for MatchError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(reason) => MatchError::StateConflict(reason),
            other => MatchError::Store(other),
        }
    }
}
