use std::sync::Arc;

use crate::core::error::MatchError;
use crate::models::{Candidate, QueueEntry, User, UserId, UserStatus};
use crate::services::store::ProfileStore;

/// The set of users currently searching.
///
/// Sole writer of queue entries. Callers serialize per user through the
/// matcher's lock table.
#[derive(Clone)]
pub struct MatchQueue {
    store: Arc<dyn ProfileStore>,
}

impl MatchQueue {
    pub fn new(store: Arc<dyn ProfileStore>) -> Self {
        Self { store }
    }

    /// Queue a user with a snapshot of their gender and age.
    ///
    /// An existing entry is replaced and moves to the back.
    pub async fn enqueue(&self, user: &User) -> Result<QueueEntry, MatchError> {
        if user.status == UserStatus::Chatting {
            return Err(MatchError::AlreadyPaired);
        }
        if !user.is_complete() {
            return Err(MatchError::ProfileIncomplete);
        }
        let entry = QueueEntry::snapshot(user).ok_or(MatchError::ProfileIncomplete)?;

        self.store.insert_queue_entry(&entry).await?;
        tracing::debug!(
            "Queued user {} ({:?}, {})",
            entry.user_id,
            entry.gender,
            entry.age
        );
        Ok(entry)
    }

    /// Remove a user from the queue; `false` if they were not queued
    pub async fn dequeue(&self, user_id: UserId) -> Result<bool, MatchError> {
        let removed = self.store.remove_queue_entry(user_id).await?;
        if removed {
            tracing::debug!("Dequeued user {}", user_id);
        }
        Ok(removed)
    }

    pub async fn is_queued(&self, user_id: UserId) -> Result<bool, MatchError> {
        Ok(self.store.is_queued(user_id).await?)
    }

    /// Queued users in `city` other than `exclude`, in queue order
    pub async fn candidates_in_city(
        &self,
        city: &str,
        exclude: UserId,
    ) -> Result<Vec<Candidate>, MatchError> {
        Ok(self.store.queued_in_city(city, exclude).await?)
    }

    pub async fn entries(&self) -> Result<Vec<QueueEntry>, MatchError> {
        Ok(self.store.queue_entries().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Gender, Preferences, ProfileField};
    use crate::services::memory::MemoryStore;

    async fn profile(store: &MemoryStore, user_id: UserId, complete: bool) -> User {
        store
            .create_default_profile(user_id, Preferences::default())
            .await
            .unwrap();
        store
            .upsert_profile_field(user_id, ProfileField::Gender(Gender::Male))
            .await
            .unwrap();
        store
            .upsert_profile_field(user_id, ProfileField::Age(22))
            .await
            .unwrap();
        if complete {
            store
                .upsert_profile_field(user_id, ProfileField::Location("Bandung".to_string()))
                .await
                .unwrap();
        }
        store.get_profile(user_id).await.unwrap().unwrap()
    }

    #[tokio::test]
    async fn test_enqueue_marks_searching() {
        let store = Arc::new(MemoryStore::new());
        let queue = MatchQueue::new(store.clone());
        let user = profile(&store, 1, true).await;

        let entry = queue.enqueue(&user).await.unwrap();
        assert_eq!(entry.age, 22);
        assert!(queue.is_queued(1).await.unwrap());

        let stored = store.get_profile(1).await.unwrap().unwrap();
        assert_eq!(stored.status, UserStatus::Searching);
    }

    #[tokio::test]
    async fn test_enqueue_twice_keeps_one_entry() {
        let store = Arc::new(MemoryStore::new());
        let queue = MatchQueue::new(store.clone());
        let user = profile(&store, 1, true).await;

        queue.enqueue(&user).await.unwrap();
        queue.enqueue(&user).await.unwrap();
        assert_eq!(queue.entries().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_enqueue_incomplete_profile() {
        let store = Arc::new(MemoryStore::new());
        let queue = MatchQueue::new(store.clone());
        let user = profile(&store, 1, false).await;

        let result = queue.enqueue(&user).await;
        assert!(matches!(result, Err(MatchError::ProfileIncomplete)));
        assert!(!queue.is_queued(1).await.unwrap());
    }

    #[tokio::test]
    async fn test_dequeue_is_noop_when_absent() {
        let store = Arc::new(MemoryStore::new());
        let queue = MatchQueue::new(store.clone());
        profile(&store, 1, true).await;

        assert!(!queue.dequeue(1).await.unwrap());
        let stored = store.get_profile(1).await.unwrap().unwrap();
        assert_eq!(stored.status, UserStatus::Idle);
    }
}
