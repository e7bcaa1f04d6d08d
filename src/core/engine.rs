use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::error::MatchError;
use crate::core::hooks::PairingHooks;
use crate::models::{Pairing, UserId};
use crate::services::store::ProfileStore;

/// Authority over status transitions and pairing records
#[derive(Clone)]
pub struct PairingEngine {
    store: Arc<dyn ProfileStore>,
    hooks: PairingHooks,
}

impl PairingEngine {
    pub fn new(store: Arc<dyn ProfileStore>, hooks: PairingHooks) -> Self {
        Self { store, hooks }
    }

    /// Pair two searching users in one atomic store transition.
    ///
    /// Refused with `StateConflict` when either side stopped searching or was
    /// paired elsewhere since it was selected.
    pub async fn commit_pairing(&self, a: UserId, b: UserId) -> Result<Pairing, MatchError> {
        if a == b {
            return Err(MatchError::StateConflict(format!(
                "user {} cannot pair with itself",
                a
            )));
        }

        let pairing = self
            .store
            .insert_pairing(a, b, Uuid::new_v4(), Utc::now())
            .await?;

        tracing::info!(
            "Paired users {} and {} (session {})",
            a,
            b,
            pairing.session_id
        );
        self.hooks.pairing_established(a, b).await;

        Ok(pairing)
    }

    /// End the user's chat; returns the released partner, `None` without mutation
    pub async fn dissolve_pairing(&self, user_id: UserId) -> Result<Option<UserId>, MatchError> {
        let Some(pairing) = self.store.remove_pairing(user_id).await? else {
            return Ok(None);
        };

        tracing::info!(
            "Dissolved pairing of {} and {} (session {})",
            pairing.user_id,
            pairing.partner_id,
            pairing.session_id
        );
        self.hooks
            .pairing_dissolved(pairing.user_id, pairing.partner_id)
            .await;

        Ok(Some(pairing.partner_id))
    }

    pub async fn current_partner(&self, user_id: UserId) -> Result<Option<UserId>, MatchError> {
        Ok(self.current_pairing(user_id).await?.map(|p| p.partner_id))
    }

    pub async fn current_pairing(&self, user_id: UserId) -> Result<Option<Pairing>, MatchError> {
        Ok(self.store.find_pairing(user_id).await?)
    }

    pub async fn active_pairings(&self) -> Result<u64, MatchError> {
        Ok(self.store.count_pairings().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hooks::tests::RecordingListener;
    use crate::models::{Gender, Preferences, ProfileField, QueueEntry, UserStatus};
    use crate::services::memory::MemoryStore;

    async fn searching(store: &MemoryStore, user_id: UserId) {
        store
            .create_default_profile(user_id, Preferences::default())
            .await
            .unwrap();
        store
            .upsert_profile_field(user_id, ProfileField::Gender(Gender::Female))
            .await
            .unwrap();
        store
            .upsert_profile_field(user_id, ProfileField::Age(30))
            .await
            .unwrap();
        let user = store.get_profile(user_id).await.unwrap().unwrap();
        store
            .insert_queue_entry(&QueueEntry::snapshot(&user).unwrap())
            .await
            .unwrap();
    }

    fn engine(store: Arc<MemoryStore>, listener: Arc<RecordingListener>) -> PairingEngine {
        PairingEngine::new(store, PairingHooks::new().with_listener(listener))
    }

    #[tokio::test]
    async fn test_commit_pairs_both_sides() {
        let store = Arc::new(MemoryStore::new());
        let listener = Arc::new(RecordingListener::default());
        let engine = engine(store.clone(), listener.clone());
        searching(&store, 1).await;
        searching(&store, 2).await;

        let pairing = engine.commit_pairing(1, 2).await.unwrap();
        assert_eq!(pairing.partner_id, 2);

        for (user_id, partner_id) in [(1, 2), (2, 1)] {
            let user = store.get_profile(user_id).await.unwrap().unwrap();
            assert_eq!(user.status, UserStatus::Chatting);
            assert_eq!(user.partner_id, Some(partner_id));
            assert!(!store.is_queued(user_id).await.unwrap());
            assert_eq!(engine.current_partner(user_id).await.unwrap(), Some(partner_id));
        }

        assert_eq!(*listener.events.lock().await, vec![("established", 1, 2)]);
    }

    #[tokio::test]
    async fn test_commit_refuses_already_chatting() {
        let store = Arc::new(MemoryStore::new());
        let listener = Arc::new(RecordingListener::default());
        let engine = engine(store.clone(), listener.clone());
        for id in 1..=3 {
            searching(&store, id).await;
        }

        engine.commit_pairing(1, 2).await.unwrap();
        let result = engine.commit_pairing(3, 2).await;
        assert!(matches!(result, Err(MatchError::StateConflict(_))));

        // Loser stays queued, the existing pair is untouched
        assert!(store.is_queued(3).await.unwrap());
        assert_eq!(engine.current_partner(2).await.unwrap(), Some(1));
        assert_eq!(listener.events.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_commit_refuses_self_pairing() {
        let store = Arc::new(MemoryStore::new());
        let engine = engine(store.clone(), Arc::new(RecordingListener::default()));
        searching(&store, 1).await;

        let result = engine.commit_pairing(1, 1).await;
        assert!(matches!(result, Err(MatchError::StateConflict(_))));
    }

    #[tokio::test]
    async fn test_dissolve_releases_both_and_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let listener = Arc::new(RecordingListener::default());
        let engine = engine(store.clone(), listener.clone());
        searching(&store, 1).await;
        searching(&store, 2).await;
        engine.commit_pairing(1, 2).await.unwrap();

        assert_eq!(engine.dissolve_pairing(2).await.unwrap(), Some(1));
        for user_id in [1, 2] {
            let user = store.get_profile(user_id).await.unwrap().unwrap();
            assert_eq!(user.status, UserStatus::Idle);
            assert_eq!(user.partner_id, None);
        }

        assert_eq!(engine.dissolve_pairing(2).await.unwrap(), None);
        assert_eq!(engine.dissolve_pairing(1).await.unwrap(), None);

        let events = listener.events.lock().await;
        assert_eq!(*events, vec![("established", 1, 2), ("dissolved", 2, 1)]);
    }
}
