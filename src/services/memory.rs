use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::models::{
    Candidate, Pairing, Preferences, ProfileField, QueueEntry, User, UserId, UserStatus,
};
use crate::services::store::{ProfileStore, StoreError};

#[derive(Debug, Default)]
struct MemoryState {
    profiles: HashMap<UserId, User>,
    // Insertion order is queue order
    queue: Vec<QueueEntry>,
    pairings: HashMap<UserId, Pairing>,
}

impl MemoryState {
    fn profile_mut(&mut self, user_id: UserId) -> Result<&mut User, StoreError> {
        self.profiles
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::NotFound(format!("Profile not found for user {}", user_id)))
    }

    fn drop_queue_entry(&mut self, user_id: UserId) -> bool {
        let before = self.queue.len();
        self.queue.retain(|entry| entry.user_id != user_id);
        self.queue.len() != before
    }

    fn reset_to_idle(&mut self, user_id: UserId) {
        if let Some(profile) = self.profiles.get_mut(&user_id) {
            profile.status = UserStatus::Idle;
            profile.partner_id = None;
        }
    }
}

/// In-process store holding all three tables behind one lock.
///
/// Each trait method holds the lock for its whole body, which gives every
/// multi-row transition the same all-or-nothing behaviour as a database
/// transaction.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn get_profile(&self, user_id: UserId) -> Result<Option<User>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.profiles.get(&user_id).cloned())
    }

    async fn create_default_profile(
        &self,
        user_id: UserId,
        preferences: Preferences,
    ) -> Result<User, StoreError> {
        let mut state = self.state.lock().await;
        let profile = state
            .profiles
            .entry(user_id)
            .or_insert_with(|| User::new(user_id, preferences));
        Ok(profile.clone())
    }

    async fn upsert_profile_field(
        &self,
        user_id: UserId,
        field: ProfileField,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        state.profile_mut(user_id)?.apply(&field);
        Ok(())
    }

    async fn insert_queue_entry(&self, entry: &QueueEntry) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let profile = state.profile_mut(entry.user_id)?;
        if profile.status == UserStatus::Chatting {
            return Err(StoreError::Conflict(format!(
                "user {} is chatting and cannot be queued",
                entry.user_id
            )));
        }
        profile.status = UserStatus::Searching;

        state.drop_queue_entry(entry.user_id);
        state.queue.push(entry.clone());
        Ok(())
    }

    async fn remove_queue_entry(&self, user_id: UserId) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        if !state.drop_queue_entry(user_id) {
            return Ok(false);
        }
        if let Some(profile) = state.profiles.get_mut(&user_id) {
            profile.status = UserStatus::Idle;
        }
        Ok(true)
    }

    async fn is_queued(&self, user_id: UserId) -> Result<bool, StoreError> {
        let state = self.state.lock().await;
        Ok(state.queue.iter().any(|entry| entry.user_id == user_id))
    }

    async fn queued_in_city(
        &self,
        city: &str,
        exclude: UserId,
    ) -> Result<Vec<Candidate>, StoreError> {
        let state = self.state.lock().await;
        let candidates = state
            .queue
            .iter()
            .filter(|entry| entry.user_id != exclude)
            .filter_map(|entry| state.profiles.get(&entry.user_id))
            .filter(|profile| profile.location.as_deref() == Some(city))
            .filter_map(|profile| {
                Some(Candidate {
                    user_id: profile.user_id,
                    location: profile.location.clone()?,
                    coordinates: profile.coordinates,
                    gender: profile.gender,
                    age: profile.age?,
                    preferences: profile.preferences,
                })
            })
            .collect();
        Ok(candidates)
    }

    async fn queue_entries(&self) -> Result<Vec<QueueEntry>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.queue.clone())
    }

    async fn insert_pairing(
        &self,
        a: UserId,
        b: UserId,
        session_id: Uuid,
        paired_at: DateTime<Utc>,
    ) -> Result<Pairing, StoreError> {
        if a == b {
            return Err(StoreError::Conflict(format!("user {} cannot pair with itself", a)));
        }

        let mut state = self.state.lock().await;
        for user_id in [a, b] {
            let status = state
                .profiles
                .get(&user_id)
                .map(|profile| profile.status)
                .ok_or_else(|| StoreError::Conflict(format!("user {} does not exist", user_id)))?;
            if status != UserStatus::Searching || state.pairings.contains_key(&user_id) {
                return Err(StoreError::Conflict(format!(
                    "user {} is {:?}, expected searching",
                    user_id, status
                )));
            }
        }

        let pairing = Pairing {
            user_id: a,
            partner_id: b,
            session_id,
            paired_at,
        };
        state.pairings.insert(a, pairing);
        state.pairings.insert(b, pairing.reciprocal());

        for (user_id, partner_id) in [(a, b), (b, a)] {
            let profile = state.profile_mut(user_id)?;
            profile.status = UserStatus::Chatting;
            profile.partner_id = Some(partner_id);
            state.drop_queue_entry(user_id);
        }

        Ok(pairing)
    }

    async fn remove_pairing(&self, user_id: UserId) -> Result<Option<Pairing>, StoreError> {
        let mut state = self.state.lock().await;
        let Some(pairing) = state.pairings.remove(&user_id) else {
            return Ok(None);
        };
        state.pairings.remove(&pairing.partner_id);

        for id in [pairing.user_id, pairing.partner_id] {
            state.reset_to_idle(id);
            state.drop_queue_entry(id);
        }

        Ok(Some(pairing))
    }

    async fn find_pairing(&self, user_id: UserId) -> Result<Option<Pairing>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.pairings.get(&user_id).copied())
    }

    async fn count_pairings(&self) -> Result<u64, StoreError> {
        let state = self.state.lock().await;
        Ok((state.pairings.len() / 2) as u64)
    }

    async fn health_check(&self) -> Result<bool, StoreError> {
        Ok(true)
    }
}
