use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::core::{
    engine::PairingEngine,
    error::MatchError,
    filters::{accepts_requester, filter_candidates},
    hooks::PairingHooks,
    locks::UserLocks,
    queue::MatchQueue,
    ranker::{select_nearest, Selection},
};
use crate::models::{Gender, User, UserId, UserStatus};
use crate::services::store::ProfileStore;

/// Result of a match request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum MatchOutcome {
    Paired {
        #[serde(rename = "partnerId")]
        partner_id: UserId,
        #[serde(rename = "sessionId")]
        session_id: Uuid,
    },
    /// No compatible candidate yet; the user stays in the queue
    Queued,
}

/// Queue and pairing counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchStats {
    pub queued: usize,
    pub queued_male: usize,
    pub queued_female: usize,
    pub queued_unknown: usize,
    pub active_pairings: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct MatcherSettings {
    /// Also require the candidate's preferences to accept the requester
    pub mutual_preferences: bool,
    /// Selection re-runs after a conflicting commit
    pub max_commit_retries: u32,
}

impl Default for MatcherSettings {
    fn default() -> Self {
        Self {
            mutual_preferences: false,
            max_commit_retries: 3,
        }
    }
}

/// Matchmaking orchestrator
///
/// # Pipeline
/// 1. Validate and enqueue the requester (under the requester's lock)
/// 2. Same-city candidates from the queue, filtered by preferences
/// 3. Nearest candidate, or queue order without coordinates
/// 4. Commit under the ordered pair lock; the store re-checks both sides
#[derive(Clone)]
pub struct Matcher {
    store: Arc<dyn ProfileStore>,
    queue: MatchQueue,
    engine: PairingEngine,
    locks: UserLocks,
    settings: MatcherSettings,
}

impl Matcher {
    pub fn new(store: Arc<dyn ProfileStore>, hooks: PairingHooks, settings: MatcherSettings) -> Self {
        Self {
            queue: MatchQueue::new(store.clone()),
            engine: PairingEngine::new(store.clone(), hooks),
            store,
            locks: UserLocks::new(),
            settings,
        }
    }

    pub fn queue(&self) -> &MatchQueue {
        &self.queue
    }

    /// Start searching for a partner.
    ///
    /// Returns `Paired` when a compatible queued user was committed, `Queued`
    /// otherwise. Nothing is mutated when the request is refused.
    pub async fn request_match(&self, user_id: UserId) -> Result<MatchOutcome, MatchError> {
        {
            let _guard = self.locks.lock(user_id).await;
            let user = self.load(user_id).await?;

            match user.status {
                UserStatus::Chatting => return Err(MatchError::AlreadyPaired),
                UserStatus::Searching => return Err(MatchError::AlreadyQueued),
                UserStatus::Idle => {}
            }

            self.queue.enqueue(&user).await?;
        }

        tracing::info!("User {} is searching", user_id);

        for attempt in 0..=self.settings.max_commit_retries {
            let requester = self.load(user_id).await?;

            match requester.status {
                UserStatus::Searching => {}
                // Another flow picked this user while we were selecting
                UserStatus::Chatting => return self.paired_outcome(user_id).await,
                UserStatus::Idle => {
                    return Err(MatchError::StateConflict(format!(
                        "user {} stopped searching",
                        user_id
                    )))
                }
            }

            let Some(selection) = self.select_candidate(&requester).await? else {
                tracing::debug!("No candidate for user {}, staying queued", user_id);
                return Ok(MatchOutcome::Queued);
            };

            let _guard = self.locks.lock_pair(user_id, selection.user_id).await;
            match self.engine.commit_pairing(user_id, selection.user_id).await {
                Ok(pairing) => {
                    return Ok(MatchOutcome::Paired {
                        partner_id: pairing.partner_id,
                        session_id: pairing.session_id,
                    })
                }
                Err(MatchError::StateConflict(reason)) => {
                    tracing::debug!(
                        "Commit of {} with {} conflicted (attempt {}): {}",
                        user_id,
                        selection.user_id,
                        attempt + 1,
                        reason
                    );
                }
                Err(e) => return Err(e),
            }
        }

        tracing::warn!(
            "User {} stays queued after {} conflicting commits",
            user_id,
            self.settings.max_commit_retries + 1
        );
        Ok(MatchOutcome::Queued)
    }

    /// Leave the chat or the queue; returns the released partner, if any
    pub async fn request_stop(&self, user_id: UserId) -> Result<Option<UserId>, MatchError> {
        let _guard = match self.engine.current_partner(user_id).await? {
            Some(partner_id) => self.locks.lock_pair(user_id, partner_id).await,
            None => self.locks.lock(user_id).await,
        };

        if let Some(partner_id) = self.engine.dissolve_pairing(user_id).await? {
            return Ok(Some(partner_id));
        }

        if self.queue.dequeue(user_id).await? {
            tracing::info!("User {} stopped searching", user_id);
        }
        Ok(None)
    }

    pub async fn current_partner(&self, user_id: UserId) -> Result<Option<UserId>, MatchError> {
        self.engine.current_partner(user_id).await
    }

    /// Counters by queue snapshot gender
    pub async fn stats(&self) -> Result<MatchStats, MatchError> {
        let entries = self.queue.entries().await?;
        let count = |gender: Gender| entries.iter().filter(|e| e.gender == gender).count();

        Ok(MatchStats {
            queued: entries.len(),
            queued_male: count(Gender::Male),
            queued_female: count(Gender::Female),
            queued_unknown: count(Gender::Unknown),
            active_pairings: self.engine.active_pairings().await?,
        })
    }

    async fn load(&self, user_id: UserId) -> Result<User, MatchError> {
        self.store
            .get_profile(user_id)
            .await?
            .ok_or(MatchError::ProfileNotFound(user_id))
    }

    async fn paired_outcome(&self, user_id: UserId) -> Result<MatchOutcome, MatchError> {
        match self.engine.current_pairing(user_id).await? {
            Some(pairing) => Ok(MatchOutcome::Paired {
                partner_id: pairing.partner_id,
                session_id: pairing.session_id,
            }),
            None => Err(MatchError::StateConflict(format!(
                "user {} was released while matching",
                user_id
            ))),
        }
    }

    async fn select_candidate(&self, requester: &User) -> Result<Option<Selection>, MatchError> {
        let Some(city) = requester.location.as_deref() else {
            return Ok(None);
        };

        let pool = self.queue.candidates_in_city(city, requester.user_id).await?;
        let pool_size = pool.len();

        let mut compatible = filter_candidates(&requester.preferences, pool);
        if self.settings.mutual_preferences {
            compatible.retain(|candidate| accepts_requester(candidate, requester));
        }

        tracing::debug!(
            "{} of {} queued users in {} are compatible with user {}",
            compatible.len(),
            pool_size,
            city,
            requester.user_id
        );

        Ok(select_nearest(
            requester.coordinates,
            requester.preferences.radius_km,
            &compatible,
        ))
    }
}
