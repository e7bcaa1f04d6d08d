//! Anon Match - matchmaking and pairing engine for anonymous one-on-one chat
//!
//! Users wait in a queue, are filtered by declared gender and age preferences
//! within their city, ranked by distance, and committed into exclusive
//! reciprocal pairings. Pairing lifecycle events fan out to subscribers such
//! as the mini-game registry.

pub mod config;
pub mod core;
pub mod games;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{MatchError, MatchOutcome, Matcher, MatcherSettings, PairingHooks, PairingListener};
pub use models::{Coordinates, Gender, GenderPreference, Preferences, User, UserId, UserStatus};
pub use services::{MemoryStore, PostgresStore, ProfileStore};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_library_exports() {
        let store: Arc<dyn ProfileStore> = Arc::new(MemoryStore::new());
        let matcher = Matcher::new(store, PairingHooks::new(), MatcherSettings::default());
        assert_eq!(matcher.current_partner(1).await.unwrap(), None);
    }
}
