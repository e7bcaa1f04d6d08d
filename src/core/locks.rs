use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::models::UserId;

/// Exclusive access to one or two users' matchmaking state
pub struct UserGuard {
    _guards: Vec<OwnedMutexGuard<()>>,
}

/// Per-user async locks.
///
/// Pair locks are always taken in ascending id order so two flows locking the
/// same pair from opposite ends cannot deadlock. Idle entries are pruned on
/// each acquisition.
#[derive(Clone, Default)]
pub struct UserLocks {
    table: Arc<Mutex<HashMap<UserId, Arc<AsyncMutex<()>>>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, user_id: UserId) -> Arc<AsyncMutex<()>> {
        let mut table = match self.table.lock() {
            Ok(table) => table,
            Err(poisoned) => poisoned.into_inner(),
        };
        // Only the table holds unused slots
        table.retain(|id, slot| *id == user_id || Arc::strong_count(slot) > 1);
        table.entry(user_id).or_default().clone()
    }

    pub async fn lock(&self, user_id: UserId) -> UserGuard {
        let guard = self.slot(user_id).lock_owned().await;
        UserGuard {
            _guards: vec![guard],
        }
    }

    pub async fn lock_pair(&self, a: UserId, b: UserId) -> UserGuard {
        if a == b {
            return self.lock(a).await;
        }

        let (first, second) = if a < b { (a, b) } else { (b, a) };
        let first = self.slot(first).lock_owned().await;
        let second = self.slot(second).lock_owned().await;
        UserGuard {
            _guards: vec![first, second],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_lock_is_exclusive_per_user() {
        let locks = UserLocks::new();
        let guard = locks.lock(1).await;

        let blocked = tokio::time::timeout(Duration::from_millis(50), locks.lock(1)).await;
        assert!(blocked.is_err());

        // Other users are unaffected
        let other = tokio::time::timeout(Duration::from_millis(50), locks.lock(2)).await;
        assert!(other.is_ok());

        drop(guard);
        let reacquired = tokio::time::timeout(Duration::from_millis(50), locks.lock(1)).await;
        assert!(reacquired.is_ok());
    }

    #[tokio::test]
    async fn test_pair_lock_blocks_both_users() {
        let locks = UserLocks::new();
        let _pair = locks.lock_pair(5, 3).await;

        for id in [3, 5] {
            let blocked = tokio::time::timeout(Duration::from_millis(50), locks.lock(id)).await;
            assert!(blocked.is_err(), "user {} should be locked", id);
        }
    }

    #[tokio::test]
    async fn test_opposite_pair_orders_do_not_deadlock() {
        let locks = UserLocks::new();

        let mut handles = Vec::new();
        for i in 0..50 {
            let locks = locks.clone();
            handles.push(tokio::spawn(async move {
                let (a, b) = if i % 2 == 0 { (1, 2) } else { (2, 1) };
                let _guard = locks.lock_pair(a, b).await;
                tokio::task::yield_now().await;
            }));
        }

        let all = async {
            for handle in handles {
                handle.await.unwrap();
            }
        };
        assert!(tokio::time::timeout(Duration::from_secs(5), all).await.is_ok());
    }

    #[tokio::test]
    async fn test_same_id_pair_takes_single_lock() {
        let locks = UserLocks::new();
        let guard = tokio::time::timeout(Duration::from_millis(50), locks.lock_pair(4, 4)).await;
        assert!(guard.is_ok());
    }
}
