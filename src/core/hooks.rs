use async_trait::async_trait;
use std::sync::Arc;

use crate::models::UserId;

/// Subscriber to pairing lifecycle events
#[async_trait]
pub trait PairingListener: Send + Sync {
    async fn on_pairing_established(&self, a: UserId, b: UserId);

    async fn on_pairing_dissolved(&self, a: UserId, b: UserId);
}

/// Fan-out of pairing events to every subscriber, in subscription order
#[derive(Clone, Default)]
pub struct PairingHooks {
    listeners: Vec<Arc<dyn PairingListener>>,
}

impl PairingHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: Arc<dyn PairingListener>) {
        self.listeners.push(listener);
    }

    pub fn with_listener(mut self, listener: Arc<dyn PairingListener>) -> Self {
        self.subscribe(listener);
        self
    }

    pub(crate) async fn pairing_established(&self, a: UserId, b: UserId) {
        for listener in &self.listeners {
            listener.on_pairing_established(a, b).await;
        }
    }

    pub(crate) async fn pairing_dissolved(&self, a: UserId, b: UserId) {
        for listener in &self.listeners {
            listener.on_pairing_dissolved(a, b).await;
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tokio::sync::Mutex;

    /// Records every event it receives
    #[derive(Default)]
    pub struct RecordingListener {
        pub events: Mutex<Vec<(&'static str, UserId, UserId)>>,
    }

    #[async_trait]
    impl PairingListener for RecordingListener {
        async fn on_pairing_established(&self, a: UserId, b: UserId) {
            self.events.lock().await.push(("established", a, b));
        }

        async fn on_pairing_dissolved(&self, a: UserId, b: UserId) {
            self.events.lock().await.push(("dissolved", a, b));
        }
    }

    #[tokio::test]
    async fn test_events_reach_every_listener() {
        let first = Arc::new(RecordingListener::default());
        let second = Arc::new(RecordingListener::default());
        let hooks = PairingHooks::new()
            .with_listener(first.clone())
            .with_listener(second.clone());

        hooks.pairing_established(1, 2).await;
        hooks.pairing_dissolved(2, 1).await;

        for listener in [first, second] {
            let events = listener.events.lock().await;
            assert_eq!(
                *events,
                vec![("established", 1, 2), ("dissolved", 2, 1)]
            );
        }
    }
}
