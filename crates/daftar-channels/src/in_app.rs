//! In-app live bus — per-user broadcast channels.
//!
//! Publishing to a user with no active subscriber is a normal outcome
//! (`NoSubscriber`), not an error: the inbox listing is the fallback surface
//! for offline users.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::broadcast;
use uuid::Uuid;

use daftar_core::error::{DaftarError, Result};
use daftar_core::traits::{LiveBus, LivePayload, PublishOutcome};

const DEFAULT_CAPACITY: usize = 64;

/// Process-local publish/subscribe bus keyed by user identity.
pub struct InAppBus {
    topics: Mutex<HashMap<Uuid, broadcast::Sender<LivePayload>>>,
    capacity: usize,
}

impl InAppBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Per-user ring buffer capacity; slow subscribers lag, they do not
    /// block the publisher.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            topics: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Subscribe to a user's channel. Called by the UI gateway when a client
    /// connects.
    pub fn subscribe(&self, owner: Uuid) -> Result<broadcast::Receiver<LivePayload>> {
        let mut topics = self.lock()?;
        let sender = topics
            .entry(owner)
            .or_insert_with(|| broadcast::channel(self.capacity).0);
        Ok(sender.subscribe())
    }

    /// Active subscriber count for a user.
    pub fn subscriber_count(&self, owner: Uuid) -> Result<usize> {
        let topics = self.lock()?;
        Ok(topics.get(&owner).map_or(0, |tx| tx.receiver_count()))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<Uuid, broadcast::Sender<LivePayload>>>> {
        self.topics
            .lock()
            .map_err(|e| DaftarError::Bus(format!("topic map lock poisoned: {e}")))
    }
}

impl Default for InAppBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LiveBus for InAppBus {
    async fn publish(&self, owner: Uuid, payload: LivePayload) -> Result<PublishOutcome> {
        let topics = self.lock()?;
        match topics.get(&owner) {
            Some(tx) if tx.receiver_count() > 0 => match tx.send(payload) {
                Ok(_) => Ok(PublishOutcome::Delivered),
                // all receivers dropped between the count and the send
                Err(_) => Ok(PublishOutcome::NoSubscriber),
            },
            _ => {
                tracing::debug!(%owner, "no live subscriber, inbox will surface the notification");
                Ok(PublishOutcome::NoSubscriber)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn payload(title: &str) -> LivePayload {
        LivePayload {
            id: Uuid::new_v4(),
            title: title.into(),
            message: "test".into(),
            kind: "debt_reminder".into(),
            priority: "medium".into(),
            created_at: Utc::now(),
            data: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn publish_without_subscriber_reports_no_subscriber() {
        let bus = InAppBus::new();
        let outcome = bus.publish(Uuid::new_v4(), payload("hello")).await.unwrap();
        assert_eq!(outcome, PublishOutcome::NoSubscriber);
    }

    #[tokio::test]
    async fn subscriber_receives_published_payload() {
        let bus = InAppBus::new();
        let owner = Uuid::new_v4();
        let mut rx = bus.subscribe(owner).unwrap();
        assert_eq!(bus.subscriber_count(owner).unwrap(), 1);

        let outcome = bus.publish(owner, payload("salom")).await.unwrap();
        assert_eq!(outcome, PublishOutcome::Delivered);

        let received = rx.recv().await.unwrap();
        assert_eq!(received.title, "salom");
    }

    #[tokio::test]
    async fn dropped_subscriber_counts_as_offline() {
        let bus = InAppBus::new();
        let owner = Uuid::new_v4();
        let rx = bus.subscribe(owner).unwrap();
        drop(rx);

        let outcome = bus.publish(owner, payload("hello")).await.unwrap();
        assert_eq!(outcome, PublishOutcome::NoSubscriber);
    }

    #[tokio::test]
    async fn channels_are_isolated_per_owner() {
        let bus = InAppBus::new();
        let listener = Uuid::new_v4();
        let other = Uuid::new_v4();
        let mut rx = bus.subscribe(listener).unwrap();

        bus.publish(other, payload("not yours")).await.unwrap();
        bus.publish(listener, payload("yours")).await.unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.title, "yours");
        assert!(rx.try_recv().is_err());
    }
}
