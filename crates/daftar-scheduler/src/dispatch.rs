//! Delivery dispatcher — best-effort live publish plus the status
//! transition on the persisted record.
//!
//! `NoSubscriber` still counts as sent: the record is durable and the inbox
//! surfaces it the next time the user opens the app. Only a bus error marks
//! the record `failed`.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use daftar_core::error::Result;
use daftar_core::models::{Notification, NotificationStatus};
use daftar_core::traits::{LiveBus, LivePayload, NotificationStore, PublishOutcome};

/// Pushes scheduled notifications over the live bus and records the outcome.
#[derive(Clone)]
pub struct Dispatcher {
    bus: Arc<dyn LiveBus>,
    notifications: Arc<dyn NotificationStore>,
}

impl Dispatcher {
    pub fn new(bus: Arc<dyn LiveBus>, notifications: Arc<dyn NotificationStore>) -> Self {
        Self { bus, notifications }
    }

    /// Deliver one scheduled notification. Returns the status the record
    /// ended in. Store errors propagate; bus errors are absorbed into the
    /// `failed` transition.
    pub async fn deliver(
        &self,
        notification: &Notification,
        now: DateTime<Utc>,
    ) -> Result<NotificationStatus> {
        let payload = LivePayload::from_notification(notification);
        match self.bus.publish(notification.owner, payload).await {
            Ok(outcome) => {
                if outcome == PublishOutcome::NoSubscriber {
                    tracing::debug!(
                        id = %notification.id,
                        owner = %notification.owner,
                        "owner offline, notification kept for the inbox"
                    );
                }
                self.notifications.mark_sent(notification.id, now).await?;
                Ok(NotificationStatus::Sent)
            }
            Err(e) => {
                tracing::warn!(id = %notification.id, error = %e, "live publish failed");
                self.notifications.mark_failed(notification.id).await?;
                Ok(NotificationStatus::Failed)
            }
        }
    }
}
