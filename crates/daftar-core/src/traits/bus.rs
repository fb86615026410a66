//! Live-channel bus — best-effort real-time delivery to a connected client.
//!
//! The bus is an injected capability, not a global handle. "Nobody is
//! listening" is an explicit outcome distinct from a transport error: the
//! dispatcher records the former as `sent` and only the latter as `failed`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::models::Notification;

/// What the publish call reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// At least one live subscriber received the payload.
    Delivered,
    /// The bus is up but the owner has no active subscriber.
    NoSubscriber,
}

/// The wire shape delivered to a connected client. This is the contract the
/// UI layer renders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivePayload {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    pub kind: String,
    pub priority: String,
    pub created_at: DateTime<Utc>,
    pub data: serde_json::Value,
}

impl LivePayload {
    pub fn from_notification(n: &Notification) -> Self {
        Self {
            id: n.id,
            title: n.title.clone(),
            message: n.message.clone(),
            kind: n.kind.as_str().to_string(),
            priority: n.priority.as_str().to_string(),
            created_at: n.created_at,
            data: n.data.clone(),
        }
    }
}

/// Publish/subscribe transport keyed by user identity.
#[async_trait]
pub trait LiveBus: Send + Sync {
    /// Publish to the owner's channel. `Err` means the transport itself
    /// failed; an offline owner is `Ok(NoSubscriber)`.
    async fn publish(&self, owner: Uuid, payload: LivePayload) -> Result<PublishOutcome>;
}
