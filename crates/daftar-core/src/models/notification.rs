//! Notification record — what the factory materializes and the inbox lists.
//!
//! Status machine: `Scheduled → Sent | Failed`. Independently of delivery, a
//! viewer may move any status to `Read` (terminal, sets `read_at`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    DebtReminder,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DebtReminder => "debt_reminder",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "debt_reminder" => Some(Self::DebtReminder),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationPriority {
    Medium,
    High,
}

impl NotificationPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Scheduled,
    Sent,
    Failed,
    Read,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Sent => "sent",
            Self::Failed => "failed",
            Self::Read => "read",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(Self::Scheduled),
            "sent" => Some(Self::Sent),
            "failed" => Some(Self::Failed),
            "read" => Some(Self::Read),
            _ => None,
        }
    }
}

/// Advisory tag only — transport is always the live-channel bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationChannel {
    InApp,
}

impl NotificationChannel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InApp => "in_app",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "in_app" => Some(Self::InApp),
            _ => None,
        }
    }
}

/// A persisted notification, referencing its triggering debt by id only
/// inside `data` (weak reference — deleting the debt keeps the record).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub owner: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    /// Client-side deep-linking payload: debt id, direction, amount, due date.
    pub data: serde_json::Value,
    pub priority: NotificationPriority,
    pub status: NotificationStatus,
    pub channel: NotificationChannel,
    pub scheduled_for: DateTime<Utc>,
    pub sent_at: Option<DateTime<Utc>>,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Create a debt reminder scheduled for immediate delivery.
    pub fn debt_reminder(
        owner: Uuid,
        title: String,
        message: String,
        priority: NotificationPriority,
        data: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner,
            kind: NotificationKind::DebtReminder,
            title,
            message,
            data,
            priority,
            status: NotificationStatus::Scheduled,
            channel: NotificationChannel::InApp,
            scheduled_for: now,
            sent_at: None,
            read_at: None,
            created_at: now,
        }
    }

    pub fn is_read(&self) -> bool {
        self.status == NotificationStatus::Read
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_reminder_starts_scheduled_and_unread() {
        let now = Utc::now();
        let n = Notification::debt_reminder(
            Uuid::new_v4(),
            "Qarz eslatmasi".into(),
            "test".into(),
            NotificationPriority::Medium,
            serde_json::json!({}),
            now,
        );
        assert_eq!(n.status, NotificationStatus::Scheduled);
        assert_eq!(n.scheduled_for, now);
        assert!(n.sent_at.is_none());
        assert!(n.read_at.is_none());
        assert!(!n.is_read());
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            NotificationStatus::Scheduled,
            NotificationStatus::Sent,
            NotificationStatus::Failed,
            NotificationStatus::Read,
        ] {
            assert_eq!(NotificationStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(NotificationStatus::parse("bogus"), None);
    }
}
