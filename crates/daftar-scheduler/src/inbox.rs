//! Inbox — the read surface over persisted notifications.
//!
//! Everything here is owner-scoped: a caller can only see and mutate their
//! own records. Delivery status never blocks visibility, so a `failed`
//! record still shows up and can be read.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use daftar_core::error::Result;
use daftar_core::models::Notification;
use daftar_core::traits::NotificationStore;

const DEFAULT_PAGE: usize = 50;

/// Owner-scoped notification listing and read-state management.
#[derive(Clone)]
pub struct Inbox {
    notifications: Arc<dyn NotificationStore>,
}

impl Inbox {
    pub fn new(notifications: Arc<dyn NotificationStore>) -> Self {
        Self { notifications }
    }

    /// Newest-first page of the owner's notifications.
    pub async fn list(
        &self,
        owner: Uuid,
        unread_only: bool,
        limit: Option<usize>,
    ) -> Result<Vec<Notification>> {
        self.notifications
            .list_by_owner(owner, unread_only, limit.unwrap_or(DEFAULT_PAGE))
            .await
    }

    /// Unread badge count.
    pub async fn unread_count(&self, owner: Uuid) -> Result<u64> {
        self.notifications.unread_count(owner).await
    }

    /// Mark one notification read. Idempotent; false when the record was
    /// already read or belongs to someone else.
    pub async fn mark_read(&self, owner: Uuid, id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        self.notifications.mark_read(owner, id, now).await
    }

    /// Mark everything read; returns how many records transitioned.
    pub async fn mark_all_read(&self, owner: Uuid, now: DateTime<Utc>) -> Result<u64> {
        self.notifications.mark_all_read(owner, now).await
    }

    /// Remove one notification.
    pub async fn delete(&self, owner: Uuid, id: Uuid) -> Result<bool> {
        self.notifications.delete(owner, id).await
    }

    /// Clear the owner's inbox; returns how many records were removed.
    pub async fn delete_all(&self, owner: Uuid) -> Result<u64> {
        self.notifications.delete_all(owner).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use daftar_core::models::{NotificationPriority, NotificationStatus};
    use daftar_store::SqliteDb;

    fn inbox_over(db: &SqliteDb) -> Inbox {
        Inbox::new(Arc::new(db.notifications()))
    }

    async fn seed(db: &SqliteDb, owner: Uuid, title: &str) -> Notification {
        let n = Notification::debt_reminder(
            owner,
            title.into(),
            "test".into(),
            NotificationPriority::Medium,
            serde_json::json!({}),
            Utc::now(),
        );
        db.notifications().insert(&n).await.unwrap();
        n
    }

    #[tokio::test]
    async fn unread_filter_and_badge_count() {
        let db = SqliteDb::open_in_memory().unwrap();
        let inbox = inbox_over(&db);
        let owner = Uuid::new_v4();

        let first = seed(&db, owner, "birinchi").await;
        seed(&db, owner, "ikkinchi").await;
        assert_eq!(inbox.unread_count(owner).await.unwrap(), 2);

        assert!(inbox.mark_read(owner, first.id, Utc::now()).await.unwrap());
        assert_eq!(inbox.unread_count(owner).await.unwrap(), 1);

        let unread = inbox.list(owner, true, None).await.unwrap();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].title, "ikkinchi");

        let all = inbox.list(owner, false, None).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn mark_read_is_owner_scoped_and_idempotent() {
        let db = SqliteDb::open_in_memory().unwrap();
        let inbox = inbox_over(&db);
        let owner = Uuid::new_v4();
        let n = seed(&db, owner, "sizniki").await;

        // someone else cannot read it away
        assert!(!inbox.mark_read(Uuid::new_v4(), n.id, Utc::now()).await.unwrap());

        assert!(inbox.mark_read(owner, n.id, Utc::now()).await.unwrap());
        assert!(!inbox.mark_read(owner, n.id, Utc::now()).await.unwrap());

        let stored = db.notifications().get(n.id).await.unwrap().unwrap();
        assert_eq!(stored.status, NotificationStatus::Read);
        assert!(stored.read_at.is_some());
    }

    #[tokio::test]
    async fn mark_all_read_reports_the_transition_count() {
        let db = SqliteDb::open_in_memory().unwrap();
        let inbox = inbox_over(&db);
        let owner = Uuid::new_v4();
        for i in 0..3 {
            seed(&db, owner, &format!("n{i}")).await;
        }
        seed(&db, Uuid::new_v4(), "begona").await;

        assert_eq!(inbox.mark_all_read(owner, Utc::now()).await.unwrap(), 3);
        assert_eq!(inbox.mark_all_read(owner, Utc::now()).await.unwrap(), 0);
        assert_eq!(inbox.unread_count(owner).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn delete_and_clear() {
        let db = SqliteDb::open_in_memory().unwrap();
        let inbox = inbox_over(&db);
        let owner = Uuid::new_v4();
        let n = seed(&db, owner, "bitta").await;
        seed(&db, owner, "ikkita").await;

        assert!(inbox.delete(owner, n.id).await.unwrap());
        assert!(!inbox.delete(owner, n.id).await.unwrap());
        assert_eq!(inbox.delete_all(owner).await.unwrap(), 1);
        assert!(inbox.list(owner, false, None).await.unwrap().is_empty());
    }
}
