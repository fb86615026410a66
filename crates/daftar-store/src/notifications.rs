//! SQLite notification store.
//!
//! Status transitions are guarded in SQL: `mark_sent`/`mark_failed` only
//! move a record out of `scheduled`, and the read transitions only touch
//! not-yet-read rows, which makes them idempotent.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, params};
use uuid::Uuid;

use daftar_core::error::{DaftarError, Result};
use daftar_core::models::{
    Notification, NotificationChannel, NotificationKind, NotificationPriority, NotificationStatus,
};
use daftar_core::traits::NotificationStore;

use crate::{parse_opt_ts, parse_ts, store_err, ts};

const NOTIFICATION_COLUMNS: &str = "id, owner, kind, title, message, data, priority, status, \
     channel, scheduled_for, sent_at, read_at, created_at";

#[derive(Clone)]
pub struct SqliteNotificationStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteNotificationStore {
    pub(crate) fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DaftarError::Store(format!("connection lock poisoned: {e}")))
    }
}

#[async_trait]
impl NotificationStore for SqliteNotificationStore {
    async fn insert(&self, notification: &Notification) -> Result<()> {
        let data = serde_json::to_string(&notification.data)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO notifications (id, owner, kind, title, message, data, priority,
                status, channel, scheduled_for, sent_at, read_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                notification.id.to_string(),
                notification.owner.to_string(),
                notification.kind.as_str(),
                notification.title,
                notification.message,
                data,
                notification.priority.as_str(),
                notification.status.as_str(),
                notification.channel.as_str(),
                ts(&notification.scheduled_for),
                notification.sent_at.as_ref().map(ts),
                notification.read_at.as_ref().map(ts),
                ts(&notification.created_at),
            ],
        )
        .map_err(store_err)?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Notification>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?1"
            ))
            .map_err(store_err)?;
        let mut rows = stmt
            .query_map(params![id.to_string()], map_notification_row)
            .map_err(store_err)?;
        match rows.next() {
            Some(row) => Ok(Some(row.map_err(store_err)??)),
            None => Ok(None),
        }
    }

    async fn list_by_owner(
        &self,
        owner: Uuid,
        unread_only: bool,
        limit: usize,
    ) -> Result<Vec<Notification>> {
        let conn = self.lock()?;
        let filter = if unread_only {
            " AND status != 'read'"
        } else {
            ""
        };
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {NOTIFICATION_COLUMNS} FROM notifications \
                 WHERE owner = ?1{filter} ORDER BY created_at DESC LIMIT ?2"
            ))
            .map_err(store_err)?;
        let rows = stmt
            .query_map(
                params![owner.to_string(), limit as i64],
                map_notification_row,
            )
            .map_err(store_err)?;
        collect_notifications(rows)
    }

    async fn unread_count(&self, owner: Uuid) -> Result<u64> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM notifications WHERE owner = ?1 AND status != 'read'",
                params![owner.to_string()],
                |row| row.get(0),
            )
            .map_err(store_err)?;
        Ok(count as u64)
    }

    async fn mark_read(&self, owner: Uuid, id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE notifications SET status = 'read', read_at = ?1
                 WHERE id = ?2 AND owner = ?3 AND status != 'read'",
                params![ts(&now), id.to_string(), owner.to_string()],
            )
            .map_err(store_err)?;
        Ok(changed > 0)
    }

    async fn mark_all_read(&self, owner: Uuid, now: DateTime<Utc>) -> Result<u64> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE notifications SET status = 'read', read_at = ?1
                 WHERE owner = ?2 AND status != 'read'",
                params![ts(&now), owner.to_string()],
            )
            .map_err(store_err)?;
        Ok(changed as u64)
    }

    async fn delete(&self, owner: Uuid, id: Uuid) -> Result<bool> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "DELETE FROM notifications WHERE id = ?1 AND owner = ?2",
                params![id.to_string(), owner.to_string()],
            )
            .map_err(store_err)?;
        Ok(changed > 0)
    }

    async fn delete_all(&self, owner: Uuid) -> Result<u64> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "DELETE FROM notifications WHERE owner = ?1",
                params![owner.to_string()],
            )
            .map_err(store_err)?;
        Ok(changed as u64)
    }

    async fn list_scheduled_due(&self, now: DateTime<Utc>) -> Result<Vec<Notification>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {NOTIFICATION_COLUMNS} FROM notifications \
                 WHERE status = 'scheduled' AND scheduled_for <= ?1 ORDER BY scheduled_for"
            ))
            .map_err(store_err)?;
        let rows = stmt
            .query_map(params![ts(&now)], map_notification_row)
            .map_err(store_err)?;
        collect_notifications(rows)
    }

    async fn mark_sent(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE notifications SET status = 'sent', sent_at = ?1
                 WHERE id = ?2 AND status = 'scheduled'",
                params![ts(&now), id.to_string()],
            )
            .map_err(store_err)?;
        Ok(changed > 0)
    }

    async fn mark_failed(&self, id: Uuid) -> Result<bool> {
        let conn = self.lock()?;
        let changed = conn
            .execute(
                "UPDATE notifications SET status = 'failed'
                 WHERE id = ?1 AND status = 'scheduled'",
                params![id.to_string()],
            )
            .map_err(store_err)?;
        Ok(changed > 0)
    }

    async fn ping(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.query_row("SELECT 1", [], |_| Ok(()))
            .map_err(store_err)?;
        Ok(())
    }
}

fn map_notification_row(row: &Row<'_>) -> rusqlite::Result<Result<Notification>> {
    let id: String = row.get(0)?;
    let owner: String = row.get(1)?;
    let kind: String = row.get(2)?;
    let title: String = row.get(3)?;
    let message: String = row.get(4)?;
    let data: String = row.get(5)?;
    let priority: String = row.get(6)?;
    let status: String = row.get(7)?;
    let channel: String = row.get(8)?;
    let scheduled_for: String = row.get(9)?;
    let sent_at: Option<String> = row.get(10)?;
    let read_at: Option<String> = row.get(11)?;
    let created_at: String = row.get(12)?;

    Ok(build_notification(
        id,
        owner,
        kind,
        title,
        message,
        data,
        priority,
        status,
        channel,
        scheduled_for,
        sent_at,
        read_at,
        created_at,
    ))
}

#[allow(clippy::too_many_arguments)]
fn build_notification(
    id: String,
    owner: String,
    kind: String,
    title: String,
    message: String,
    data: String,
    priority: String,
    status: String,
    channel: String,
    scheduled_for: String,
    sent_at: Option<String>,
    read_at: Option<String>,
    created_at: String,
) -> Result<Notification> {
    Ok(Notification {
        id: parse_uuid(&id)?,
        owner: parse_uuid(&owner)?,
        kind: NotificationKind::parse(&kind)
            .ok_or_else(|| DaftarError::Store(format!("bad notification kind '{kind}'")))?,
        title,
        message,
        data: serde_json::from_str(&data)?,
        priority: NotificationPriority::parse(&priority)
            .ok_or_else(|| DaftarError::Store(format!("bad priority '{priority}'")))?,
        status: NotificationStatus::parse(&status)
            .ok_or_else(|| DaftarError::Store(format!("bad status '{status}'")))?,
        channel: NotificationChannel::parse(&channel)
            .ok_or_else(|| DaftarError::Store(format!("bad channel '{channel}'")))?,
        scheduled_for: parse_ts(&scheduled_for)?,
        sent_at: parse_opt_ts(sent_at)?,
        read_at: parse_opt_ts(read_at)?,
        created_at: parse_ts(&created_at)?,
    })
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| DaftarError::Store(format!("bad uuid '{s}': {e}")))
}

fn collect_notifications(
    rows: impl Iterator<Item = rusqlite::Result<Result<Notification>>>,
) -> Result<Vec<Notification>> {
    let mut notifications = Vec::new();
    for row in rows {
        notifications.push(row.map_err(store_err)??);
    }
    Ok(notifications)
}
