//! SQLite debt store.
//!
//! Mutations hold the connection lock for the whole read-modify-write and
//! touch only the columns they own: `record_payment` never writes reminder
//! columns, `claim_reminder` writes exactly one `*_last_sent` column. The
//! claim is a compare-and-swap — `WHERE <column> IS ?expected` — so of two
//! overlapping sweeps that both decided to fire, only one row update lands.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, params};
use uuid::Uuid;

use daftar_core::error::{DaftarError, Result};
use daftar_core::models::{
    Debt, DebtDirection, DebtStatus, ReminderCategory, ReminderSettings,
};
use daftar_core::models::debt::{BeforeDueReminder, OnDueReminder, OverdueReminder};
use daftar_core::traits::DebtStore;

use crate::{parse_opt_ts, parse_ts, store_err, ts};

const DEBT_COLUMNS: &str = "id, owner, counterparty_name, counterparty_phone, direction, \
     amount, remaining_amount, due_date, original_due_date, status, \
     before_enabled, before_days, before_last_sent, \
     on_due_enabled, on_due_last_sent, \
     overdue_enabled, overdue_interval, overdue_last_sent, \
     extensions, created_at, updated_at";

#[derive(Clone)]
pub struct SqliteDebtStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDebtStore {
    pub(crate) fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| DaftarError::Store(format!("connection lock poisoned: {e}")))
    }

    fn load(conn: &Connection, id: Uuid) -> Result<Option<Debt>> {
        let mut stmt = conn
            .prepare(&format!("SELECT {DEBT_COLUMNS} FROM debts WHERE id = ?1"))
            .map_err(store_err)?;
        let mut rows = stmt
            .query_map(params![id.to_string()], map_debt_row)
            .map_err(store_err)?;
        match rows.next() {
            Some(row) => Ok(Some(row.map_err(store_err)??)),
            None => Ok(None),
        }
    }

    fn require(conn: &Connection, id: Uuid) -> Result<Debt> {
        Self::load(conn, id)?.ok_or_else(|| DaftarError::NotFound(format!("debt {id}")))
    }
}

#[async_trait]
impl DebtStore for SqliteDebtStore {
    async fn insert(&self, debt: &Debt) -> Result<()> {
        let extensions = serde_json::to_string(&debt.extensions)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO debts (id, owner, counterparty_name, counterparty_phone, direction,
                amount, remaining_amount, due_date, original_due_date, status,
                before_enabled, before_days, before_last_sent,
                on_due_enabled, on_due_last_sent,
                overdue_enabled, overdue_interval, overdue_last_sent,
                extensions, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21)",
            params![
                debt.id.to_string(),
                debt.owner.to_string(),
                debt.counterparty_name,
                debt.counterparty_phone,
                debt.direction.as_str(),
                debt.amount,
                debt.remaining_amount,
                ts(&debt.due_date),
                ts(&debt.original_due_date),
                debt.status.as_str(),
                debt.reminders.before_due.enabled as i32,
                debt.reminders.before_due.days_before,
                debt.reminders.before_due.last_sent.as_ref().map(ts),
                debt.reminders.on_due.enabled as i32,
                debt.reminders.on_due.last_sent.as_ref().map(ts),
                debt.reminders.overdue.enabled as i32,
                debt.reminders.overdue.days_interval,
                debt.reminders.overdue.last_sent.as_ref().map(ts),
                extensions,
                ts(&debt.created_at),
                ts(&debt.updated_at),
            ],
        )
        .map_err(store_err)?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Debt>> {
        let conn = self.lock()?;
        Self::load(&conn, id)
    }

    async fn list_by_owner(&self, owner: Uuid) -> Result<Vec<Debt>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {DEBT_COLUMNS} FROM debts WHERE owner = ?1 ORDER BY due_date"
            ))
            .map_err(store_err)?;
        let rows = stmt
            .query_map(params![owner.to_string()], map_debt_row)
            .map_err(store_err)?;
        collect_debts(rows)
    }

    async fn list_reminder_eligible(&self, now: DateTime<Utc>) -> Result<Vec<Debt>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {DEBT_COLUMNS} FROM debts WHERE remaining_amount > 0 ORDER BY due_date"
            ))
            .map_err(store_err)?;
        let rows = stmt.query_map([], map_debt_row).map_err(store_err)?;
        let mut debts = collect_debts(rows)?;
        // The stored status may be stale (an obligation crosses into overdue
        // between writes); re-derive instead of trusting it.
        for debt in &mut debts {
            debt.refresh_status(now);
        }
        debts.retain(|d| d.status != DebtStatus::Completed);
        Ok(debts)
    }

    async fn record_payment(&self, id: Uuid, amount: i64, now: DateTime<Utc>) -> Result<Debt> {
        let conn = self.lock()?;
        let mut debt = Self::require(&conn, id)?;
        debt.record_payment(amount, now)?;
        conn.execute(
            "UPDATE debts SET remaining_amount = ?1, status = ?2, updated_at = ?3 WHERE id = ?4",
            params![
                debt.remaining_amount,
                debt.status.as_str(),
                ts(&now),
                id.to_string()
            ],
        )
        .map_err(store_err)?;
        Ok(debt)
    }

    async fn extend_due_date(
        &self,
        id: Uuid,
        new_due_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Debt> {
        let conn = self.lock()?;
        let mut debt = Self::require(&conn, id)?;
        debt.extend_due_date(new_due_date, now);
        let extensions = serde_json::to_string(&debt.extensions)?;
        conn.execute(
            "UPDATE debts SET due_date = ?1, status = ?2, extensions = ?3, updated_at = ?4
             WHERE id = ?5",
            params![
                ts(&new_due_date),
                debt.status.as_str(),
                extensions,
                ts(&now),
                id.to_string()
            ],
        )
        .map_err(store_err)?;
        Ok(debt)
    }

    async fn claim_reminder(
        &self,
        id: Uuid,
        category: ReminderCategory,
        expected_last_sent: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let column = match category {
            ReminderCategory::BeforeDue => "before_last_sent",
            ReminderCategory::OnDue => "on_due_last_sent",
            ReminderCategory::Overdue => "overdue_last_sent",
        };
        let conn = self.lock()?;
        // SQLite's IS operator treats two NULLs as equal, which makes the
        // CAS work for the never-sent case too.
        let changed = conn
            .execute(
                &format!(
                    "UPDATE debts SET {column} = ?1, updated_at = ?1 \
                     WHERE id = ?2 AND {column} IS ?3"
                ),
                params![
                    ts(&now),
                    id.to_string(),
                    expected_last_sent.as_ref().map(ts)
                ],
            )
            .map_err(store_err)?;
        Ok(changed > 0)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let conn = self.lock()?;
        let changed = conn
            .execute("DELETE FROM debts WHERE id = ?1", params![id.to_string()])
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

fn map_debt_row(row: &Row<'_>) -> rusqlite::Result<Result<Debt>> {
    let id: String = row.get(0)?;
    let owner: String = row.get(1)?;
    let counterparty_name: String = row.get(2)?;
    let counterparty_phone: Option<String> = row.get(3)?;
    let direction: String = row.get(4)?;
    let amount: i64 = row.get(5)?;
    let remaining_amount: i64 = row.get(6)?;
    let due_date: String = row.get(7)?;
    let original_due_date: String = row.get(8)?;
    let status: String = row.get(9)?;
    let before_enabled: bool = row.get::<_, i32>(10)? != 0;
    let before_days: i64 = row.get(11)?;
    let before_last_sent: Option<String> = row.get(12)?;
    let on_due_enabled: bool = row.get::<_, i32>(13)? != 0;
    let on_due_last_sent: Option<String> = row.get(14)?;
    let overdue_enabled: bool = row.get::<_, i32>(15)? != 0;
    let overdue_interval: i64 = row.get(16)?;
    let overdue_last_sent: Option<String> = row.get(17)?;
    let extensions: String = row.get(18)?;
    let created_at: String = row.get(19)?;
    let updated_at: String = row.get(20)?;

    Ok(build_debt(DebtRowParts {
        id,
        owner,
        counterparty_name,
        counterparty_phone,
        direction,
        amount,
        remaining_amount,
        due_date,
        original_due_date,
        status,
        before_enabled,
        before_days,
        before_last_sent,
        on_due_enabled,
        on_due_last_sent,
        overdue_enabled,
        overdue_interval,
        overdue_last_sent,
        extensions,
        created_at,
        updated_at,
    }))
}

struct DebtRowParts {
    id: String,
    owner: String,
    counterparty_name: String,
    counterparty_phone: Option<String>,
    direction: String,
    amount: i64,
    remaining_amount: i64,
    due_date: String,
    original_due_date: String,
    status: String,
    before_enabled: bool,
    before_days: i64,
    before_last_sent: Option<String>,
    on_due_enabled: bool,
    on_due_last_sent: Option<String>,
    overdue_enabled: bool,
    overdue_interval: i64,
    overdue_last_sent: Option<String>,
    extensions: String,
    created_at: String,
    updated_at: String,
}

fn build_debt(parts: DebtRowParts) -> Result<Debt> {
    let direction = DebtDirection::parse(&parts.direction)
        .ok_or_else(|| DaftarError::Store(format!("bad direction '{}'", parts.direction)))?;
    let due_date = parse_ts(&parts.due_date)?;
    let remaining_amount = parts.remaining_amount;
    let stored_status = parts.status;
    // Stored status is informational; derive defensively on load so a stale
    // or hand-edited row cannot smuggle in a wrong state.
    let status = match stored_status.as_str() {
        "completed" if remaining_amount <= 0 => DebtStatus::Completed,
        _ => Debt::derive_status(remaining_amount, due_date, Utc::now()),
    };

    Ok(Debt {
        id: parse_uuid(&parts.id)?,
        owner: parse_uuid(&parts.owner)?,
        counterparty_name: parts.counterparty_name,
        counterparty_phone: parts.counterparty_phone,
        direction,
        amount: parts.amount,
        remaining_amount,
        due_date,
        original_due_date: parse_ts(&parts.original_due_date)?,
        status,
        reminders: ReminderSettings {
            before_due: BeforeDueReminder {
                enabled: parts.before_enabled,
                days_before: parts.before_days,
                last_sent: parse_opt_ts(parts.before_last_sent)?,
            },
            on_due: OnDueReminder {
                enabled: parts.on_due_enabled,
                last_sent: parse_opt_ts(parts.on_due_last_sent)?,
            },
            overdue: OverdueReminder {
                enabled: parts.overdue_enabled,
                days_interval: parts.overdue_interval,
                last_sent: parse_opt_ts(parts.overdue_last_sent)?,
            },
        },
        extensions: serde_json::from_str(&parts.extensions)?,
        created_at: parse_ts(&parts.created_at)?,
        updated_at: parse_ts(&parts.updated_at)?,
    })
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| DaftarError::Store(format!("bad uuid '{s}': {e}")))
}

fn collect_debts(
    rows: impl Iterator<Item = rusqlite::Result<Result<Debt>>>,
) -> Result<Vec<Debt>> {
    let mut debts = Vec::new();
    for row in rows {
        debts.push(row.map_err(store_err)??);
    }
    Ok(debts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SqliteDb;
    use chrono::Duration;

    fn store() -> SqliteDebtStore {
        SqliteDb::open_in_memory().unwrap().debts()
    }

    fn sample_debt(due_in_days: i64) -> Debt {
        Debt::new(
            Uuid::new_v4(),
            "Akmal",
            DebtDirection::Borrowed,
            1_500_000,
            Utc::now() + Duration::days(due_in_days),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn insert_and_reload_round_trip() {
        let store = store();
        let debt = sample_debt(3);
        store.insert(&debt).await.unwrap();

        let loaded = store.get(debt.id).await.unwrap().unwrap();
        assert_eq!(loaded.owner, debt.owner);
        assert_eq!(loaded.counterparty_name, "Akmal");
        assert_eq!(loaded.remaining_amount, 1_500_000);
        assert_eq!(loaded.status, DebtStatus::Active);
        assert!(loaded.reminders.before_due.enabled);
        assert!(loaded.reminders.before_due.last_sent.is_none());
    }

    #[tokio::test]
    async fn payment_updates_only_payment_fields() {
        let store = store();
        let mut debt = sample_debt(3);
        debt.reminders.before_due.last_sent = Some(Utc::now());
        store.insert(&debt).await.unwrap();

        let updated = store
            .record_payment(debt.id, 500_000, Utc::now())
            .await
            .unwrap();
        assert_eq!(updated.remaining_amount, 1_000_000);

        let reloaded = store.get(debt.id).await.unwrap().unwrap();
        assert_eq!(reloaded.remaining_amount, 1_000_000);
        // reminder sub-state untouched by the payment write
        assert!(reloaded.reminders.before_due.last_sent.is_some());
    }

    #[tokio::test]
    async fn full_payment_removes_from_eligible_set() {
        let store = store();
        let debt = sample_debt(3);
        store.insert(&debt).await.unwrap();
        assert_eq!(
            store.list_reminder_eligible(Utc::now()).await.unwrap().len(),
            1
        );

        store
            .record_payment(debt.id, 1_500_000, Utc::now())
            .await
            .unwrap();
        assert!(
            store
                .list_reminder_eligible(Utc::now())
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn eligible_set_rederives_overdue_status() {
        let store = store();
        let debt = sample_debt(-2);
        store.insert(&debt).await.unwrap();

        let eligible = store.list_reminder_eligible(Utc::now()).await.unwrap();
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].status, DebtStatus::Overdue);
    }

    #[tokio::test]
    async fn extension_keeps_original_due_date_and_audits() {
        let store = store();
        let debt = sample_debt(-1);
        store.insert(&debt).await.unwrap();

        let new_due = Utc::now() + Duration::days(10);
        let updated = store
            .extend_due_date(debt.id, new_due, Utc::now())
            .await
            .unwrap();
        assert_eq!(updated.extensions.len(), 1);

        let reloaded = store.get(debt.id).await.unwrap().unwrap();
        assert_eq!(reloaded.original_due_date, debt.original_due_date);
        assert_eq!(reloaded.extensions.len(), 1);
        assert_eq!(reloaded.status, DebtStatus::Active);
    }

    #[tokio::test]
    async fn claim_is_won_exactly_once_per_snapshot() {
        let store = store();
        let debt = sample_debt(3);
        store.insert(&debt).await.unwrap();

        let now = Utc::now();
        // Two sweeps holding the same snapshot (last_sent = None) race.
        let first = store
            .claim_reminder(debt.id, ReminderCategory::BeforeDue, None, now)
            .await
            .unwrap();
        let second = store
            .claim_reminder(debt.id, ReminderCategory::BeforeDue, None, now)
            .await
            .unwrap();
        assert!(first);
        assert!(!second);

        let reloaded = store.get(debt.id).await.unwrap().unwrap();
        let stored = reloaded.reminders.before_due.last_sent.unwrap();
        assert_eq!(stored.timestamp_micros(), now.timestamp_micros());

        // A later sweep holding the fresh snapshot may claim again.
        let later = now + Duration::days(1);
        let third = store
            .claim_reminder(debt.id, ReminderCategory::BeforeDue, Some(stored), later)
            .await
            .unwrap();
        assert!(third);
    }

    #[tokio::test]
    async fn claim_touches_only_its_own_category() {
        let store = store();
        let debt = sample_debt(0);
        store.insert(&debt).await.unwrap();

        store
            .claim_reminder(debt.id, ReminderCategory::OnDue, None, Utc::now())
            .await
            .unwrap();

        let reloaded = store.get(debt.id).await.unwrap().unwrap();
        assert!(reloaded.reminders.on_due.last_sent.is_some());
        assert!(reloaded.reminders.before_due.last_sent.is_none());
        assert!(reloaded.reminders.overdue.last_sent.is_none());
    }

    #[tokio::test]
    async fn delete_removes_the_row() {
        let store = store();
        let debt = sample_debt(3);
        store.insert(&debt).await.unwrap();
        assert!(store.delete(debt.id).await.unwrap());
        assert!(!store.delete(debt.id).await.unwrap());
        assert!(store.get(debt.id).await.unwrap().is_none());
    }
}
