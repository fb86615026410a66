//! Document store traits for debts and notifications.
//!
//! The one hard correctness requirement of the scheduler lives here:
//! `DebtStore::claim_reminder` is a compare-and-swap on a single category's
//! `last_sent`, so a throttle decision and its `last_sent` update form one
//! atomic write. Two overlapping sweeps that both read "may fire" race on
//! the claim, and exactly one wins.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Debt, Notification, ReminderCategory};

#[async_trait]
pub trait DebtStore: Send + Sync {
    async fn insert(&self, debt: &Debt) -> Result<()>;

    async fn get(&self, id: Uuid) -> Result<Option<Debt>>;

    async fn list_by_owner(&self, owner: Uuid) -> Result<Vec<Debt>>;

    /// All obligations the scheduler should evaluate: outstanding amount
    /// above zero and derived status in {active, overdue}. Status is
    /// re-derived at read time, never trusted from storage.
    async fn list_reminder_eligible(&self, now: DateTime<Utc>) -> Result<Vec<Debt>>;

    /// Decrement the outstanding amount and recompute the status. Touches
    /// only the payment fields — reminder sub-state is left alone.
    async fn record_payment(&self, id: Uuid, amount: i64, now: DateTime<Utc>) -> Result<Debt>;

    /// Move the due date, append an audit entry, recompute the status.
    /// `original_due_date` is never written.
    async fn extend_due_date(
        &self,
        id: Uuid,
        new_due_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<Debt>;

    /// Atomically set the category's `last_sent` to `now`, but only if it
    /// still equals `expected_last_sent` (the snapshot the throttle policy
    /// evaluated). Returns whether this caller won the claim. The update is
    /// field-scoped: concurrent payment or due-date writes are not clobbered.
    async fn claim_reminder(
        &self,
        id: Uuid,
        category: ReminderCategory,
        expected_last_sent: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<bool>;

    /// Explicit removal only — the scheduler never deletes obligations.
    async fn delete(&self, id: Uuid) -> Result<bool>;

    /// Cheap health probe used by the scheduler's `start()`.
    async fn ping(&self) -> Result<()>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert(&self, notification: &Notification) -> Result<()>;

    async fn get(&self, id: Uuid) -> Result<Option<Notification>>;

    /// Newest-first listing for the inbox, optionally unread-only, bounded.
    async fn list_by_owner(
        &self,
        owner: Uuid,
        unread_only: bool,
        limit: usize,
    ) -> Result<Vec<Notification>>;

    async fn unread_count(&self, owner: Uuid) -> Result<u64>;

    /// Idempotent: returns false when the record was already read or is not
    /// owned by `owner`.
    async fn mark_read(&self, owner: Uuid, id: Uuid, now: DateTime<Utc>) -> Result<bool>;

    /// Returns the number of records transitioned to read.
    async fn mark_all_read(&self, owner: Uuid, now: DateTime<Utc>) -> Result<u64>;

    /// Hard delete, owner-scoped.
    async fn delete(&self, owner: Uuid, id: Uuid) -> Result<bool>;

    async fn delete_all(&self, owner: Uuid) -> Result<u64>;

    /// Records still `scheduled` with `scheduled_for <= now` — the rescan
    /// sub-pass re-attempts dispatch for these.
    async fn list_scheduled_due(&self, now: DateTime<Utc>) -> Result<Vec<Notification>>;

    /// `scheduled → sent`; refuses any other starting status.
    async fn mark_sent(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool>;

    /// `scheduled → failed`; refuses any other starting status.
    async fn mark_failed(&self, id: Uuid) -> Result<bool>;

    /// Cheap health probe used by the scheduler's `start()`.
    async fn ping(&self) -> Result<()>;
}
