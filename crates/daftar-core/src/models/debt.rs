//! Debt obligation model — the record the reminder scheduler sweeps.
//!
//! `status` is derived, never caller-supplied: every mutation boundary
//! recomputes it from `remaining_amount` and `due_date`. The per-category
//! reminder sub-state is embedded in the obligation so a throttle update and
//! the obligation live in one record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DaftarError, Result};

/// Who owes whom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebtDirection {
    /// The owner borrowed from the counterparty.
    Borrowed,
    /// The owner lent to the counterparty.
    Lent,
}

impl DebtDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Borrowed => "borrowed",
            Self::Lent => "lent",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "borrowed" => Some(Self::Borrowed),
            "lent" => Some(Self::Lent),
            _ => None,
        }
    }
}

/// Derived obligation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebtStatus {
    Active,
    Overdue,
    Completed,
}

impl DebtStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Overdue => "overdue",
            Self::Completed => "completed",
        }
    }
}

/// The three mutually exclusive reminder triggers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderCategory {
    BeforeDue,
    OnDue,
    Overdue,
}

impl ReminderCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BeforeDue => "before_due",
            Self::OnDue => "on_due",
            Self::Overdue => "overdue",
        }
    }
}

/// Reminder settings for the window before the due date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeforeDueReminder {
    #[serde(default = "bool_true")]
    pub enabled: bool,
    /// Window size: remind when 1..=days_before days remain.
    #[serde(default = "default_days_before")]
    pub days_before: i64,
    pub last_sent: Option<DateTime<Utc>>,
}

impl Default for BeforeDueReminder {
    fn default() -> Self {
        Self {
            enabled: true,
            days_before: default_days_before(),
            last_sent: None,
        }
    }
}

/// Reminder settings for the due date itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OnDueReminder {
    #[serde(default = "bool_true")]
    pub enabled: bool,
    pub last_sent: Option<DateTime<Utc>>,
}

impl Default for OnDueReminder {
    fn default() -> Self {
        Self {
            enabled: true,
            last_sent: None,
        }
    }
}

/// Reminder settings once the obligation is overdue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverdueReminder {
    #[serde(default = "bool_true")]
    pub enabled: bool,
    /// Repeat cadence in days. Values <= 0 are treated as 1 by the throttle.
    #[serde(default = "default_days_interval")]
    pub days_interval: i64,
    pub last_sent: Option<DateTime<Utc>>,
}

impl Default for OverdueReminder {
    fn default() -> Self {
        Self {
            enabled: true,
            days_interval: default_days_interval(),
            last_sent: None,
        }
    }
}

fn bool_true() -> bool {
    true
}

fn default_days_before() -> i64 {
    3
}

fn default_days_interval() -> i64 {
    3
}

/// Per-category notification sub-state, one block per trigger.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReminderSettings {
    #[serde(default)]
    pub before_due: BeforeDueReminder,
    #[serde(default)]
    pub on_due: OnDueReminder,
    #[serde(default)]
    pub overdue: OverdueReminder,
}

impl ReminderSettings {
    /// Whether the given category is enabled.
    pub fn enabled(&self, category: ReminderCategory) -> bool {
        match category {
            ReminderCategory::BeforeDue => self.before_due.enabled,
            ReminderCategory::OnDue => self.on_due.enabled,
            ReminderCategory::Overdue => self.overdue.enabled,
        }
    }

    /// Last-sent timestamp for the given category.
    pub fn last_sent(&self, category: ReminderCategory) -> Option<DateTime<Utc>> {
        match category {
            ReminderCategory::BeforeDue => self.before_due.last_sent,
            ReminderCategory::OnDue => self.on_due.last_sent,
            ReminderCategory::Overdue => self.overdue.last_sent,
        }
    }

    pub fn set_last_sent(&mut self, category: ReminderCategory, at: DateTime<Utc>) {
        match category {
            ReminderCategory::BeforeDue => self.before_due.last_sent = Some(at),
            ReminderCategory::OnDue => self.on_due.last_sent = Some(at),
            ReminderCategory::Overdue => self.overdue.last_sent = Some(at),
        }
    }
}

/// Audit entry appended when a due date is extended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DueDateExtension {
    pub extended_at: DateTime<Utc>,
    pub old_due_date: DateTime<Utc>,
    pub new_due_date: DateTime<Utc>,
}

/// A debt obligation tracked for one user.
///
/// Money is in whole so'm. `original_due_date` is set once at creation and
/// never moves; extensions shift `due_date` and append to `extensions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Debt {
    pub id: Uuid,
    pub owner: Uuid,
    pub counterparty_name: String,
    pub counterparty_phone: Option<String>,
    pub direction: DebtDirection,
    pub amount: i64,
    pub remaining_amount: i64,
    pub due_date: DateTime<Utc>,
    pub original_due_date: DateTime<Utc>,
    pub status: DebtStatus,
    pub reminders: ReminderSettings,
    pub extensions: Vec<DueDateExtension>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Debt {
    /// Create a new obligation. The full amount is outstanding.
    pub fn new(
        owner: Uuid,
        counterparty_name: &str,
        direction: DebtDirection,
        amount: i64,
        due_date: DateTime<Utc>,
    ) -> Result<Self> {
        if amount <= 0 {
            return Err(DaftarError::Validation(format!(
                "debt amount must be positive, got {amount}"
            )));
        }
        if counterparty_name.trim().is_empty() {
            return Err(DaftarError::Validation(
                "counterparty name must not be empty".into(),
            ));
        }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            owner,
            counterparty_name: counterparty_name.trim().to_string(),
            counterparty_phone: None,
            direction,
            amount,
            remaining_amount: amount,
            due_date,
            original_due_date: due_date,
            status: Self::derive_status(amount, due_date, now),
            reminders: ReminderSettings::default(),
            extensions: Vec::new(),
            created_at: now,
            updated_at: now,
        })
    }

    /// Derive the status from the obligation's own fields.
    pub fn derive_status(
        remaining_amount: i64,
        due_date: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> DebtStatus {
        if remaining_amount <= 0 {
            DebtStatus::Completed
        } else if due_date < now {
            DebtStatus::Overdue
        } else {
            DebtStatus::Active
        }
    }

    /// Recompute `status` in place.
    pub fn refresh_status(&mut self, now: DateTime<Utc>) {
        self.status = Self::derive_status(self.remaining_amount, self.due_date, now);
    }

    /// Apply a payment: decrement the outstanding amount (clamped at zero)
    /// and recompute the status.
    pub fn record_payment(&mut self, amount: i64, now: DateTime<Utc>) -> Result<()> {
        if amount <= 0 {
            return Err(DaftarError::Validation(format!(
                "payment amount must be positive, got {amount}"
            )));
        }
        self.remaining_amount = (self.remaining_amount - amount).max(0);
        self.refresh_status(now);
        self.updated_at = now;
        Ok(())
    }

    /// Move the due date and record an audit entry. `original_due_date`
    /// never changes.
    pub fn extend_due_date(&mut self, new_due_date: DateTime<Utc>, now: DateTime<Utc>) {
        self.extensions.push(DueDateExtension {
            extended_at: now,
            old_due_date: self.due_date,
            new_due_date,
        });
        self.due_date = new_due_date;
        self.refresh_status(now);
        self.updated_at = now;
    }

    /// Whether the scheduler should consider this obligation at all.
    pub fn is_reminder_eligible(&self, now: DateTime<Utc>) -> bool {
        self.remaining_amount > 0
            && Self::derive_status(self.remaining_amount, self.due_date, now)
                != DebtStatus::Completed
    }
}
