//! Domain models for the reminder scheduler.

pub mod debt;
pub mod notification;

pub use debt::{
    Debt, DebtDirection, DebtStatus, DueDateExtension, ReminderCategory, ReminderSettings,
};
pub use notification::{
    Notification, NotificationChannel, NotificationKind, NotificationPriority, NotificationStatus,
};
