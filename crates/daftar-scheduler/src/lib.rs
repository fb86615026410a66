//! # Daftar Scheduler
//!
//! The debt reminder pipeline: a periodic sweep over all outstanding
//! obligations that classifies each one against its due date, throttles
//! per-category repeats, materializes a notification record, and attempts
//! best-effort live delivery.
//!
//! ## Architecture
//! ```text
//! ReminderScheduler (tokio interval, Notify for shutdown)
//!   └── each pass, per eligible debt:
//!         due::evaluate      → before_due | on_due | overdue
//!         throttle::may_fire → per-category cadence rules
//!         DebtStore::claim_reminder → CAS on last_sent (race guard)
//!         factory::build     → Notification (status = scheduled)
//!         Dispatcher::deliver → LiveBus publish, scheduled → sent | failed
//!       then an independent rescan of leftover `scheduled` records.
//!
//! Inbox — the read surface the UI consumes, independent of the write path.
//! ```

pub mod dispatch;
pub mod due;
pub mod engine;
pub mod factory;
pub mod inbox;
pub mod throttle;

pub use dispatch::Dispatcher;
pub use due::{DueMatch, evaluate};
pub use engine::{PassStats, ReminderScheduler};
pub use inbox::Inbox;
