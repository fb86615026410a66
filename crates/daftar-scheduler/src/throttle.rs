//! Per-category throttle rules.
//!
//! Each category keeps its own `last_sent` stamp, so extending an overdue
//! obligation back into the before-due window does not inherit the overdue
//! cadence. These checks are advisory; the store-level claim on `last_sent`
//! is what actually prevents a double fire.

use chrono::{DateTime, Duration, Utc};

use daftar_core::models::{ReminderCategory, ReminderSettings};

/// Whether a matched category is allowed to fire now.
///
/// `overdue_days` is only consulted for the overdue cadence and is ignored
/// for the other two categories.
pub fn may_fire(
    reminders: &ReminderSettings,
    category: ReminderCategory,
    overdue_days: i64,
    now: DateTime<Utc>,
) -> bool {
    let last_sent = reminders.last_sent(category);
    match category {
        // at most one per 24 hours
        ReminderCategory::BeforeDue => match last_sent {
            None => true,
            Some(at) => now - at > Duration::hours(24),
        },
        // 24 hours elapsed and a different calendar date, so a reminder at
        // 23:50 does not repeat at 00:10
        ReminderCategory::OnDue => match last_sent {
            None => true,
            Some(at) => now - at > Duration::hours(24) && at.date_naive() != now.date_naive(),
        },
        // fires on interval multiples of days overdue, or whenever a full
        // interval has elapsed since the last send
        ReminderCategory::Overdue => {
            let interval = reminders.overdue.days_interval.max(1);
            match last_sent {
                None => true,
                Some(at) => {
                    overdue_days % interval == 0 || now - at > Duration::hours(24 * interval)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_with(category: ReminderCategory, last_sent: Option<DateTime<Utc>>) -> ReminderSettings {
        let mut settings = ReminderSettings::default();
        if let Some(at) = last_sent {
            settings.set_last_sent(category, at);
        }
        settings
    }

    #[test]
    fn before_due_first_send_is_free() {
        let now = Utc::now();
        let settings = settings_with(ReminderCategory::BeforeDue, None);
        assert!(may_fire(&settings, ReminderCategory::BeforeDue, 0, now));
    }

    #[test]
    fn before_due_waits_a_full_day() {
        let now = Utc::now();
        let recent = settings_with(ReminderCategory::BeforeDue, Some(now - Duration::hours(3)));
        assert!(!may_fire(&recent, ReminderCategory::BeforeDue, 0, now));

        let stale = settings_with(ReminderCategory::BeforeDue, Some(now - Duration::hours(25)));
        assert!(may_fire(&stale, ReminderCategory::BeforeDue, 0, now));
    }

    #[test]
    fn on_due_needs_elapsed_time_and_a_new_date() {
        let now = Utc::now();

        // sent yesterday, over 24h ago
        let eligible = settings_with(ReminderCategory::OnDue, Some(now - Duration::hours(25)));
        assert!(may_fire(&eligible, ReminderCategory::OnDue, 0, now));

        // sent minutes ago, same day
        let just_sent = settings_with(ReminderCategory::OnDue, Some(now - Duration::minutes(30)));
        assert!(!may_fire(&just_sent, ReminderCategory::OnDue, 0, now));
    }

    #[test]
    fn overdue_fires_on_interval_multiples() {
        let now = Utc::now();
        let mut settings = settings_with(ReminderCategory::Overdue, Some(now - Duration::hours(20)));
        settings.overdue.days_interval = 2;

        assert!(may_fire(&settings, ReminderCategory::Overdue, 2, now));
        assert!(may_fire(&settings, ReminderCategory::Overdue, 4, now));
        assert!(may_fire(&settings, ReminderCategory::Overdue, 6, now));
        assert!(!may_fire(&settings, ReminderCategory::Overdue, 5, now));
    }

    #[test]
    fn overdue_also_fires_after_a_full_interval_elapses() {
        let now = Utc::now();
        let mut settings =
            settings_with(ReminderCategory::Overdue, Some(now - Duration::hours(49)));
        settings.overdue.days_interval = 2;

        // day 5 is not a multiple of 2, but over two full days elapsed
        assert!(may_fire(&settings, ReminderCategory::Overdue, 5, now));
    }

    #[test]
    fn overdue_interval_is_clamped_to_one() {
        let now = Utc::now();
        let mut settings = settings_with(ReminderCategory::Overdue, Some(now - Duration::hours(1)));
        settings.overdue.days_interval = 0;

        // every day is a multiple of 1
        assert!(may_fire(&settings, ReminderCategory::Overdue, 7, now));
    }

    #[test]
    fn stamps_are_scoped_per_category() {
        let now = Utc::now();
        // a fresh overdue stamp must not throttle before_due
        let settings = settings_with(ReminderCategory::Overdue, Some(now - Duration::minutes(5)));
        assert!(may_fire(&settings, ReminderCategory::BeforeDue, 0, now));
        assert!(may_fire(&settings, ReminderCategory::OnDue, 0, now));
    }
}
