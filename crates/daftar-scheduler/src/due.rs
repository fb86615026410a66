//! Due-date evaluator — classifies an obligation's day offset into a
//! reminder category.
//!
//! `days_diff = ceil((due_date - now) / 1 day)`, so anything less than a
//! full day overdue still counts as "due today". The three categories are
//! mutually exclusive by the sign of the diff.

use chrono::{DateTime, Utc};

use daftar_core::models::{Debt, DebtStatus, ReminderCategory};

const DAY_MS: i64 = 86_400_000;

/// A matched category with its day magnitude: days remaining for
/// `BeforeDue`, zero for `OnDue`, days elapsed for `Overdue`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueMatch {
    pub category: ReminderCategory,
    pub days: i64,
}

/// Evaluate one obligation. Returns `None` when nothing should fire on this
/// pass: the obligation is settled, the matched category is disabled, or the
/// due date is still outside the before-due window.
pub fn evaluate(debt: &Debt, now: DateTime<Utc>) -> Option<DueMatch> {
    // A payment may have settled the debt after the eligibility query ran;
    // re-derive instead of trusting the loaded status.
    if Debt::derive_status(debt.remaining_amount, debt.due_date, now) == DebtStatus::Completed {
        return None;
    }

    let days_diff = ceil_days(debt.due_date, now);
    if days_diff > 0 {
        let window = &debt.reminders.before_due;
        if window.enabled && days_diff <= window.days_before {
            return Some(DueMatch {
                category: ReminderCategory::BeforeDue,
                days: days_diff,
            });
        }
        None
    } else if days_diff == 0 {
        debt.reminders.on_due.enabled.then_some(DueMatch {
            category: ReminderCategory::OnDue,
            days: 0,
        })
    } else {
        debt.reminders.overdue.enabled.then_some(DueMatch {
            category: ReminderCategory::Overdue,
            days: -days_diff,
        })
    }
}

fn ceil_days(due_date: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let ms = (due_date - now).num_milliseconds();
    ms.div_euclid(DAY_MS) + (ms.rem_euclid(DAY_MS) != 0) as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use daftar_core::models::DebtDirection;
    use uuid::Uuid;

    fn debt_due_in(hours: i64) -> Debt {
        Debt::new(
            Uuid::new_v4(),
            "Akmal",
            DebtDirection::Borrowed,
            1_000_000,
            Utc::now() + Duration::hours(hours),
        )
        .unwrap()
    }

    #[test]
    fn three_days_out_matches_before_due() {
        let now = Utc::now();
        let mut debt = debt_due_in(0);
        debt.due_date = now + Duration::days(3);

        let m = evaluate(&debt, now).unwrap();
        assert_eq!(m.category, ReminderCategory::BeforeDue);
        assert_eq!(m.days, 3);
    }

    #[test]
    fn outside_window_matches_nothing() {
        let now = Utc::now();
        let mut debt = debt_due_in(0);
        debt.due_date = now + Duration::days(10);
        assert!(evaluate(&debt, now).is_none());

        // window boundary is inclusive
        debt.due_date = now + Duration::days(debt.reminders.before_due.days_before);
        assert!(evaluate(&debt, now).is_some());
    }

    #[test]
    fn due_this_instant_matches_on_due() {
        let now = Utc::now();
        let mut debt = debt_due_in(0);
        debt.due_date = now;

        let m = evaluate(&debt, now).unwrap();
        assert_eq!(m.category, ReminderCategory::OnDue);
        assert_eq!(m.days, 0);
    }

    #[test]
    fn partial_day_overdue_still_counts_as_on_due() {
        let now = Utc::now();
        let mut debt = debt_due_in(0);
        debt.due_date = now - Duration::hours(6);

        let m = evaluate(&debt, now).unwrap();
        assert_eq!(m.category, ReminderCategory::OnDue);
    }

    #[test]
    fn full_days_overdue_match_overdue_with_magnitude() {
        let now = Utc::now();
        let mut debt = debt_due_in(0);
        debt.due_date = now - Duration::days(5);

        let m = evaluate(&debt, now).unwrap();
        assert_eq!(m.category, ReminderCategory::Overdue);
        assert_eq!(m.days, 5);
    }

    #[test]
    fn categories_are_mutually_exclusive() {
        let now = Utc::now();
        let mut debt = debt_due_in(0);
        for days in [-7, -1, 0, 1, 2, 3] {
            debt.due_date = now + Duration::days(days);
            let matches = evaluate(&debt, now);
            assert!(matches.is_some(), "offset {days} should match one category");
        }
    }

    #[test]
    fn disabled_category_yields_nothing() {
        let now = Utc::now();
        let mut debt = debt_due_in(0);

        debt.due_date = now + Duration::days(2);
        debt.reminders.before_due.enabled = false;
        assert!(evaluate(&debt, now).is_none());

        debt.due_date = now;
        debt.reminders.on_due.enabled = false;
        assert!(evaluate(&debt, now).is_none());

        debt.due_date = now - Duration::days(2);
        debt.reminders.overdue.enabled = false;
        assert!(evaluate(&debt, now).is_none());
    }

    #[test]
    fn settled_debt_never_fires() {
        let now = Utc::now();
        let mut debt = debt_due_in(0);
        debt.due_date = now - Duration::days(3);
        debt.remaining_amount = 0;
        assert!(evaluate(&debt, now).is_none());
    }
}
