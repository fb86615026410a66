//! Notification factory — renders a matched reminder into a persisted
//! record. Pure: no store access, no clock reads beyond the `now` argument.
//!
//! Message templates are keyed by `(category, direction)` so "you owe" and
//! "they owe you" read naturally. Copy is Uzbek, amounts in so'm.

use chrono::{DateTime, Utc};

use daftar_core::models::{
    Debt, DebtDirection, Notification, NotificationPriority, ReminderCategory,
};

/// Build the notification for a matched category. `days` carries the
/// magnitude from the evaluator: days remaining, zero, or days overdue.
pub fn build(
    debt: &Debt,
    category: ReminderCategory,
    days: i64,
    now: DateTime<Utc>,
) -> Notification {
    let name = debt.counterparty_name.as_str();
    let amount = format_amount(debt.remaining_amount);

    let (title, message, priority) = match (category, debt.direction) {
        (ReminderCategory::BeforeDue, DebtDirection::Borrowed) if days == 1 => (
            "Qarz eslatmasi".to_string(),
            format!("Ertaga {name}ga {amount} to'lash kerak"),
            NotificationPriority::Medium,
        ),
        (ReminderCategory::BeforeDue, DebtDirection::Lent) if days == 1 => (
            "Qarz eslatmasi".to_string(),
            format!("{name} ertaga {amount} qaytarishi kerak"),
            NotificationPriority::Medium,
        ),
        (ReminderCategory::BeforeDue, DebtDirection::Borrowed) => (
            "Qarz eslatmasi".to_string(),
            format!("{name}ga {amount} to'lashga {days} kun qoldi"),
            NotificationPriority::Medium,
        ),
        (ReminderCategory::BeforeDue, DebtDirection::Lent) => (
            "Qarz eslatmasi".to_string(),
            format!("{name} {amount} qaytarishiga {days} kun qoldi"),
            NotificationPriority::Medium,
        ),
        (ReminderCategory::OnDue, DebtDirection::Borrowed) => (
            "Qarz muddati bugun".to_string(),
            format!("Bugun {name}ga {amount} to'lash kerak"),
            NotificationPriority::Medium,
        ),
        (ReminderCategory::OnDue, DebtDirection::Lent) => (
            "Qarz muddati bugun".to_string(),
            format!("{name} bugun {amount} qaytarishi kerak"),
            NotificationPriority::Medium,
        ),
        (ReminderCategory::Overdue, DebtDirection::Borrowed) => (
            "Muddati o'tgan qarz".to_string(),
            format!("{name}ga {amount} to'lash muddati {days} kun o'tib ketdi"),
            NotificationPriority::High,
        ),
        (ReminderCategory::Overdue, DebtDirection::Lent) => (
            "Muddati o'tgan qarz".to_string(),
            format!("{name} qaytarishi kerak bo'lgan {amount} muddati {days} kun o'tib ketdi"),
            NotificationPriority::High,
        ),
    };

    let data = serde_json::json!({
        "debt_id": debt.id,
        "direction": debt.direction.as_str(),
        "amount": debt.remaining_amount,
        "due_date": debt.due_date,
    });

    Notification::debt_reminder(debt.owner, title, message, priority, data, now)
}

/// Whole so'm with comma digit grouping, e.g. `1,500,000 so'm`.
pub fn format_amount(amount: i64) -> String {
    let negative = amount < 0;
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 5);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if negative {
        format!("-{grouped} so'm")
    } else {
        format!("{grouped} so'm")
    }
}
