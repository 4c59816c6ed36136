//! Notification Candidate Derivation
//!
//! Pure builders that turn a medication snapshot into the notification the
//! scheduler should create for it. The clock is always passed in so sweeps
//! are reproducible under test.

use chrono::{DateTime, Duration, NaiveTime, Utc};

use crate::models::{MedicationSnapshot, NewNotification, NotificationKind};
use crate::stock::{days_until_empty, is_low_stock, LOW_STOCK_UNITS};

/// Scheduler-created reminders come due this many minutes out
pub const REMINDER_LEAD_MINUTES: i64 = 5;

/// User-triggered batch reminders come due this many minutes out
pub const BATCH_REMINDER_LEAD_MINUTES: i64 = 30;

/// Alert deduplication look-back window
pub const ALERT_LOOKBACK_HOURS: i64 = 24;

/// Start of the reminder dedup window: midnight (UTC) of the current day.
/// One reminder per medication per day.
pub fn reminder_window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Start of the low-stock/depleted dedup window: 24 hours back.
pub fn alert_window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::hours(ALERT_LOOKBACK_HOURS)
}

/// Whether a medication qualifies for a low-stock alert: at most
/// [`LOW_STOCK_UNITS`] units on hand, or a supply projected to run out
/// within the low-stock horizon.
pub fn needs_low_stock_alert(medication: &MedicationSnapshot) -> bool {
    let days = days_until_empty(&medication.frequency, medication.stock);
    medication.stock <= LOW_STOCK_UNITS
        || is_low_stock(medication.stock, medication.pills_per_container, days)
}

/// Dose reminder for one schedule slot, due shortly after creation.
pub fn reminder_candidate(
    medication: &MedicationSnapshot,
    slot: &str,
    now: DateTime<Utc>,
) -> NewNotification {
    NewNotification {
        user_id: medication.user_id,
        medication_id: Some(medication.id),
        kind: NotificationKind::MedicationReminder,
        title: format!("Reminder: {}", medication.name),
        message: format!(
            "Time to take {} - {} at {}",
            medication.name, medication.dosage, slot
        ),
        scheduled_for: Some(now + Duration::minutes(REMINDER_LEAD_MINUTES)),
    }
}

/// Dose reminder created by a user-triggered batch run, due further out.
pub fn batch_reminder_candidate(
    medication: &MedicationSnapshot,
    now: DateTime<Utc>,
) -> NewNotification {
    NewNotification {
        user_id: medication.user_id,
        medication_id: Some(medication.id),
        kind: NotificationKind::MedicationReminder,
        title: format!("Reminder: {}", medication.name),
        message: format!(
            "Time to take {} - {} ({})",
            medication.name, medication.dosage, medication.frequency
        ),
        scheduled_for: Some(now + Duration::minutes(BATCH_REMINDER_LEAD_MINUTES)),
    }
}

/// Low supply alert, delivered on the next cycle.
pub fn low_stock_candidate(medication: &MedicationSnapshot) -> NewNotification {
    NewNotification {
        user_id: medication.user_id,
        medication_id: Some(medication.id),
        kind: NotificationKind::LowStockAlert,
        title: format!("Low Stock: {}", medication.name),
        message: format!(
            "{} is running low ({} units left). Consider restocking.",
            medication.name, medication.stock
        ),
        scheduled_for: None,
    }
}

/// Supply ran out entirely, delivered on the next cycle.
pub fn depleted_candidate(medication: &MedicationSnapshot) -> NewNotification {
    NewNotification {
        user_id: medication.user_id,
        medication_id: Some(medication.id),
        kind: NotificationKind::MedicationExpiry,
        title: format!("Out of Stock: {}", medication.name),
        message: format!(
            "{} has run out. Add stock to keep your reminders going.",
            medication.name
        ),
        scheduled_for: None,
    }
}
