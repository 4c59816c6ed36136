use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Notification kind enumeration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    /// Time to take a scheduled dose
    MedicationReminder,
    /// Stock is running low
    LowStockAlert,
    /// Medication ran out or expired
    MedicationExpiry,
    /// Prescription refill due
    RefillReminder,
    /// System/general notification
    General,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::MedicationReminder => "MEDICATION_REMINDER",
            NotificationKind::LowStockAlert => "LOW_STOCK_ALERT",
            NotificationKind::MedicationExpiry => "MEDICATION_EXPIRY",
            NotificationKind::RefillReminder => "REFILL_REMINDER",
            NotificationKind::General => "GENERAL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "MEDICATION_REMINDER" => Some(NotificationKind::MedicationReminder),
            "LOW_STOCK_ALERT" => Some(NotificationKind::LowStockAlert),
            "MEDICATION_EXPIRY" => Some(NotificationKind::MedicationExpiry),
            "REFILL_REMINDER" => Some(NotificationKind::RefillReminder),
            "GENERAL" => Some(NotificationKind::General),
            _ => None,
        }
    }
}

/// Notification delivery status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum NotificationStatus {
    /// Created, not yet delivered
    Pending,
    /// Pushed to the recipient
    Sent,
    /// Acknowledged by the recipient
    Read,
    /// Delivery gave up
    Failed,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Pending => "PENDING",
            NotificationStatus::Sent => "SENT",
            NotificationStatus::Read => "READ",
            NotificationStatus::Failed => "FAILED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(NotificationStatus::Pending),
            "SENT" => Some(NotificationStatus::Sent),
            "READ" => Some(NotificationStatus::Read),
            "FAILED" => Some(NotificationStatus::Failed),
            _ => None,
        }
    }

    /// Status machine: PENDING -> SENT -> READ, with FAILED reachable
    /// from the two non-terminal states. READ and FAILED are terminal.
    pub fn can_transition_to(&self, next: NotificationStatus) -> bool {
        matches!(
            (self, next),
            (NotificationStatus::Pending, NotificationStatus::Sent)
                | (NotificationStatus::Pending, NotificationStatus::Read)
                | (NotificationStatus::Pending, NotificationStatus::Failed)
                | (NotificationStatus::Sent, NotificationStatus::Read)
                | (NotificationStatus::Sent, NotificationStatus::Failed)
        )
    }
}

/// Core notification record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,

    /// Recipient user ID
    pub user_id: Uuid,

    /// Medication this notification is about (if any)
    pub medication_id: Option<Uuid>,

    /// Notification kind
    pub kind: NotificationKind,

    /// Delivery status
    pub status: NotificationStatus,

    /// Notification title
    pub title: String,

    /// Notification body/message
    pub message: String,

    /// Earliest delivery time; None means deliver on the next cycle
    pub scheduled_for: Option<DateTime<Utc>>,

    /// Timestamp when pushed
    pub sent_at: Option<DateTime<Utc>>,

    /// Timestamp when marked as read
    pub read_at: Option<DateTime<Utc>>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Payload for inserting a notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub medication_id: Option<Uuid>,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub scheduled_for: Option<DateTime<Utc>>,
}

/// Read-only view of a medication row, as the scheduler consumes it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicationSnapshot {
    pub id: Uuid,

    /// Owning user ID
    pub user_id: Uuid,

    /// Display name
    pub name: String,

    /// Dose description (e.g. "500mg")
    pub dosage: String,

    /// Free-text intake frequency (e.g. "2x ao dia")
    pub frequency: String,

    /// Intake times of day, "HH:MM"
    pub schedules: Vec<String>,

    /// Units currently on hand
    pub stock: i32,

    /// Units per container/box
    pub pills_per_container: i32,
}
