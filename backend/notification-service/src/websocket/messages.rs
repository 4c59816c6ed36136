//! Wire messages pushed over WebSocket connections.
//!
//! Every push is an [`Envelope`]: `{"type": ..., "data": {...}, "timestamp": ...}`
//! with the timestamp in RFC 3339.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Notification, NotificationKind};

/// Notification record as it appears inside an envelope
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationData {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub medication_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<&Notification> for NotificationData {
    fn from(n: &Notification) -> Self {
        NotificationData {
            id: n.id,
            title: n.title.clone(),
            message: n.message.clone(),
            kind: n.kind,
            medication_id: n.medication_id,
            created_at: n.created_at,
        }
    }
}

/// Typed event payloads, tagged with their wire name
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum EventPayload {
    /// A due notification delivered by the scheduler
    Notification(NotificationData),

    /// Immediate dose reminder
    MedicationReminder {
        medication_name: String,
        dosage: String,
        time: String,
        message: String,
    },

    /// Immediate low supply alert
    LowStockAlert {
        medication_name: String,
        stock_count: i32,
        message: String,
    },

    /// A notification that was just created on the recipient's behalf
    NewNotification(NotificationData),
}

impl EventPayload {
    /// Wire name of this event, as written into the envelope tag.
    pub fn event_name(&self) -> &'static str {
        match self {
            EventPayload::Notification(_) => "notification",
            EventPayload::MedicationReminder { .. } => "medication_reminder",
            EventPayload::LowStockAlert { .. } => "low_stock_alert",
            EventPayload::NewNotification(_) => "new_notification",
        }
    }

    /// Payload for a due notification.
    pub fn notification(record: &Notification) -> Self {
        EventPayload::Notification(NotificationData::from(record))
    }

    /// Payload for a dose reminder.
    pub fn medication_reminder(medication_name: &str, dosage: &str, time: &str) -> Self {
        EventPayload::MedicationReminder {
            medication_name: medication_name.to_string(),
            dosage: dosage.to_string(),
            time: time.to_string(),
            message: format!("Time to take {medication_name} - {dosage} at {time}"),
        }
    }

    /// Payload for a low supply alert.
    pub fn low_stock_alert(medication_name: &str, stock_count: i32) -> Self {
        EventPayload::LowStockAlert {
            medication_name: medication_name.to_string(),
            stock_count,
            message: format!("{medication_name} is running low ({stock_count} units left)"),
        }
    }

    /// Payload for a freshly created notification.
    pub fn new_notification(record: &Notification) -> Self {
        EventPayload::NewNotification(NotificationData::from(record))
    }
}

/// A timestamped wire message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    #[serde(flatten)]
    pub payload: EventPayload,
    pub timestamp: DateTime<Utc>,
}

impl Envelope {
    /// Wrap a payload with the given send time.
    pub fn new(payload: EventPayload, timestamp: DateTime<Utc>) -> Self {
        Envelope { payload, timestamp }
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NotificationStatus;
    use chrono::TimeZone;

    fn sample_notification() -> Notification {
        Notification {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            medication_id: Some(Uuid::new_v4()),
            kind: NotificationKind::MedicationReminder,
            status: NotificationStatus::Pending,
            title: "Reminder: Dipirona".to_string(),
            message: "Time to take Dipirona - 500mg at 08:00".to_string(),
            scheduled_for: None,
            sent_at: None,
            read_at: None,
            created_at: Utc.with_ymd_and_hms(2024, 3, 15, 8, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_envelope_wire_shape() {
        let record = sample_notification();
        let envelope = Envelope::new(
            EventPayload::notification(&record),
            Utc.with_ymd_and_hms(2024, 3, 15, 8, 1, 0).unwrap(),
        );

        let value: serde_json::Value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["type"], "notification");
        assert!(value["data"].is_object());
        assert!(value["timestamp"].is_string());
        // Inner record keeps its own type field.
        assert_eq!(value["data"]["type"], "MEDICATION_REMINDER");
        assert_eq!(value["data"]["title"], "Reminder: Dipirona");
    }

    #[test]
    fn test_medication_reminder_payload() {
        let payload = EventPayload::medication_reminder("Dipirona", "500mg", "08:00");
        let value = serde_json::to_value(&payload).unwrap();

        assert_eq!(value["type"], "medication_reminder");
        assert_eq!(value["data"]["medication_name"], "Dipirona");
        assert_eq!(value["data"]["dosage"], "500mg");
        assert_eq!(value["data"]["time"], "08:00");
        assert_eq!(
            value["data"]["message"],
            "Time to take Dipirona - 500mg at 08:00"
        );
    }

    #[test]
    fn test_low_stock_payload() {
        let payload = EventPayload::low_stock_alert("Dipirona", 4);
        let value = serde_json::to_value(&payload).unwrap();

        assert_eq!(value["type"], "low_stock_alert");
        assert_eq!(value["data"]["stock_count"], 4);
        assert_eq!(
            value["data"]["message"],
            "Dipirona is running low (4 units left)"
        );
    }

    #[test]
    fn test_new_notification_tag() {
        let record = sample_notification();
        let payload = EventPayload::new_notification(&record);
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["type"], "new_notification");
        assert_eq!(value["data"]["id"], record.id.to_string());
    }

    #[test]
    fn test_event_name_matches_wire_tag() {
        let record = sample_notification();
        for payload in [
            EventPayload::notification(&record),
            EventPayload::medication_reminder("Dipirona", "500mg", "08:00"),
            EventPayload::low_stock_alert("Dipirona", 3),
            EventPayload::new_notification(&record),
        ] {
            let value = serde_json::to_value(&payload).unwrap();
            assert_eq!(value["type"], payload.event_name());
        }
    }

    #[test]
    fn test_envelope_round_trip() {
        let envelope = Envelope::new(
            EventPayload::low_stock_alert("Dipirona", 2),
            Utc::now(),
        );
        let json = envelope.to_json().unwrap();
        let back = Envelope::from_json(&json).unwrap();
        assert_eq!(back, envelope);
    }
}
