//! Real-time push channel.
//!
//! Shapes domain events into wire envelopes and fans them out through the
//! connection registry. Fire and forget: the persisted notification row is
//! the system of record, so a push that reaches no links is not an error
//! and nothing is queued or retried.

use chrono::Utc;
use uuid::Uuid;

use crate::metrics;
use crate::models::Notification;
use crate::websocket::{ConnectionRegistry, Envelope, EventPayload};

#[derive(Clone)]
pub struct PushChannel {
    registry: ConnectionRegistry,
}

impl PushChannel {
    pub fn new(registry: ConnectionRegistry) -> Self {
        Self { registry }
    }

    /// Deliver a due notification record to its recipient.
    pub async fn notification(&self, user_id: Uuid, record: &Notification) -> usize {
        self.push(user_id, EventPayload::notification(record)).await
    }

    /// Deliver an immediate dose reminder.
    pub async fn medication_reminder(
        &self,
        user_id: Uuid,
        medication_name: &str,
        dosage: &str,
        time: &str,
    ) -> usize {
        self.push(
            user_id,
            EventPayload::medication_reminder(medication_name, dosage, time),
        )
        .await
    }

    /// Deliver an immediate low supply alert.
    pub async fn low_stock_alert(
        &self,
        user_id: Uuid,
        medication_name: &str,
        stock_count: i32,
    ) -> usize {
        self.push(
            user_id,
            EventPayload::low_stock_alert(medication_name, stock_count),
        )
        .await
    }

    /// Deliver a freshly created notification to its recipient.
    pub async fn new_notification(&self, user_id: Uuid, record: &Notification) -> usize {
        self.push(user_id, EventPayload::new_notification(record))
            .await
    }

    /// Stamp a payload and deliver it to one user's links.
    pub async fn push(&self, user_id: Uuid, payload: EventPayload) -> usize {
        let event = payload.event_name();
        let envelope = Envelope::new(payload, Utc::now());
        let delivered = self.registry.send_to_user(user_id, &envelope).await;

        metrics::observe_push(event, delivered);
        tracing::debug!(user_id = %user_id, event, delivered, "pushed envelope");
        delivered
    }

    /// Stamp a payload and deliver it to every connected user.
    pub async fn broadcast(&self, payload: EventPayload) -> usize {
        let event = payload.event_name();
        let envelope = Envelope::new(payload, Utc::now());
        let delivered = self.registry.broadcast(&envelope).await;

        metrics::observe_push(event, delivered);
        tracing::debug!(event, delivered, "broadcast envelope");
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_push_stamps_and_delivers() {
        let registry = ConnectionRegistry::new();
        let channel = PushChannel::new(registry.clone());
        let user_id = Uuid::new_v4();
        let (tx, mut rx) = mpsc::unbounded_channel();
        registry.connect(user_id, tx).await;

        let before = Utc::now();
        let delivered = channel.low_stock_alert(user_id, "Dipirona", 4).await;
        assert_eq!(delivered, 1);

        let envelope = rx.recv().await.unwrap();
        assert!(matches!(
            envelope.payload,
            EventPayload::LowStockAlert { stock_count: 4, .. }
        ));
        assert!(envelope.timestamp >= before);
    }

    #[tokio::test]
    async fn test_push_without_links_is_silent() {
        let registry = ConnectionRegistry::new();
        let channel = PushChannel::new(registry);

        let delivered = channel
            .medication_reminder(Uuid::new_v4(), "Dipirona", "500mg", "08:00")
            .await;
        assert_eq!(delivered, 0);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_all_users() {
        let registry = ConnectionRegistry::new();
        let channel = PushChannel::new(registry.clone());

        let (tx1, mut rx1) = mpsc::unbounded_channel();
        let (tx2, mut rx2) = mpsc::unbounded_channel();
        registry.connect(Uuid::new_v4(), tx1).await;
        registry.connect(Uuid::new_v4(), tx2).await;

        let delivered = channel
            .broadcast(EventPayload::low_stock_alert("Dipirona", 2))
            .await;

        assert_eq!(delivered, 2);
        assert!(rx1.recv().await.is_some());
        assert!(rx2.recv().await.is_some());
    }
}
