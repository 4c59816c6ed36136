//! User-triggered notification operations.
//!
//! The scheduler owns the recurring sweeps; this service covers the
//! operations a request can trigger directly: creating a notification,
//! acknowledging one, and deriving a user's reminders or low-stock alerts
//! on demand.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{NewNotification, Notification, NotificationKind};
use crate::producers;
use crate::push::PushChannel;
use crate::store::{MedicationStore, NotificationStore};

pub struct NotificationService {
    notifications: Arc<dyn NotificationStore>,
    medications: Arc<dyn MedicationStore>,
    push: PushChannel,
}

impl NotificationService {
    pub fn new(
        notifications: Arc<dyn NotificationStore>,
        medications: Arc<dyn MedicationStore>,
        push: PushChannel,
    ) -> Self {
        Self {
            notifications,
            medications,
            push,
        }
    }

    /// Persist a notification and push it to its recipient right away.
    ///
    /// The push is fire-and-forget; the stored row stays PENDING and the
    /// scheduler delivers it on the next due pass.
    pub async fn create_and_push(&self, new: NewNotification) -> AppResult<Notification> {
        let stored = self.notifications.insert(new).await?;
        let delivered = self.push.new_notification(stored.user_id, &stored).await;

        debug!(
            notification_id = %stored.id,
            user_id = %stored.user_id,
            delivered,
            "created notification"
        );
        Ok(stored)
    }

    /// Mark one of the user's notifications read.
    pub async fn mark_read(&self, id: Uuid, user_id: Uuid, now: DateTime<Utc>) -> AppResult<()> {
        let updated = self.notifications.mark_read(id, user_id, now).await?;
        if !updated {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    pub async fn unread_count(&self, user_id: Uuid) -> AppResult<i64> {
        self.notifications.unread_count(user_id).await
    }

    /// Create dose reminders for every in-stock medication the user owns.
    ///
    /// Reminders come due 30 minutes out and are delivered by the scheduler.
    /// At most one reminder per medication per day; returns how many rows
    /// were created.
    pub async fn create_reminders_for_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<usize> {
        let since = producers::reminder_window_start(now);
        let mut created = 0;

        for medication in self.medications.in_stock_for_user(user_id).await? {
            let existing = self
                .notifications
                .find_since(medication.id, NotificationKind::MedicationReminder, since)
                .await?;
            if existing.is_some() {
                continue;
            }

            self.notifications
                .insert(producers::batch_reminder_candidate(&medication, now))
                .await?;
            created += 1;
        }

        info!(user_id = %user_id, created, "created medication reminders");
        Ok(created)
    }

    /// Create low-stock alerts for the user's medications that are running
    /// out. At most one alert per medication per 24 hours; returns how many
    /// rows were created.
    pub async fn create_low_stock_alerts_for_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<usize> {
        let since = producers::alert_window_start(now);
        let mut created = 0;

        for medication in self.medications.in_stock_for_user(user_id).await? {
            if !producers::needs_low_stock_alert(&medication) {
                continue;
            }

            let existing = self
                .notifications
                .find_since(medication.id, NotificationKind::LowStockAlert, since)
                .await?;
            if existing.is_some() {
                continue;
            }

            self.notifications
                .insert(producers::low_stock_candidate(&medication))
                .await?;
            created += 1;
        }

        info!(user_id = %user_id, created, "created low stock alerts");
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MedicationSnapshot, NotificationStatus};
    use crate::store::{MemoryMedicationStore, MemoryNotificationStore};
    use crate::websocket::{ConnectionRegistry, EventPayload};

    fn medication(user_id: Uuid, name: &str, frequency: &str, stock: i32) -> MedicationSnapshot {
        MedicationSnapshot {
            id: Uuid::new_v4(),
            user_id,
            name: name.to_string(),
            dosage: "500mg".to_string(),
            frequency: frequency.to_string(),
            schedules: vec!["08:00".to_string(), "20:00".to_string()],
            stock,
            pills_per_container: 30,
        }
    }

    fn service() -> (
        NotificationService,
        Arc<MemoryNotificationStore>,
        Arc<MemoryMedicationStore>,
        ConnectionRegistry,
    ) {
        let notifications = Arc::new(MemoryNotificationStore::new());
        let medications = Arc::new(MemoryMedicationStore::new());
        let registry = ConnectionRegistry::default();
        let push = PushChannel::new(registry.clone());
        let service =
            NotificationService::new(notifications.clone(), medications.clone(), push);
        (service, notifications, medications, registry)
    }

    #[tokio::test]
    async fn test_create_and_push_reaches_live_link() {
        let (service, _, _, registry) = service();
        let user_id = Uuid::new_v4();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        registry.connect(user_id, tx).await;

        let stored = service
            .create_and_push(NewNotification {
                user_id,
                medication_id: None,
                kind: NotificationKind::General,
                title: "Welcome".to_string(),
                message: "Hello".to_string(),
                scheduled_for: None,
            })
            .await
            .unwrap();

        assert_eq!(stored.status, NotificationStatus::Pending);

        let envelope = rx.try_recv().expect("expected a pushed envelope");
        match envelope.payload {
            EventPayload::NewNotification(data) => {
                assert_eq!(data.id, stored.id);
                assert_eq!(data.title, "Welcome");
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_and_push_without_links_still_persists() {
        let (service, notifications, _, _) = service();
        let user_id = Uuid::new_v4();

        let stored = service
            .create_and_push(NewNotification {
                user_id,
                medication_id: None,
                kind: NotificationKind::General,
                title: "Offline".to_string(),
                message: "Nobody listening".to_string(),
                scheduled_for: None,
            })
            .await
            .unwrap();

        assert!(notifications.get(stored.id).await.is_some());
    }

    #[tokio::test]
    async fn test_mark_read_unknown_row_is_not_found() {
        let (service, _, _, _) = service();

        let err = service
            .mark_read(Uuid::new_v4(), Uuid::new_v4(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }

    #[tokio::test]
    async fn test_mark_read_other_users_row_is_not_found() {
        let (service, _, _, _) = service();
        let owner = Uuid::new_v4();

        let stored = service
            .create_and_push(NewNotification {
                user_id: owner,
                medication_id: None,
                kind: NotificationKind::General,
                title: "Private".to_string(),
                message: "Owner only".to_string(),
                scheduled_for: None,
            })
            .await
            .unwrap();

        let err = service
            .mark_read(stored.id, Uuid::new_v4(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound));

        service.mark_read(stored.id, owner, Utc::now()).await.unwrap();
        assert_eq!(service.unread_count(owner).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_batch_reminders_once_per_day() {
        let (service, notifications, medications, _) = service();
        let user_id = Uuid::new_v4();
        medications
            .push(medication(user_id, "Dipirona", "2x ao dia", 20))
            .await;
        medications
            .push(medication(user_id, "Losartana", "1x ao dia", 30))
            .await;

        let now = Utc::now();
        assert_eq!(
            service.create_reminders_for_user(user_id, now).await.unwrap(),
            2
        );
        assert_eq!(
            service.create_reminders_for_user(user_id, now).await.unwrap(),
            0
        );

        let rows = notifications.all().await;
        assert_eq!(rows.len(), 2);
        assert!(rows
            .iter()
            .all(|n| n.kind == NotificationKind::MedicationReminder));
    }

    #[tokio::test]
    async fn test_batch_alerts_only_for_low_stock() {
        let (service, notifications, medications, _) = service();
        let user_id = Uuid::new_v4();
        medications
            .push(medication(user_id, "Dipirona", "3x ao dia", 6))
            .await;
        medications
            .push(medication(user_id, "Losartana", "1x ao dia", 100))
            .await;

        let now = Utc::now();
        assert_eq!(
            service
                .create_low_stock_alerts_for_user(user_id, now)
                .await
                .unwrap(),
            1
        );
        assert_eq!(
            service
                .create_low_stock_alerts_for_user(user_id, now)
                .await
                .unwrap(),
            0
        );

        let rows = notifications.all().await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].kind, NotificationKind::LowStockAlert);
        assert!(rows[0].message.contains("Dipirona"));
    }
}
