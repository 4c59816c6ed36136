//! End-to-end scenarios: stock math through derivation through delivery.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::sync::mpsc;
use uuid::Uuid;

use notification_service::config::WorkerConfig;
use notification_service::models::{
    MedicationSnapshot, NewNotification, NotificationKind, NotificationStatus,
};
use notification_service::stock::{days_until_empty, is_low_stock};
use notification_service::store::{
    MemoryMedicationStore, MemoryNotificationStore, NotificationStore,
};
use notification_service::websocket::ConnectionRegistry;
use notification_service::{NotificationWorker, PushChannel};

fn medication(user_id: Uuid, name: &str, frequency: &str, stock: i32) -> MedicationSnapshot {
    MedicationSnapshot {
        id: Uuid::new_v4(),
        user_id,
        name: name.to_string(),
        dosage: "500mg".to_string(),
        frequency: frequency.to_string(),
        schedules: vec!["08:00".to_string()],
        stock,
        pills_per_container: 30,
    }
}

fn worker() -> (
    Arc<NotificationWorker>,
    Arc<MemoryNotificationStore>,
    Arc<MemoryMedicationStore>,
    ConnectionRegistry,
) {
    let notifications = Arc::new(MemoryNotificationStore::new());
    let medications = Arc::new(MemoryMedicationStore::new());
    let registry = ConnectionRegistry::new();
    let push = PushChannel::new(registry.clone());
    let worker = Arc::new(NotificationWorker::new(
        notifications.clone(),
        medications.clone(),
        push,
        WorkerConfig::default(),
    ));
    (worker, notifications, medications, registry)
}

#[test]
fn test_week_of_supply_counts_as_low() {
    // Three doses a day through 21 units: exactly seven days.
    let days = days_until_empty("3x ao dia", 21);
    assert_eq!(days, Some(7));
    assert!(is_low_stock(21, 30, days));
}

#[test]
fn test_hundred_days_of_supply_is_not_low() {
    let days = days_until_empty("1x ao dia", 100);
    assert_eq!(days, Some(100));
    assert!(!is_low_stock(100, 30, days));
}

#[tokio::test]
async fn test_boundary_medications_through_the_sweep() {
    let (worker, notifications, medications, _) = worker();
    let user_id = Uuid::new_v4();

    let low = medication(user_id, "Dipirona", "3x ao dia", 21);
    let fine = medication(user_id, "Losartana", "1x ao dia", 100);
    medications.push(low.clone()).await;
    medications.push(fine).await;

    assert_eq!(worker.run_low_stock_sweep(Utc::now()).await.unwrap(), 1);

    let rows = notifications.all().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].medication_id, Some(low.id));
    assert_eq!(rows[0].kind, NotificationKind::LowStockAlert);
}

#[tokio::test]
async fn test_unparseable_frequency_never_trips_duration_clause() {
    let (worker, notifications, medications, _) = worker();
    let user_id = Uuid::new_v4();

    // Plenty of stock, no parseable dose count: not low.
    medications
        .push(medication(user_id, "Pomada", "conforme necessario", 50))
        .await;

    assert_eq!(worker.run_low_stock_sweep(Utc::now()).await.unwrap(), 0);
    assert!(notifications.all().await.is_empty());
}

#[tokio::test]
async fn test_past_schedule_is_sent_with_exactly_one_push() {
    let (worker, notifications, _, registry) = worker();
    let user_id = Uuid::new_v4();
    let (tx, mut rx) = mpsc::unbounded_channel();
    registry.connect(user_id, tx).await;

    let now = Utc::now();
    let stored = notifications
        .insert(NewNotification {
            user_id,
            medication_id: None,
            kind: NotificationKind::General,
            title: "Overdue".to_string(),
            message: "Should go out now".to_string(),
            scheduled_for: Some(now - Duration::minutes(1)),
        })
        .await
        .unwrap();

    assert_eq!(worker.process_due_notifications(now).await.unwrap(), 1);

    let row = notifications.get(stored.id).await.unwrap();
    assert_eq!(row.status, NotificationStatus::Sent);
    assert!(row.sent_at.is_some());

    assert!(rx.try_recv().is_ok());
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_pushes_arrive_in_cycle_order() {
    let (worker, notifications, _, registry) = worker();
    let user_id = Uuid::new_v4();
    let (tx, mut rx) = mpsc::unbounded_channel();
    registry.connect(user_id, tx).await;

    let now = Utc::now();
    notifications
        .insert(NewNotification {
            user_id,
            medication_id: None,
            kind: NotificationKind::General,
            title: "first".to_string(),
            message: "cycle one".to_string(),
            scheduled_for: None,
        })
        .await
        .unwrap();
    worker.process_due_notifications(now).await.unwrap();

    notifications
        .insert(NewNotification {
            user_id,
            medication_id: None,
            kind: NotificationKind::General,
            title: "second".to_string(),
            message: "cycle two".to_string(),
            scheduled_for: None,
        })
        .await
        .unwrap();
    worker.process_due_notifications(now).await.unwrap();

    let first = rx.try_recv().unwrap();
    let second = rx.try_recv().unwrap();
    let title = |e: &notification_service::Envelope| match &e.payload {
        notification_service::EventPayload::Notification(data) => data.title.clone(),
        other => panic!("unexpected payload: {:?}", other),
    };
    assert_eq!(title(&first), "first");
    assert_eq!(title(&second), "second");
}
