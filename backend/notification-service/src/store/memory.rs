//! In-memory stores.
//!
//! Back the worker and service in tests and in database-less development
//! runs. They enforce the same status transitions as the Postgres stores.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{
    MedicationSnapshot, NewNotification, Notification, NotificationKind, NotificationStatus,
};
use crate::store::{MedicationStore, NotificationStore};

#[derive(Default)]
pub struct MemoryNotificationStore {
    rows: RwLock<Vec<Notification>>,
}

impl MemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored row, oldest first.
    pub async fn all(&self) -> Vec<Notification> {
        self.rows.read().await.clone()
    }

    pub async fn get(&self, id: Uuid) -> Option<Notification> {
        self.rows.read().await.iter().find(|n| n.id == id).cloned()
    }
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn insert(&self, new: NewNotification) -> AppResult<Notification> {
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            medication_id: new.medication_id,
            kind: new.kind,
            status: NotificationStatus::Pending,
            title: new.title,
            message: new.message,
            scheduled_for: new.scheduled_for,
            sent_at: None,
            read_at: None,
            created_at: Utc::now(),
        };

        self.rows.write().await.push(notification.clone());
        Ok(notification)
    }

    async fn find_since(
        &self,
        medication_id: Uuid,
        kind: NotificationKind,
        since: DateTime<Utc>,
    ) -> AppResult<Option<Notification>> {
        let rows = self.rows.read().await;
        let found = rows
            .iter()
            .filter(|n| {
                n.medication_id == Some(medication_id) && n.kind == kind && n.created_at >= since
            })
            .max_by_key(|n| n.created_at)
            .cloned();
        Ok(found)
    }

    async fn list_due(&self, now: DateTime<Utc>) -> AppResult<Vec<Notification>> {
        let rows = self.rows.read().await;
        let due = rows
            .iter()
            .filter(|n| {
                n.status == NotificationStatus::Pending
                    && n.scheduled_for.map_or(true, |at| at <= now)
            })
            .cloned()
            .collect();
        Ok(due)
    }

    async fn mark_sent(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<bool> {
        let mut rows = self.rows.write().await;
        match rows.iter_mut().find(|n| n.id == id) {
            Some(row) if row.status.can_transition_to(NotificationStatus::Sent) => {
                row.status = NotificationStatus::Sent;
                row.sent_at = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_failed(&self, id: Uuid) -> AppResult<bool> {
        let mut rows = self.rows.write().await;
        match rows.iter_mut().find(|n| n.id == id) {
            Some(row) if row.status.can_transition_to(NotificationStatus::Failed) => {
                row.status = NotificationStatus::Failed;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_read(&self, id: Uuid, user_id: Uuid, at: DateTime<Utc>) -> AppResult<bool> {
        let mut rows = self.rows.write().await;
        match rows.iter_mut().find(|n| n.id == id && n.user_id == user_id) {
            Some(row) if row.status.can_transition_to(NotificationStatus::Read) => {
                row.status = NotificationStatus::Read;
                row.read_at = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn unread_count(&self, user_id: Uuid) -> AppResult<i64> {
        let rows = self.rows.read().await;
        let count = rows
            .iter()
            .filter(|n| n.user_id == user_id && n.status != NotificationStatus::Read)
            .count();
        Ok(count as i64)
    }
}

#[derive(Default)]
pub struct MemoryMedicationStore {
    rows: RwLock<Vec<MedicationSnapshot>>,
}

impl MemoryMedicationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push(&self, medication: MedicationSnapshot) {
        self.rows.write().await.push(medication);
    }

    /// Overwrite the stock level of a stored medication.
    pub async fn set_stock(&self, id: Uuid, stock: i32) {
        let mut rows = self.rows.write().await;
        if let Some(row) = rows.iter_mut().find(|m| m.id == id) {
            row.stock = stock;
        }
    }
}

#[async_trait]
impl MedicationStore for MemoryMedicationStore {
    async fn in_stock(&self) -> AppResult<Vec<MedicationSnapshot>> {
        let rows = self.rows.read().await;
        Ok(rows.iter().filter(|m| m.stock > 0).cloned().collect())
    }

    async fn in_stock_for_user(&self, user_id: Uuid) -> AppResult<Vec<MedicationSnapshot>> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .filter(|m| m.user_id == user_id && m.stock > 0)
            .cloned()
            .collect())
    }

    async fn stock_at_most(&self, stock: i32) -> AppResult<Vec<MedicationSnapshot>> {
        let rows = self.rows.read().await;
        Ok(rows.iter().filter(|m| m.stock <= stock).cloned().collect())
    }
}
