//! Postgres-backed stores.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::error;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    MedicationSnapshot, NewNotification, Notification, NotificationKind, NotificationStatus,
};
use crate::store::{MedicationStore, NotificationStore};

pub struct PgNotificationStore {
    db: PgPool,
}

impl PgNotificationStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl NotificationStore for PgNotificationStore {
    async fn insert(&self, new: NewNotification) -> AppResult<Notification> {
        let query = r#"
            INSERT INTO notifications (
                id, user_id, medication_id, kind, status, title, message,
                scheduled_for, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, user_id, medication_id, kind, status, title, message,
                      scheduled_for, sent_at, read_at, created_at
        "#;

        let row = sqlx::query(query)
            .bind(Uuid::new_v4())
            .bind(new.user_id)
            .bind(new.medication_id)
            .bind(new.kind.as_str())
            .bind(NotificationStatus::Pending.as_str())
            .bind(&new.title)
            .bind(&new.message)
            .bind(new.scheduled_for)
            .bind(Utc::now())
            .fetch_one(&self.db)
            .await
            .map_err(|e| {
                error!("Failed to insert notification: {}", e);
                AppError::from(e)
            })?;

        Ok(notification_from_row(&row))
    }

    async fn find_since(
        &self,
        medication_id: Uuid,
        kind: NotificationKind,
        since: DateTime<Utc>,
    ) -> AppResult<Option<Notification>> {
        let query = r#"
            SELECT id, user_id, medication_id, kind, status, title, message,
                   scheduled_for, sent_at, read_at, created_at
            FROM notifications
            WHERE medication_id = $1 AND kind = $2 AND created_at >= $3
            ORDER BY created_at DESC
            LIMIT 1
        "#;

        let row = sqlx::query(query)
            .bind(medication_id)
            .bind(kind.as_str())
            .bind(since)
            .fetch_optional(&self.db)
            .await
            .map_err(|e| {
                error!("Failed to look up recent notification: {}", e);
                AppError::from(e)
            })?;

        Ok(row.as_ref().map(notification_from_row))
    }

    async fn list_due(&self, now: DateTime<Utc>) -> AppResult<Vec<Notification>> {
        let query = r#"
            SELECT id, user_id, medication_id, kind, status, title, message,
                   scheduled_for, sent_at, read_at, created_at
            FROM notifications
            WHERE status = 'PENDING'
              AND (scheduled_for IS NULL OR scheduled_for <= $1)
            ORDER BY created_at
        "#;

        let rows = sqlx::query(query)
            .bind(now)
            .fetch_all(&self.db)
            .await
            .map_err(|e| {
                error!("Failed to list due notifications: {}", e);
                AppError::from(e)
            })?;

        Ok(rows.iter().map(notification_from_row).collect())
    }

    async fn mark_sent(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<bool> {
        let query = r#"
            UPDATE notifications
            SET status = 'SENT', sent_at = $2
            WHERE id = $1 AND status = 'PENDING'
        "#;

        let result = sqlx::query(query)
            .bind(id)
            .bind(at)
            .execute(&self.db)
            .await
            .map_err(|e| {
                error!("Failed to mark notification {} sent: {}", id, e);
                AppError::from(e)
            })?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_failed(&self, id: Uuid) -> AppResult<bool> {
        let query = r#"
            UPDATE notifications
            SET status = 'FAILED'
            WHERE id = $1 AND status IN ('PENDING', 'SENT')
        "#;

        let result = sqlx::query(query)
            .bind(id)
            .execute(&self.db)
            .await
            .map_err(|e| {
                error!("Failed to mark notification {} failed: {}", id, e);
                AppError::from(e)
            })?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_read(&self, id: Uuid, user_id: Uuid, at: DateTime<Utc>) -> AppResult<bool> {
        let query = r#"
            UPDATE notifications
            SET status = 'READ', read_at = $3
            WHERE id = $1 AND user_id = $2 AND status IN ('PENDING', 'SENT')
        "#;

        let result = sqlx::query(query)
            .bind(id)
            .bind(user_id)
            .bind(at)
            .execute(&self.db)
            .await
            .map_err(|e| {
                error!("Failed to mark notification {} read: {}", id, e);
                AppError::from(e)
            })?;

        Ok(result.rows_affected() > 0)
    }

    async fn unread_count(&self, user_id: Uuid) -> AppResult<i64> {
        let query = r#"
            SELECT COUNT(*) as count
            FROM notifications
            WHERE user_id = $1 AND status != 'READ'
        "#;

        let row = sqlx::query(query)
            .bind(user_id)
            .fetch_one(&self.db)
            .await
            .map_err(|e| {
                error!("Failed to count unread notifications: {}", e);
                AppError::from(e)
            })?;

        Ok(row.get("count"))
    }
}

pub struct PgMedicationStore {
    db: PgPool,
}

impl PgMedicationStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MedicationStore for PgMedicationStore {
    async fn in_stock(&self) -> AppResult<Vec<MedicationSnapshot>> {
        let query = r#"
            SELECT id, user_id, name, dosage, frequency, schedules,
                   stock, pills_per_container
            FROM medications
            WHERE stock > 0
            ORDER BY name
        "#;

        let rows = sqlx::query(query)
            .fetch_all(&self.db)
            .await
            .map_err(|e| {
                error!("Failed to load in-stock medications: {}", e);
                AppError::from(e)
            })?;

        Ok(rows.iter().map(medication_from_row).collect())
    }

    async fn in_stock_for_user(&self, user_id: Uuid) -> AppResult<Vec<MedicationSnapshot>> {
        let query = r#"
            SELECT id, user_id, name, dosage, frequency, schedules,
                   stock, pills_per_container
            FROM medications
            WHERE user_id = $1 AND stock > 0
            ORDER BY name
        "#;

        let rows = sqlx::query(query)
            .bind(user_id)
            .fetch_all(&self.db)
            .await
            .map_err(|e| {
                error!("Failed to load medications for user {}: {}", user_id, e);
                AppError::from(e)
            })?;

        Ok(rows.iter().map(medication_from_row).collect())
    }

    async fn stock_at_most(&self, stock: i32) -> AppResult<Vec<MedicationSnapshot>> {
        let query = r#"
            SELECT id, user_id, name, dosage, frequency, schedules,
                   stock, pills_per_container
            FROM medications
            WHERE stock <= $1
            ORDER BY name
        "#;

        let rows = sqlx::query(query)
            .bind(stock)
            .fetch_all(&self.db)
            .await
            .map_err(|e| {
                error!("Failed to load medications by stock level: {}", e);
                AppError::from(e)
            })?;

        Ok(rows.iter().map(medication_from_row).collect())
    }
}

fn notification_from_row(row: &PgRow) -> Notification {
    let kind: String = row.get("kind");
    let status: String = row.get("status");

    Notification {
        id: row.get("id"),
        user_id: row.get("user_id"),
        medication_id: row.get("medication_id"),
        kind: NotificationKind::parse(&kind).unwrap_or(NotificationKind::General),
        status: NotificationStatus::parse(&status).unwrap_or(NotificationStatus::Pending),
        title: row.get("title"),
        message: row.get("message"),
        scheduled_for: row.get("scheduled_for"),
        sent_at: row.get("sent_at"),
        read_at: row.get("read_at"),
        created_at: row.get("created_at"),
    }
}

fn medication_from_row(row: &PgRow) -> MedicationSnapshot {
    MedicationSnapshot {
        id: row.get("id"),
        user_id: row.get("user_id"),
        name: row.get("name"),
        dosage: row.get("dosage"),
        frequency: row.get("frequency"),
        schedules: row.get("schedules"),
        stock: row.get("stock"),
        pills_per_container: row.get("pills_per_container"),
    }
}
