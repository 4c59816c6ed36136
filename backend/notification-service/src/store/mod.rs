//! Narrow persistence interfaces.
//!
//! The scheduler and service layer talk to storage through these traits;
//! [`postgres`] holds the production implementations and [`memory`] an
//! in-process pair used by tests and offline runs. Status changes go through
//! guarded transition operations, never blind writes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{MedicationSnapshot, NewNotification, Notification, NotificationKind};

pub mod memory;
pub mod postgres;

pub use memory::{MemoryMedicationStore, MemoryNotificationStore};
pub use postgres::{PgMedicationStore, PgNotificationStore};

/// Persistence operations on notification rows
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Insert a new PENDING notification and return the stored row.
    async fn insert(&self, new: NewNotification) -> AppResult<Notification>;

    /// Latest notification of `kind` for a medication created at or after
    /// `since`. Used for deduplication windows.
    async fn find_since(
        &self,
        medication_id: Uuid,
        kind: NotificationKind,
        since: DateTime<Utc>,
    ) -> AppResult<Option<Notification>>;

    /// Pending notifications that are due: no schedule, or scheduled at or
    /// before `now`.
    async fn list_due(&self, now: DateTime<Utc>) -> AppResult<Vec<Notification>>;

    /// PENDING -> SENT. Returns false when the row is missing or not PENDING.
    async fn mark_sent(&self, id: Uuid, at: DateTime<Utc>) -> AppResult<bool>;

    /// PENDING or SENT -> FAILED. Returns false when the row is missing or
    /// already terminal.
    async fn mark_failed(&self, id: Uuid) -> AppResult<bool>;

    /// PENDING or SENT -> READ, scoped to the owning user. Returns false
    /// when the row is missing, owned by someone else, or already terminal.
    async fn mark_read(&self, id: Uuid, user_id: Uuid, at: DateTime<Utc>) -> AppResult<bool>;

    /// Number of a user's notifications not yet read.
    async fn unread_count(&self, user_id: Uuid) -> AppResult<i64>;
}

/// Read-only view of the medication catalog
#[async_trait]
pub trait MedicationStore: Send + Sync {
    /// All medications with stock on hand, across users.
    async fn in_stock(&self) -> AppResult<Vec<MedicationSnapshot>>;

    /// One user's medications with stock on hand.
    async fn in_stock_for_user(&self, user_id: Uuid) -> AppResult<Vec<MedicationSnapshot>>;

    /// Medications whose stock is at or below the given level.
    async fn stock_at_most(&self, stock: i32) -> AppResult<Vec<MedicationSnapshot>>;
}
