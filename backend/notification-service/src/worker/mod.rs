//! Background notification scheduler.
//!
//! One long-lived cooperative loop per process. Three tickers share a single
//! `select!`: the due-send cycle (every minute), the reminder sweep (every
//! five minutes) and the low-stock sweep (hourly). A failing item never
//! aborts its pass, a failing pass never kills the loop; the loop exits only
//! through [`NotificationWorker::stop`].
//!
//! Each pass takes `now` as an argument so tests can drive the cadences
//! directly with a controlled clock.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::time::interval;
use tracing::{debug, error, info, warn};

use crate::config::WorkerConfig;
use crate::error::AppResult;
use crate::metrics;
use crate::models::{MedicationSnapshot, NotificationKind};
use crate::producers;
use crate::push::PushChannel;
use crate::store::{MedicationStore, NotificationStore};

pub struct NotificationWorker {
    notifications: Arc<dyn NotificationStore>,
    medications: Arc<dyn MedicationStore>,
    push: PushChannel,
    config: WorkerConfig,
    running: AtomicBool,
    shutdown: watch::Sender<bool>,
}

impl NotificationWorker {
    pub fn new(
        notifications: Arc<dyn NotificationStore>,
        medications: Arc<dyn MedicationStore>,
        push: PushChannel,
        config: WorkerConfig,
    ) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            notifications,
            medications,
            push,
            config,
            running: AtomicBool::new(false),
            shutdown,
        }
    }

    /// Spawn the scheduler loop. Starting an already-running worker is a
    /// no-op that returns an immediately-finished handle.
    pub fn start(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("notification worker already running, ignoring start");
            return tokio::spawn(async {});
        }

        // send_replace updates the flag even while no receiver exists yet.
        self.shutdown.send_replace(false);
        // Subscribe before spawning: a stop() issued before the task first
        // polls must still be observed as a change.
        let shutdown = self.shutdown.subscribe();
        let worker = Arc::clone(self);
        tokio::spawn(async move {
            worker.run(shutdown).await;
            worker.running.store(false, Ordering::SeqCst);
        })
    }

    /// Ask the loop to exit. Advisory: the current pass runs to completion.
    pub fn stop(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut due_timer = interval(Duration::from_secs(self.config.cycle_secs));
        let mut reminder_timer = interval(Duration::from_secs(self.config.reminder_secs));
        let mut low_stock_timer = interval(Duration::from_secs(self.config.low_stock_secs));

        info!(
            cycle_secs = self.config.cycle_secs,
            reminder_secs = self.config.reminder_secs,
            low_stock_secs = self.config.low_stock_secs,
            "notification worker started"
        );

        loop {
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("notification worker received stop signal");
                        break;
                    }
                }
                _ = due_timer.tick() => {
                    self.observe("due_send", self.process_due_notifications(Utc::now()).await);
                }
                _ = reminder_timer.tick() => {
                    self.observe("reminder", self.run_reminder_sweep(Utc::now()).await);
                }
                _ = low_stock_timer.tick() => {
                    self.observe("low_stock", self.run_low_stock_sweep(Utc::now()).await);
                }
            }
        }

        info!("notification worker stopped");
    }

    fn observe(&self, pass: &'static str, outcome: AppResult<usize>) {
        match outcome {
            Ok(processed) => {
                metrics::observe_worker_pass(pass, true);
                if processed > 0 {
                    debug!(pass, processed, "scheduler pass completed");
                }
            }
            Err(e) => {
                metrics::observe_worker_pass(pass, false);
                error!(pass, error = %e, "scheduler pass failed, will retry next tick");
            }
        }
    }

    /// Deliver every pending notification whose schedule has come due.
    ///
    /// The SENT mark is persisted before the push and never reverted: the
    /// stored row is the system of record, the push a best-effort signal.
    /// Returns how many rows were sent.
    pub async fn process_due_notifications(&self, now: DateTime<Utc>) -> AppResult<usize> {
        let due = self.notifications.list_due(now).await?;
        let mut sent = 0;

        for notification in due {
            match self.notifications.mark_sent(notification.id, now).await {
                Ok(true) => {
                    self.push
                        .notification(notification.user_id, &notification)
                        .await;
                    sent += 1;
                }
                Ok(false) => {
                    // Raced with another transition; leave the row alone.
                    debug!(
                        notification_id = %notification.id,
                        "due notification no longer pending, skipping"
                    );
                }
                Err(e) => {
                    warn!(
                        notification_id = %notification.id,
                        error = %e,
                        "failed to mark notification sent"
                    );
                    if let Err(e) = self.notifications.mark_failed(notification.id).await {
                        warn!(
                            notification_id = %notification.id,
                            error = %e,
                            "failed to mark notification failed"
                        );
                    }
                }
            }
        }

        Ok(sent)
    }

    /// Create dose reminders for every in-stock medication with a schedule.
    ///
    /// At most one reminder per medication per day: the dedup lookup sees
    /// rows created earlier in the same sweep, so the first slot wins.
    /// Returns how many reminders were created.
    pub async fn run_reminder_sweep(&self, now: DateTime<Utc>) -> AppResult<usize> {
        let since = producers::reminder_window_start(now);
        let mut created = 0;

        for medication in self.medications.in_stock().await? {
            for slot in &medication.schedules {
                match self.create_reminder(&medication, slot, since, now).await {
                    Ok(true) => created += 1,
                    Ok(false) => {}
                    Err(e) => {
                        warn!(
                            medication_id = %medication.id,
                            slot = %slot,
                            error = %e,
                            "reminder derivation failed, skipping medication slot"
                        );
                    }
                }
            }
        }

        Ok(created)
    }

    async fn create_reminder(
        &self,
        medication: &MedicationSnapshot,
        slot: &str,
        since: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<bool> {
        let existing = self
            .notifications
            .find_since(medication.id, NotificationKind::MedicationReminder, since)
            .await?;
        if existing.is_some() {
            return Ok(false);
        }

        let stored = self
            .notifications
            .insert(producers::reminder_candidate(medication, slot, now))
            .await?;
        self.push
            .medication_reminder(medication.user_id, &medication.name, &medication.dosage, slot)
            .await;

        debug!(
            notification_id = %stored.id,
            medication_id = %medication.id,
            slot = %slot,
            "created medication reminder"
        );
        Ok(true)
    }

    /// Alert on medications running low, then flag depleted ones.
    ///
    /// Both checks dedup against the last 24 hours. Low-stock alerts are
    /// pushed immediately; depleted notices have no schedule and go out with
    /// the next due-send pass. Returns how many rows were created.
    pub async fn run_low_stock_sweep(&self, now: DateTime<Utc>) -> AppResult<usize> {
        let since = producers::alert_window_start(now);
        let mut created = 0;

        for medication in self.medications.in_stock().await? {
            if !producers::needs_low_stock_alert(&medication) {
                continue;
            }
            match self.create_low_stock_alert(&medication, since).await {
                Ok(true) => created += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(
                        medication_id = %medication.id,
                        error = %e,
                        "low stock derivation failed, skipping medication"
                    );
                }
            }
        }

        for medication in self.medications.stock_at_most(0).await? {
            match self.create_depleted_notice(&medication, since).await {
                Ok(true) => created += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(
                        medication_id = %medication.id,
                        error = %e,
                        "depleted check failed, skipping medication"
                    );
                }
            }
        }

        Ok(created)
    }

    async fn create_low_stock_alert(
        &self,
        medication: &MedicationSnapshot,
        since: DateTime<Utc>,
    ) -> AppResult<bool> {
        let existing = self
            .notifications
            .find_since(medication.id, NotificationKind::LowStockAlert, since)
            .await?;
        if existing.is_some() {
            return Ok(false);
        }

        let stored = self
            .notifications
            .insert(producers::low_stock_candidate(medication))
            .await?;
        self.push
            .low_stock_alert(medication.user_id, &medication.name, medication.stock)
            .await;

        debug!(
            notification_id = %stored.id,
            medication_id = %medication.id,
            stock = medication.stock,
            "created low stock alert"
        );
        Ok(true)
    }

    async fn create_depleted_notice(
        &self,
        medication: &MedicationSnapshot,
        since: DateTime<Utc>,
    ) -> AppResult<bool> {
        let existing = self
            .notifications
            .find_since(medication.id, NotificationKind::MedicationExpiry, since)
            .await?;
        if existing.is_some() {
            return Ok(false);
        }

        let stored = self
            .notifications
            .insert(producers::depleted_candidate(medication))
            .await?;

        debug!(
            notification_id = %stored.id,
            medication_id = %medication.id,
            "created depleted notice"
        );
        Ok(true)
    }
}
