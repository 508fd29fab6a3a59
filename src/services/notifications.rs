use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use crate::database::models::{Alert, Notification, NotificationType};
use crate::error::{AppError, AppResult};

/// Outward calls into notification delivery and operational alerting.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification) -> impl Future<Output = AppResult<()>> + Send;

    fn raise_alert(&self, alert: Alert) -> impl Future<Output = AppResult<()>> + Send;
}

/// Keeps every call in memory so callers can inspect what went out.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    notifications: Arc<Mutex<Vec<Notification>>>,
    alerts: Arc<Mutex<Vec<Alert>>>,
    failures: Arc<AtomicUsize>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications
            .lock()
            .map(|n| n.clone())
            .unwrap_or_default()
    }

    pub fn notifications_of(&self, notification_type: NotificationType) -> Vec<Notification> {
        self.notifications()
            .into_iter()
            .filter(|n| n.notification_type == notification_type)
            .collect()
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().map(|a| a.clone()).unwrap_or_default()
    }

    /// Make the next `count` deliveries (notifications or alerts) fail
    /// without being recorded, like an unreachable outbox.
    pub fn fail_next_deliveries(&self, count: usize) {
        self.failures.store(count, Ordering::SeqCst);
    }

    fn take_failure(&self) -> AppResult<()> {
        let failed = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(AppError::internal_server_error_message("outbox unavailable"));
        }
        Ok(())
    }

    pub fn clear(&self) {
        if let Ok(mut notifications) = self.notifications.lock() {
            notifications.clear();
        }
        if let Ok(mut alerts) = self.alerts.lock() {
            alerts.clear();
        }
    }
}

impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: Notification) -> AppResult<()> {
        self.take_failure()?;
        if let Ok(mut notifications) = self.notifications.lock() {
            notifications.push(notification);
        }
        Ok(())
    }

    async fn raise_alert(&self, alert: Alert) -> AppResult<()> {
        self.take_failure()?;
        if let Ok(mut alerts) = self.alerts.lock() {
            alerts.push(alert);
        }
        Ok(())
    }
}
