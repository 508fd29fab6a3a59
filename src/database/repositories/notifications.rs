use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::{
    models::{Alert, Notification},
    utils::sql,
};
use crate::error::AppResult;
use crate::services::notifications::Notifier;

/// Queues notifications and alerts in outbox tables for the delivery service.
#[derive(Clone)]
pub struct PgNotifier {
    pool: PgPool,
}

impl PgNotifier {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl Notifier for PgNotifier {
    async fn notify(&self, notification: Notification) -> AppResult<()> {
        sqlx::query(&sql(r#"
            INSERT INTO
                notification_outbox (
                    id,
                    user_id,
                    organization_id,
                    notification_type,
                    title,
                    message,
                    created_at
                )
            VALUES
                (?, ?, ?, ?, ?, ?, ?)
        "#))
        .bind(Uuid::new_v4())
        .bind(notification.user_id)
        .bind(notification.organization_id)
        .bind(notification.notification_type)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        log::debug!(
            "Queued {} notification for user {}",
            notification.notification_type,
            notification.user_id
        );
        Ok(())
    }

    async fn raise_alert(&self, alert: Alert) -> AppResult<()> {
        sqlx::query(&sql(r#"
            INSERT INTO
                operational_alerts (
                    id,
                    organization_id,
                    employee_id,
                    severity,
                    alert_type,
                    description,
                    alert_date,
                    deviation_minutes,
                    created_at
                )
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#))
        .bind(Uuid::new_v4())
        .bind(alert.organization_id)
        .bind(alert.employee_id)
        .bind(alert.severity)
        .bind(&alert.alert_type)
        .bind(&alert.description)
        .bind(alert.date)
        .bind(alert.deviation_minutes)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
