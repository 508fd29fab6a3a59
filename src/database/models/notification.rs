use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{macros::string_enum, minutes::Minutes};

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    pub enum NotificationType {
        OvertimeApprovalRequested => "OVERTIME_APPROVAL_REQUESTED",
        OvertimeApprovalAdjusted => "OVERTIME_APPROVAL_ADJUSTED",
        OvertimeApproved => "OVERTIME_APPROVED",
        OvertimeRejected => "OVERTIME_REJECTED",
        OvertimeExpired => "OVERTIME_EXPIRED",
        TimeBankRequestApproved => "TIME_BANK_REQUEST_APPROVED",
        TimeBankRequestRejected => "TIME_BANK_REQUEST_REJECTED",
    }
}

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    pub enum AlertSeverity {
        Info => "INFO",
        Warning => "WARNING",
        Critical => "CRITICAL",
    }
}

/// Category passed to the approver resolver.
pub const OVERTIME_APPROVAL_CATEGORY: &str = "OVERTIME";
pub const TIME_BANK_APPROVAL_CATEGORY: &str = "TIME_BANK";

/// Alert type raised when a day first needs overtime approval.
pub const OVERTIME_PENDING_ALERT: &str = "OVERTIME_PENDING_APPROVAL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub organization_id: Uuid,
    pub employee_id: Uuid,
    pub severity: AlertSeverity,
    pub alert_type: String,
    pub description: String,
    pub date: NaiveDate,
    pub deviation_minutes: Minutes,
}
