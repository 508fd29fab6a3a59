use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{
    authorization::OverworkAuthorization, macros::string_enum, minutes::Minutes,
    movement::TimeBankMovement,
};

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    pub enum RequestKind {
        Recovery => "RECOVERY",
        Festive => "FESTIVE",
    }
}

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    pub enum RequestStatus {
        Pending => "PENDING",
        Approved => "APPROVED",
        Rejected => "REJECTED",
        Cancelled => "CANCELLED",
    }
}

/// Employee-initiated request to spend (recovery) or credit (festive) banked
/// time. Independent of the daily candidate pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TimeBankRequest {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub employee_id: Uuid,
    pub kind: RequestKind,
    /// Always positive; the sign of the resulting movement follows the kind.
    pub minutes: Minutes,
    pub request_date: NaiveDate,
    pub reason: Option<String>,
    pub status: RequestStatus,
    pub reviewed_by: Option<Uuid>,
    pub review_notes: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TimeBankRequest {
    pub fn signed_minutes(&self) -> Minutes {
        match self.kind {
            RequestKind::Recovery => -self.minutes.abs(),
            RequestKind::Festive => self.minutes.abs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTimeBankRequestInput {
    pub employee_id: Uuid,
    pub kind: RequestKind,
    pub minutes: i32,
    pub date: NaiveDate,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequestInput {
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceAdjustmentInput {
    pub minutes: i32,
    pub reason: String,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeBankBalance {
    pub organization_id: Uuid,
    pub employee_id: Uuid,
    pub balance_minutes: Minutes,
    pub max_positive_minutes: Minutes,
    pub max_negative_minutes: Minutes,
    /// How much more can be credited before the positive cap.
    pub credit_headroom_minutes: Minutes,
    /// How much more can be debited before the negative cap.
    pub debit_headroom_minutes: Minutes,
    pub pending_authorizations: Vec<OverworkAuthorization>,
    pub recent_movements: Vec<TimeBankMovement>,
}
