use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{macros::string_enum, minutes::Minutes, policy::CompensationType};

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    pub enum AuthorizationStatus {
        Pending => "PENDING",
        Approved => "APPROVED",
        Rejected => "REJECTED",
        Cancelled => "CANCELLED",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OverworkAuthorization {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub employee_id: Uuid,
    pub work_date: NaiveDate,
    pub candidate_id: Uuid,
    pub requested_minutes: Minutes,
    pub approved_minutes: Option<Minutes>,
    pub status: AuthorizationStatus,
    pub compensation_type: CompensationType,
    pub requested_by: Option<Uuid>,
    pub approver_id: Option<Uuid>,
    pub resolution_notes: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OverworkAuthorization {
    pub fn new(
        organization_id: Uuid,
        employee_id: Uuid,
        work_date: NaiveDate,
        candidate_id: Uuid,
        requested_minutes: Minutes,
        compensation_type: CompensationType,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            organization_id,
            employee_id,
            work_date,
            candidate_id,
            requested_minutes,
            approved_minutes: None,
            status: AuthorizationStatus::Pending,
            compensation_type,
            requested_by: None,
            approver_id: None,
            resolution_notes: None,
            resolved_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Pending or approved: still has a say over the day's ledger effect.
    pub fn is_open(&self) -> bool {
        matches!(
            self.status,
            AuthorizationStatus::Pending | AuthorizationStatus::Approved
        )
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveAuthorizationInput {
    pub approved_minutes: Option<i32>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectAuthorizationInput {
    pub notes: Option<String>,
}
