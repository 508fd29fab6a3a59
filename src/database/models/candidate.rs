use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{macros::string_enum, minutes::Minutes};

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    pub enum CandidateType {
        Extra => "EXTRA",
        Deficit => "DEFICIT",
        Complementary => "COMPLEMENTARY",
        NonWorkday => "NON_WORKDAY",
    }
}

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    pub enum CandidateStatus {
        PendingCalc => "PENDING_CALC",
        Ready => "READY",
        PendingApproval => "PENDING_APPROVAL",
        Settled => "SETTLED",
        Rejected => "REJECTED",
        Skipped => "SKIPPED",
    }
}

impl CandidateStatus {
    /// Statuses whose minutes count towards the weekly daily-sum.
    pub fn counts_towards_week(&self) -> bool {
        matches!(self, CandidateStatus::Settled | CandidateStatus::Ready)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct OvertimeCandidate {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub employee_id: Uuid,
    pub work_date: NaiveDate,
    pub workday_id: Option<Uuid>,
    pub expected_minutes: Option<Minutes>,
    pub worked_minutes: Minutes,
    pub raw_deviation_minutes: Minutes,
    pub candidate_minutes: Minutes,
    pub candidate_type: CandidateType,
    pub status: CandidateStatus,
    pub requires_approval: bool,
    pub skip_reason: Option<String>,
    pub overwork_authorization_id: Option<Uuid>,
    pub policy_snapshot: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The computed next state of a candidate row, before identity and timestamps
/// are attached.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateInput {
    pub organization_id: Uuid,
    pub employee_id: Uuid,
    pub work_date: NaiveDate,
    pub workday_id: Option<Uuid>,
    pub expected_minutes: Option<Minutes>,
    pub worked_minutes: Minutes,
    pub raw_deviation_minutes: Minutes,
    pub candidate_minutes: Minutes,
    pub candidate_type: CandidateType,
    pub status: CandidateStatus,
    pub requires_approval: bool,
    pub skip_reason: Option<String>,
    pub overwork_authorization_id: Option<Uuid>,
    pub policy_snapshot: serde_json::Value,
}

impl CandidateInput {
    /// True when writing `self` over `existing` would change nothing.
    pub fn matches(&self, existing: &OvertimeCandidate) -> bool {
        self.organization_id == existing.organization_id
            && self.employee_id == existing.employee_id
            && self.work_date == existing.work_date
            && self.workday_id == existing.workday_id
            && self.expected_minutes == existing.expected_minutes
            && self.worked_minutes == existing.worked_minutes
            && self.raw_deviation_minutes == existing.raw_deviation_minutes
            && self.candidate_minutes == existing.candidate_minutes
            && self.candidate_type == existing.candidate_type
            && self.status == existing.status
            && self.requires_approval == existing.requires_approval
            && self.skip_reason == existing.skip_reason
            && self.overwork_authorization_id == existing.overwork_authorization_id
            && self.policy_snapshot == existing.policy_snapshot
    }

    pub fn with_status(mut self, status: CandidateStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_authorization(mut self, authorization_id: Option<Uuid>) -> Self {
        self.overwork_authorization_id = authorization_id;
        self
    }
}
