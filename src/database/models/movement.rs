use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{candidate::CandidateType, macros::string_enum, minutes::Minutes};

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    pub enum MovementType {
        Extra => "EXTRA",
        Deficit => "DEFICIT",
        Correction => "CORRECTION",
        Recovery => "RECOVERY",
        Festive => "FESTIVE",
        Adjustment => "ADJUSTMENT",
    }
}

impl From<CandidateType> for MovementType {
    fn from(candidate_type: CandidateType) -> Self {
        match candidate_type {
            CandidateType::Extra | CandidateType::Complementary => MovementType::Extra,
            CandidateType::Deficit => MovementType::Deficit,
            CandidateType::NonWorkday => MovementType::Festive,
        }
    }
}

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    pub enum MovementOrigin {
        AutoDaily => "AUTO_DAILY",
        OvertimeAuthorization => "OVERTIME_AUTHORIZATION",
        EmployeeRequest => "EMPLOYEE_REQUEST",
        Correction => "CORRECTION",
    }
}

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    pub enum MovementStatus {
        Confirmed => "CONFIRMED",
        Cancelled => "CANCELLED",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TimeBankMovement {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub employee_id: Uuid,
    pub movement_date: NaiveDate,
    pub minutes: Minutes,
    pub movement_type: MovementType,
    pub origin: MovementOrigin,
    pub status: MovementStatus,
    pub workday_id: Option<Uuid>,
    pub overwork_authorization_id: Option<Uuid>,
    pub time_bank_request_id: Option<Uuid>,
    pub correction_week_start: Option<NaiveDate>,
    pub description: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Natural key of a ledger movement. Every engine write goes through one of
/// these so a re-run replaces rather than appends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MovementKey {
    AutoDaily { employee_id: Uuid, workday_id: Uuid },
    Authorization(Uuid),
    Request(Uuid),
    WeeklyCorrection { employee_id: Uuid, week_start: NaiveDate },
    /// Manual adjustments are appended; the id is minted by the caller.
    Adjustment(Uuid),
}

impl MovementKey {
    pub fn origin(&self) -> MovementOrigin {
        match self {
            MovementKey::AutoDaily { .. } => MovementOrigin::AutoDaily,
            MovementKey::Authorization(_) => MovementOrigin::OvertimeAuthorization,
            MovementKey::Request(_) => MovementOrigin::EmployeeRequest,
            MovementKey::WeeklyCorrection { .. } | MovementKey::Adjustment(_) => {
                MovementOrigin::Correction
            }
        }
    }

    pub fn matches(&self, movement: &TimeBankMovement) -> bool {
        match *self {
            MovementKey::AutoDaily {
                employee_id,
                workday_id,
            } => {
                movement.origin == MovementOrigin::AutoDaily
                    && movement.employee_id == employee_id
                    && movement.workday_id == Some(workday_id)
            }
            MovementKey::Authorization(id) => movement.overwork_authorization_id == Some(id),
            MovementKey::Request(id) => movement.time_bank_request_id == Some(id),
            MovementKey::WeeklyCorrection {
                employee_id,
                week_start,
            } => {
                movement.employee_id == employee_id
                    && movement.correction_week_start == Some(week_start)
            }
            MovementKey::Adjustment(id) => movement.id == id,
        }
    }
}

/// What the engine wants a keyed movement to look like. The ledger writer
/// fills in the applied (possibly clamped) minutes.
#[derive(Debug, Clone, PartialEq)]
pub struct MovementDraft {
    pub organization_id: Uuid,
    pub employee_id: Uuid,
    pub key: MovementKey,
    pub movement_date: NaiveDate,
    pub minutes: Minutes,
    pub movement_type: MovementType,
    pub description: Option<String>,
    pub created_by: Option<Uuid>,
}

impl MovementDraft {
    pub fn into_movement(
        self,
        applied: Minutes,
        metadata: Option<serde_json::Value>,
        existing: Option<&TimeBankMovement>,
    ) -> TimeBankMovement {
        let now = Utc::now();
        let (workday_id, authorization_id, request_id, week_start) = match self.key {
            MovementKey::AutoDaily { workday_id, .. } => (Some(workday_id), None, None, None),
            MovementKey::Authorization(id) => (None, Some(id), None, None),
            MovementKey::Request(id) => (None, None, Some(id), None),
            MovementKey::WeeklyCorrection { week_start, .. } => (None, None, None, Some(week_start)),
            MovementKey::Adjustment(_) => (None, None, None, None),
        };
        let id = match (existing, self.key) {
            (Some(existing), _) => existing.id,
            (None, MovementKey::Adjustment(id)) => id,
            (None, _) => Uuid::new_v4(),
        };

        TimeBankMovement {
            id,
            organization_id: self.organization_id,
            employee_id: self.employee_id,
            movement_date: self.movement_date,
            minutes: applied,
            movement_type: self.movement_type,
            origin: self.key.origin(),
            status: MovementStatus::Confirmed,
            workday_id,
            overwork_authorization_id: authorization_id,
            time_bank_request_id: request_id,
            correction_week_start: week_start,
            description: self.description,
            metadata,
            created_by: self.created_by,
            created_at: existing.map(|m| m.created_at).unwrap_or(now),
            updated_at: now,
        }
    }
}

/// Ledger-relevant equality: ignores identity and timestamps.
pub fn same_ledger_effect(a: &TimeBankMovement, b: &TimeBankMovement) -> bool {
    a.minutes == b.minutes
        && a.movement_type == b.movement_type
        && a.movement_date == b.movement_date
        && a.status == b.status
        && a.metadata == b.metadata
        && a.description == b.description
}
