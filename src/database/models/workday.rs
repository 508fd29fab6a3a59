use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{macros::string_enum, minutes::Minutes};

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    pub enum CalculationStatus {
        Dirty => "DIRTY",
        Calculating => "CALCULATING",
        Ready => "READY",
        Error => "ERROR",
    }
}

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    pub enum ScheduleSource {
        Contract => "CONTRACT",
        Shift => "SHIFT",
        Calendar => "CALENDAR",
        Holiday => "HOLIDAY",
        Absence => "ABSENCE",
        Default => "DEFAULT",
    }
}

/// Daily aggregate of clock events, owned by the time-capture pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct WorkdaySummary {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub employee_id: Uuid,
    pub work_date: NaiveDate,
    pub worked_minutes: Minutes,
    pub expected_minutes: Option<Minutes>,
    pub calculation_status: CalculationStatus,
    pub updated_at: DateTime<Utc>,
}

/// The schedule in force for one employee on one date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveSchedule {
    pub expected_minutes: Option<Minutes>,
    pub is_working_day: bool,
    pub source: ScheduleSource,
    pub exception_type: Option<String>,
}
