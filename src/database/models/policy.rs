use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{macros::string_enum, minutes::Minutes};

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    pub enum CalculationMode {
        Daily => "DAILY",
        Weekly => "WEEKLY",
    }
}

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    pub enum ApprovalMode {
        None => "NONE",
        Pre => "PRE",
        Post => "POST",
    }
}

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    pub enum CompensationType {
        Time => "TIME",
        Pay => "PAY",
        Mixed => "MIXED",
        None => "NONE",
    }
}

string_enum! {
    #[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
    #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
    pub enum NonWorkingDayPolicy {
        AutoAllow => "AUTO_ALLOW",
        RequireApproval => "REQUIRE_APPROVAL",
    }
}

/// Raw `overtime_settings` row for an organization. Every column is nullable;
/// a missing row or a missing column falls back to the engine defaults.
#[derive(Debug, Clone, Default, sqlx::FromRow)]
pub struct OvertimeSettingsRow {
    pub organization_id: Uuid,
    pub calculation_mode: Option<String>,
    pub approval_mode: Option<String>,
    pub compensation_type: Option<String>,
    pub tolerance_minutes: Option<i32>,
    pub daily_limit_minutes: Option<i32>,
    pub weekly_limit_minutes: Option<i32>,
    pub monthly_limit_minutes: Option<i32>,
    pub annual_limit_minutes: Option<i32>,
    pub reference_weekly_hours: Option<BigDecimal>,
    pub non_working_day_policy: Option<String>,
    pub rounding_increment_minutes: Option<i32>,
    pub deficit_grace_minutes: Option<i32>,
    pub excess_grace_minutes: Option<i32>,
    pub max_positive_balance_minutes: Option<i32>,
    pub max_negative_balance_minutes: Option<i32>,
}

/// Organization overtime settings as handed to the policy resolver, already
/// parsed out of their storage representation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OvertimeSettings {
    pub calculation_mode: Option<CalculationMode>,
    pub approval_mode: Option<ApprovalMode>,
    pub compensation_type: Option<CompensationType>,
    pub tolerance_minutes: Option<Minutes>,
    pub daily_limit_minutes: Option<Minutes>,
    pub weekly_limit_minutes: Option<Minutes>,
    pub monthly_limit_minutes: Option<Minutes>,
    pub annual_limit_minutes: Option<Minutes>,
    pub reference_weekly_minutes: Option<Minutes>,
    pub non_working_day_policy: Option<NonWorkingDayPolicy>,
    pub rounding_increment_minutes: Option<Minutes>,
    pub deficit_grace_minutes: Option<Minutes>,
    pub excess_grace_minutes: Option<Minutes>,
    pub max_positive_balance_minutes: Option<Minutes>,
    pub max_negative_balance_minutes: Option<Minutes>,
}

impl From<OvertimeSettingsRow> for OvertimeSettings {
    fn from(row: OvertimeSettingsRow) -> Self {
        fn parse<T: std::str::FromStr<Err = String>>(value: Option<String>) -> Option<T> {
            value.and_then(|v| match v.parse() {
                Ok(parsed) => Some(parsed),
                Err(err) => {
                    log::warn!("Ignoring overtime setting: {}", err);
                    None
                }
            })
        }

        Self {
            calculation_mode: parse(row.calculation_mode),
            approval_mode: parse(row.approval_mode),
            compensation_type: parse(row.compensation_type),
            tolerance_minutes: row.tolerance_minutes.map(Minutes),
            daily_limit_minutes: row.daily_limit_minutes.map(Minutes),
            weekly_limit_minutes: row.weekly_limit_minutes.map(Minutes),
            monthly_limit_minutes: row.monthly_limit_minutes.map(Minutes),
            annual_limit_minutes: row.annual_limit_minutes.map(Minutes),
            reference_weekly_minutes: row
                .reference_weekly_hours
                .as_ref()
                .and_then(Minutes::from_decimal_hours),
            non_working_day_policy: parse(row.non_working_day_policy),
            rounding_increment_minutes: row.rounding_increment_minutes.map(Minutes),
            deficit_grace_minutes: row.deficit_grace_minutes.map(Minutes),
            excess_grace_minutes: row.excess_grace_minutes.map(Minutes),
            max_positive_balance_minutes: row.max_positive_balance_minutes.map(Minutes),
            max_negative_balance_minutes: row.max_negative_balance_minutes.map(Minutes),
        }
    }
}

/// The effective overtime policy of one organization. Resolved once per job
/// and passed down by reference; never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OvertimePolicy {
    pub calculation_mode: CalculationMode,
    pub approval_mode: ApprovalMode,
    pub compensation_type: CompensationType,
    pub tolerance_minutes: Minutes,
    pub daily_limit_minutes: Minutes,
    pub weekly_limit_minutes: Minutes,
    pub monthly_limit_minutes: Minutes,
    pub annual_limit_minutes: Minutes,
    /// Full-time reference week (e.g. 40h = 2400 minutes). Always > 0.
    pub reference_weekly_minutes: Minutes,
    pub non_working_day_policy: NonWorkingDayPolicy,
    pub rounding_increment_minutes: Minutes,
    pub deficit_grace_minutes: Minutes,
    pub excess_grace_minutes: Minutes,
    pub max_positive_balance_minutes: Minutes,
    pub max_negative_balance_minutes: Minutes,
}

impl OvertimePolicy {
    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}
