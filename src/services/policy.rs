use uuid::Uuid;

use crate::database::models::{
    ApprovalMode, CalculationMode, CompensationType, Minutes, NonWorkingDayPolicy,
    OvertimePolicy, OvertimeSettings,
};
use crate::error::AppResult;
use crate::services::directory::WorkforceDirectory;

pub const DEFAULT_CALCULATION_MODE: CalculationMode = CalculationMode::Daily;
pub const DEFAULT_APPROVAL_MODE: ApprovalMode = ApprovalMode::None;
pub const DEFAULT_COMPENSATION_TYPE: CompensationType = CompensationType::Time;
pub const DEFAULT_NON_WORKING_DAY_POLICY: NonWorkingDayPolicy =
    NonWorkingDayPolicy::RequireApproval;
pub const DEFAULT_TOLERANCE_MINUTES: Minutes = Minutes(15);
pub const DEFAULT_DAILY_LIMIT_MINUTES: Minutes = Minutes(120);
pub const DEFAULT_WEEKLY_LIMIT_MINUTES: Minutes = Minutes(600);
pub const DEFAULT_MONTHLY_LIMIT_MINUTES: Minutes = Minutes(1_200);
pub const DEFAULT_ANNUAL_LIMIT_MINUTES: Minutes = Minutes(4_800);
/// 40 hours.
pub const DEFAULT_REFERENCE_WEEKLY_MINUTES: Minutes = Minutes(2_400);
pub const DEFAULT_ROUNDING_INCREMENT_MINUTES: Minutes = Minutes(1);
pub const DEFAULT_DEFICIT_GRACE_MINUTES: Minutes = Minutes(10);
pub const DEFAULT_EXCESS_GRACE_MINUTES: Minutes = Minutes(0);
pub const DEFAULT_MAX_POSITIVE_BALANCE_MINUTES: Minutes = Minutes(2_400);
pub const DEFAULT_MAX_NEGATIVE_BALANCE_MINUTES: Minutes = Minutes(600);

impl Default for OvertimePolicy {
    fn default() -> Self {
        Self {
            calculation_mode: DEFAULT_CALCULATION_MODE,
            approval_mode: DEFAULT_APPROVAL_MODE,
            compensation_type: DEFAULT_COMPENSATION_TYPE,
            tolerance_minutes: DEFAULT_TOLERANCE_MINUTES,
            daily_limit_minutes: DEFAULT_DAILY_LIMIT_MINUTES,
            weekly_limit_minutes: DEFAULT_WEEKLY_LIMIT_MINUTES,
            monthly_limit_minutes: DEFAULT_MONTHLY_LIMIT_MINUTES,
            annual_limit_minutes: DEFAULT_ANNUAL_LIMIT_MINUTES,
            reference_weekly_minutes: DEFAULT_REFERENCE_WEEKLY_MINUTES,
            non_working_day_policy: DEFAULT_NON_WORKING_DAY_POLICY,
            rounding_increment_minutes: DEFAULT_ROUNDING_INCREMENT_MINUTES,
            deficit_grace_minutes: DEFAULT_DEFICIT_GRACE_MINUTES,
            excess_grace_minutes: DEFAULT_EXCESS_GRACE_MINUTES,
            max_positive_balance_minutes: DEFAULT_MAX_POSITIVE_BALANCE_MINUTES,
            max_negative_balance_minutes: DEFAULT_MAX_NEGATIVE_BALANCE_MINUTES,
        }
    }
}

fn non_negative(field: &str, value: Option<Minutes>, default: Minutes) -> Minutes {
    match value {
        Some(v) if v.is_negative() => {
            log::warn!(
                "Overtime setting {} is negative ({}), using default {}",
                field,
                v,
                default
            );
            default
        }
        Some(v) => v,
        None => default,
    }
}

fn positive(field: &str, value: Option<Minutes>, default: Minutes) -> Minutes {
    match value {
        Some(v) if !v.is_positive() => {
            log::warn!(
                "Overtime setting {} must be positive ({}), using default {}",
                field,
                v,
                default
            );
            default
        }
        Some(v) => v,
        None => default,
    }
}

/// Merge organization settings over the defaults, field by field.
pub fn resolve_policy(settings: Option<&OvertimeSettings>) -> OvertimePolicy {
    let Some(s) = settings else {
        return OvertimePolicy::default();
    };

    OvertimePolicy {
        calculation_mode: s.calculation_mode.unwrap_or(DEFAULT_CALCULATION_MODE),
        approval_mode: s.approval_mode.unwrap_or(DEFAULT_APPROVAL_MODE),
        compensation_type: s.compensation_type.unwrap_or(DEFAULT_COMPENSATION_TYPE),
        tolerance_minutes: non_negative(
            "tolerance_minutes",
            s.tolerance_minutes,
            DEFAULT_TOLERANCE_MINUTES,
        ),
        daily_limit_minutes: non_negative(
            "daily_limit_minutes",
            s.daily_limit_minutes,
            DEFAULT_DAILY_LIMIT_MINUTES,
        ),
        weekly_limit_minutes: non_negative(
            "weekly_limit_minutes",
            s.weekly_limit_minutes,
            DEFAULT_WEEKLY_LIMIT_MINUTES,
        ),
        monthly_limit_minutes: non_negative(
            "monthly_limit_minutes",
            s.monthly_limit_minutes,
            DEFAULT_MONTHLY_LIMIT_MINUTES,
        ),
        annual_limit_minutes: non_negative(
            "annual_limit_minutes",
            s.annual_limit_minutes,
            DEFAULT_ANNUAL_LIMIT_MINUTES,
        ),
        reference_weekly_minutes: positive(
            "reference_weekly_hours",
            s.reference_weekly_minutes,
            DEFAULT_REFERENCE_WEEKLY_MINUTES,
        ),
        non_working_day_policy: s
            .non_working_day_policy
            .unwrap_or(DEFAULT_NON_WORKING_DAY_POLICY),
        rounding_increment_minutes: positive(
            "rounding_increment_minutes",
            s.rounding_increment_minutes,
            DEFAULT_ROUNDING_INCREMENT_MINUTES,
        ),
        deficit_grace_minutes: non_negative(
            "deficit_grace_minutes",
            s.deficit_grace_minutes,
            DEFAULT_DEFICIT_GRACE_MINUTES,
        ),
        excess_grace_minutes: non_negative(
            "excess_grace_minutes",
            s.excess_grace_minutes,
            DEFAULT_EXCESS_GRACE_MINUTES,
        ),
        max_positive_balance_minutes: non_negative(
            "max_positive_balance_minutes",
            s.max_positive_balance_minutes,
            DEFAULT_MAX_POSITIVE_BALANCE_MINUTES,
        ),
        max_negative_balance_minutes: non_negative(
            "max_negative_balance_minutes",
            s.max_negative_balance_minutes,
            DEFAULT_MAX_NEGATIVE_BALANCE_MINUTES,
        ),
    }
}

pub struct PolicyResolver<'a, D> {
    directory: &'a D,
}

impl<'a, D: WorkforceDirectory> PolicyResolver<'a, D> {
    pub fn new(directory: &'a D) -> Self {
        Self { directory }
    }

    pub async fn resolve(&self, organization_id: Uuid) -> AppResult<OvertimePolicy> {
        let settings = self.directory.overtime_settings(organization_id).await?;
        if settings.is_none() {
            log::debug!(
                "No overtime settings for organization {}, using defaults",
                organization_id
            );
        }
        Ok(resolve_policy(settings.as_ref()))
    }
}
