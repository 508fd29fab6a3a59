//! Read side of the collaborators the engine depends on but does not own:
//! time capture (workday summaries), the effective-schedule calculator,
//! organization settings, contracts and approval chains.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::database::models::{
    CalculationStatus, EffectiveSchedule, Minutes, OvertimeSettings, WorkdaySummary,
};
use crate::error::AppResult;

pub trait WorkforceDirectory: Send + Sync {
    fn list_organizations(&self) -> impl Future<Output = AppResult<Vec<Uuid>>> + Send;

    fn workday_summary(
        &self,
        organization_id: Uuid,
        employee_id: Uuid,
        work_date: NaiveDate,
    ) -> impl Future<Output = AppResult<Option<WorkdaySummary>>> + Send;

    /// All summaries of the organization dated within `[from, to]`.
    fn summaries_between(
        &self,
        organization_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> impl Future<Output = AppResult<Vec<WorkdaySummary>>> + Send;

    /// Summaries dated on or after `since` that are `DIRTY`, or `CALCULATING`
    /// with no update since `stuck_before`.
    fn summaries_needing_recalculation(
        &self,
        organization_id: Uuid,
        since: NaiveDate,
        stuck_before: DateTime<Utc>,
    ) -> impl Future<Output = AppResult<Vec<WorkdaySummary>>> + Send;

    fn set_calculation_status(
        &self,
        workday_id: Uuid,
        status: CalculationStatus,
    ) -> impl Future<Output = AppResult<()>> + Send;

    fn effective_schedule(
        &self,
        employee_id: Uuid,
        date: NaiveDate,
    ) -> impl Future<Output = AppResult<Option<EffectiveSchedule>>> + Send;

    fn overtime_settings(
        &self,
        organization_id: Uuid,
    ) -> impl Future<Output = AppResult<Option<OvertimeSettings>>> + Send;

    /// Contracted weekly minutes, when the employee has a contract on file.
    fn contracted_weekly_minutes(
        &self,
        organization_id: Uuid,
        employee_id: Uuid,
    ) -> impl Future<Output = AppResult<Option<Minutes>>> + Send;

    /// Approver chain for the employee. The resolution policy (manager, team
    /// lead, admin fallback...) belongs to the implementation.
    fn resolve_approvers(
        &self,
        employee_id: Uuid,
        organization_id: Uuid,
        category: &str,
    ) -> impl Future<Output = AppResult<Vec<Uuid>>> + Send;
}
