use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::{
    models::{
        CalculationStatus, EffectiveSchedule, Minutes, OvertimeSettings, OvertimeSettingsRow,
        WorkdaySummary,
    },
    utils::sql,
};
use crate::error::AppResult;
use crate::services::directory::WorkforceDirectory;

/// Reads the tables owned by time capture, scheduling, settings and org
/// structure. Only `set_calculation_status` writes.
#[derive(Clone)]
pub struct PgWorkforceDirectory {
    pool: PgPool,
}

impl PgWorkforceDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl WorkforceDirectory for PgWorkforceDirectory {
    async fn list_organizations(&self) -> AppResult<Vec<Uuid>> {
        let organizations = sqlx::query_scalar::<_, Uuid>(&sql(r#"
            SELECT organization_id FROM overtime_settings
            UNION
            SELECT DISTINCT organization_id FROM workday_summaries
        "#))
        .fetch_all(&self.pool)
        .await?;

        Ok(organizations)
    }

    async fn workday_summary(
        &self,
        organization_id: Uuid,
        employee_id: Uuid,
        work_date: NaiveDate,
    ) -> AppResult<Option<WorkdaySummary>> {
        let summary = sqlx::query_as::<_, WorkdaySummary>(&sql(r#"
            SELECT
                id,
                organization_id,
                employee_id,
                work_date,
                worked_minutes,
                expected_minutes,
                calculation_status,
                updated_at
            FROM
                workday_summaries
            WHERE
                organization_id = ?
                AND employee_id = ?
                AND work_date = ?
        "#))
        .bind(organization_id)
        .bind(employee_id)
        .bind(work_date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(summary)
    }

    async fn summaries_between(
        &self,
        organization_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> AppResult<Vec<WorkdaySummary>> {
        let summaries = sqlx::query_as::<_, WorkdaySummary>(&sql(r#"
            SELECT
                id,
                organization_id,
                employee_id,
                work_date,
                worked_minutes,
                expected_minutes,
                calculation_status,
                updated_at
            FROM
                workday_summaries
            WHERE
                organization_id = ?
                AND work_date BETWEEN ? AND ?
            ORDER BY
                employee_id,
                work_date
        "#))
        .bind(organization_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(summaries)
    }

    async fn summaries_needing_recalculation(
        &self,
        organization_id: Uuid,
        since: NaiveDate,
        stuck_before: DateTime<Utc>,
    ) -> AppResult<Vec<WorkdaySummary>> {
        let summaries = sqlx::query_as::<_, WorkdaySummary>(&sql(r#"
            SELECT
                id,
                organization_id,
                employee_id,
                work_date,
                worked_minutes,
                expected_minutes,
                calculation_status,
                updated_at
            FROM
                workday_summaries
            WHERE
                organization_id = ?
                AND work_date >= ?
                AND (
                    calculation_status = 'DIRTY'
                    OR (calculation_status = 'CALCULATING' AND updated_at < ?)
                )
            ORDER BY
                work_date,
                employee_id
        "#))
        .bind(organization_id)
        .bind(since)
        .bind(stuck_before)
        .fetch_all(&self.pool)
        .await?;

        Ok(summaries)
    }

    async fn set_calculation_status(
        &self,
        workday_id: Uuid,
        status: CalculationStatus,
    ) -> AppResult<()> {
        sqlx::query(&sql(r#"
            UPDATE
                workday_summaries
            SET
                calculation_status = ?,
                updated_at = ?
            WHERE
                id = ?
        "#))
        .bind(status)
        .bind(Utc::now())
        .bind(workday_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn effective_schedule(
        &self,
        employee_id: Uuid,
        date: NaiveDate,
    ) -> AppResult<Option<EffectiveSchedule>> {
        let schedule = sqlx::query_as::<_, EffectiveSchedule>(&sql(r#"
            SELECT
                expected_minutes,
                is_working_day,
                source,
                exception_type
            FROM
                effective_schedules
            WHERE
                employee_id = ?
                AND schedule_date = ?
        "#))
        .bind(employee_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(schedule)
    }

    async fn overtime_settings(&self, organization_id: Uuid) -> AppResult<Option<OvertimeSettings>> {
        let row = sqlx::query_as::<_, OvertimeSettingsRow>(&sql(r#"
            SELECT
                organization_id,
                calculation_mode,
                approval_mode,
                compensation_type,
                tolerance_minutes,
                daily_limit_minutes,
                weekly_limit_minutes,
                monthly_limit_minutes,
                annual_limit_minutes,
                reference_weekly_hours,
                non_working_day_policy,
                rounding_increment_minutes,
                deficit_grace_minutes,
                excess_grace_minutes,
                max_positive_balance_minutes,
                max_negative_balance_minutes
            FROM
                overtime_settings
            WHERE
                organization_id = ?
        "#))
        .bind(organization_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(OvertimeSettings::from))
    }

    async fn contracted_weekly_minutes(
        &self,
        organization_id: Uuid,
        employee_id: Uuid,
    ) -> AppResult<Option<Minutes>> {
        let hours = sqlx::query_scalar::<_, BigDecimal>(&sql(r#"
            SELECT
                weekly_hours
            FROM
                employee_contracts
            WHERE
                organization_id = ?
                AND employee_id = ?
                AND start_date <= CURRENT_DATE
                AND (end_date IS NULL OR end_date >= CURRENT_DATE)
            ORDER BY
                start_date DESC
            LIMIT
                1
        "#))
        .bind(organization_id)
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(hours.as_ref().and_then(Minutes::from_decimal_hours))
    }

    async fn resolve_approvers(
        &self,
        employee_id: Uuid,
        organization_id: Uuid,
        category: &str,
    ) -> AppResult<Vec<Uuid>> {
        // Category-specific chain entries first, then the employee's generic chain.
        let approvers = sqlx::query_scalar::<_, Uuid>(&sql(r#"
            SELECT
                approver_id
            FROM
                approval_chains
            WHERE
                organization_id = ?
                AND employee_id = ?
                AND (category = ? OR category IS NULL)
            ORDER BY
                category NULLS LAST,
                position
        "#))
        .bind(organization_id)
        .bind(employee_id)
        .bind(category)
        .fetch_all(&self.pool)
        .await?;

        Ok(approvers)
    }
}
