use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::{
    models::{
        CandidateInput, CandidateStatus, Minutes, MovementKey, OvertimeCandidate,
        OverworkAuthorization, TimeBankMovement, TimeBankRequest,
    },
    utils::sql,
};
use crate::error::AppResult;
use crate::services::store::OvertimeStore;

/// Postgres-backed store for candidates, authorizations, movements and
/// time-bank requests.
#[derive(Clone)]
pub struct PgOvertimeStore {
    pool: PgPool,
}

impl PgOvertimeStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl OvertimeStore for PgOvertimeStore {
    async fn find_candidate(
        &self,
        organization_id: Uuid,
        employee_id: Uuid,
        work_date: NaiveDate,
    ) -> AppResult<Option<OvertimeCandidate>> {
        let candidate = sqlx::query_as::<_, OvertimeCandidate>(&sql(r#"
            SELECT
                id,
                organization_id,
                employee_id,
                work_date,
                workday_id,
                expected_minutes,
                worked_minutes,
                raw_deviation_minutes,
                candidate_minutes,
                candidate_type,
                status,
                requires_approval,
                skip_reason,
                overwork_authorization_id,
                policy_snapshot,
                created_at,
                updated_at
            FROM
                overtime_candidates
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

        Ok(candidate)
    }

    async fn find_candidate_by_id(&self, id: Uuid) -> AppResult<Option<OvertimeCandidate>> {
        let candidate = sqlx::query_as::<_, OvertimeCandidate>(&sql(r#"
            SELECT
                id,
                organization_id,
                employee_id,
                work_date,
                workday_id,
                expected_minutes,
                worked_minutes,
                raw_deviation_minutes,
                candidate_minutes,
                candidate_type,
                status,
                requires_approval,
                skip_reason,
                overwork_authorization_id,
                policy_snapshot,
                created_at,
                updated_at
            FROM
                overtime_candidates
            WHERE
                id = ?
        "#))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(candidate)
    }

    async fn upsert_candidate(&self, input: CandidateInput) -> AppResult<OvertimeCandidate> {
        let now = Utc::now();
        let candidate = sqlx::query_as::<_, OvertimeCandidate>(&sql(r#"
            INSERT INTO
                overtime_candidates (
                    id,
                    organization_id,
                    employee_id,
                    work_date,
                    workday_id,
                    expected_minutes,
                    worked_minutes,
                    raw_deviation_minutes,
                    candidate_minutes,
                    candidate_type,
                    status,
                    requires_approval,
                    skip_reason,
                    overwork_authorization_id,
                    policy_snapshot,
                    created_at,
                    updated_at
                )
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (organization_id, employee_id, work_date) DO UPDATE
            SET
                workday_id = EXCLUDED.workday_id,
                expected_minutes = EXCLUDED.expected_minutes,
                worked_minutes = EXCLUDED.worked_minutes,
                raw_deviation_minutes = EXCLUDED.raw_deviation_minutes,
                candidate_minutes = EXCLUDED.candidate_minutes,
                candidate_type = EXCLUDED.candidate_type,
                status = EXCLUDED.status,
                requires_approval = EXCLUDED.requires_approval,
                skip_reason = EXCLUDED.skip_reason,
                overwork_authorization_id = EXCLUDED.overwork_authorization_id,
                policy_snapshot = EXCLUDED.policy_snapshot,
                updated_at = EXCLUDED.updated_at
            RETURNING
                id,
                organization_id,
                employee_id,
                work_date,
                workday_id,
                expected_minutes,
                worked_minutes,
                raw_deviation_minutes,
                candidate_minutes,
                candidate_type,
                status,
                requires_approval,
                skip_reason,
                overwork_authorization_id,
                policy_snapshot,
                created_at,
                updated_at
        "#))
        .bind(Uuid::new_v4())
        .bind(input.organization_id)
        .bind(input.employee_id)
        .bind(input.work_date)
        .bind(input.workday_id)
        .bind(input.expected_minutes)
        .bind(input.worked_minutes)
        .bind(input.raw_deviation_minutes)
        .bind(input.candidate_minutes)
        .bind(input.candidate_type)
        .bind(input.status)
        .bind(input.requires_approval)
        .bind(input.skip_reason)
        .bind(input.overwork_authorization_id)
        .bind(input.policy_snapshot)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(candidate)
    }

    async fn delete_candidate(
        &self,
        organization_id: Uuid,
        employee_id: Uuid,
        work_date: NaiveDate,
    ) -> AppResult<bool> {
        let result = sqlx::query(&sql(r#"
            DELETE FROM overtime_candidates
            WHERE
                organization_id = ?
                AND employee_id = ?
                AND work_date = ?
        "#))
        .bind(organization_id)
        .bind(employee_id)
        .bind(work_date)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_candidate_status(&self, id: Uuid, status: CandidateStatus) -> AppResult<()> {
        sqlx::query(&sql(r#"
            UPDATE
                overtime_candidates
            SET
                status = ?,
                updated_at = ?
            WHERE
                id = ?
                AND status <> ?
        "#))
        .bind(status)
        .bind(Utc::now())
        .bind(id)
        .bind(status)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_candidates_between(
        &self,
        organization_id: Uuid,
        employee_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> AppResult<Vec<OvertimeCandidate>> {
        let candidates = sqlx::query_as::<_, OvertimeCandidate>(&sql(r#"
            SELECT
                id,
                organization_id,
                employee_id,
                work_date,
                workday_id,
                expected_minutes,
                worked_minutes,
                raw_deviation_minutes,
                candidate_minutes,
                candidate_type,
                status,
                requires_approval,
                skip_reason,
                overwork_authorization_id,
                policy_snapshot,
                created_at,
                updated_at
            FROM
                overtime_candidates
            WHERE
                organization_id = ?
                AND employee_id = ?
                AND work_date BETWEEN ? AND ?
            ORDER BY
                work_date
        "#))
        .bind(organization_id)
        .bind(employee_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(candidates)
    }

    async fn find_authorization(&self, id: Uuid) -> AppResult<Option<OverworkAuthorization>> {
        let authorization = sqlx::query_as::<_, OverworkAuthorization>(&sql(r#"
            SELECT
                id,
                organization_id,
                employee_id,
                work_date,
                candidate_id,
                requested_minutes,
                approved_minutes,
                status,
                compensation_type,
                requested_by,
                approver_id,
                resolution_notes,
                resolved_at,
                created_at,
                updated_at
            FROM
                overwork_authorizations
            WHERE
                id = ?
        "#))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(authorization)
    }

    async fn latest_authorization_for_day(
        &self,
        organization_id: Uuid,
        employee_id: Uuid,
        work_date: NaiveDate,
    ) -> AppResult<Option<OverworkAuthorization>> {
        let authorization = sqlx::query_as::<_, OverworkAuthorization>(&sql(r#"
            SELECT
                id,
                organization_id,
                employee_id,
                work_date,
                candidate_id,
                requested_minutes,
                approved_minutes,
                status,
                compensation_type,
                requested_by,
                approver_id,
                resolution_notes,
                resolved_at,
                created_at,
                updated_at
            FROM
                overwork_authorizations
            WHERE
                organization_id = ?
                AND employee_id = ?
                AND work_date = ?
            ORDER BY
                created_at DESC
            LIMIT
                1
        "#))
        .bind(organization_id)
        .bind(employee_id)
        .bind(work_date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(authorization)
    }

    async fn save_authorization(&self, authorization: &OverworkAuthorization) -> AppResult<()> {
        sqlx::query(&sql(r#"
            INSERT INTO
                overwork_authorizations (
                    id,
                    organization_id,
                    employee_id,
                    work_date,
                    candidate_id,
                    requested_minutes,
                    approved_minutes,
                    status,
                    compensation_type,
                    requested_by,
                    approver_id,
                    resolution_notes,
                    resolved_at,
                    created_at,
                    updated_at
                )
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE
            SET
                candidate_id = EXCLUDED.candidate_id,
                requested_minutes = EXCLUDED.requested_minutes,
                approved_minutes = EXCLUDED.approved_minutes,
                status = EXCLUDED.status,
                compensation_type = EXCLUDED.compensation_type,
                requested_by = EXCLUDED.requested_by,
                approver_id = EXCLUDED.approver_id,
                resolution_notes = EXCLUDED.resolution_notes,
                resolved_at = EXCLUDED.resolved_at,
                updated_at = EXCLUDED.updated_at
        "#))
        .bind(authorization.id)
        .bind(authorization.organization_id)
        .bind(authorization.employee_id)
        .bind(authorization.work_date)
        .bind(authorization.candidate_id)
        .bind(authorization.requested_minutes)
        .bind(authorization.approved_minutes)
        .bind(authorization.status)
        .bind(authorization.compensation_type)
        .bind(authorization.requested_by)
        .bind(authorization.approver_id)
        .bind(&authorization.resolution_notes)
        .bind(authorization.resolved_at)
        .bind(authorization.created_at)
        .bind(authorization.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_pending_authorizations(
        &self,
        organization_id: Uuid,
        employee_id: Option<Uuid>,
        created_before: Option<DateTime<Utc>>,
    ) -> AppResult<Vec<OverworkAuthorization>> {
        let authorizations = sqlx::query_as::<_, OverworkAuthorization>(&sql(r#"
            SELECT
                id,
                organization_id,
                employee_id,
                work_date,
                candidate_id,
                requested_minutes,
                approved_minutes,
                status,
                compensation_type,
                requested_by,
                approver_id,
                resolution_notes,
                resolved_at,
                created_at,
                updated_at
            FROM
                overwork_authorizations
            WHERE
                organization_id = ?
                AND status = 'PENDING'
                AND (?::uuid IS NULL OR employee_id = ?)
                AND (?::timestamptz IS NULL OR created_at < ?)
            ORDER BY
                created_at
        "#))
        .bind(organization_id)
        .bind(employee_id)
        .bind(employee_id)
        .bind(created_before)
        .bind(created_before)
        .fetch_all(&self.pool)
        .await?;

        Ok(authorizations)
    }

    async fn balance(
        &self,
        organization_id: Uuid,
        employee_id: Uuid,
        excluding: Option<Uuid>,
    ) -> AppResult<Minutes> {
        let balance = sqlx::query_scalar::<_, i32>(&sql(r#"
            SELECT
                COALESCE(SUM(minutes), 0)::INT
            FROM
                time_bank_movements
            WHERE
                organization_id = ?
                AND employee_id = ?
                AND status = 'CONFIRMED'
                AND (?::uuid IS NULL OR id <> ?)
        "#))
        .bind(organization_id)
        .bind(employee_id)
        .bind(excluding)
        .bind(excluding)
        .fetch_one(&self.pool)
        .await?;

        Ok(Minutes(balance))
    }

    async fn find_movement(
        &self,
        organization_id: Uuid,
        key: MovementKey,
    ) -> AppResult<Option<TimeBankMovement>> {
        const SELECT: &str = r#"
            SELECT
                id,
                organization_id,
                employee_id,
                movement_date,
                minutes,
                movement_type,
                origin,
                status,
                workday_id,
                overwork_authorization_id,
                time_bank_request_id,
                correction_week_start,
                description,
                metadata,
                created_by,
                created_at,
                updated_at
            FROM
                time_bank_movements
            WHERE
                organization_id = ?
        "#;

        let movement = match key {
            MovementKey::AutoDaily {
                employee_id,
                workday_id,
            } => {
                sqlx::query_as::<_, TimeBankMovement>(&sql(&format!(
                    "{SELECT} AND origin = 'AUTO_DAILY' AND employee_id = ? AND workday_id = ?"
                )))
                .bind(organization_id)
                .bind(employee_id)
                .bind(workday_id)
                .fetch_optional(&self.pool)
                .await?
            }
            MovementKey::Authorization(authorization_id) => {
                sqlx::query_as::<_, TimeBankMovement>(&sql(&format!(
                    "{SELECT} AND overwork_authorization_id = ?"
                )))
                .bind(organization_id)
                .bind(authorization_id)
                .fetch_optional(&self.pool)
                .await?
            }
            MovementKey::Request(request_id) => {
                sqlx::query_as::<_, TimeBankMovement>(&sql(&format!(
                    "{SELECT} AND time_bank_request_id = ?"
                )))
                .bind(organization_id)
                .bind(request_id)
                .fetch_optional(&self.pool)
                .await?
            }
            MovementKey::WeeklyCorrection {
                employee_id,
                week_start,
            } => {
                sqlx::query_as::<_, TimeBankMovement>(&sql(&format!(
                    "{SELECT} AND employee_id = ? AND correction_week_start = ?"
                )))
                .bind(organization_id)
                .bind(employee_id)
                .bind(week_start)
                .fetch_optional(&self.pool)
                .await?
            }
            MovementKey::Adjustment(id) => {
                sqlx::query_as::<_, TimeBankMovement>(&sql(&format!("{SELECT} AND id = ?")))
                    .bind(organization_id)
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?
            }
        };

        Ok(movement)
    }

    async fn save_movement(&self, movement: &TimeBankMovement) -> AppResult<()> {
        sqlx::query(&sql(r#"
            INSERT INTO
                time_bank_movements (
                    id,
                    organization_id,
                    employee_id,
                    movement_date,
                    minutes,
                    movement_type,
                    origin,
                    status,
                    workday_id,
                    overwork_authorization_id,
                    time_bank_request_id,
                    correction_week_start,
                    description,
                    metadata,
                    created_by,
                    created_at,
                    updated_at
                )
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE
            SET
                movement_date = EXCLUDED.movement_date,
                minutes = EXCLUDED.minutes,
                movement_type = EXCLUDED.movement_type,
                status = EXCLUDED.status,
                description = EXCLUDED.description,
                metadata = EXCLUDED.metadata,
                updated_at = EXCLUDED.updated_at
        "#))
        .bind(movement.id)
        .bind(movement.organization_id)
        .bind(movement.employee_id)
        .bind(movement.movement_date)
        .bind(movement.minutes)
        .bind(movement.movement_type)
        .bind(movement.origin)
        .bind(movement.status)
        .bind(movement.workday_id)
        .bind(movement.overwork_authorization_id)
        .bind(movement.time_bank_request_id)
        .bind(movement.correction_week_start)
        .bind(&movement.description)
        .bind(&movement.metadata)
        .bind(movement.created_by)
        .bind(movement.created_at)
        .bind(movement.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete_movement(&self, id: Uuid) -> AppResult<()> {
        sqlx::query(&sql("DELETE FROM time_bank_movements WHERE id = ?"))
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn list_movements(
        &self,
        organization_id: Uuid,
        employee_id: Uuid,
        limit: Option<i64>,
    ) -> AppResult<Vec<TimeBankMovement>> {
        let movements = sqlx::query_as::<_, TimeBankMovement>(&sql(r#"
            SELECT
                id,
                organization_id,
                employee_id,
                movement_date,
                minutes,
                movement_type,
                origin,
                status,
                workday_id,
                overwork_authorization_id,
                time_bank_request_id,
                correction_week_start,
                description,
                metadata,
                created_by,
                created_at,
                updated_at
            FROM
                time_bank_movements
            WHERE
                organization_id = ?
                AND employee_id = ?
            ORDER BY
                movement_date DESC,
                created_at DESC
            LIMIT
                ?
        "#))
        .bind(organization_id)
        .bind(employee_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    async fn find_request(&self, id: Uuid) -> AppResult<Option<TimeBankRequest>> {
        let request = sqlx::query_as::<_, TimeBankRequest>(&sql(r#"
            SELECT
                id,
                organization_id,
                employee_id,
                kind,
                minutes,
                request_date,
                reason,
                status,
                reviewed_by,
                review_notes,
                reviewed_at,
                created_at,
                updated_at
            FROM
                time_bank_requests
            WHERE
                id = ?
        "#))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(request)
    }

    async fn save_request(&self, request: &TimeBankRequest) -> AppResult<()> {
        sqlx::query(&sql(r#"
            INSERT INTO
                time_bank_requests (
                    id,
                    organization_id,
                    employee_id,
                    kind,
                    minutes,
                    request_date,
                    reason,
                    status,
                    reviewed_by,
                    review_notes,
                    reviewed_at,
                    created_at,
                    updated_at
                )
            VALUES
                (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE
            SET
                status = EXCLUDED.status,
                reviewed_by = EXCLUDED.reviewed_by,
                review_notes = EXCLUDED.review_notes,
                reviewed_at = EXCLUDED.reviewed_at,
                updated_at = EXCLUDED.updated_at
        "#))
        .bind(request.id)
        .bind(request.organization_id)
        .bind(request.employee_id)
        .bind(request.kind)
        .bind(request.minutes)
        .bind(request.request_date)
        .bind(&request.reason)
        .bind(request.status)
        .bind(request.reviewed_by)
        .bind(&request.review_notes)
        .bind(request.reviewed_at)
        .bind(request.created_at)
        .bind(request.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
