//! Persistence seam for the records the engine owns.
//!
//! Implementations must make every write an upsert on the natural key of the
//! record (see `MovementKey` for movements), so a job can be re-run from
//! scratch after a crash without duplicating rows.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::database::models::{
    CandidateInput, CandidateStatus, Minutes, MovementKey, OvertimeCandidate,
    OverworkAuthorization, TimeBankMovement, TimeBankRequest,
};
use crate::error::AppResult;

pub trait OvertimeStore: Send + Sync {
    // ------------------------------------------------------------------
    // Candidates
    // ------------------------------------------------------------------

    fn find_candidate(
        &self,
        organization_id: Uuid,
        employee_id: Uuid,
        work_date: NaiveDate,
    ) -> impl Future<Output = AppResult<Option<OvertimeCandidate>>> + Send;

    fn find_candidate_by_id(
        &self,
        id: Uuid,
    ) -> impl Future<Output = AppResult<Option<OvertimeCandidate>>> + Send;

    /// Insert or overwrite the candidate for (org, employee, date).
    fn upsert_candidate(
        &self,
        input: CandidateInput,
    ) -> impl Future<Output = AppResult<OvertimeCandidate>> + Send;

    fn delete_candidate(
        &self,
        organization_id: Uuid,
        employee_id: Uuid,
        work_date: NaiveDate,
    ) -> impl Future<Output = AppResult<bool>> + Send;

    fn set_candidate_status(
        &self,
        id: Uuid,
        status: CandidateStatus,
    ) -> impl Future<Output = AppResult<()>> + Send;

    fn list_candidates_between(
        &self,
        organization_id: Uuid,
        employee_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> impl Future<Output = AppResult<Vec<OvertimeCandidate>>> + Send;

    // ------------------------------------------------------------------
    // Authorizations
    // ------------------------------------------------------------------

    fn find_authorization(
        &self,
        id: Uuid,
    ) -> impl Future<Output = AppResult<Option<OverworkAuthorization>>> + Send;

    /// Most recently created authorization for the day, in any status.
    fn latest_authorization_for_day(
        &self,
        organization_id: Uuid,
        employee_id: Uuid,
        work_date: NaiveDate,
    ) -> impl Future<Output = AppResult<Option<OverworkAuthorization>>> + Send;

    /// Insert or overwrite by id.
    fn save_authorization(
        &self,
        authorization: &OverworkAuthorization,
    ) -> impl Future<Output = AppResult<()>> + Send;

    fn list_pending_authorizations(
        &self,
        organization_id: Uuid,
        employee_id: Option<Uuid>,
        created_before: Option<DateTime<Utc>>,
    ) -> impl Future<Output = AppResult<Vec<OverworkAuthorization>>> + Send;

    // ------------------------------------------------------------------
    // Movements
    // ------------------------------------------------------------------

    /// Sum of confirmed movements for the employee, optionally leaving one out.
    fn balance(
        &self,
        organization_id: Uuid,
        employee_id: Uuid,
        excluding: Option<Uuid>,
    ) -> impl Future<Output = AppResult<Minutes>> + Send;

    fn find_movement(
        &self,
        organization_id: Uuid,
        key: MovementKey,
    ) -> impl Future<Output = AppResult<Option<TimeBankMovement>>> + Send;

    /// Insert or overwrite by id.
    fn save_movement(
        &self,
        movement: &TimeBankMovement,
    ) -> impl Future<Output = AppResult<()>> + Send;

    fn delete_movement(&self, id: Uuid) -> impl Future<Output = AppResult<()>> + Send;

    fn list_movements(
        &self,
        organization_id: Uuid,
        employee_id: Uuid,
        limit: Option<i64>,
    ) -> impl Future<Output = AppResult<Vec<TimeBankMovement>>> + Send;

    // ------------------------------------------------------------------
    // Time-bank requests
    // ------------------------------------------------------------------

    fn find_request(
        &self,
        id: Uuid,
    ) -> impl Future<Output = AppResult<Option<TimeBankRequest>>> + Send;

    /// Insert or overwrite by id.
    fn save_request(
        &self,
        request: &TimeBankRequest,
    ) -> impl Future<Output = AppResult<()>> + Send;
}
