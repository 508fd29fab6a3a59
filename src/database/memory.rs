//! In-process implementations of the store and directory seams. Used by the
//! test suite and for running the service without a database.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::database::models::{
    AuthorizationStatus, CalculationStatus, CandidateInput, CandidateStatus, EffectiveSchedule,
    Minutes, MovementKey, MovementStatus, OvertimeCandidate, OvertimeSettings,
    OverworkAuthorization, TimeBankMovement, TimeBankRequest, WorkdaySummary,
};
use crate::error::{AppError, AppResult};
use crate::services::{directory::WorkforceDirectory, store::OvertimeStore};

fn poisoned() -> AppError {
    AppError::internal_server_error_message("in-memory state lock poisoned")
}

#[derive(Default)]
struct StoreState {
    candidates: HashMap<Uuid, OvertimeCandidate>,
    authorizations: HashMap<Uuid, OverworkAuthorization>,
    movements: HashMap<Uuid, TimeBankMovement>,
    requests: HashMap<Uuid, TimeBankRequest>,
    failing_movement_writes: usize,
}

/// Clones share the same state.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, StoreState>> {
        self.state.lock().map_err(|_| poisoned())
    }

    /// Every movement of the employee, any status, oldest first.
    pub fn movements(&self, organization_id: Uuid, employee_id: Uuid) -> Vec<TimeBankMovement> {
        let Ok(state) = self.lock() else {
            return Vec::new();
        };
        let mut movements: Vec<_> = state
            .movements
            .values()
            .filter(|m| m.organization_id == organization_id && m.employee_id == employee_id)
            .cloned()
            .collect();
        movements.sort_by_key(|m| (m.movement_date, m.created_at));
        movements
    }

    /// Every authorization of the employee, oldest first.
    pub fn authorizations(
        &self,
        organization_id: Uuid,
        employee_id: Uuid,
    ) -> Vec<OverworkAuthorization> {
        let Ok(state) = self.lock() else {
            return Vec::new();
        };
        let mut authorizations: Vec<_> = state
            .authorizations
            .values()
            .filter(|a| a.organization_id == organization_id && a.employee_id == employee_id)
            .cloned()
            .collect();
        authorizations.sort_by_key(|a| a.created_at);
        authorizations
    }

    /// Make the next `count` movement writes fail, like a dropped connection.
    pub fn fail_next_movement_writes(&self, count: usize) {
        if let Ok(mut state) = self.lock() {
            state.failing_movement_writes = count;
        }
    }

    /// Move an authorization's creation time, e.g. to age it past expiry.
    pub fn backdate_authorization(&self, authorization_id: Uuid, created_at: DateTime<Utc>) {
        if let Ok(mut state) = self.lock() {
            if let Some(authorization) = state.authorizations.get_mut(&authorization_id) {
                authorization.created_at = created_at;
            }
        }
    }
}

impl OvertimeStore for InMemoryStore {
    async fn find_candidate(
        &self,
        organization_id: Uuid,
        employee_id: Uuid,
        work_date: NaiveDate,
    ) -> AppResult<Option<OvertimeCandidate>> {
        let state = self.lock()?;
        Ok(state
            .candidates
            .values()
            .find(|c| {
                c.organization_id == organization_id
                    && c.employee_id == employee_id
                    && c.work_date == work_date
            })
            .cloned())
    }

    async fn find_candidate_by_id(&self, id: Uuid) -> AppResult<Option<OvertimeCandidate>> {
        Ok(self.lock()?.candidates.get(&id).cloned())
    }

    async fn upsert_candidate(&self, input: CandidateInput) -> AppResult<OvertimeCandidate> {
        let mut state = self.lock()?;
        let now = Utc::now();
        let existing = state
            .candidates
            .values()
            .find(|c| {
                c.organization_id == input.organization_id
                    && c.employee_id == input.employee_id
                    && c.work_date == input.work_date
            })
            .map(|c| (c.id, c.created_at));
        let (id, created_at) = existing.unwrap_or((Uuid::new_v4(), now));

        let candidate = OvertimeCandidate {
            id,
            organization_id: input.organization_id,
            employee_id: input.employee_id,
            work_date: input.work_date,
            workday_id: input.workday_id,
            expected_minutes: input.expected_minutes,
            worked_minutes: input.worked_minutes,
            raw_deviation_minutes: input.raw_deviation_minutes,
            candidate_minutes: input.candidate_minutes,
            candidate_type: input.candidate_type,
            status: input.status,
            requires_approval: input.requires_approval,
            skip_reason: input.skip_reason,
            overwork_authorization_id: input.overwork_authorization_id,
            policy_snapshot: input.policy_snapshot,
            created_at,
            updated_at: now,
        };
        state.candidates.insert(id, candidate.clone());
        Ok(candidate)
    }

    async fn delete_candidate(
        &self,
        organization_id: Uuid,
        employee_id: Uuid,
        work_date: NaiveDate,
    ) -> AppResult<bool> {
        let mut state = self.lock()?;
        let before = state.candidates.len();
        state.candidates.retain(|_, c| {
            !(c.organization_id == organization_id
                && c.employee_id == employee_id
                && c.work_date == work_date)
        });
        Ok(state.candidates.len() != before)
    }

    async fn set_candidate_status(&self, id: Uuid, status: CandidateStatus) -> AppResult<()> {
        let mut state = self.lock()?;
        if let Some(candidate) = state.candidates.get_mut(&id) {
            if candidate.status != status {
                candidate.status = status;
                candidate.updated_at = Utc::now();
            }
        }
        Ok(())
    }

    async fn list_candidates_between(
        &self,
        organization_id: Uuid,
        employee_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> AppResult<Vec<OvertimeCandidate>> {
        let state = self.lock()?;
        let mut candidates: Vec<_> = state
            .candidates
            .values()
            .filter(|c| {
                c.organization_id == organization_id
                    && c.employee_id == employee_id
                    && c.work_date >= from
                    && c.work_date <= to
            })
            .cloned()
            .collect();
        candidates.sort_by_key(|c| c.work_date);
        Ok(candidates)
    }

    async fn find_authorization(&self, id: Uuid) -> AppResult<Option<OverworkAuthorization>> {
        Ok(self.lock()?.authorizations.get(&id).cloned())
    }

    async fn latest_authorization_for_day(
        &self,
        organization_id: Uuid,
        employee_id: Uuid,
        work_date: NaiveDate,
    ) -> AppResult<Option<OverworkAuthorization>> {
        let state = self.lock()?;
        Ok(state
            .authorizations
            .values()
            .filter(|a| {
                a.organization_id == organization_id
                    && a.employee_id == employee_id
                    && a.work_date == work_date
            })
            .max_by_key(|a| a.created_at)
            .cloned())
    }

    async fn save_authorization(&self, authorization: &OverworkAuthorization) -> AppResult<()> {
        self.lock()?
            .authorizations
            .insert(authorization.id, authorization.clone());
        Ok(())
    }

    async fn list_pending_authorizations(
        &self,
        organization_id: Uuid,
        employee_id: Option<Uuid>,
        created_before: Option<DateTime<Utc>>,
    ) -> AppResult<Vec<OverworkAuthorization>> {
        let state = self.lock()?;
        let mut pending: Vec<_> = state
            .authorizations
            .values()
            .filter(|a| {
                a.organization_id == organization_id
                    && a.status == AuthorizationStatus::Pending
                    && employee_id.is_none_or(|e| a.employee_id == e)
                    && created_before.is_none_or(|cutoff| a.created_at < cutoff)
            })
            .cloned()
            .collect();
        pending.sort_by_key(|a| a.created_at);
        Ok(pending)
    }

    async fn balance(
        &self,
        organization_id: Uuid,
        employee_id: Uuid,
        excluding: Option<Uuid>,
    ) -> AppResult<Minutes> {
        let state = self.lock()?;
        Ok(state
            .movements
            .values()
            .filter(|m| {
                m.organization_id == organization_id
                    && m.employee_id == employee_id
                    && m.status == MovementStatus::Confirmed
                    && Some(m.id) != excluding
            })
            .map(|m| m.minutes)
            .sum())
    }

    async fn find_movement(
        &self,
        organization_id: Uuid,
        key: MovementKey,
    ) -> AppResult<Option<TimeBankMovement>> {
        let state = self.lock()?;
        Ok(state
            .movements
            .values()
            .find(|m| m.organization_id == organization_id && key.matches(m))
            .cloned())
    }

    async fn save_movement(&self, movement: &TimeBankMovement) -> AppResult<()> {
        let mut state = self.lock()?;
        if state.failing_movement_writes > 0 {
            state.failing_movement_writes -= 1;
            return Err(AppError::internal_server_error_message(
                "movement write failed",
            ));
        }
        state.movements.insert(movement.id, movement.clone());
        Ok(())
    }

    async fn delete_movement(&self, id: Uuid) -> AppResult<()> {
        self.lock()?.movements.remove(&id);
        Ok(())
    }

    async fn list_movements(
        &self,
        organization_id: Uuid,
        employee_id: Uuid,
        limit: Option<i64>,
    ) -> AppResult<Vec<TimeBankMovement>> {
        let state = self.lock()?;
        let mut movements: Vec<_> = state
            .movements
            .values()
            .filter(|m| m.organization_id == organization_id && m.employee_id == employee_id)
            .cloned()
            .collect();
        movements.sort_by(|a, b| {
            b.movement_date
                .cmp(&a.movement_date)
                .then(b.created_at.cmp(&a.created_at))
        });
        if let Some(limit) = limit {
            movements.truncate(usize::try_from(limit).unwrap_or(0));
        }
        Ok(movements)
    }

    async fn find_request(&self, id: Uuid) -> AppResult<Option<TimeBankRequest>> {
        Ok(self.lock()?.requests.get(&id).cloned())
    }

    async fn save_request(&self, request: &TimeBankRequest) -> AppResult<()> {
        self.lock()?.requests.insert(request.id, request.clone());
        Ok(())
    }
}

#[derive(Default)]
struct DirectoryState {
    organizations: BTreeSet<Uuid>,
    summaries: HashMap<Uuid, WorkdaySummary>,
    schedules: HashMap<(Uuid, NaiveDate), EffectiveSchedule>,
    settings: HashMap<Uuid, OvertimeSettings>,
    contracts: HashMap<(Uuid, Uuid), Minutes>,
    approvers: HashMap<(Uuid, Uuid), Vec<Uuid>>,
    schedules_unavailable: bool,
}

/// Stand-in for the external collaborators. Clones share the same state.
#[derive(Clone, Default)]
pub struct InMemoryDirectory {
    state: Arc<Mutex<DirectoryState>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, DirectoryState>> {
        self.state.lock().map_err(|_| poisoned())
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut DirectoryState) -> T) -> T {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut state)
    }

    pub fn add_organization(&self, organization_id: Uuid) {
        self.with_state(|s| {
            s.organizations.insert(organization_id);
        });
    }

    /// Record (or overwrite) the day's summary and mark it `DIRTY`, the way
    /// the time-capture pipeline does after a clock event.
    pub fn put_summary(
        &self,
        organization_id: Uuid,
        employee_id: Uuid,
        work_date: NaiveDate,
        worked_minutes: i32,
        expected_minutes: Option<i32>,
    ) -> WorkdaySummary {
        self.with_state(|s| {
            s.organizations.insert(organization_id);
            let id = s
                .summaries
                .values()
                .find(|w| {
                    w.organization_id == organization_id
                        && w.employee_id == employee_id
                        && w.work_date == work_date
                })
                .map(|w| w.id)
                .unwrap_or_else(Uuid::new_v4);
            let summary = WorkdaySummary {
                id,
                organization_id,
                employee_id,
                work_date,
                worked_minutes: Minutes(worked_minutes),
                expected_minutes: expected_minutes.map(Minutes),
                calculation_status: CalculationStatus::Dirty,
                updated_at: Utc::now(),
            };
            s.summaries.insert(id, summary.clone());
            summary
        })
    }

    pub fn remove_summary(&self, organization_id: Uuid, employee_id: Uuid, work_date: NaiveDate) {
        self.with_state(|s| {
            s.summaries.retain(|_, w| {
                !(w.organization_id == organization_id
                    && w.employee_id == employee_id
                    && w.work_date == work_date)
            })
        })
    }

    pub fn summary(
        &self,
        organization_id: Uuid,
        employee_id: Uuid,
        work_date: NaiveDate,
    ) -> Option<WorkdaySummary> {
        self.with_state(|s| {
            s.summaries
                .values()
                .find(|w| {
                    w.organization_id == organization_id
                        && w.employee_id == employee_id
                        && w.work_date == work_date
                })
                .cloned()
        })
    }

    /// Force a summary's status and last update, e.g. to simulate a crashed
    /// calculation.
    pub fn force_status(&self, workday_id: Uuid, status: CalculationStatus, updated_at: DateTime<Utc>) {
        self.with_state(|s| {
            if let Some(summary) = s.summaries.get_mut(&workday_id) {
                summary.calculation_status = status;
                summary.updated_at = updated_at;
            }
        })
    }

    pub fn put_schedule(&self, employee_id: Uuid, date: NaiveDate, schedule: EffectiveSchedule) {
        self.with_state(|s| {
            s.schedules.insert((employee_id, date), schedule);
        });
    }

    pub fn put_settings(&self, organization_id: Uuid, settings: OvertimeSettings) {
        self.with_state(|s| {
            s.organizations.insert(organization_id);
            s.settings.insert(organization_id, settings);
        });
    }

    pub fn put_contract(&self, organization_id: Uuid, employee_id: Uuid, weekly_minutes: Minutes) {
        self.with_state(|s| {
            s.contracts
                .insert((organization_id, employee_id), weekly_minutes);
        });
    }

    /// Make schedule lookups fail, as during a scheduling service outage.
    pub fn set_schedules_unavailable(&self, unavailable: bool) {
        self.with_state(|s| s.schedules_unavailable = unavailable);
    }

    pub fn put_approvers(&self, organization_id: Uuid, employee_id: Uuid, approvers: Vec<Uuid>) {
        self.with_state(|s| {
            s.approvers.insert((organization_id, employee_id), approvers);
        });
    }
}

impl WorkforceDirectory for InMemoryDirectory {
    async fn list_organizations(&self) -> AppResult<Vec<Uuid>> {
        Ok(self.lock()?.organizations.iter().copied().collect())
    }

    async fn workday_summary(
        &self,
        organization_id: Uuid,
        employee_id: Uuid,
        work_date: NaiveDate,
    ) -> AppResult<Option<WorkdaySummary>> {
        let state = self.lock()?;
        Ok(state
            .summaries
            .values()
            .find(|w| {
                w.organization_id == organization_id
                    && w.employee_id == employee_id
                    && w.work_date == work_date
            })
            .cloned())
    }

    async fn summaries_between(
        &self,
        organization_id: Uuid,
        from: NaiveDate,
        to: NaiveDate,
    ) -> AppResult<Vec<WorkdaySummary>> {
        let state = self.lock()?;
        let mut summaries: Vec<_> = state
            .summaries
            .values()
            .filter(|w| w.organization_id == organization_id && w.work_date >= from && w.work_date <= to)
            .cloned()
            .collect();
        summaries.sort_by_key(|w| (w.employee_id, w.work_date));
        Ok(summaries)
    }

    async fn summaries_needing_recalculation(
        &self,
        organization_id: Uuid,
        since: NaiveDate,
        stuck_before: DateTime<Utc>,
    ) -> AppResult<Vec<WorkdaySummary>> {
        let state = self.lock()?;
        let mut summaries: Vec<_> = state
            .summaries
            .values()
            .filter(|w| {
                w.organization_id == organization_id
                    && w.work_date >= since
                    && match w.calculation_status {
                        CalculationStatus::Dirty => true,
                        CalculationStatus::Calculating => w.updated_at < stuck_before,
                        _ => false,
                    }
            })
            .cloned()
            .collect();
        summaries.sort_by_key(|w| (w.work_date, w.employee_id));
        Ok(summaries)
    }

    async fn set_calculation_status(
        &self,
        workday_id: Uuid,
        status: CalculationStatus,
    ) -> AppResult<()> {
        let mut state = self.lock()?;
        if let Some(summary) = state.summaries.get_mut(&workday_id) {
            summary.calculation_status = status;
            summary.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn effective_schedule(
        &self,
        employee_id: Uuid,
        date: NaiveDate,
    ) -> AppResult<Option<EffectiveSchedule>> {
        let state = self.lock()?;
        if state.schedules_unavailable {
            return Err(AppError::internal_server_error_message(
                "schedule lookup unavailable",
            ));
        }
        Ok(state.schedules.get(&(employee_id, date)).cloned())
    }

    async fn overtime_settings(&self, organization_id: Uuid) -> AppResult<Option<OvertimeSettings>> {
        Ok(self.lock()?.settings.get(&organization_id).cloned())
    }

    async fn contracted_weekly_minutes(
        &self,
        organization_id: Uuid,
        employee_id: Uuid,
    ) -> AppResult<Option<Minutes>> {
        Ok(self
            .lock()?
            .contracts
            .get(&(organization_id, employee_id))
            .copied())
    }

    async fn resolve_approvers(
        &self,
        employee_id: Uuid,
        organization_id: Uuid,
        _category: &str,
    ) -> AppResult<Vec<Uuid>> {
        Ok(self
            .lock()?
            .approvers
            .get(&(organization_id, employee_id))
            .cloned()
            .unwrap_or_default())
    }
}
