use chrono::{Duration, NaiveDate, Utc};
use uuid::Uuid;

use crate::database::models::{
    ApproveAuthorizationInput, BalanceAdjustmentInput, CalculationStatus,
    CreateTimeBankRequestInput, Minutes, OvertimeCandidate, OvertimePolicy,
    OverworkAuthorization, RejectAuthorizationInput, ReviewRequestInput, TimeBankBalance,
    TimeBankMovement, TimeBankRequest, WorkdaySummary,
};
use crate::error::AppResult;
use crate::services::{
    approval::ApprovalGate,
    candidate::CandidateCalculator,
    directory::WorkforceDirectory,
    notifications::Notifier,
    policy::PolicyResolver,
    reconciler::{WeeklyCorrection, WeeklyReconciler},
    requests::TimeBankRequests,
    store::OvertimeStore,
};

const RECENT_MOVEMENTS_LIMIT: i64 = 20;

/// Entry point for every engine operation. Each call resolves the policy
/// once and threads it through the components it drives.
pub struct OvertimeEngine<S, D, N> {
    store: S,
    directory: D,
    notifier: N,
}

impl<S, D, N> OvertimeEngine<S, D, N>
where
    S: OvertimeStore,
    D: WorkforceDirectory,
    N: Notifier,
{
    pub fn new(store: S, directory: D, notifier: N) -> Self {
        Self {
            store,
            directory,
            notifier,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub async fn policy(&self, organization_id: Uuid) -> AppResult<OvertimePolicy> {
        PolicyResolver::new(&self.directory)
            .resolve(organization_id)
            .await
    }

    pub async fn list_organizations(&self) -> AppResult<Vec<Uuid>> {
        self.directory.list_organizations().await
    }

    /// Recompute one employee/day. Marks the workday `CALCULATING` for the
    /// duration and `READY` once everything is written.
    pub async fn recompute_day(
        &self,
        organization_id: Uuid,
        employee_id: Uuid,
        date: NaiveDate,
    ) -> AppResult<Option<OvertimeCandidate>> {
        let summary = self
            .directory
            .workday_summary(organization_id, employee_id, date)
            .await?;
        if let Some(summary) = &summary {
            self.directory
                .set_calculation_status(summary.id, CalculationStatus::Calculating)
                .await?;
        }

        let policy = self.policy(organization_id).await?;
        let candidate = CandidateCalculator::new(&self.store, &self.directory, &self.notifier)
            .calculate(organization_id, employee_id, date, &policy)
            .await?;

        if let Some(summary) = &summary {
            self.directory
                .set_calculation_status(summary.id, CalculationStatus::Ready)
                .await?;
        }
        Ok(candidate)
    }

    /// Flag a day whose recomputation gave up after its last retry.
    pub async fn mark_day_failed(
        &self,
        organization_id: Uuid,
        employee_id: Uuid,
        date: NaiveDate,
    ) -> AppResult<()> {
        if let Some(summary) = self
            .directory
            .workday_summary(organization_id, employee_id, date)
            .await?
        {
            self.directory
                .set_calculation_status(summary.id, CalculationStatus::Error)
                .await?;
        }
        Ok(())
    }

    pub async fn approve_authorization(
        &self,
        organization_id: Uuid,
        authorization_id: Uuid,
        approver_id: Uuid,
        input: ApproveAuthorizationInput,
    ) -> AppResult<OverworkAuthorization> {
        ApprovalGate::new(&self.store, &self.directory, &self.notifier)
            .approve(organization_id, authorization_id, approver_id, input)
            .await
    }

    pub async fn reject_authorization(
        &self,
        organization_id: Uuid,
        authorization_id: Uuid,
        approver_id: Uuid,
        input: RejectAuthorizationInput,
    ) -> AppResult<OverworkAuthorization> {
        ApprovalGate::new(&self.store, &self.directory, &self.notifier)
            .reject(organization_id, authorization_id, approver_id, input)
            .await
    }

    pub async fn expire_authorizations(
        &self,
        organization_id: Uuid,
        expiry_days: i64,
    ) -> AppResult<usize> {
        ApprovalGate::new(&self.store, &self.directory, &self.notifier)
            .expire(organization_id, expiry_days)
            .await
    }

    pub async fn reconcile_week(
        &self,
        organization_id: Uuid,
        week_start: NaiveDate,
    ) -> AppResult<Vec<WeeklyCorrection>> {
        let policy = self.policy(organization_id).await?;
        WeeklyReconciler::new(&self.store, &self.directory)
            .reconcile(organization_id, week_start, &policy)
            .await
    }

    /// Workdays within the lookback window that are `DIRTY` or have been
    /// `CALCULATING` for longer than `stuck_after`.
    pub async fn sweep(
        &self,
        organization_id: Uuid,
        lookback_days: i64,
        stuck_after: Duration,
    ) -> AppResult<Vec<WorkdaySummary>> {
        let now = Utc::now();
        let since = now.date_naive() - Duration::days(lookback_days);
        let due = self
            .directory
            .summaries_needing_recalculation(organization_id, since, now - stuck_after)
            .await?;
        if !due.is_empty() {
            log::info!(
                "Sweep found {} workdays to recalculate for organization {}",
                due.len(),
                organization_id
            );
        }
        Ok(due)
    }

    pub async fn balance_summary(
        &self,
        organization_id: Uuid,
        employee_id: Uuid,
    ) -> AppResult<TimeBankBalance> {
        let policy = self.policy(organization_id).await?;
        let balance = self
            .store
            .balance(organization_id, employee_id, None)
            .await?;
        let pending_authorizations = self
            .store
            .list_pending_authorizations(organization_id, Some(employee_id), None)
            .await?;
        let recent_movements = self
            .store
            .list_movements(organization_id, employee_id, Some(RECENT_MOVEMENTS_LIMIT))
            .await?;

        Ok(TimeBankBalance {
            organization_id,
            employee_id,
            balance_minutes: balance,
            max_positive_minutes: policy.max_positive_balance_minutes,
            max_negative_minutes: policy.max_negative_balance_minutes,
            credit_headroom_minutes: (policy.max_positive_balance_minutes - balance)
                .max(Minutes::ZERO),
            debit_headroom_minutes: (balance + policy.max_negative_balance_minutes)
                .max(Minutes::ZERO),
            pending_authorizations,
            recent_movements,
        })
    }

    fn requests(&self) -> TimeBankRequests<'_, S, D, N> {
        TimeBankRequests::new(&self.store, &self.directory, &self.notifier)
    }

    pub async fn create_request(
        &self,
        organization_id: Uuid,
        input: CreateTimeBankRequestInput,
    ) -> AppResult<TimeBankRequest> {
        self.requests().create(organization_id, input).await
    }

    pub async fn approve_request(
        &self,
        organization_id: Uuid,
        request_id: Uuid,
        reviewer_id: Uuid,
        input: ReviewRequestInput,
    ) -> AppResult<TimeBankRequest> {
        self.requests()
            .approve(organization_id, request_id, reviewer_id, input)
            .await
    }

    pub async fn reject_request(
        &self,
        organization_id: Uuid,
        request_id: Uuid,
        reviewer_id: Uuid,
        input: ReviewRequestInput,
    ) -> AppResult<TimeBankRequest> {
        self.requests()
            .reject(organization_id, request_id, reviewer_id, input)
            .await
    }

    pub async fn cancel_request(
        &self,
        organization_id: Uuid,
        request_id: Uuid,
        actor_id: Uuid,
    ) -> AppResult<TimeBankRequest> {
        self.requests()
            .cancel(organization_id, request_id, actor_id)
            .await
    }

    pub async fn adjust_balance(
        &self,
        organization_id: Uuid,
        employee_id: Uuid,
        actor_id: Uuid,
        input: BalanceAdjustmentInput,
    ) -> AppResult<Option<TimeBankMovement>> {
        self.requests()
            .adjust_balance(organization_id, employee_id, actor_id, input)
            .await
    }
}
