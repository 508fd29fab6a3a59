use chrono::NaiveDate;
use uuid::Uuid;

use crate::database::models::{
    ApprovalMode, CandidateInput, CandidateStatus, CandidateType, EffectiveSchedule, Minutes,
    MovementKey, NonWorkingDayPolicy, OvertimeCandidate, OvertimePolicy, ScheduleSource,
    WorkdaySummary,
};
use crate::error::AppResult;
use crate::services::{
    approval::ApprovalGate,
    directory::WorkforceDirectory,
    ledger::LedgerWriter,
    normalizer::{ExcessBand, normalize},
    notifications::Notifier,
    store::OvertimeStore,
};

pub const NO_SCHEDULE_SKIP_REASON: &str = "NO_SCHEDULE_DATA";

/// Pure assessment of one day. The returned candidate carries `READY`,
/// `PENDING_APPROVAL` or `SKIPPED`; settling happens in the calculator.
pub fn evaluate_day(
    summary: &WorkdaySummary,
    schedule: Option<&EffectiveSchedule>,
    contracted_weekly_minutes: Option<Minutes>,
    policy: &OvertimePolicy,
) -> CandidateInput {
    let expected = summary
        .expected_minutes
        .or_else(|| schedule.and_then(|s| s.expected_minutes));

    let mut input = CandidateInput {
        organization_id: summary.organization_id,
        employee_id: summary.employee_id,
        work_date: summary.work_date,
        workday_id: Some(summary.id),
        expected_minutes: expected,
        worked_minutes: summary.worked_minutes,
        raw_deviation_minutes: Minutes::ZERO,
        candidate_minutes: Minutes::ZERO,
        candidate_type: CandidateType::Extra,
        status: CandidateStatus::Ready,
        requires_approval: false,
        skip_reason: None,
        overwork_authorization_id: None,
        policy_snapshot: policy.snapshot(),
    };

    let Some(expected) = expected else {
        input.status = CandidateStatus::Skipped;
        input.skip_reason = Some(NO_SCHEDULE_SKIP_REASON.to_string());
        return input;
    };

    let is_working_day = schedule
        .map(|s| s.is_working_day)
        .unwrap_or(expected.is_positive());
    let is_absence = schedule.is_some_and(|s| s.source == ScheduleSource::Absence);
    let non_working = !is_working_day || is_absence;

    let raw = if non_working {
        summary.worked_minutes
    } else {
        summary.worked_minutes - expected
    };
    let candidate = normalize(raw, policy, ExcessBand::Tolerance);

    let candidate_type = if candidate.is_negative() {
        CandidateType::Deficit
    } else if non_working {
        CandidateType::NonWorkday
    } else if candidate.is_positive()
        && contracted_weekly_minutes.is_some_and(|c| c < policy.reference_weekly_minutes)
    {
        CandidateType::Complementary
    } else {
        CandidateType::Extra
    };

    let requires_approval = candidate.is_positive()
        && candidate_type != CandidateType::Deficit
        && (policy.approval_mode != ApprovalMode::None
            || (candidate_type == CandidateType::NonWorkday
                && policy.non_working_day_policy == NonWorkingDayPolicy::RequireApproval));

    input.raw_deviation_minutes = raw;
    input.candidate_minutes = candidate;
    input.candidate_type = candidate_type;
    input.requires_approval = requires_approval;
    if requires_approval {
        input.status = CandidateStatus::PendingApproval;
    }
    input
}

/// Recomputes one employee/day and carries the result through the approval
/// gate or straight into the ledger. Safe to re-run at any point.
pub struct CandidateCalculator<'a, S, D, N> {
    store: &'a S,
    directory: &'a D,
    notifier: &'a N,
}

impl<'a, S, D, N> CandidateCalculator<'a, S, D, N>
where
    S: OvertimeStore,
    D: WorkforceDirectory,
    N: Notifier,
{
    pub fn new(store: &'a S, directory: &'a D, notifier: &'a N) -> Self {
        Self {
            store,
            directory,
            notifier,
        }
    }

    /// Returns the candidate after the run, or `None` when the day has no
    /// workday summary and was cleared.
    pub async fn calculate(
        &self,
        organization_id: Uuid,
        employee_id: Uuid,
        date: NaiveDate,
        policy: &OvertimePolicy,
    ) -> AppResult<Option<OvertimeCandidate>> {
        let existing = self
            .store
            .find_candidate(organization_id, employee_id, date)
            .await?;

        let Some(summary) = self
            .directory
            .workday_summary(organization_id, employee_id, date)
            .await?
        else {
            self.clear_day(organization_id, employee_id, date, existing.as_ref())
                .await?;
            return Ok(None);
        };

        let schedule = self.directory.effective_schedule(employee_id, date).await?;
        let contracted = self
            .directory
            .contracted_weekly_minutes(organization_id, employee_id)
            .await?;
        let input = evaluate_day(&summary, schedule.as_ref(), contracted, policy);

        let candidate = if input.status == CandidateStatus::Skipped {
            log::info!(
                "Skipping overtime for employee {} on {}: no schedule data",
                employee_id,
                date
            );
            self.withdraw_effects(organization_id, employee_id, date, Some(summary.id))
                .await?;
            self.write_if_changed(input, existing).await?
        } else if input.requires_approval {
            self.settle_through_approval(input, existing, policy).await?
        } else {
            self.settle_directly(input, existing, summary.id, policy)
                .await?
        };

        Ok(Some(candidate))
    }

    async fn settle_through_approval(
        &self,
        input: CandidateInput,
        existing: Option<OvertimeCandidate>,
        policy: &OvertimePolicy,
    ) -> AppResult<OvertimeCandidate> {
        // A movement booked while the day did not need approval must go.
        if let Some(workday_id) = input.workday_id {
            LedgerWriter::new(self.store)
                .remove_movement(
                    input.organization_id,
                    MovementKey::AutoDaily {
                        employee_id: input.employee_id,
                        workday_id,
                    },
                )
                .await?;
        }

        let current = match existing {
            Some(candidate) => candidate,
            None => self.store.upsert_candidate(input.clone()).await?,
        };

        let decision = ApprovalGate::new(self.store, self.directory, self.notifier)
            .evaluate(current.id, &input, policy)
            .await?;

        let next = input
            .with_status(decision.status)
            .with_authorization(decision.authorization_id);
        self.write_if_changed(next, Some(current)).await
    }

    async fn settle_directly(
        &self,
        input: CandidateInput,
        existing: Option<OvertimeCandidate>,
        workday_id: Uuid,
        policy: &OvertimePolicy,
    ) -> AppResult<OvertimeCandidate> {
        ApprovalGate::new(self.store, self.directory, self.notifier)
            .withdraw(input.organization_id, input.employee_id, input.work_date)
            .await?;

        LedgerWriter::new(self.store)
            .upsert_auto_daily_movement(
                input.organization_id,
                input.employee_id,
                workday_id,
                input.work_date,
                input.candidate_minutes,
                policy,
                input.candidate_type.into(),
            )
            .await?;

        let next = input.with_status(CandidateStatus::Settled);
        self.write_if_changed(next, existing).await
    }

    async fn write_if_changed(
        &self,
        next: CandidateInput,
        existing: Option<OvertimeCandidate>,
    ) -> AppResult<OvertimeCandidate> {
        match existing {
            Some(current) if next.matches(&current) => {
                log::debug!(
                    "Candidate for employee {} on {} unchanged",
                    current.employee_id,
                    current.work_date
                );
                Ok(current)
            }
            _ => {
                let candidate = self.store.upsert_candidate(next).await?;
                log::info!(
                    "Candidate for employee {} on {}: {} {} ({})",
                    candidate.employee_id,
                    candidate.work_date,
                    candidate.candidate_type,
                    candidate.candidate_minutes,
                    candidate.status
                );
                Ok(candidate)
            }
        }
    }

    async fn withdraw_effects(
        &self,
        organization_id: Uuid,
        employee_id: Uuid,
        date: NaiveDate,
        workday_id: Option<Uuid>,
    ) -> AppResult<()> {
        ApprovalGate::new(self.store, self.directory, self.notifier)
            .withdraw(organization_id, employee_id, date)
            .await?;
        if let Some(workday_id) = workday_id {
            LedgerWriter::new(self.store)
                .remove_movement(
                    organization_id,
                    MovementKey::AutoDaily {
                        employee_id,
                        workday_id,
                    },
                )
                .await?;
        }
        Ok(())
    }

    async fn clear_day(
        &self,
        organization_id: Uuid,
        employee_id: Uuid,
        date: NaiveDate,
        existing: Option<&OvertimeCandidate>,
    ) -> AppResult<()> {
        let Some(existing) = existing else {
            return Ok(());
        };
        self.withdraw_effects(organization_id, employee_id, date, existing.workday_id)
            .await?;
        self.store
            .delete_candidate(organization_id, employee_id, date)
            .await?;
        log::info!(
            "Removed stale candidate for employee {} on {}: workday summary is gone",
            employee_id,
            date
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    use crate::database::models::CalculationStatus;

    fn summary(worked: i32, expected: Option<i32>) -> WorkdaySummary {
        WorkdaySummary {
            id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            employee_id: Uuid::new_v4(),
            work_date: NaiveDate::from_ymd_opt(2025, 3, 12).unwrap(),
            worked_minutes: Minutes(worked),
            expected_minutes: expected.map(Minutes),
            calculation_status: CalculationStatus::Dirty,
            updated_at: Utc::now(),
        }
    }

    fn schedule(expected: Option<i32>, working: bool, source: ScheduleSource) -> EffectiveSchedule {
        EffectiveSchedule {
            expected_minutes: expected.map(Minutes),
            is_working_day: working,
            source,
            exception_type: None,
        }
    }

    fn policy() -> OvertimePolicy {
        OvertimePolicy {
            tolerance_minutes: Minutes(15),
            deficit_grace_minutes: Minutes(10),
            rounding_increment_minutes: Minutes(5),
            ..Default::default()
        }
    }

    #[test]
    fn extra_minutes_on_a_working_day() {
        let input = evaluate_day(&summary(500, Some(480)), None, None, &policy());

        assert_eq!(input.raw_deviation_minutes, Minutes(20));
        assert_eq!(input.candidate_minutes, Minutes(20));
        assert_eq!(input.candidate_type, CandidateType::Extra);
        assert_eq!(input.status, CandidateStatus::Ready);
        assert!(!input.requires_approval);
    }

    #[test]
    fn deficit_never_requires_approval() {
        let p = OvertimePolicy {
            approval_mode: ApprovalMode::Pre,
            ..policy()
        };
        let input = evaluate_day(&summary(430, Some(480)), None, None, &p);

        assert_eq!(input.candidate_minutes, Minutes(-50));
        assert_eq!(input.candidate_type, CandidateType::Deficit);
        assert!(!input.requires_approval);
    }

    #[test]
    fn all_worked_time_counts_on_a_non_working_day() {
        let s = schedule(Some(0), false, ScheduleSource::Calendar);
        let input = evaluate_day(&summary(90, Some(0)), Some(&s), None, &policy());

        assert_eq!(input.raw_deviation_minutes, Minutes(90));
        assert_eq!(input.candidate_type, CandidateType::NonWorkday);
        assert!(input.requires_approval);
        assert_eq!(input.status, CandidateStatus::PendingApproval);
    }

    #[test]
    fn auto_allow_settles_non_working_days_without_approval() {
        let p = OvertimePolicy {
            non_working_day_policy: NonWorkingDayPolicy::AutoAllow,
            ..policy()
        };
        let s = schedule(Some(0), false, ScheduleSource::Holiday);
        let input = evaluate_day(&summary(90, None), Some(&s), None, &p);

        assert_eq!(input.candidate_type, CandidateType::NonWorkday);
        assert!(!input.requires_approval);
    }

    #[test]
    fn absence_is_treated_as_a_non_working_day() {
        let s = schedule(Some(480), true, ScheduleSource::Absence);
        let input = evaluate_day(&summary(120, None), Some(&s), None, &policy());

        assert_eq!(input.expected_minutes, Some(Minutes(480)));
        assert_eq!(input.raw_deviation_minutes, Minutes(120));
        assert_eq!(input.candidate_type, CandidateType::NonWorkday);
    }

    #[test]
    fn summary_expected_minutes_win_over_the_schedule() {
        let s = schedule(Some(420), true, ScheduleSource::Shift);
        let input = evaluate_day(&summary(500, Some(480)), Some(&s), None, &policy());

        assert_eq!(input.expected_minutes, Some(Minutes(480)));
        assert_eq!(input.raw_deviation_minutes, Minutes(20));
    }

    #[test]
    fn no_expected_minutes_anywhere_is_skipped() {
        let s = schedule(None, true, ScheduleSource::Default);
        let input = evaluate_day(&summary(500, None), Some(&s), None, &policy());

        assert_eq!(input.status, CandidateStatus::Skipped);
        assert_eq!(input.skip_reason.as_deref(), Some(NO_SCHEDULE_SKIP_REASON));
        assert_eq!(input.candidate_minutes, Minutes::ZERO);
        assert!(!input.requires_approval);
    }

    #[test]
    fn part_time_contracts_produce_complementary_hours() {
        let input = evaluate_day(
            &summary(300, Some(240)),
            None,
            Some(Minutes(1_200)),
            &policy(),
        );
        assert_eq!(input.candidate_type, CandidateType::Complementary);

        let full_time = evaluate_day(
            &summary(300, Some(240)),
            None,
            Some(Minutes(2_400)),
            &policy(),
        );
        assert_eq!(full_time.candidate_type, CandidateType::Extra);
    }

    #[test]
    fn approval_mode_gates_positive_working_day_candidates() {
        let p = OvertimePolicy {
            approval_mode: ApprovalMode::Post,
            ..policy()
        };
        let input = evaluate_day(&summary(540, Some(480)), None, None, &p);
        assert!(input.requires_approval);

        let within_tolerance = evaluate_day(&summary(490, Some(480)), None, None, &p);
        assert_eq!(within_tolerance.candidate_minutes, Minutes::ZERO);
        assert!(!within_tolerance.requires_approval);
    }

    #[test]
    fn snapshot_freezes_the_policy_used() {
        let p = policy();
        let input = evaluate_day(&summary(500, Some(480)), None, None, &p);
        assert_eq!(input.policy_snapshot["toleranceMinutes"], 15);
    }
}
