use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;
use uuid::Uuid;

use crate::database::models::{
    CalculationMode, Minutes, MovementDraft, MovementKey, MovementType, OvertimeCandidate,
    OvertimePolicy, WorkdaySummary,
};
use crate::error::AppResult;
use crate::services::{
    directory::WorkforceDirectory,
    ledger::{ClampResult, LedgerWriter},
    normalizer::{ExcessBand, normalize},
    store::OvertimeStore,
};

/// Monday of the ISO week containing `date`.
pub fn week_start_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Outcome of reconciling one employee's week.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyCorrection {
    pub employee_id: Uuid,
    pub week_start: NaiveDate,
    pub worked_minutes: Minutes,
    pub expected_minutes: Minutes,
    pub weekly_normalized_minutes: Minutes,
    pub daily_sum_minutes: Minutes,
    /// `weekly_normalized - daily_sum`, before any ledger clamp.
    pub correction_minutes: Minutes,
    pub applied_minutes: Minutes,
    pub clamp: Option<ClampResult>,
}

/// Weekly totals for one employee. `candidates` are the same week's daily
/// candidates; their expected minutes fill in days the summary leaves blank.
pub fn weekly_totals(
    summaries: &[&WorkdaySummary],
    candidates: &[OvertimeCandidate],
    policy: &OvertimePolicy,
) -> (Minutes, Minutes, Minutes, Minutes) {
    let worked: Minutes = summaries.iter().map(|s| s.worked_minutes).sum();
    let expected: Minutes = summaries
        .iter()
        .filter_map(|s| {
            s.expected_minutes.or_else(|| {
                candidates
                    .iter()
                    .find(|c| c.work_date == s.work_date)
                    .and_then(|c| c.expected_minutes)
            })
        })
        .sum();
    let normalized = normalize(worked - expected, policy, ExcessBand::Tolerance);
    let daily_sum: Minutes = candidates
        .iter()
        .filter(|c| c.status.counts_towards_week())
        .map(|c| c.candidate_minutes)
        .sum();
    (worked, expected, normalized, daily_sum)
}

pub struct WeeklyReconciler<'a, S, D> {
    store: &'a S,
    directory: &'a D,
}

impl<'a, S: OvertimeStore, D: WorkforceDirectory> WeeklyReconciler<'a, S, D> {
    pub fn new(store: &'a S, directory: &'a D) -> Self {
        Self { store, directory }
    }

    pub async fn reconcile(
        &self,
        organization_id: Uuid,
        week_start: NaiveDate,
        policy: &OvertimePolicy,
    ) -> AppResult<Vec<WeeklyCorrection>> {
        if policy.calculation_mode != CalculationMode::Weekly {
            log::debug!(
                "Organization {} uses daily calculation, skipping weekly reconciliation",
                organization_id
            );
            return Ok(Vec::new());
        }

        let week_start = week_start_of(week_start);
        let week_end = week_start + Duration::days(6);
        let summaries = self
            .directory
            .summaries_between(organization_id, week_start, week_end)
            .await?;

        let mut by_employee: BTreeMap<Uuid, Vec<&WorkdaySummary>> = BTreeMap::new();
        for summary in &summaries {
            by_employee
                .entry(summary.employee_id)
                .or_default()
                .push(summary);
        }

        let ledger = LedgerWriter::new(self.store);
        let mut corrections = Vec::new();

        for (employee_id, days) in by_employee {
            let candidates = self
                .store
                .list_candidates_between(organization_id, employee_id, week_start, week_end)
                .await?;
            let (worked, expected, normalized, daily_sum) =
                weekly_totals(&days, &candidates, policy);
            let key = MovementKey::WeeklyCorrection {
                employee_id,
                week_start,
            };

            if expected.is_zero() {
                log::debug!(
                    "No expected minutes for employee {} in week {}, skipping",
                    employee_id,
                    week_start
                );
                ledger.remove_movement(organization_id, key).await?;
                continue;
            }

            let correction = normalized - daily_sum;
            let draft = MovementDraft {
                organization_id,
                employee_id,
                key,
                movement_date: week_end,
                minutes: correction,
                movement_type: if correction.is_negative() {
                    MovementType::Deficit
                } else {
                    MovementType::Correction
                },
                description: Some(format!("Weekly reconciliation for week of {}", week_start)),
                created_by: None,
            };
            let outcome = ledger.upsert_movement(draft, policy).await?;

            if !correction.is_zero() {
                log::info!(
                    "Weekly correction for employee {} (week {}): weekly {} - daily {} = {}",
                    employee_id,
                    week_start,
                    normalized,
                    daily_sum,
                    correction
                );
            }

            corrections.push(WeeklyCorrection {
                employee_id,
                week_start,
                worked_minutes: worked,
                expected_minutes: expected,
                weekly_normalized_minutes: normalized,
                daily_sum_minutes: daily_sum,
                correction_minutes: correction,
                applied_minutes: outcome.applied(),
                clamp: outcome.clamp,
            });
        }

        Ok(corrections)
    }
}
