use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, NaiveDate, Utc};
use tokio::sync::watch;

use crate::config::Config;
use crate::database::models::CalculationMode;
use crate::error::AppResult;
use crate::jobs::{
    AuthorizationExpireJob, Job, JobQueue, WeeklyReconciliationJob, WorkdaySweepJob,
};
use crate::services::{Notifier, OvertimeEngine, OvertimeStore, WorkforceDirectory};

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub sweep_interval: Duration,
    pub sweep_lookback_days: i64,
    pub maintenance_interval: Duration,
    pub authorization_expiry_days: i64,
}

impl From<&Config> for SchedulerSettings {
    fn from(config: &Config) -> Self {
        Self {
            sweep_interval: Duration::from_secs(config.sweep_interval_secs.max(1)),
            sweep_lookback_days: config.sweep_lookback_days,
            maintenance_interval: Duration::from_secs(config.reconciliation_interval_secs.max(1)),
            authorization_expiry_days: config.authorization_expiry_days,
        }
    }
}

/// Monday of the week before the one containing `today`.
pub fn previous_week_start(today: NaiveDate) -> NaiveDate {
    let offset = i64::from(today.weekday().num_days_from_monday()) + 7;
    today - chrono::Duration::days(offset)
}

/// Enqueue a sweep for every known organization.
pub async fn sweep_tick<S, D, N>(
    engine: &OvertimeEngine<S, D, N>,
    queue: &JobQueue,
    settings: &SchedulerSettings,
) -> AppResult<usize>
where
    S: OvertimeStore,
    D: WorkforceDirectory,
    N: Notifier,
{
    let mut queued = 0;
    for organization_id in engine.list_organizations().await? {
        let job = Job::WorkdaySweep(WorkdaySweepJob {
            organization_id,
            lookback_days: settings.sweep_lookback_days,
        });
        if queue.enqueue(job).await {
            queued += 1;
        }
    }
    Ok(queued)
}

/// Enqueue authorization expiry for every organization, plus the previous
/// week's reconciliation where the organization reconciles weekly.
pub async fn maintenance_tick<S, D, N>(
    engine: &OvertimeEngine<S, D, N>,
    queue: &JobQueue,
    settings: &SchedulerSettings,
    today: NaiveDate,
) -> AppResult<usize>
where
    S: OvertimeStore,
    D: WorkforceDirectory,
    N: Notifier,
{
    let week_start = previous_week_start(today);
    let mut queued = 0;
    for organization_id in engine.list_organizations().await? {
        let expire = Job::AuthorizationExpire(AuthorizationExpireJob {
            organization_id,
            expiry_days: settings.authorization_expiry_days,
        });
        if queue.enqueue(expire).await {
            queued += 1;
        }

        let policy = engine.policy(organization_id).await?;
        if policy.calculation_mode == CalculationMode::Weekly {
            let reconcile = Job::WeeklyReconciliation(WeeklyReconciliationJob {
                organization_id,
                week_start,
            });
            if queue.enqueue(reconcile).await {
                queued += 1;
            }
        }
    }
    Ok(queued)
}

/// Drive both ticks until `shutdown` flips to true.
pub async fn run_scheduler<S, D, N>(
    engine: Arc<OvertimeEngine<S, D, N>>,
    queue: JobQueue,
    settings: SchedulerSettings,
    mut shutdown: watch::Receiver<bool>,
) where
    S: OvertimeStore + 'static,
    D: WorkforceDirectory + 'static,
    N: Notifier + 'static,
{
    let mut sweep = tokio::time::interval(settings.sweep_interval);
    let mut maintenance = tokio::time::interval(settings.maintenance_interval);
    sweep.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    maintenance.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    log::info!(
        "Scheduler started: sweep every {:?}, maintenance every {:?}",
        settings.sweep_interval,
        settings.maintenance_interval
    );

    loop {
        tokio::select! {
            _ = sweep.tick() => {
                if let Err(e) = sweep_tick(&engine, &queue, &settings).await {
                    log::error!("Sweep tick failed: {}", e);
                }
            }
            _ = maintenance.tick() => {
                let today = Utc::now().date_naive();
                if let Err(e) = maintenance_tick(&engine, &queue, &settings, today).await {
                    log::error!("Maintenance tick failed: {}", e);
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    log::info!("Scheduler stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn previous_week_starts_on_the_monday_before() {
        let monday = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        for day in [10, 12, 16] {
            let today = NaiveDate::from_ymd_opt(2025, 3, day).unwrap();
            assert_eq!(previous_week_start(today), monday);
        }
    }
}
