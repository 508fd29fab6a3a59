use std::sync::Arc;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

use crate::error::AppResult;
use crate::jobs::queue::{JobQueue, QueuedJob};
use crate::jobs::{Job, WorkdayOvertimeJob};
use crate::services::{Notifier, OvertimeEngine, OvertimeStore, WorkforceDirectory};

/// Spawn one worker per receiver. Each worker drains its shard in order.
pub fn start_workers<S, D, N>(
    engine: Arc<OvertimeEngine<S, D, N>>,
    queue: JobQueue,
    receivers: Vec<UnboundedReceiver<QueuedJob>>,
) -> Vec<JoinHandle<()>>
where
    S: OvertimeStore + 'static,
    D: WorkforceDirectory + 'static,
    N: Notifier + 'static,
{
    receivers
        .into_iter()
        .enumerate()
        .map(|(index, mut receiver)| {
            let engine = engine.clone();
            let queue = queue.clone();
            tokio::spawn(async move {
                log::info!("Job worker {} started", index);
                while let Some(queued) = receiver.recv().await {
                    run_one(&engine, &queue, queued).await;
                }
                log::info!("Job worker {} stopped", index);
            })
        })
        .collect()
}

async fn run_one<S, D, N>(engine: &OvertimeEngine<S, D, N>, queue: &JobQueue, queued: QueuedJob)
where
    S: OvertimeStore,
    D: WorkforceDirectory,
    N: Notifier,
{
    queue.release(&queued.job).await;
    let key = queued.job.singleton_key();

    match execute(engine, queue, &queued.job).await {
        Ok(()) => {
            log::debug!("Job {} finished (attempt {})", key, queued.attempt);
            queue.complete();
        }
        Err(e) if e.is_retryable() && queued.attempt < queue.settings().max_attempts => {
            log::warn!("Job {} failed on attempt {}: {}", key, queued.attempt, e);
            queue.retry(queued);
        }
        Err(e) => {
            if let Job::WorkdayOvertime(job) = &queued.job {
                if let Err(mark_err) = engine
                    .mark_day_failed(job.organization_id, job.employee_id, job.date)
                    .await
                {
                    log::error!("Failed to flag workday for {}: {}", key, mark_err);
                }
            }
            queue.dead_letter(queued, e.to_string());
            queue.complete();
        }
    }
}

async fn execute<S, D, N>(
    engine: &OvertimeEngine<S, D, N>,
    queue: &JobQueue,
    job: &Job,
) -> AppResult<()>
where
    S: OvertimeStore,
    D: WorkforceDirectory,
    N: Notifier,
{
    match job {
        Job::WorkdayOvertime(j) => {
            engine
                .recompute_day(j.organization_id, j.employee_id, j.date)
                .await?;
        }
        Job::WeeklyReconciliation(j) => {
            let corrections = engine.reconcile_week(j.organization_id, j.week_start).await?;
            log::info!(
                "Weekly reconciliation for {} week {}: {} employees",
                j.organization_id,
                j.week_start,
                corrections.len()
            );
        }
        Job::WorkdaySweep(j) => {
            let due = engine
                .sweep(j.organization_id, j.lookback_days, queue.settings().stuck_after)
                .await?;
            for summary in due {
                queue
                    .enqueue(Job::WorkdayOvertime(WorkdayOvertimeJob {
                        organization_id: summary.organization_id,
                        employee_id: summary.employee_id,
                        date: summary.work_date,
                    }))
                    .await;
            }
        }
        Job::AuthorizationExpire(j) => {
            let expired = engine
                .expire_authorizations(j.organization_id, j.expiry_days)
                .await?;
            if expired > 0 {
                log::info!(
                    "Expired {} pending authorizations for {}",
                    expired,
                    j.organization_id
                );
            }
        }
    }
    Ok(())
}
