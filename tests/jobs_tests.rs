use std::time::Duration;

use chrono::Utc;
use pretty_assertions::assert_eq;
use tokio::sync::watch;

use timebank::Config;
use timebank::database::models::{CalculationStatus, Minutes};
use timebank::jobs::scheduler::{maintenance_tick, sweep_tick};
use timebank::jobs::{
    Job, JobQueue, QueueSettings, SchedulerSettings, WorkdayOvertimeJob, WorkdaySweepJob,
    run_scheduler, start_workers,
};

mod common;

use common::{TestContext, base_settings, weekly_settings};

const IDLE_TIMEOUT: Duration = Duration::from_secs(5);

fn queue_with_workers(ctx: &TestContext) -> JobQueue {
    let (queue, receivers) = JobQueue::new(QueueSettings::from(&Config::test_config()));
    start_workers(ctx.engine.clone(), queue.clone(), receivers);
    queue
}

#[tokio::test]
async fn workday_job_recomputes_the_day() {
    let ctx = TestContext::new(base_settings());
    let queue = queue_with_workers(&ctx);
    let day = Utc::now().date_naive();
    ctx.record_day(day, 540, Some(480));

    let job = Job::WorkdayOvertime(WorkdayOvertimeJob {
        organization_id: ctx.organization_id,
        employee_id: ctx.employee_id,
        date: day,
    });
    queue.enqueue(job).await;

    assert!(queue.wait_idle(IDLE_TIMEOUT).await);
    assert_eq!(ctx.balance().await, Minutes(60));
    let summary = ctx
        .directory()
        .summary(ctx.organization_id, ctx.employee_id, day)
        .unwrap();
    assert_eq!(summary.calculation_status, CalculationStatus::Ready);
}

#[tokio::test]
async fn sweep_picks_up_dirty_and_stuck_days_only() {
    let ctx = TestContext::new(base_settings());
    let queue = queue_with_workers(&ctx);
    let today = Utc::now().date_naive();
    let yesterday = today - chrono::Duration::days(1);
    let two_days_ago = today - chrono::Duration::days(2);
    let long_ago = today - chrono::Duration::days(30);

    ctx.record_day(today, 540, Some(480));
    let stuck = ctx
        .directory()
        .put_summary(ctx.organization_id, ctx.employee_id, yesterday, 520, Some(480));
    ctx.directory().force_status(
        stuck.id,
        CalculationStatus::Calculating,
        Utc::now() - chrono::Duration::hours(1),
    );
    let busy = ctx
        .directory()
        .put_summary(ctx.organization_id, ctx.employee_id, two_days_ago, 600, Some(480));
    ctx.directory()
        .force_status(busy.id, CalculationStatus::Calculating, Utc::now());
    ctx.record_day(long_ago, 600, Some(480));

    queue
        .enqueue(Job::WorkdaySweep(WorkdaySweepJob {
            organization_id: ctx.organization_id,
            lookback_days: 7,
        }))
        .await;
    assert!(queue.wait_idle(IDLE_TIMEOUT).await);

    // Today's +60 and yesterday's +40; the busy day and the old one wait.
    assert_eq!(ctx.balance().await, Minutes(100));
    let status = |day| {
        ctx.directory()
            .summary(ctx.organization_id, ctx.employee_id, day)
            .unwrap()
            .calculation_status
    };
    assert_eq!(status(today), CalculationStatus::Ready);
    assert_eq!(status(yesterday), CalculationStatus::Ready);
    assert_eq!(status(two_days_ago), CalculationStatus::Calculating);
    assert_eq!(status(long_ago), CalculationStatus::Dirty);
}

#[tokio::test]
async fn failing_job_is_retried_then_dead_lettered() {
    let ctx = TestContext::new(base_settings());
    let queue = queue_with_workers(&ctx);
    let day = Utc::now().date_naive();
    ctx.record_day(day, 540, Some(480));
    ctx.directory().set_schedules_unavailable(true);

    queue
        .enqueue(Job::WorkdayOvertime(WorkdayOvertimeJob {
            organization_id: ctx.organization_id,
            employee_id: ctx.employee_id,
            date: day,
        }))
        .await;
    assert!(queue.wait_idle(IDLE_TIMEOUT).await);

    let dead = queue.dead_letters();
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].attempts, 3);
    assert_eq!(ctx.balance().await, Minutes::ZERO);
    let summary = ctx
        .directory()
        .summary(ctx.organization_id, ctx.employee_id, day)
        .unwrap();
    assert_eq!(summary.calculation_status, CalculationStatus::Error);

    // Once the outage is over the next trigger goes through.
    ctx.directory().set_schedules_unavailable(false);
    ctx.directory()
        .force_status(summary.id, CalculationStatus::Dirty, Utc::now());
    queue
        .enqueue(Job::WorkdaySweep(WorkdaySweepJob {
            organization_id: ctx.organization_id,
            lookback_days: 7,
        }))
        .await;
    assert!(queue.wait_idle(IDLE_TIMEOUT).await);
    assert_eq!(ctx.balance().await, Minutes(60));
}

#[tokio::test]
async fn maintenance_tick_reconciles_only_weekly_organizations() {
    let daily = TestContext::new(base_settings());
    let weekly = TestContext::new(weekly_settings());
    let settings = SchedulerSettings::from(&Config::test_config());
    let today = Utc::now().date_naive();

    let (daily_queue, _daily_receivers) =
        JobQueue::new(QueueSettings::from(&Config::test_config()));
    let (weekly_queue, _weekly_receivers) =
        JobQueue::new(QueueSettings::from(&Config::test_config()));

    let daily_queued = maintenance_tick(&*daily.engine, &daily_queue, &settings, today)
        .await
        .unwrap();
    let weekly_queued = maintenance_tick(&*weekly.engine, &weekly_queue, &settings, today)
        .await
        .unwrap();

    assert_eq!(daily_queued, 1);
    assert_eq!(weekly_queued, 2);

    // Still pending: a second tick merges into the queued jobs.
    let again = maintenance_tick(&*weekly.engine, &weekly_queue, &settings, today)
        .await
        .unwrap();
    assert_eq!(again, 0);
    let sweeps = sweep_tick(&*weekly.engine, &weekly_queue, &settings)
        .await
        .unwrap();
    assert_eq!(sweeps, 1);
}

#[tokio::test]
async fn scheduler_drives_dirty_days_to_ready() {
    let ctx = TestContext::new(base_settings());
    let queue = queue_with_workers(&ctx);
    let day = Utc::now().date_naive();
    ctx.record_day(day, 540, Some(480));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = tokio::spawn(run_scheduler(
        ctx.engine.clone(),
        queue.clone(),
        SchedulerSettings::from(&Config::test_config()),
        shutdown_rx,
    ));

    let mut ready = false;
    for _ in 0..200 {
        let summary = ctx
            .directory()
            .summary(ctx.organization_id, ctx.employee_id, day)
            .unwrap();
        if summary.calculation_status == CalculationStatus::Ready {
            ready = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    shutdown_tx.send(true).unwrap();
    scheduler.await.unwrap();

    assert!(ready);
    assert_eq!(ctx.balance().await, Minutes(60));
}
