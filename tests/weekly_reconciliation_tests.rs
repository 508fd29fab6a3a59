use pretty_assertions::assert_eq;

use timebank::database::models::{Minutes, MovementType};

mod common;

use common::{TestContext, base_settings, date, weekly_settings};

#[tokio::test]
async fn small_daily_excesses_add_up_to_a_weekly_correction() {
    let ctx = TestContext::new(weekly_settings());
    let week_start = date(2025, 3, 10);
    // +10 on three days: each inside the daily tolerance, +30 over the week.
    let worked = [490, 490, 490, 480, 480];
    for (offset, minutes) in worked.iter().enumerate() {
        let day = week_start + chrono::Duration::days(offset as i64);
        ctx.record_day(day, *minutes, Some(480));
        ctx.recompute(day).await;
    }
    assert_eq!(ctx.balance().await, Minutes::ZERO);

    let corrections = ctx
        .engine
        .reconcile_week(ctx.organization_id, week_start)
        .await
        .unwrap();

    assert_eq!(corrections.len(), 1);
    let correction = &corrections[0];
    assert_eq!(correction.worked_minutes, Minutes(2430));
    assert_eq!(correction.expected_minutes, Minutes(2400));
    assert_eq!(correction.weekly_normalized_minutes, Minutes(30));
    assert_eq!(correction.daily_sum_minutes, Minutes::ZERO);
    assert_eq!(correction.correction_minutes, Minutes(30));
    assert_eq!(
        correction.daily_sum_minutes + correction.correction_minutes,
        correction.weekly_normalized_minutes
    );
    assert_eq!(ctx.balance().await, Minutes(30));

    let movements = ctx.store().movements(ctx.organization_id, ctx.employee_id);
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].movement_type, MovementType::Correction);
    assert_eq!(movements[0].correction_week_start, Some(week_start));
    assert_eq!(movements[0].movement_date, date(2025, 3, 16));
}

#[tokio::test]
async fn daily_settlements_plus_correction_equal_the_weekly_figure() {
    let ctx = TestContext::new(weekly_settings());
    let week_start = date(2025, 3, 10);
    // Mon +60 settles daily; Tue -30 settles daily; Wed +10 is tolerated.
    let worked = [540, 450, 490, 480, 480];
    for (offset, minutes) in worked.iter().enumerate() {
        let day = week_start + chrono::Duration::days(offset as i64);
        ctx.record_day(day, *minutes, Some(480));
        ctx.recompute(day).await;
    }
    assert_eq!(ctx.balance().await, Minutes(30));

    let corrections = ctx
        .engine
        .reconcile_week(ctx.organization_id, week_start)
        .await
        .unwrap();
    let correction = &corrections[0];

    assert_eq!(correction.weekly_normalized_minutes, Minutes(40));
    assert_eq!(correction.daily_sum_minutes, Minutes(30));
    assert_eq!(correction.correction_minutes, Minutes(10));
    assert_eq!(ctx.balance().await, correction.weekly_normalized_minutes);
}

#[tokio::test]
async fn reconciling_twice_keeps_a_single_correction() {
    let ctx = TestContext::new(weekly_settings());
    let week_start = date(2025, 3, 10);
    for offset in 0..3 {
        let day = week_start + chrono::Duration::days(offset);
        ctx.record_day(day, 470, Some(480));
        ctx.recompute(day).await;
    }

    for _ in 0..3 {
        ctx.engine
            .reconcile_week(ctx.organization_id, week_start)
            .await
            .unwrap();
    }

    let movements = ctx.store().movements(ctx.organization_id, ctx.employee_id);
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].movement_type, MovementType::Deficit);
    assert_eq!(ctx.balance().await, Minutes(-30));
}

#[tokio::test]
async fn any_day_of_the_week_selects_the_same_week() {
    let ctx = TestContext::new(weekly_settings());
    let week_start = date(2025, 3, 10);
    for offset in 0..3 {
        let day = week_start + chrono::Duration::days(offset);
        ctx.record_day(day, 490, Some(480));
        ctx.recompute(day).await;
    }

    let corrections = ctx
        .engine
        .reconcile_week(ctx.organization_id, date(2025, 3, 13))
        .await
        .unwrap();

    assert_eq!(corrections[0].week_start, week_start);
    assert_eq!(corrections[0].correction_minutes, Minutes(30));
}

#[tokio::test]
async fn daily_organizations_are_not_reconciled() {
    let ctx = TestContext::new(base_settings());
    let week_start = date(2025, 3, 10);
    for offset in 0..3 {
        let day = week_start + chrono::Duration::days(offset);
        ctx.record_day(day, 490, Some(480));
        ctx.recompute(day).await;
    }

    let corrections = ctx
        .engine
        .reconcile_week(ctx.organization_id, week_start)
        .await
        .unwrap();

    assert!(corrections.is_empty());
    assert_eq!(ctx.balance().await, Minutes::ZERO);
}
