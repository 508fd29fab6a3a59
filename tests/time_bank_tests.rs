use pretty_assertions::assert_eq;
use uuid::Uuid;

use timebank::database::models::{
    BalanceAdjustmentInput, CreateTimeBankRequestInput, Minutes, MovementStatus, MovementType,
    NotificationType, OvertimeSettings, RequestKind, RequestStatus, ReviewRequestInput,
    TimeBankRequest,
};
use timebank::error::AppError;

mod common;

use common::{TestContext, base_settings, date};

async fn file_request(ctx: &TestContext, kind: RequestKind, minutes: i32) -> TimeBankRequest {
    ctx.engine
        .create_request(
            ctx.organization_id,
            CreateTimeBankRequestInput {
                employee_id: ctx.employee_id,
                kind,
                minutes,
                date: date(2025, 3, 14),
                reason: Some("Dentist appointment".to_string()),
            },
        )
        .await
        .unwrap()
}

fn adjustment(minutes: i32, reason: &str) -> BalanceAdjustmentInput {
    BalanceAdjustmentInput {
        minutes,
        reason: reason.to_string(),
        date: Some(date(2025, 3, 1)),
    }
}

fn capped_settings(max_positive: i32, max_negative: i32) -> OvertimeSettings {
    OvertimeSettings {
        max_positive_balance_minutes: Some(Minutes(max_positive)),
        max_negative_balance_minutes: Some(Minutes(max_negative)),
        ..base_settings()
    }
}

#[tokio::test]
async fn requests_need_a_positive_amount() {
    let ctx = TestContext::new(base_settings());

    for minutes in [0, -30] {
        let result = ctx
            .engine
            .create_request(
                ctx.organization_id,
                CreateTimeBankRequestInput {
                    employee_id: ctx.employee_id,
                    kind: RequestKind::Recovery,
                    minutes,
                    date: date(2025, 3, 14),
                    reason: None,
                },
            )
            .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
}

#[tokio::test]
async fn approved_recovery_debits_the_balance() {
    let ctx = TestContext::new(base_settings());
    let request = file_request(&ctx, RequestKind::Recovery, 90).await;
    assert_eq!(request.status, RequestStatus::Pending);
    assert_eq!(ctx.balance().await, Minutes::ZERO);

    let approved = ctx
        .engine
        .approve_request(
            ctx.organization_id,
            request.id,
            ctx.approver_id,
            ReviewRequestInput {
                notes: Some("Enjoy".to_string()),
            },
        )
        .await
        .unwrap();

    assert_eq!(approved.status, RequestStatus::Approved);
    assert_eq!(approved.reviewed_by, Some(ctx.approver_id));
    assert_eq!(approved.review_notes.as_deref(), Some("Enjoy"));
    assert_eq!(ctx.balance().await, Minutes(-90));

    let movements = ctx.store().movements(ctx.organization_id, ctx.employee_id);
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].movement_type, MovementType::Recovery);
    assert_eq!(movements[0].time_bank_request_id, Some(request.id));
    assert_eq!(movements[0].movement_date, date(2025, 3, 14));

    let notices = ctx
        .notifier()
        .notifications_of(NotificationType::TimeBankRequestApproved);
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].user_id, ctx.employee_id);
}

#[tokio::test]
async fn approved_festive_credits_the_balance() {
    let ctx = TestContext::new(base_settings());
    let request = file_request(&ctx, RequestKind::Festive, 120).await;

    ctx.engine
        .approve_request(
            ctx.organization_id,
            request.id,
            ctx.approver_id,
            ReviewRequestInput::default(),
        )
        .await
        .unwrap();

    assert_eq!(ctx.balance().await, Minutes(120));
    let movements = ctx.store().movements(ctx.organization_id, ctx.employee_id);
    assert_eq!(movements[0].movement_type, MovementType::Festive);
}

#[tokio::test]
async fn rejected_request_books_nothing() {
    let ctx = TestContext::new(base_settings());
    let request = file_request(&ctx, RequestKind::Recovery, 60).await;

    let rejected = ctx
        .engine
        .reject_request(
            ctx.organization_id,
            request.id,
            ctx.approver_id,
            ReviewRequestInput {
                notes: Some("Busy week".to_string()),
            },
        )
        .await
        .unwrap();

    assert_eq!(rejected.status, RequestStatus::Rejected);
    assert!(
        ctx.store()
            .movements(ctx.organization_id, ctx.employee_id)
            .is_empty()
    );
    let notices = ctx
        .notifier()
        .notifications_of(NotificationType::TimeBankRequestRejected);
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].user_id, ctx.employee_id);
}

#[tokio::test]
async fn cancelling_an_approved_request_restores_the_balance() {
    let ctx = TestContext::new(base_settings());
    let request = file_request(&ctx, RequestKind::Recovery, 90).await;
    ctx.engine
        .approve_request(
            ctx.organization_id,
            request.id,
            ctx.approver_id,
            ReviewRequestInput::default(),
        )
        .await
        .unwrap();

    let cancelled = ctx
        .engine
        .cancel_request(ctx.organization_id, request.id, ctx.employee_id)
        .await
        .unwrap();

    assert_eq!(cancelled.status, RequestStatus::Cancelled);
    assert_eq!(ctx.balance().await, Minutes::ZERO);
    // The movement stays for audit.
    let movements = ctx.store().movements(ctx.organization_id, ctx.employee_id);
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].status, MovementStatus::Cancelled);
}

#[tokio::test]
async fn reviews_apply_only_to_pending_requests() {
    let ctx = TestContext::new(base_settings());
    let request = file_request(&ctx, RequestKind::Recovery, 30).await;
    ctx.engine
        .reject_request(
            ctx.organization_id,
            request.id,
            ctx.approver_id,
            ReviewRequestInput::default(),
        )
        .await
        .unwrap();

    let approve = ctx
        .engine
        .approve_request(
            ctx.organization_id,
            request.id,
            ctx.approver_id,
            ReviewRequestInput::default(),
        )
        .await;
    assert!(matches!(approve, Err(AppError::Conflict(_))));

    let cancel = ctx
        .engine
        .cancel_request(ctx.organization_id, request.id, ctx.employee_id)
        .await;
    assert!(matches!(cancel, Err(AppError::Conflict(_))));

    let foreign = ctx
        .engine
        .cancel_request(Uuid::new_v4(), request.id, ctx.employee_id)
        .await;
    assert!(matches!(foreign, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn adjustments_need_an_amount_and_a_reason() {
    let ctx = TestContext::new(base_settings());

    let zero = ctx
        .engine
        .adjust_balance(
            ctx.organization_id,
            ctx.employee_id,
            ctx.approver_id,
            adjustment(0, "Carry-over"),
        )
        .await;
    assert!(matches!(zero, Err(AppError::BadRequest(_))));

    let blank = ctx
        .engine
        .adjust_balance(
            ctx.organization_id,
            ctx.employee_id,
            ctx.approver_id,
            adjustment(30, "   "),
        )
        .await;
    assert!(matches!(blank, Err(AppError::BadRequest(_))));
    assert_eq!(ctx.balance().await, Minutes::ZERO);
}

#[tokio::test]
async fn adjustments_are_clamped_like_any_other_write() {
    let ctx = TestContext::new(capped_settings(60, 30));

    let first = ctx
        .engine
        .adjust_balance(
            ctx.organization_id,
            ctx.employee_id,
            ctx.approver_id,
            adjustment(100, "Carry-over from the old system"),
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(first.minutes, Minutes(60));
    assert_eq!(first.movement_type, MovementType::Adjustment);
    assert_eq!(first.created_by, Some(ctx.approver_id));
    let metadata = first.metadata.unwrap();
    assert_eq!(metadata["clampedByLimit"], true);
    assert_eq!(metadata["attemptedMinutes"], 100);
    assert_eq!(metadata["appliedMinutes"], 60);

    // Already at the cap: the whole amount is absorbed.
    let second = ctx
        .engine
        .adjust_balance(
            ctx.organization_id,
            ctx.employee_id,
            ctx.approver_id,
            adjustment(10, "Bonus"),
        )
        .await
        .unwrap();
    assert!(second.is_none());
    assert_eq!(ctx.balance().await, Minutes(60));
}

#[tokio::test]
async fn balance_summary_reports_headroom_on_both_sides() {
    let ctx = TestContext::new(capped_settings(600, 300));
    ctx.engine
        .adjust_balance(
            ctx.organization_id,
            ctx.employee_id,
            ctx.approver_id,
            adjustment(100, "Carry-over"),
        )
        .await
        .unwrap();

    let summary = ctx
        .engine
        .balance_summary(ctx.organization_id, ctx.employee_id)
        .await
        .unwrap();

    assert_eq!(summary.balance_minutes, Minutes(100));
    assert_eq!(summary.max_positive_minutes, Minutes(600));
    assert_eq!(summary.max_negative_minutes, Minutes(300));
    assert_eq!(summary.credit_headroom_minutes, Minutes(500));
    assert_eq!(summary.debit_headroom_minutes, Minutes(400));
    assert!(summary.pending_authorizations.is_empty());
    assert_eq!(summary.recent_movements.len(), 1);
}
