use actix_web::{App, http::StatusCode, test, web};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio::sync::mpsc::UnboundedReceiver;

use timebank::database::memory::{InMemoryDirectory, InMemoryStore};
use timebank::database::models::{AuthorizationStatus, Minutes};
use timebank::handlers::identity::{ORGANIZATION_HEADER, USER_HEADER};
use timebank::jobs::{QueueSettings, queue::QueuedJob};
use timebank::services::RecordingNotifier;
use timebank::{AppState, Config, JobQueue, routes};

mod common;

use common::{TestContext, approval_settings, base_settings, date};

type MemoryState = AppState<InMemoryStore, InMemoryDirectory, RecordingNotifier>;

/// App state without workers: enqueued jobs stay pending. The receivers are
/// returned so the queue keeps accepting jobs.
fn app_state(
    ctx: &TestContext,
) -> (web::Data<MemoryState>, Vec<UnboundedReceiver<QueuedJob>>) {
    let (queue, receivers) = JobQueue::new(QueueSettings::from(&Config::test_config()));
    let state = web::Data::new(AppState {
        engine: ctx.engine.clone(),
        queue,
    });
    (state, receivers)
}

fn caller_headers(
    req: test::TestRequest,
    ctx: &TestContext,
    user_id: uuid::Uuid,
) -> test::TestRequest {
    req.insert_header((ORGANIZATION_HEADER, ctx.organization_id.to_string()))
        .insert_header((USER_HEADER, user_id.to_string()))
}

#[actix_web::test]
async fn test_health_endpoint() {
    let ctx = TestContext::new(base_settings());
    let (state, _receivers) = app_state(&ctx);
    let app = test::init_service(
        App::new()
            .app_data(state)
            .configure(routes::configure::<InMemoryStore, InMemoryDirectory, RecordingNotifier>),
    )
    .await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "ok");
}

#[actix_web::test]
async fn test_requests_without_caller_headers_are_unauthorized() {
    let ctx = TestContext::new(base_settings());
    let (state, _receivers) = app_state(&ctx);
    let app = test::init_service(
        App::new()
            .app_data(state)
            .configure(routes::configure::<InMemoryStore, InMemoryDirectory, RecordingNotifier>),
    )
    .await;

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/time-bank/{}", ctx.employee_id))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/time-bank/{}", ctx.employee_id))
        .insert_header((ORGANIZATION_HEADER, "not-a-uuid"))
        .insert_header((USER_HEADER, ctx.approver_id.to_string()))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_recalculate_merges_repeated_triggers() {
    let ctx = TestContext::new(base_settings());
    let (state, _receivers) = app_state(&ctx);
    let app = test::init_service(
        App::new()
            .app_data(state)
            .configure(routes::configure::<InMemoryStore, InMemoryDirectory, RecordingNotifier>),
    )
    .await;

    let payload = json!({
        "employeeId": ctx.employee_id,
        "date": "2025-03-12"
    });

    let req = caller_headers(
        test::TestRequest::post().uri("/api/v1/workdays/recalculate"),
        &ctx,
        ctx.approver_id,
    )
    .set_json(&payload)
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["queued"], true);
    let key = body["data"]["key"].as_str().unwrap().to_string();
    assert!(key.contains(&ctx.employee_id.to_string()));

    let req = caller_headers(
        test::TestRequest::post().uri("/api/v1/workdays/recalculate"),
        &ctx,
        ctx.approver_id,
    )
    .set_json(&payload)
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["queued"], false);
    assert_eq!(body["data"]["key"], key.as_str());
}

#[actix_web::test]
async fn test_get_balance_endpoint() {
    let ctx = TestContext::new(base_settings());
    let day = date(2025, 3, 12);
    ctx.record_day(day, 540, Some(480));
    ctx.recompute(day).await;

    let (state, _receivers) = app_state(&ctx);
    let app = test::init_service(
        App::new()
            .app_data(state)
            .configure(routes::configure::<InMemoryStore, InMemoryDirectory, RecordingNotifier>),
    )
    .await;

    let req = caller_headers(
        test::TestRequest::get().uri(&format!("/api/v1/time-bank/{}", ctx.employee_id)),
        &ctx,
        ctx.employee_id,
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["balanceMinutes"], 60);
    assert_eq!(body["data"]["recentMovements"].as_array().unwrap().len(), 1);
}

#[actix_web::test]
async fn test_approve_authorization_endpoint() {
    let ctx = TestContext::new(approval_settings());
    let day = date(2025, 3, 12);
    ctx.record_day(day, 540, Some(480));
    ctx.recompute(day).await;
    assert_eq!(ctx.balance().await, Minutes::ZERO);
    let authorization = ctx.store().authorizations(ctx.organization_id, ctx.employee_id)[0].clone();

    let (state, _receivers) = app_state(&ctx);
    let app = test::init_service(
        App::new()
            .app_data(state)
            .configure(routes::configure::<InMemoryStore, InMemoryDirectory, RecordingNotifier>),
    )
    .await;

    let req = caller_headers(
        test::TestRequest::get().uri(&format!(
            "/api/v1/overtime/authorizations?employeeId={}",
            ctx.employee_id
        )),
        &ctx,
        ctx.approver_id,
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let req = caller_headers(
        test::TestRequest::post().uri(&format!(
            "/api/v1/overtime/authorizations/{}/approve",
            authorization.id
        )),
        &ctx,
        ctx.approver_id,
    )
    .set_json(json!({ "notes": "Release crunch" }))
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Overwork authorization approved");
    assert_eq!(ctx.balance().await, Minutes(60));

    // A second decision is a conflict.
    let req = caller_headers(
        test::TestRequest::post().uri(&format!(
            "/api/v1/overtime/authorizations/{}/approve",
            authorization.id
        )),
        &ctx,
        ctx.approver_id,
    )
    .set_json(json!({}))
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let stored = ctx.store().authorizations(ctx.organization_id, ctx.employee_id)[0].clone();
    assert_eq!(stored.status, AuthorizationStatus::Approved);
}

#[actix_web::test]
async fn test_reconcile_requires_a_monday() {
    let ctx = TestContext::new(base_settings());
    let (state, _receivers) = app_state(&ctx);
    let app = test::init_service(
        App::new()
            .app_data(state)
            .configure(routes::configure::<InMemoryStore, InMemoryDirectory, RecordingNotifier>),
    )
    .await;

    let req = caller_headers(
        test::TestRequest::post().uri("/api/v1/overtime/reconcile"),
        &ctx,
        ctx.approver_id,
    )
    .set_json(json!({ "weekStart": "2025-03-12" }))
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = caller_headers(
        test::TestRequest::post().uri("/api/v1/overtime/reconcile"),
        &ctx,
        ctx.approver_id,
    )
    .set_json(json!({ "weekStart": "2025-03-10" }))
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::ACCEPTED);
}

#[actix_web::test]
async fn test_time_bank_request_lifecycle_over_http() {
    let ctx = TestContext::new(base_settings());
    let (state, _receivers) = app_state(&ctx);
    let app = test::init_service(
        App::new()
            .app_data(state)
            .configure(routes::configure::<InMemoryStore, InMemoryDirectory, RecordingNotifier>),
    )
    .await;

    let req = caller_headers(
        test::TestRequest::post().uri("/api/v1/time-bank/requests"),
        &ctx,
        ctx.employee_id,
    )
    .set_json(json!({
        "employeeId": ctx.employee_id,
        "kind": "FESTIVE",
        "minutes": 120,
        "date": "2025-03-14"
    }))
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["status"], "PENDING");
    let request_id = body["data"]["id"].as_str().unwrap().to_string();

    // No body: review notes are optional.
    let req = caller_headers(
        test::TestRequest::post().uri(&format!("/api/v1/time-bank/requests/{}/approve", request_id)),
        &ctx,
        ctx.approver_id,
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(ctx.balance().await, Minutes(120));

    let req = caller_headers(
        test::TestRequest::post().uri(&format!("/api/v1/time-bank/requests/{}/cancel", request_id)),
        &ctx,
        ctx.employee_id,
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["status"], "CANCELLED");
    assert_eq!(ctx.balance().await, Minutes::ZERO);
}

#[actix_web::test]
async fn test_dead_letters_start_empty() {
    let ctx = TestContext::new(base_settings());
    let (state, _receivers) = app_state(&ctx);
    let app = test::init_service(
        App::new()
            .app_data(state)
            .configure(routes::configure::<InMemoryStore, InMemoryDirectory, RecordingNotifier>),
    )
    .await;

    let req = caller_headers(
        test::TestRequest::get().uri("/api/v1/jobs/dead-letters"),
        &ctx,
        ctx.approver_id,
    )
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = test::read_body_json(resp).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}
