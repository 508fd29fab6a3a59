use actix_web::{HttpResponse, Result, web};
use uuid::Uuid;

use crate::{
    AppState,
    database::models::{BalanceAdjustmentInput, CreateTimeBankRequestInput, ReviewRequestInput},
    handlers::{identity::CallerIdentity, shared::ApiResponse},
    services::{Notifier, OvertimeStore, WorkforceDirectory},
};

/// Balance, caps, headroom, pending authorizations and recent movements.
pub async fn get_balance<S, D, N>(
    path: web::Path<Uuid>,
    caller: CallerIdentity,
    state: web::Data<AppState<S, D, N>>,
) -> Result<HttpResponse>
where
    S: OvertimeStore + 'static,
    D: WorkforceDirectory + 'static,
    N: Notifier + 'static,
{
    let balance = state
        .engine
        .balance_summary(caller.organization_id, path.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(balance)))
}

pub async fn adjust_balance<S, D, N>(
    path: web::Path<Uuid>,
    caller: CallerIdentity,
    input: web::Json<BalanceAdjustmentInput>,
    state: web::Data<AppState<S, D, N>>,
) -> Result<HttpResponse>
where
    S: OvertimeStore + 'static,
    D: WorkforceDirectory + 'static,
    N: Notifier + 'static,
{
    let movement = state
        .engine
        .adjust_balance(
            caller.organization_id,
            path.into_inner(),
            caller.user_id,
            input.into_inner(),
        )
        .await?;

    let message = if movement.is_some() {
        "Balance adjusted"
    } else {
        "Adjustment fully absorbed by the balance limits"
    };
    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(movement, message)))
}

pub async fn create_request<S, D, N>(
    caller: CallerIdentity,
    input: web::Json<CreateTimeBankRequestInput>,
    state: web::Data<AppState<S, D, N>>,
) -> Result<HttpResponse>
where
    S: OvertimeStore + 'static,
    D: WorkforceDirectory + 'static,
    N: Notifier + 'static,
{
    let request = state
        .engine
        .create_request(caller.organization_id, input.into_inner())
        .await?;

    Ok(HttpResponse::Created().json(ApiResponse::success(request)))
}

pub async fn approve_request<S, D, N>(
    path: web::Path<Uuid>,
    caller: CallerIdentity,
    input: Option<web::Json<ReviewRequestInput>>,
    state: web::Data<AppState<S, D, N>>,
) -> Result<HttpResponse>
where
    S: OvertimeStore + 'static,
    D: WorkforceDirectory + 'static,
    N: Notifier + 'static,
{
    let request = state
        .engine
        .approve_request(
            caller.organization_id,
            path.into_inner(),
            caller.user_id,
            input.map(|i| i.into_inner()).unwrap_or_default(),
        )
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(request)))
}

pub async fn reject_request<S, D, N>(
    path: web::Path<Uuid>,
    caller: CallerIdentity,
    input: Option<web::Json<ReviewRequestInput>>,
    state: web::Data<AppState<S, D, N>>,
) -> Result<HttpResponse>
where
    S: OvertimeStore + 'static,
    D: WorkforceDirectory + 'static,
    N: Notifier + 'static,
{
    let request = state
        .engine
        .reject_request(
            caller.organization_id,
            path.into_inner(),
            caller.user_id,
            input.map(|i| i.into_inner()).unwrap_or_default(),
        )
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(request)))
}

pub async fn cancel_request<S, D, N>(
    path: web::Path<Uuid>,
    caller: CallerIdentity,
    state: web::Data<AppState<S, D, N>>,
) -> Result<HttpResponse>
where
    S: OvertimeStore + 'static,
    D: WorkforceDirectory + 'static,
    N: Notifier + 'static,
{
    let request = state
        .engine
        .cancel_request(caller.organization_id, path.into_inner(), caller.user_id)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(request)))
}
