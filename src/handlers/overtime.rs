use actix_web::{HttpResponse, Result, web};
use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    AppState,
    database::models::{ApproveAuthorizationInput, RejectAuthorizationInput},
    error::AppError,
    handlers::{
        identity::CallerIdentity,
        shared::{ApiResponse, EnqueuedJob},
    },
    jobs::{Job, WeeklyReconciliationJob},
    services::{Notifier, OvertimeStore, WorkforceDirectory},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingQuery {
    pub employee_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileInput {
    pub week_start: NaiveDate,
}

pub async fn list_pending_authorizations<S, D, N>(
    caller: CallerIdentity,
    query: web::Query<PendingQuery>,
    state: web::Data<AppState<S, D, N>>,
) -> Result<HttpResponse>
where
    S: OvertimeStore + 'static,
    D: WorkforceDirectory + 'static,
    N: Notifier + 'static,
{
    let pending = state
        .engine
        .store()
        .list_pending_authorizations(caller.organization_id, query.employee_id, None)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success(pending)))
}

pub async fn approve_authorization<S, D, N>(
    path: web::Path<Uuid>,
    caller: CallerIdentity,
    input: web::Json<ApproveAuthorizationInput>,
    state: web::Data<AppState<S, D, N>>,
) -> Result<HttpResponse>
where
    S: OvertimeStore + 'static,
    D: WorkforceDirectory + 'static,
    N: Notifier + 'static,
{
    let authorization = state
        .engine
        .approve_authorization(
            caller.organization_id,
            path.into_inner(),
            caller.user_id,
            input.into_inner(),
        )
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        authorization,
        "Overwork authorization approved",
    )))
}

pub async fn reject_authorization<S, D, N>(
    path: web::Path<Uuid>,
    caller: CallerIdentity,
    input: web::Json<RejectAuthorizationInput>,
    state: web::Data<AppState<S, D, N>>,
) -> Result<HttpResponse>
where
    S: OvertimeStore + 'static,
    D: WorkforceDirectory + 'static,
    N: Notifier + 'static,
{
    let authorization = state
        .engine
        .reject_authorization(
            caller.organization_id,
            path.into_inner(),
            caller.user_id,
            input.into_inner(),
        )
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
        authorization,
        "Overwork authorization rejected",
    )))
}

/// Queue the weekly reconciliation of the week starting on `weekStart`.
pub async fn reconcile<S, D, N>(
    caller: CallerIdentity,
    input: web::Json<ReconcileInput>,
    state: web::Data<AppState<S, D, N>>,
) -> Result<HttpResponse>
where
    S: OvertimeStore + 'static,
    D: WorkforceDirectory + 'static,
    N: Notifier + 'static,
{
    let week_start = input.week_start;
    if week_start.weekday() != chrono::Weekday::Mon {
        return Err(AppError::BadRequest(format!("{} is not a Monday", week_start)).into());
    }

    let job = Job::WeeklyReconciliation(WeeklyReconciliationJob {
        organization_id: caller.organization_id,
        week_start,
    });
    let key = job.singleton_key();
    let name = job.name().to_string();
    let queued = state.queue.enqueue(job).await;

    Ok(HttpResponse::Accepted().json(ApiResponse::success(EnqueuedJob {
        job: name,
        key,
        queued,
    })))
}

/// Jobs of the caller's organization that used up their retries.
pub async fn dead_letters<S, D, N>(
    caller: CallerIdentity,
    state: web::Data<AppState<S, D, N>>,
) -> Result<HttpResponse>
where
    S: OvertimeStore + 'static,
    D: WorkforceDirectory + 'static,
    N: Notifier + 'static,
{
    let letters: Vec<_> = state
        .queue
        .dead_letters()
        .into_iter()
        .filter(|letter| letter.job.organization_id() == caller.organization_id)
        .collect();

    Ok(HttpResponse::Ok().json(ApiResponse::success(letters)))
}
