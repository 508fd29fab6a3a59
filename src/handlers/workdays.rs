use actix_web::{HttpResponse, Result, web};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    AppState,
    handlers::{
        identity::CallerIdentity,
        shared::{ApiResponse, EnqueuedJob},
    },
    jobs::{Job, WorkdayOvertimeJob},
    services::{Notifier, OvertimeStore, WorkforceDirectory},
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecalculateInput {
    pub employee_id: Uuid,
    pub date: NaiveDate,
}

/// Queue a recomputation of one employee/day. Repeated calls before the job
/// starts collapse into one run.
pub async fn recalculate<S, D, N>(
    caller: CallerIdentity,
    input: web::Json<RecalculateInput>,
    state: web::Data<AppState<S, D, N>>,
) -> Result<HttpResponse>
where
    S: OvertimeStore + 'static,
    D: WorkforceDirectory + 'static,
    N: Notifier + 'static,
{
    let input = input.into_inner();
    let job = Job::WorkdayOvertime(WorkdayOvertimeJob {
        organization_id: caller.organization_id,
        employee_id: input.employee_id,
        date: input.date,
    });
    let key = job.singleton_key();
    let name = job.name().to_string();
    let queued = state.queue.enqueue(job).await;

    log::info!(
        "Recalculation of {} requested by {} (queued: {})",
        key,
        caller.user_id,
        queued
    );

    Ok(HttpResponse::Accepted().json(ApiResponse::success(EnqueuedJob {
        job: name,
        key,
        queued,
    })))
}
