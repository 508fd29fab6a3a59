use actix_web::web;

use crate::handlers::{health, overtime, time_bank, workdays};
use crate::services::{Notifier, OvertimeStore, WorkforceDirectory};

/// Mount every route. Generic over the engine's collaborators so tests can
/// serve the same surface over the in-memory implementations.
pub fn configure<S, D, N>(cfg: &mut web::ServiceConfig)
where
    S: OvertimeStore + 'static,
    D: WorkforceDirectory + 'static,
    N: Notifier + 'static,
{
    cfg.service(health::health).service(
        web::scope("/api/v1")
            .service(
                web::scope("/workdays")
                    .route("/recalculate", web::post().to(workdays::recalculate::<S, D, N>)),
            )
            .service(
                web::scope("/overtime")
                    .route(
                        "/authorizations",
                        web::get().to(overtime::list_pending_authorizations::<S, D, N>),
                    )
                    .route(
                        "/authorizations/{id}/approve",
                        web::post().to(overtime::approve_authorization::<S, D, N>),
                    )
                    .route(
                        "/authorizations/{id}/reject",
                        web::post().to(overtime::reject_authorization::<S, D, N>),
                    )
                    .route("/reconcile", web::post().to(overtime::reconcile::<S, D, N>)),
            )
            .service(
                web::scope("/time-bank")
                    .route("/requests", web::post().to(time_bank::create_request::<S, D, N>))
                    .route(
                        "/requests/{id}/approve",
                        web::post().to(time_bank::approve_request::<S, D, N>),
                    )
                    .route(
                        "/requests/{id}/reject",
                        web::post().to(time_bank::reject_request::<S, D, N>),
                    )
                    .route(
                        "/requests/{id}/cancel",
                        web::post().to(time_bank::cancel_request::<S, D, N>),
                    )
                    .route("/{employee_id}", web::get().to(time_bank::get_balance::<S, D, N>))
                    .route(
                        "/{employee_id}/adjust",
                        web::post().to(time_bank::adjust_balance::<S, D, N>),
                    ),
            )
            .service(
                web::scope("/jobs")
                    .route("/dead-letters", web::get().to(overtime::dead_letters::<S, D, N>)),
            ),
    );
}
