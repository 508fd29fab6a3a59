use std::sync::Arc;

pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod routes;
pub mod services;

pub use config::Config;
pub use jobs::JobQueue;
pub use services::OvertimeEngine;

/// Shared by every request handler.
pub struct AppState<S, D, N> {
    pub engine: Arc<OvertimeEngine<S, D, N>>,
    pub queue: JobQueue,
}
