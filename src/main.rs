use std::sync::Arc;

use actix_web::{App, HttpServer, middleware::Logger, web};
use anyhow::Result;
use tokio::sync::watch;

use timebank::database::{
    init_database,
    repositories::{PgNotifier, PgOvertimeStore, PgWorkforceDirectory},
};
use timebank::jobs::{self, JobQueue, QueueSettings, SchedulerSettings};
use timebank::{AppState, Config, OvertimeEngine, routes};

type Store = PgOvertimeStore;
type Directory = PgWorkforceDirectory;
type Outbox = PgNotifier;

#[actix_web::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config = Config::from_env()?;
    log::info!(
        "Starting time-bank service (environment: {})",
        config.environment
    );

    let pool = init_database(&config.database_url, config.database_max_connections).await?;
    log::info!("Database initialized");

    let engine = Arc::new(OvertimeEngine::new(
        Store::new(pool.clone()),
        Directory::new(pool.clone()),
        Outbox::new(pool),
    ));

    let (queue, receivers) = JobQueue::new(QueueSettings::from(&config));
    let workers = jobs::start_workers(engine.clone(), queue.clone(), receivers);
    log::info!("Started {} job workers", workers.len());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = tokio::spawn(jobs::run_scheduler(
        engine.clone(),
        queue.clone(),
        SchedulerSettings::from(&config),
        shutdown_rx,
    ));

    let state = web::Data::new(AppState { engine, queue });
    let server_address = config.server_address();
    log::info!("Server starting on http://{}", server_address);

    let served = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Logger::new(r#"%a "%r" %s %b %T"#))
            .configure(routes::configure::<Store, Directory, Outbox>)
    })
    .bind(&server_address)?
    .run()
    .await;

    let _ = shutdown_tx.send(true);
    if let Err(e) = scheduler.await {
        log::error!("Scheduler task ended abnormally: {}", e);
    }

    served.map_err(|e| anyhow::anyhow!("Server error: {}", e))
}
