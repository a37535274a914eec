//! # scripthubd — scripthub daemon
//!
//! Composition root that wires all adapters together and starts the server.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars)
//! - Initialize the `SQLite` connection pool and run migrations
//! - Construct the adapters: schedule store, script catalog, controller
//! - Restore the persisted schedules; a broken collection is fatal
//! - Run the scheduler loop and start the controller feed
//! - Build the axum router and serve until SIGTERM/SIGINT
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use scripthub_adapter_http_axum::router;
use scripthub_adapter_http_axum::state::AppState;
use scripthub_adapter_storage_sqlite_sqlx::SqliteScheduleStore;
use scripthub_adapter_virtual::VirtualController;
use scripthub_app::ports::ControllerFeed;
use scripthub_app::scheduler::Scheduler;
use scripthub_app::services::manual_run_service::ManualRunService;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    init_tracing(&config.logging.filter);

    // Adapters
    let db = scripthub_adapter_storage_sqlite_sqlx::Config {
        database_url: config.database_url().to_string(),
    }
    .build()
    .await
    .context("failed to open database")?;
    let store = SqliteScheduleStore::new(db.pool().clone());
    let scripts = config.script_catalog();
    let controller = VirtualController::new(config.virtual_config());
    tracing::info!(dir = %scripts.dir().display(), "using script directory");

    // Scheduler
    let scheduler = Arc::new(Scheduler::new(
        store,
        scripts.clone(),
        controller.clone(),
        config.scheduler_config(),
    ));
    scheduler
        .load()
        .await
        .inspect_err(|err| tracing::error!(error = ?err, "failed to load schedules"))
        .context("failed to load schedules")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler_task = tokio::spawn({
        let scheduler = Arc::clone(&scheduler);
        async move { scheduler.run(shutdown_rx).await }
    });
    controller
        .start(scheduler.sink())
        .await
        .context("failed to start controller feed")?;

    // HTTP
    let state = AppState::new(
        Arc::clone(&scheduler),
        ManualRunService::new(scripts.clone()),
        scripts,
        controller,
    );
    let app = router::build(state);

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!(%bind_addr, "scripthubd listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    shutdown_tx.send_replace(true);
    if let Err(err) = scheduler_task.await {
        tracing::warn!(error = %err, "scheduler task ended abnormally");
    }
    tracing::info!("scripthubd stopped");
    Ok(())
}

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|err| {
        eprintln!("invalid log filter {filter:?}: {err}, falling back to info");
        EnvFilter::new("info")
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received ctrl-c, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
