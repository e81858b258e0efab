mod bootstrap;
mod callback;
mod health;
mod scheduler;

use std::time::Duration;

use anyhow::Result;
use axum::Router;
use tokio::sync::oneshot;

use timeclock_core::config::{AppConfig, LoadOptions};

use crate::bootstrap::Application;
use crate::scheduler::AlertScheduler;

fn init_logging(config: &AppConfig) {
    use timeclock_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

fn app(application: &Application) -> Router {
    health::router(
        application.db_pool.clone(),
        application.clock,
        application.config.scheduler.enabled,
    )
    .merge(callback::router(application.dispatcher.clone()))
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let application = bootstrap::bootstrap_with_config(config).await?;
    let server = &application.config.server;

    let scheduler = if application.config.scheduler.enabled {
        let tick = Duration::from_secs(application.config.scheduler.tick_secs);
        Some(AlertScheduler::new(application.alerts.clone(), application.clock).spawn(tick))
    } else {
        tracing::info!(
            event_name = "system.scheduler.disabled",
            correlation_id = "bootstrap",
            "alert scheduler disabled by configuration"
        );
        None
    };

    let address = format!("{}:{}", server.bind_address, server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let routes = app(&application);
    let serve = tokio::spawn(async move {
        axum::serve(listener, routes)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.await;
            })
            .await
    });

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        "timeclock-server started"
    );
    wait_for_shutdown().await?;
    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "timeclock-server stopping"
    );

    if let Some(scheduler) = scheduler {
        scheduler.abort();
    }
    let _ = shutdown_tx.send(());
    let grace = Duration::from_secs(server.graceful_shutdown_secs);
    match tokio::time::timeout(grace, serve).await {
        Ok(joined) => joined??,
        Err(_) => tracing::warn!(
            event_name = "system.server.shutdown_timeout",
            correlation_id = "shutdown",
            grace_secs = grace.as_secs(),
            "in-flight requests did not finish before the grace period"
        ),
    }

    application.db_pool.close().await;
    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
