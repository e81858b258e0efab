use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use timeclock_assistant::{AlertDispatcher, ConversationRouter, Stores};
use timeclock_core::calendar::WallClock;
use timeclock_core::config::{AppConfig, ConfigError, LoadOptions};
use timeclock_db::{connect_with_config, migrations, DbPool};
use timeclock_gateway::events::{conversation_dispatcher, EventDispatcher};
use timeclock_gateway::messenger::{messenger_from_config, GatewayError};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub clock: WallClock,
    pub dispatcher: Arc<EventDispatcher>,
    pub alerts: AlertDispatcher,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("gateway client setup failed: {0}")]
    Gateway(#[from] GatewayError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    let clock = config.attendance.wall_clock()?;

    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let messenger = messenger_from_config(&config.gateway)?;
    info!(
        event_name = "system.bootstrap.gateway",
        correlation_id = "bootstrap",
        delivery = if config.gateway.api_base_url.is_some() { "http" } else { "log_only" },
        "outbound messenger initialized"
    );

    let stores = Stores::sql(db_pool.clone(), messenger);
    let router = Arc::new(ConversationRouter::new(stores.clone(), clock));

    Ok(Application {
        config,
        db_pool,
        clock,
        dispatcher: Arc::new(conversation_dispatcher(router)),
        alerts: AlertDispatcher::new(stores),
    })
}

#[cfg(test)]
mod tests {
    use timeclock_core::config::{ConfigOverrides, LoadOptions};

    use crate::bootstrap::bootstrap;

    #[tokio::test]
    async fn bootstrap_fails_fast_when_gateway_token_is_missing() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                gateway_api_base_url: Some("https://gateway.example.com".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        let message = result.err().expect("error").to_string();
        assert!(message.contains("gateway.channel_token"), "{message}");
    }

    #[tokio::test]
    async fn bootstrap_applies_migrations_and_wires_handlers() {
        let app = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:?cache=shared".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await
        .expect("bootstrap should succeed with defaults");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('app_user', 'attendance', 'chat_session')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("expected baseline tables after bootstrap");
        assert_eq!(table_count, 3);
        assert_eq!(app.dispatcher.handler_count(), 2);

        app.db_pool.close().await;
    }
}
