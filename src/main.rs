//! statusboard status collection service.
//!
//! Main entry point. Loads configuration, selects the table store backend,
//! and serves status reports until a shutdown signal arrives.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use statusboard_api::{start_server, AppState, Config, StorageBackend};
use statusboard_core::{MemoryTableStore, PgTableStore, TableStore};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;

    init_tracing(&config.rust_log);

    info!("Starting statusboard");
    info!(
        storage_backend = ?config.storage_backend,
        table = %config.table_name,
        token_check = config.secret_provider().is_enabled(),
        max_payload_bytes = config.max_payload_bytes,
        "Configuration loaded"
    );

    let addr = config.parse_server_addr()?;
    let secrets = Arc::new(config.secret_provider());

    match config.storage_backend {
        StorageBackend::Postgres => {
            info!(database_url = %config.database_url_masked(), "Using PostgreSQL table store");

            let pool = create_database_pool(&config).await?;
            let store = PgTableStore::new(pool.clone());
            store.ensure_schema().await.context("Failed to create table store schema")?;
            info!("Table store schema ready");

            let state = AppState::from_config(&config, Arc::new(store), secrets);
            serve(state, addr).await?;

            pool.close().await;
            info!("Database connections closed");
        },
        StorageBackend::Memory => {
            warn!("Using in-memory table store; rows are lost on shutdown");

            let store: Arc<dyn TableStore> = Arc::new(MemoryTableStore::new());
            let state = AppState::from_config(&config, store, secrets);
            serve(state, addr).await?;
        },
    }

    info!("statusboard shutdown complete");
    Ok(())
}

async fn serve(state: AppState, addr: std::net::SocketAddr) -> Result<()> {
    info!(%addr, "statusboard is ready to receive status reports");
    start_server(state, addr).await.context("HTTP server failed")
}

/// Initializes tracing, preferring `RUST_LOG` from the environment.
fn init_tracing(default_filter: &str) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info,statusboard=debug,tower_http=debug"));

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
}

/// Creates the database connection pool with retry logic.
async fn create_database_pool(config: &Config) -> Result<sqlx::PgPool> {
    const MAX_RETRIES: u32 = 5;
    const RETRY_DELAY: Duration = Duration::from_secs(2);

    let mut retries = 0;

    loop {
        match PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connection_timeout))
            .connect(&config.database_url)
            .await
        {
            Ok(pool) => {
                sqlx::query("SELECT 1")
                    .execute(&pool)
                    .await
                    .context("Failed to verify database connection")?;

                info!("Database connection pool established");
                return Ok(pool);
            },
            Err(e) if retries < MAX_RETRIES => {
                retries += 1;
                warn!(
                    attempt = retries,
                    max_retries = MAX_RETRIES,
                    error = %e,
                    "Database connection failed, retrying..."
                );
                tokio::time::sleep(RETRY_DELAY).await;
            },
            Err(e) => {
                return Err(e).context("Failed to create database connection pool after retries");
            },
        }
    }
}
