use hanger_orders_api::api::{router, AppState};
use hanger_orders_api::auth::SupabaseAuthClient;
use hanger_orders_api::cache::{Backoff, CacheClient};
use hanger_orders_api::config::Config;
use hanger_orders_api::db::{Database, MigrationRunner};

use std::sync::Arc;
use tokio::signal;
use tracing::{debug, error, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before anything reads the environment
    let dotenv = dotenvy::dotenv();

    let log_dir = std::env::var("LOG_DIR").unwrap_or_else(|_| "./logs".to_string());
    std::fs::create_dir_all(&log_dir).unwrap_or_else(|e| {
        eprintln!("Warning: Could not create log directory {}: {}", log_dir, e);
    });

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "hanger-orders-api.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,hanger_orders_api=debug")),
        )
        .with(fmt::layer().with_target(true))
        // JSON file output
        .with(
            fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .json()
                .with_writer(non_blocking),
        )
        .init();

    debug!("Logging initialized - log directory: {}", log_dir);
    if let Err(e) = dotenv {
        warn!("No .env file found or error loading it: {}", e);
    }

    let config = Config::from_env()?;
    let socket_addr = config.socket_addr()?;

    info!("Starting Hanger Orders API v{}", env!("CARGO_PKG_VERSION"));
    info!("Max DB connections: {}", config.max_db_connections);
    info!("Cache TTL: {}s", config.cache_ttl.as_secs());

    let db = Database::connect(&config).await?;

    if config.run_migrations {
        let applied = MigrationRunner::new(&config.migrations_dir).run(&db).await?;
        info!("Migrations up to date ({} applied now)", applied);
    }

    let cache = CacheClient::from_url(
        config.redis_url.as_deref(),
        Backoff::new(config.cache_max_retries),
    );
    let auth = Arc::new(SupabaseAuthClient::new(
        &config.supabase_url,
        &config.supabase_anon_key,
    )?);

    let state = AppState::from_database(db, auth, cache, config.cache_ttl);
    let app = router(state, &config.cors_origins);

    let listener = tokio::net::TcpListener::bind(&socket_addr).await?;
    info!("Server listening on {}", socket_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Received shutdown signal");
}
