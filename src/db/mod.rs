//! Postgres access for the managed database.
//!
//! One [`Database`] handle wraps a `deadpool-postgres` pool and implements
//! every store trait the handlers depend on.

mod customers;
mod migrations;
mod notifications;
mod orders;
mod quotas;

pub use migrations::{MigrationFile, MigrationRunner};

use crate::config::Config;
use crate::error::{ApiError, Result};
use crate::store::HealthProbe;
use async_trait::async_trait;
use deadpool_postgres::{Config as PoolConfig, Object, Pool, Runtime};
use std::time::Duration;
use tokio_postgres::NoTls;
use tracing::{info, warn};

#[derive(Clone)]
pub struct Database {
    pool: Pool,
}

impl Database {
    /// Build the pool and verify the database answers
    pub async fn connect(config: &Config) -> Result<Self> {
        Self::connect_url(&config.database_url, config.max_db_connections).await
    }

    pub async fn connect_url(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = create_pool(database_url, max_connections)?;

        let client = pool.get().await.map_err(|e| ApiError::ConnectionFailed {
            cause: e.to_string(),
        })?;

        // Simple ping query
        client
            .execute("SELECT 1", &[])
            .await
            .map_err(|e| ApiError::ConnectionFailed {
                cause: format!("Ping failed: {}", e),
            })?;

        info!("Connected to PostgreSQL (max {} connections)", max_connections);

        Ok(Self { pool })
    }

    async fn client(&self) -> Result<Object> {
        self.pool.get().await.map_err(|e| ApiError::ConnectionFailed {
            cause: e.to_string(),
        })
    }
}

#[async_trait]
impl HealthProbe for Database {
    async fn ping(&self) -> bool {
        match self.pool.get().await {
            Ok(client) => client.execute("SELECT 1", &[]).await.is_ok(),
            Err(e) => {
                warn!("Health check could not get a connection: {}", e);
                false
            }
        }
    }
}

fn create_pool(database_url: &str, max_size: u32) -> Result<Pool> {
    let mut cfg = PoolConfig::new();
    cfg.url = Some(database_url.to_string());

    cfg.pool = Some(deadpool_postgres::PoolConfig {
        max_size: max_size as usize,
        timeouts: deadpool_postgres::Timeouts {
            wait: Some(Duration::from_secs(5)),
            create: Some(Duration::from_secs(5)),
            recycle: Some(Duration::from_secs(5)),
        },
        ..Default::default()
    });

    cfg.create_pool(Some(Runtime::Tokio1), NoTls)
        .map_err(|e| ApiError::Internal(format!("Failed to create pool: {}", e)))
}

/// Map a query error to a 500 naming the failed operation
fn query_failed(operation: &'static str) -> impl Fn(tokio_postgres::Error) -> ApiError {
    move |e| ApiError::Database {
        operation,
        cause: e.to_string(),
    }
}

/// Typed column read that reports decode problems instead of panicking
fn column<'a, T>(row: &'a tokio_postgres::Row, name: &str) -> Result<T>
where
    T: tokio_postgres::types::FromSql<'a>,
{
    row.try_get(name).map_err(|e| ApiError::Database {
        operation: "decode row",
        cause: format!("column {}: {}", name, e),
    })
}
