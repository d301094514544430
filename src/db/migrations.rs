//! Startup migrations for local and self-hosted databases.
//!
//! Applies `*.sql` files from the migrations directory in filename order and
//! records each one with its SHA-256 checksum in `_hanger_migrations`.
//! Hosted deployments manage the schema remotely and leave this off.

use super::Database;
use crate::error::{ApiError, Result};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct MigrationFile {
    pub name: String,
    pub path: PathBuf,
    pub checksum: String,
}

pub struct MigrationRunner {
    migrations_dir: PathBuf,
}

impl MigrationRunner {
    pub fn new(migrations_dir: &Path) -> Self {
        Self {
            migrations_dir: migrations_dir.to_path_buf(),
        }
    }

    pub fn find_migration_files(&self) -> Result<Vec<MigrationFile>> {
        if !self.migrations_dir.exists() {
            debug!(
                "Migrations directory {:?} does not exist, nothing to apply",
                self.migrations_dir
            );
            return Ok(Vec::new());
        }

        let mut migrations = Vec::new();

        for entry in fs::read_dir(&self.migrations_dir).map_err(|e| {
            ApiError::Internal(format!("Failed to read migrations directory: {}", e))
        })? {
            let entry = entry
                .map_err(|e| ApiError::Internal(format!("Failed to read directory entry: {}", e)))?;

            let path = entry.path();
            if !path.is_file() || path.extension().map_or(true, |ext| ext != "sql") {
                continue;
            }

            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("")
                .to_string();

            let content = fs::read_to_string(&path).map_err(|e| {
                ApiError::Internal(format!("Failed to read migration file {:?}: {}", path, e))
            })?;

            migrations.push(MigrationFile {
                name,
                path,
                checksum: compute_checksum(&content),
            });
        }

        // Numeric prefixes (001_, 002_, ...) give the apply order
        migrations.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(migrations)
    }

    pub async fn run(&self, db: &Database) -> Result<usize> {
        let client = db.client().await?;

        client
            .batch_execute(
                r#"
                CREATE TABLE IF NOT EXISTS _hanger_migrations (
                    id SERIAL PRIMARY KEY,
                    migration_file TEXT NOT NULL UNIQUE,
                    checksum TEXT NOT NULL,
                    applied_at TIMESTAMPTZ DEFAULT NOW()
                )
                "#,
            )
            .await
            .map_err(|e| ApiError::Database {
                operation: "create migrations table",
                cause: e.to_string(),
            })?;

        let applied: HashMap<String, String> = client
            .query("SELECT migration_file, checksum FROM _hanger_migrations", &[])
            .await
            .map_err(|e| ApiError::Database {
                operation: "query applied migrations",
                cause: e.to_string(),
            })?
            .iter()
            .map(|row| (row.get(0), row.get(1)))
            .collect();

        let mut count = 0;

        for migration in self.find_migration_files()? {
            if let Some(stored) = applied.get(&migration.name) {
                if stored != &migration.checksum {
                    warn!(
                        "Checksum mismatch for applied migration {}: stored={}, current={}",
                        migration.name, stored, migration.checksum
                    );
                }
                continue;
            }

            info!("Applying migration: {}", migration.name);

            let sql = fs::read_to_string(&migration.path).map_err(|e| {
                ApiError::Internal(format!("Failed to read {}: {}", migration.name, e))
            })?;

            client
                .batch_execute(&sql)
                .await
                .map_err(|e| ApiError::Database {
                    operation: "apply migration",
                    cause: format!("{}: {}", migration.name, e),
                })?;

            client
                .execute(
                    "INSERT INTO _hanger_migrations (migration_file, checksum) VALUES ($1, $2)",
                    &[&migration.name, &migration.checksum],
                )
                .await
                .map_err(|e| ApiError::Database {
                    operation: "record migration",
                    cause: format!("{}: {}", migration.name, e),
                })?;

            count += 1;
        }

        if count > 0 {
            info!("Applied {} migrations", count);
        }

        Ok(count)
    }
}

fn compute_checksum(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}
