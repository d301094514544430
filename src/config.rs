use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub max_db_connections: u32,
    pub redis_url: Option<String>,
    pub cache_ttl: Duration,
    pub cache_max_retries: u32,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub cors_origins: Vec<String>,
    pub run_migrations: bool,
    pub migrations_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        // Build database_url from individual fields or use DATABASE_URL if provided
        let database_url = if let Ok(url) = env::var("DATABASE_URL") {
            url
        } else {
            let db_host = env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string());
            let db_port = env::var("DB_PORT").unwrap_or_else(|_| "5432".to_string());
            let db_name = env::var("DB_NAME").unwrap_or_else(|_| "postgres".to_string());
            let db_user = env::var("DB_USER").unwrap_or_else(|_| "postgres".to_string());
            let db_password = env::var("DB_PASSWORD").unwrap_or_else(|_| "postgres".to_string());

            // URL-encode password to handle special characters
            let encoded_password = urlencoding::encode(&db_password);

            format!(
                "postgres://{}:{}@{}:{}/{}",
                db_user, encoded_password, db_host, db_port, db_name
            )
        };

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let server_port = parse_or("PORT", 5000);
        let max_db_connections = parse_or("MAX_DB_CONNECTIONS", 10);

        let redis_url = env::var("REDIS_URL")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let cache_ttl_secs: u64 = parse_or("CACHE_TTL_SECS", 300);
        let cache_max_retries = parse_or("CACHE_MAX_RETRIES", 10);

        let supabase_url = env::var("SUPABASE_URL")
            .map_err(|_| anyhow::anyhow!("SUPABASE_URL must be set"))?;
        let supabase_anon_key = env::var("SUPABASE_ANON_KEY")
            .map_err(|_| anyhow::anyhow!("SUPABASE_ANON_KEY must be set"))?;

        let cors_origins = split_list(&env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string()));

        let run_migrations = env::var("RUN_MIGRATIONS")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);
        let migrations_dir = PathBuf::from(
            env::var("MIGRATIONS_DIR").unwrap_or_else(|_| "./migrations".to_string()),
        );

        Ok(Config {
            database_url,
            server_host,
            server_port,
            max_db_connections,
            redis_url,
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            cache_max_retries,
            supabase_url: supabase_url.trim_end_matches('/').to_string(),
            supabase_anon_key,
            cors_origins,
            run_migrations,
            migrations_dir,
        })
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.server_host, self.server_port);
        addr.parse()
            .map_err(|e| anyhow::anyhow!("Invalid socket address: {}", e))
    }
}

/// Read a numeric variable, falling back to `default` when unset or malformed
fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}
