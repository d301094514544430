//! Optional response cache.
//!
//! [`CacheClient`] is a process-wide handle shared by the middleware and the
//! handlers that invalidate. It connects lazily: the first operation spawns
//! a background connect task with a bounded linear backoff, and operations
//! issued before the backend is ready simply miss. Backend failures are
//! logged and swallowed, so the cache never fails a request.

mod invalidation;
mod memory;
mod middleware;
mod redis_backend;

pub use invalidation::{order_patterns, ORDERS_PREFIX, QUOTAS_PREFIX};
pub use memory::{glob_match, MemoryBackend};
pub use middleware::{cache_key, cache_response, CacheRoute, CACHE_STATUS_HEADER};
pub use redis_backend::RedisBackend;

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// URL that selects the in-process backend instead of Redis
pub const MEMORY_URL: &str = "memory://";

const COMMAND_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache backend error: {0}")]
    Backend(String),

    #[error("Cache operation timed out")]
    Timeout,
}

impl From<redis::RedisError> for CacheError {
    fn from(err: redis::RedisError) -> Self {
        CacheError::Backend(err.to_string())
    }
}

pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Key-value store with TTL expiry and glob-pattern deletes
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> CacheResult<()>;
    /// Delete every key matching a `*`/`?` glob, returning how many went
    async fn delete_pattern(&self, pattern: &str) -> CacheResult<usize>;
}

/// Linear reconnect schedule: retry `n` waits `min(n * step, max_delay)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub step: Duration,
    pub max_delay: Duration,
    pub max_retries: u32,
}

impl Backoff {
    pub fn new(max_retries: u32) -> Self {
        Self {
            step: Duration::from_millis(300),
            max_delay: Duration::from_secs(3),
            max_retries,
        }
    }

    /// Delay before retry `attempt` (1-based), `None` once retries are spent
    pub fn delay(&self, attempt: u32) -> Option<Duration> {
        if attempt > self.max_retries {
            return None;
        }
        Some(self.step.saturating_mul(attempt).min(self.max_delay))
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(10)
    }
}

#[derive(Debug, Clone)]
enum CacheSource {
    Redis(String),
    Memory,
}

enum ConnState {
    Idle,
    Connecting,
    Ready(Arc<dyn CacheBackend>),
    Failed,
}

struct Inner {
    source: Option<CacheSource>,
    state: RwLock<ConnState>,
    backoff: Backoff,
}

#[derive(Clone)]
pub struct CacheClient {
    inner: Arc<Inner>,
}

impl CacheClient {
    /// Build from `REDIS_URL`. No URL means a disabled, pass-through cache.
    pub fn from_url(url: Option<&str>, backoff: Backoff) -> Self {
        let source = url.map(|u| {
            if u == MEMORY_URL {
                CacheSource::Memory
            } else {
                CacheSource::Redis(u.to_string())
            }
        });

        match &source {
            Some(CacheSource::Redis(_)) => info!("Response cache configured with Redis backend"),
            Some(CacheSource::Memory) => info!("Response cache configured with in-process backend"),
            None => info!("REDIS_URL not set, response cache disabled"),
        }

        Self {
            inner: Arc::new(Inner {
                source,
                state: RwLock::new(ConnState::Idle),
                backoff,
            }),
        }
    }

    pub fn disabled() -> Self {
        Self::from_url(None, Backoff::default())
    }

    /// Client that is ready immediately with the given backend
    pub fn with_backend(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            inner: Arc::new(Inner {
                source: Some(CacheSource::Memory),
                state: RwLock::new(ConnState::Ready(backend)),
                backoff: Backoff::default(),
            }),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.source.is_some()
    }

    pub async fn is_connected(&self) -> bool {
        matches!(*self.inner.state.read().await, ConnState::Ready(_))
    }

    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let backend = self.backend().await?;

        match tokio::time::timeout(COMMAND_TIMEOUT, backend.get(key)).await {
            Ok(Ok(value)) => {
                debug!(
                    "Cache {} for key {}",
                    if value.is_some() { "hit" } else { "miss" },
                    key
                );
                value
            }
            Ok(Err(e)) => {
                warn!("Cache GET failed for {}: {}", key, e);
                None
            }
            Err(_) => {
                warn!("Cache GET timed out for {}", key);
                None
            }
        }
    }

    pub async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) {
        let Some(backend) = self.backend().await else {
            return;
        };

        match tokio::time::timeout(COMMAND_TIMEOUT, backend.set(key, value, ttl)).await {
            Ok(Ok(())) => debug!("Cached {} for {}s", key, ttl.as_secs()),
            Ok(Err(e)) => warn!("Cache SET failed for {}: {}", key, e),
            Err(_) => warn!("Cache SET timed out for {}", key),
        }
    }

    pub async fn delete_pattern(&self, pattern: &str) -> usize {
        let Some(backend) = self.backend().await else {
            return 0;
        };

        match tokio::time::timeout(COMMAND_TIMEOUT, backend.delete_pattern(pattern)).await {
            Ok(Ok(removed)) => {
                debug!("Invalidated {} cache keys matching {}", removed, pattern);
                removed
            }
            Ok(Err(e)) => {
                warn!("Cache invalidation failed for {}: {}", pattern, e);
                0
            }
            Err(_) => {
                warn!("Cache invalidation timed out for {}", pattern);
                0
            }
        }
    }

    /// Ready backend, or `None` while disabled, connecting or given up.
    /// The first call on an idle client starts the connect task.
    async fn backend(&self) -> Option<Arc<dyn CacheBackend>> {
        let source = self.inner.source.clone()?;

        {
            let state = self.inner.state.read().await;
            match &*state {
                ConnState::Ready(backend) => return Some(backend.clone()),
                ConnState::Connecting | ConnState::Failed => return None,
                ConnState::Idle => {}
            }
        }

        let mut state = self.inner.state.write().await;
        if matches!(*state, ConnState::Idle) {
            *state = ConnState::Connecting;
            let inner = self.inner.clone();
            tokio::spawn(connect_with_backoff(inner, move || {
                open_backend(source.clone())
            }));
        }

        None
    }
}

/// One initial attempt plus up to `max_retries` retries, then `Failed`
async fn connect_with_backoff<F, Fut>(inner: Arc<Inner>, mut open: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = CacheResult<Arc<dyn CacheBackend>>>,
{
    let mut attempt = 0;

    loop {
        match open().await {
            Ok(backend) => {
                *inner.state.write().await = ConnState::Ready(backend);
                info!("Response cache connected");
                return;
            }
            Err(e) => {
                attempt += 1;
                match inner.backoff.delay(attempt) {
                    Some(delay) => {
                        warn!(
                            "Cache connection failed ({}), retry {}/{} in {}ms",
                            e,
                            attempt,
                            inner.backoff.max_retries,
                            delay.as_millis()
                        );
                        tokio::time::sleep(delay).await;
                    }
                    None => {
                        error!(
                            "Cache connection failed after {} attempts, continuing without cache: {}",
                            attempt, e
                        );
                        *inner.state.write().await = ConnState::Failed;
                        return;
                    }
                }
            }
        }
    }
}

async fn open_backend(source: CacheSource) -> CacheResult<Arc<dyn CacheBackend>> {
    match source {
        CacheSource::Memory => Ok(Arc::new(MemoryBackend::new())),
        CacheSource::Redis(url) => Ok(Arc::new(RedisBackend::connect(&url).await?)),
    }
}
