use super::CacheClient;
use tracing::info;
use uuid::Uuid;

pub const ORDERS_PREFIX: &str = "orders";
pub const QUOTAS_PREFIX: &str = "quotas";

/// Patterns that drop cached order listings.
///
/// A write for one customer clears that customer's entries plus the shared
/// `all` listings; a write without a known customer clears every entry.
pub fn order_patterns(user_id: Option<&str>) -> Vec<String> {
    match user_id {
        Some(id) => vec![
            format!("{}:{}*", ORDERS_PREFIX, id),
            format!("{}:all*", ORDERS_PREFIX),
        ],
        None => vec![format!("{}:*", ORDERS_PREFIX)],
    }
}

impl CacheClient {
    pub async fn invalidate_pattern(&self, pattern: &str) -> usize {
        self.delete_pattern(pattern).await
    }

    pub async fn invalidate_prefix(&self, prefix: &str) -> usize {
        self.invalidate_pattern(&format!("{}:*", prefix)).await
    }

    pub async fn invalidate_orders(&self, user_id: Option<Uuid>) -> usize {
        if !self.is_enabled() {
            return 0;
        }

        let user = user_id.map(|id| id.to_string());
        let mut removed = 0;
        for pattern in order_patterns(user.as_deref()) {
            removed += self.invalidate_pattern(&pattern).await;
        }

        if removed > 0 {
            info!("Invalidated {} cached order responses", removed);
        }
        removed
    }
}
