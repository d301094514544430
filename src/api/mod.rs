mod auth;
mod health;
mod notifications;
mod orders;
mod quotas;

pub use auth::{get_customer, signup, SignupRequest};
pub use health::{health_check, HealthResponse};
pub use notifications::{
    create_notification, delete_notification, list_notifications, mark_all_read, mark_read,
    unread_count,
};
pub use orders::{
    create_order, delete_order, get_order, list_orders, list_user_orders, update_order_status,
};
pub use quotas::{
    create_quota, delete_quota, get_quota, list_quotas, list_teams, quota_summary, update_progress,
    update_quota,
};

use crate::auth::AuthProvider;
use crate::cache::{cache_response, CacheClient, CacheRoute, ORDERS_PREFIX, QUOTAS_PREFIX};
use crate::db::Database;
use crate::store::{CustomerStore, HealthProbe, NotificationStore, OrderStore, QuotaStore};
use axum::{
    http::HeaderValue,
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

#[derive(Clone)]
pub struct AppState {
    pub customers: Arc<dyn CustomerStore>,
    pub orders: Arc<dyn OrderStore>,
    pub quotas: Arc<dyn QuotaStore>,
    pub notifications: Arc<dyn NotificationStore>,
    pub health: Arc<dyn HealthProbe>,
    pub auth: Arc<dyn AuthProvider>,
    pub cache: CacheClient,
    pub cache_ttl: Duration,
    pub started_at: Instant,
}

impl AppState {
    /// State backed by one Postgres handle for every store
    pub fn from_database(
        db: Database,
        auth: Arc<dyn AuthProvider>,
        cache: CacheClient,
        cache_ttl: Duration,
    ) -> Self {
        let db = Arc::new(db);
        Self {
            customers: db.clone(),
            orders: db.clone(),
            quotas: db.clone(),
            notifications: db.clone(),
            health: db,
            auth,
            cache,
            cache_ttl,
            started_at: Instant::now(),
        }
    }
}

pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    let cached = |prefix: &'static str| {
        middleware::from_fn_with_state(
            CacheRoute::new(state.cache.clone(), prefix, state.cache_ttl),
            cache_response,
        )
    };

    let orders = Router::new()
        .route("/orders", get(list_orders).post(create_order))
        .route("/orders/user/{userid}", get(list_user_orders))
        .route("/orders/{id}", get(get_order).delete(delete_order))
        .route("/orders/{id}/status", patch(update_order_status))
        .route_layer(cached(ORDERS_PREFIX));

    let quotas = Router::new()
        .route("/quotas", get(list_quotas).post(create_quota))
        .route("/quotas/summary", get(quota_summary))
        .route(
            "/quotas/{id}",
            get(get_quota).patch(update_quota).delete(delete_quota),
        )
        .route("/quotas/{id}/progress", patch(update_progress))
        .route("/teams", get(list_teams))
        .route_layer(cached(QUOTAS_PREFIX));

    let notifications = Router::new()
        .route(
            "/admin-notifications",
            get(list_notifications).post(create_notification),
        )
        .route("/admin-notifications/unread-count", get(unread_count))
        .route("/admin-notifications/read-all", patch(mark_all_read))
        .route("/admin-notifications/{id}", delete(delete_notification))
        .route("/admin-notifications/{id}/read", patch(mark_read));

    Router::new()
        .route("/health", get(health_check))
        .route("/api/auth/signup", post(signup))
        .route("/api/customers/{id}", get(get_customer))
        .merge(orders)
        .merge(quotas)
        .merge(notifications)
        .layer(cors_layer(cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(allowed))
}
