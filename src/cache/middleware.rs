//! HTTP response caching for read endpoints.
//!
//! Attach with `Router::route_layer` so path parameters are available:
//!
//! ```ignore
//! router.route_layer(middleware::from_fn_with_state(
//!     CacheRoute::new(cache, "orders", ttl),
//!     cache_response,
//! ))
//! ```
//!
//! Keys are `{prefix}:{identifier}{path_and_query}`. The identifier is the
//! `userid` path parameter, then the `userid` query parameter, then the
//! `x-user-id` header, and `all` when none is present.

use super::CacheClient;
use crate::error::ApiError;
use axum::{
    body::{to_bytes, Body, HttpBody},
    extract::{FromRequestParts, Query, RawPathParams, Request, State},
    http::{
        header::{HeaderName, CONTENT_TYPE},
        HeaderValue, Method, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

pub const CACHE_STATUS_HEADER: HeaderName = HeaderName::from_static("x-cache");

const IDENTIFIER_PARAM: &str = "userid";
const USER_ID_HEADER: &str = "x-user-id";
const SHARED_IDENTIFIER: &str = "all";
const MAX_CACHED_BODY: usize = 8 * 1024 * 1024;

#[derive(Clone)]
pub struct CacheRoute {
    cache: CacheClient,
    prefix: &'static str,
    ttl: Duration,
}

impl CacheRoute {
    pub fn new(cache: CacheClient, prefix: &'static str, ttl: Duration) -> Self {
        Self { cache, prefix, ttl }
    }
}

pub fn cache_key(prefix: &str, identifier: &str, path_and_query: &str) -> String {
    format!("{}:{}{}", prefix, identifier, path_and_query)
}

pub async fn cache_response(
    State(route): State<CacheRoute>,
    req: Request,
    next: Next,
) -> Response {
    if req.method() != Method::GET || !route.cache.is_enabled() {
        return next.run(req).await;
    }

    let (mut parts, body) = req.into_parts();
    let path_params = RawPathParams::from_request_parts(&mut parts, &()).await.ok();
    let req = Request::from_parts(parts, body);

    let identifier = resolve_identifier(&req, path_params.as_ref());
    let path_and_query = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| req.uri().path());
    let key = cache_key(route.prefix, &identifier, path_and_query);

    if let Some(cached) = route.cache.get(&key).await {
        return (
            StatusCode::OK,
            [
                (CONTENT_TYPE, HeaderValue::from_static("application/json")),
                (CACHE_STATUS_HEADER, HeaderValue::from_static("HIT")),
            ],
            cached,
        )
            .into_response();
    }

    let response = next.run(req).await;
    if !response.status().is_success() {
        return response;
    }

    let (mut parts, body) = response.into_parts();

    // Bodies that are unbounded or over the limit go out untouched and uncached
    let fits = body
        .size_hint()
        .upper()
        .is_some_and(|len| len <= MAX_CACHED_BODY as u64);
    if !fits {
        debug!("Not caching {}: body exceeds {} bytes or has no known size", key, MAX_CACHED_BODY);
        return Response::from_parts(parts, body);
    }

    let bytes = match to_bytes(body, MAX_CACHED_BODY).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Could not buffer response for {}: {}", key, e);
            return ApiError::Internal("Failed to read response body".to_string()).into_response();
        }
    };

    route.cache.set(&key, bytes.to_vec(), route.ttl).await;

    parts
        .headers
        .insert(CACHE_STATUS_HEADER, HeaderValue::from_static("MISS"));
    Response::from_parts(parts, Body::from(bytes))
}

fn resolve_identifier(req: &Request, path_params: Option<&RawPathParams>) -> String {
    if let Some(value) = path_params.and_then(|params| {
        params
            .iter()
            .find(|(name, _)| *name == IDENTIFIER_PARAM)
            .map(|(_, value)| value.to_string())
    }) {
        return value;
    }

    if let Ok(Query(query)) = Query::<HashMap<String, String>>::try_from_uri(req.uri()) {
        if let Some(value) = query.get(IDENTIFIER_PARAM).filter(|v| !v.is_empty()) {
            return value.clone();
        }
    }

    if let Some(value) = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
    {
        return value.to_string();
    }

    SHARED_IDENTIFIER.to_string()
}
