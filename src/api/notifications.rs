use super::AppState;
use crate::error::{ApiError, Result};
use crate::models::{AdminNotification, AdminRole, NewNotification, NotificationFilter};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub role: Option<String>,
    pub unread_only: Option<bool>,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RoleQuery {
    pub role: Option<String>,
}

#[derive(Serialize)]
struct CountResponse {
    count: i64,
}

fn parse_role(role: Option<&str>) -> Result<Option<AdminRole>> {
    role.filter(|r| !r.is_empty())
        .map(str::parse)
        .transpose()
}

pub async fn list_notifications(
    State(state): State<AppState>,
    query: std::result::Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Vec<AdminNotification>>> {
    let Query(query) = query?;

    let filter = NotificationFilter {
        role: parse_role(query.role.as_deref())?,
        unread_only: query.unread_only.unwrap_or(false),
        limit: query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
    };

    Ok(Json(state.notifications.list_notifications(&filter).await?))
}

pub async fn unread_count(
    State(state): State<AppState>,
    query: std::result::Result<Query<RoleQuery>, QueryRejection>,
) -> Result<impl IntoResponse> {
    let Query(query) = query?;
    let role = parse_role(query.role.as_deref())?;

    let count = state.notifications.unread_count(role).await?;
    Ok(Json(CountResponse { count }))
}

pub async fn create_notification(
    State(state): State<AppState>,
    payload: std::result::Result<Json<NewNotification>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(notification) = payload?;
    notification.validate()?;

    let created = state.notifications.create_notification(notification).await?;
    info!(
        "Created {} notification {} for {}",
        created.notification_type, created.id, created.target_role
    );

    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn mark_read(
    State(state): State<AppState>,
    id: std::result::Result<Path<Uuid>, PathRejection>,
) -> Result<Json<AdminNotification>> {
    let Path(id) = id?;

    state
        .notifications
        .mark_read(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Notification", id))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    query: std::result::Result<Query<RoleQuery>, QueryRejection>,
) -> Result<impl IntoResponse> {
    let Query(query) = query?;
    let role = parse_role(query.role.as_deref())?;

    let updated = state.notifications.mark_all_read(role).await?;
    Ok(Json(json!({ "success": true, "updated": updated })))
}

pub async fn delete_notification(
    State(state): State<AppState>,
    id: std::result::Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse> {
    let Path(id) = id?;

    if !state.notifications.delete_notification(id).await? {
        return Err(ApiError::not_found("Notification", id));
    }
    Ok(Json(json!({ "success": true })))
}
