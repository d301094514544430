use super::AppState;
use crate::error::{ApiError, Result};
use crate::models::{AdminRole, NewNotification, NewOrder, Order, OrderStatus};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

/// Admin notifications are a side effect; a failure is logged and the
/// order write still succeeds
async fn notify(state: &AppState, notification: NewNotification) {
    let role = notification.target_role;
    if let Err(e) = state.notifications.create_notification(notification).await {
        warn!("Failed to notify {}: {}", role, e);
    }
}

pub async fn list_orders(State(state): State<AppState>) -> Result<Json<Vec<Order>>> {
    Ok(Json(state.orders.list_orders(None).await?))
}

pub async fn list_user_orders(
    State(state): State<AppState>,
    user_id: std::result::Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Vec<Order>>> {
    let Path(user_id) = user_id?;
    Ok(Json(state.orders.list_orders(Some(user_id)).await?))
}

pub async fn get_order(
    State(state): State<AppState>,
    id: std::result::Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Order>> {
    let Path(id) = id?;

    state
        .orders
        .get_order(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Order", id))
}

pub async fn create_order(
    State(state): State<AppState>,
    payload: std::result::Result<Json<NewOrder>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(order) = payload?;
    order.validate()?;

    let created = state.orders.create_order(order).await?;
    info!("Order {} created for customer {}", created.id, created.user_id);

    state.cache.invalidate_orders(Some(created.user_id)).await;

    notify(
        &state,
        NewNotification {
            title: "New order received".to_string(),
            message: format!(
                "{} x {} ordered, total {:.2}",
                created.quantity, created.hanger_type, created.total_amount
            ),
            target_role: AdminRole::SalesAdmin,
            notification_type: Some("new_order".to_string()),
            related_order_id: Some(created.id),
        },
    )
    .await;

    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_order_status(
    State(state): State<AppState>,
    id: std::result::Result<Path<Uuid>, PathRejection>,
    payload: std::result::Result<Json<StatusUpdate>, JsonRejection>,
) -> Result<Json<Order>> {
    let Path(id) = id?;
    let Json(update) = payload?;

    let order = state
        .orders
        .update_order_status(id, update.status)
        .await?
        .ok_or_else(|| ApiError::not_found("Order", id))?;
    info!("Order {} moved to {}", order.id, order.status);

    state.cache.invalidate_orders(None).await;

    if order.status == OrderStatus::Approved {
        notify(
            &state,
            NewNotification {
                title: "Order approved for production".to_string(),
                message: format!("{} x {} is ready to schedule", order.quantity, order.hanger_type),
                target_role: AdminRole::OperationalManager,
                notification_type: Some("order_approved".to_string()),
                related_order_id: Some(order.id),
            },
        )
        .await;
    }

    Ok(Json(order))
}

pub async fn delete_order(
    State(state): State<AppState>,
    id: std::result::Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse> {
    let Path(id) = id?;

    if !state.orders.delete_order(id).await? {
        return Err(ApiError::not_found("Order", id));
    }
    info!("Order {} deleted", id);

    state.cache.invalidate_orders(None).await;
    Ok(Json(json!({ "success": true })))
}
