use super::AppState;
use crate::cache::QUOTAS_PREFIX;
use crate::error::{ApiError, Result};
use crate::models::{NewQuota, Quota, QuotaPatch, QuotaSummary, Team};
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
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct ProgressUpdate {
    pub finished_quantity: i32,
}

pub async fn list_quotas(State(state): State<AppState>) -> Result<Json<Vec<Quota>>> {
    Ok(Json(state.quotas.list_quotas().await?))
}

pub async fn quota_summary(State(state): State<AppState>) -> Result<Json<QuotaSummary>> {
    let quotas = state.quotas.list_quotas().await?;
    Ok(Json(QuotaSummary::from_quotas(&quotas)))
}

pub async fn get_quota(
    State(state): State<AppState>,
    id: std::result::Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Quota>> {
    let Path(id) = id?;

    state
        .quotas
        .get_quota(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Quota", id))
}

pub async fn create_quota(
    State(state): State<AppState>,
    payload: std::result::Result<Json<NewQuota>, JsonRejection>,
) -> Result<impl IntoResponse> {
    let Json(mut quota) = payload?;
    quota.dedup_ids();
    quota.validate()?;

    let created = state.quotas.create_quota(quota).await?;
    info!(
        "Quota {} created with {} teams",
        created.id,
        created.team_ids.len()
    );

    state.cache.invalidate_prefix(QUOTAS_PREFIX).await;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_quota(
    State(state): State<AppState>,
    id: std::result::Result<Path<Uuid>, PathRejection>,
    payload: std::result::Result<Json<QuotaPatch>, JsonRejection>,
) -> Result<Json<Quota>> {
    let Path(id) = id?;
    let Json(patch) = payload?;

    if patch.is_empty() {
        return Err(ApiError::invalid("No fields to update"));
    }

    let updated = state
        .quotas
        .update_quota(id, patch)
        .await?
        .ok_or_else(|| ApiError::not_found("Quota", id))?;
    info!("Quota {} updated", id);

    state.cache.invalidate_prefix(QUOTAS_PREFIX).await;
    Ok(Json(updated))
}

pub async fn update_progress(
    State(state): State<AppState>,
    id: std::result::Result<Path<Uuid>, PathRejection>,
    payload: std::result::Result<Json<ProgressUpdate>, JsonRejection>,
) -> Result<Json<Quota>> {
    let Path(id) = id?;
    let Json(progress) = payload?;

    if progress.finished_quantity < 0 {
        return Err(ApiError::invalid("finished_quantity must not be negative"));
    }

    // Status is derived inside the store's update, against the locked row
    let updated = state
        .quotas
        .update_quota(id, QuotaPatch::progress(progress.finished_quantity))
        .await?
        .ok_or_else(|| ApiError::not_found("Quota", id))?;
    info!(
        "Quota {} progress {}/{} ({}%)",
        id, updated.finished_quantity, updated.target_quantity, updated.progress_percentage
    );

    state.cache.invalidate_prefix(QUOTAS_PREFIX).await;
    Ok(Json(updated))
}

pub async fn delete_quota(
    State(state): State<AppState>,
    id: std::result::Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse> {
    let Path(id) = id?;

    if !state.quotas.delete_quota(id).await? {
        return Err(ApiError::not_found("Quota", id));
    }
    info!("Quota {} deleted", id);

    state.cache.invalidate_prefix(QUOTAS_PREFIX).await;
    Ok(Json(json!({ "success": true })))
}

pub async fn list_teams(State(state): State<AppState>) -> Result<Json<Vec<Team>>> {
    Ok(Json(state.quotas.list_teams().await?))
}

#[cfg(test)]
mod tests {
    use crate::api::router;
    use crate::api::test_support::{app, send, state};
    use crate::cache::{CacheClient, MemoryBackend};
    use crate::store::memory::MemoryStore;
    use axum::http::{Method, StatusCode};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use uuid::Uuid;

    async fn create(app: &axum::Router, body: Value) -> Value {
        let (status, _, quota) = send(app, Method::POST, "/quotas", Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
        quota
    }

    #[tokio::test]
    async fn test_create_links_teams() {
        let store = Arc::new(MemoryStore::new());
        let app = app(store.clone());
        let cutters = store.add_team("Cutters");

        let quota = create(
            &app,
            json!({
                "quota_name": "March batch",
                "target_quantity": 400,
                "finished_quantity": 100,
                "team_ids": [cutters.id]
            }),
        )
        .await;

        assert_eq!(quota["status"], "pending");
        assert_eq!(quota["progress_percentage"], 25.0);
        assert_eq!(quota["teams"][0]["team_name"], "Cutters");

        let quota_id: Uuid = quota["id"].as_str().unwrap().parse().unwrap();
        assert_eq!(store.team(cutters.id).unwrap().assigned_quota_id, Some(quota_id));
    }

    #[tokio::test]
    async fn test_moving_team_relinks_both_quotas() {
        let store = Arc::new(MemoryStore::new());
        let app = app(store.clone());
        let team = store.add_team("Polishers");

        let first = create(
            &app,
            json!({ "quota_name": "A", "target_quantity": 10, "team_ids": [team.id] }),
        )
        .await;
        let second = create(&app, json!({ "quota_name": "B", "target_quantity": 10 })).await;

        let uri = format!("/quotas/{}", second["id"].as_str().unwrap());
        let (status, _, updated) =
            send(&app, Method::PATCH, &uri, Some(json!({ "team_ids": [team.id] }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["teams"].as_array().unwrap().len(), 1);

        let (_, _, first) = send(
            &app,
            Method::GET,
            &format!("/quotas/{}", first["id"].as_str().unwrap()),
            None,
        )
        .await;
        assert!(first["team_ids"].as_array().unwrap().is_empty());
        assert_eq!(
            store.team(team.id).unwrap().assigned_quota_id.map(|id| id.to_string()),
            second["id"].as_str().map(ToString::to_string)
        );

        let (status, _, _) = send(&app, Method::DELETE, &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(store.team(team.id).unwrap().assigned_quota_id, None);
    }

    #[tokio::test]
    async fn test_progress_drives_status() {
        let app = app(Arc::new(MemoryStore::new()));
        let quota = create(&app, json!({ "quota_name": "Q", "target_quantity": 200 })).await;
        let uri = format!("/quotas/{}/progress", quota["id"].as_str().unwrap());

        let (_, _, body) =
            send(&app, Method::PATCH, &uri, Some(json!({ "finished_quantity": 50 }))).await;
        assert_eq!(body["status"], "in_progress");
        assert_eq!(body["progress_percentage"], 25.0);

        let (_, _, body) =
            send(&app, Method::PATCH, &uri, Some(json!({ "finished_quantity": 250 }))).await;
        assert_eq!(body["status"], "completed");
        assert_eq!(body["progress_percentage"], 125.0);

        let (status, _, _) =
            send(&app, Method::PATCH, &uri, Some(json!({ "finished_quantity": -1 }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let missing = format!("/quotas/{}/progress", Uuid::new_v4());
        let (status, _, _) =
            send(&app, Method::PATCH, &missing, Some(json!({ "finished_quantity": 1 }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_progress_status_follows_current_target() {
        let app = app(Arc::new(MemoryStore::new()));
        let quota = create(&app, json!({ "quota_name": "Q", "target_quantity": 100 })).await;
        let uri = format!("/quotas/{}", quota["id"].as_str().unwrap());

        let (_, _, body) =
            send(&app, Method::PATCH, &uri, Some(json!({ "target_quantity": 500 }))).await;
        assert_eq!(body["target_quantity"], 500);

        let (_, _, body) = send(
            &app,
            Method::PATCH,
            &format!("{}/progress", uri),
            Some(json!({ "finished_quantity": 100 })),
        )
        .await;
        assert_eq!(body["status"], "in_progress");
        assert_eq!(body["progress_percentage"], 20.0);
    }

    #[tokio::test]
    async fn test_unknown_team_ids_are_rejected() {
        let store = Arc::new(MemoryStore::new());
        let app = app(store.clone());
        let ghost = Uuid::new_v4();

        let (status, _, body) = send(
            &app,
            Method::POST,
            "/quotas",
            Some(json!({ "quota_name": "Q", "target_quantity": 5, "team_ids": [ghost, ghost] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], format!("Unknown team ids: {}", ghost));
        let (_, _, quotas) = send(&app, Method::GET, "/quotas", None).await;
        assert!(quotas.as_array().unwrap().is_empty());

        let team = store.add_team("Packers");
        let quota = create(
            &app,
            json!({ "quota_name": "Q", "target_quantity": 5, "team_ids": [team.id] }),
        )
        .await;
        let uri = format!("/quotas/{}", quota["id"].as_str().unwrap());

        let (status, _, _) = send(
            &app,
            Method::PATCH,
            &uri,
            Some(json!({ "quota_name": "Renamed", "team_ids": [ghost] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        // Rejected update left the quota and its team untouched
        let (_, _, current) = send(&app, Method::GET, &uri, None).await;
        assert_eq!(current["quota_name"], "Q");
        assert_eq!(current["team_ids"], json!([team.id]));
        assert!(store.team(team.id).unwrap().assigned_quota_id.is_some());
    }

    #[tokio::test]
    async fn test_repeated_team_id_is_stored_once() {
        let store = Arc::new(MemoryStore::new());
        let app = app(store.clone());
        let team = store.add_team("Packers");

        let quota = create(
            &app,
            json!({ "quota_name": "Q", "target_quantity": 5, "team_ids": [team.id, team.id] }),
        )
        .await;
        assert_eq!(quota["team_ids"], json!([team.id]));
        assert_eq!(quota["teams"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_summary() {
        let app = app(Arc::new(MemoryStore::new()));
        create(
            &app,
            json!({ "quota_name": "A", "target_quantity": 100, "finished_quantity": 100, "status": "completed" }),
        )
        .await;
        create(
            &app,
            json!({ "quota_name": "B", "target_quantity": 300, "finished_quantity": 50, "status": "in_progress" }),
        )
        .await;

        let (status, _, body) = send(&app, Method::GET, "/quotas/summary", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_quotas"], 2);
        assert_eq!(body["total_target"], 400);
        assert_eq!(body["total_finished"], 150);
        assert_eq!(body["overall_percentage"], 37.5);
        assert_eq!(body["by_status"]["completed"], 1);
        assert_eq!(body["by_status"]["in_progress"], 1);
        assert_eq!(body["by_status"]["pending"], 0);
    }

    #[tokio::test]
    async fn test_validation_and_not_found() {
        let app = app(Arc::new(MemoryStore::new()));

        let (status, _, body) = send(
            &app,
            Method::POST,
            "/quotas",
            Some(json!({ "quota_name": "Q", "target_quantity": 0 })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "target_quantity must be greater than 0");

        let quota = create(&app, json!({ "quota_name": "Q", "target_quantity": 5 })).await;
        let uri = format!("/quotas/{}", quota["id"].as_str().unwrap());
        let (status, _, body) = send(&app, Method::PATCH, &uri, Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No fields to update");

        let (status, _, _) = send(
            &app,
            Method::PATCH,
            &uri,
            Some(json!({ "start_date": "2024-05-10", "end_date": "2024-05-01" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _, body) =
            send(&app, Method::GET, &format!("/quotas/{}", Uuid::new_v4()), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Quota not found");
    }

    #[tokio::test]
    async fn test_teams_are_cached_and_quota_writes_invalidate() {
        let store = Arc::new(MemoryStore::new());
        store.add_team("Welders");
        store.add_team("Assemblers");
        let backend = Arc::new(MemoryBackend::new());
        let app = router(
            state(store, CacheClient::with_backend(backend.clone())),
            &["*".to_string()],
        );

        let (_, _, teams) = send(&app, Method::GET, "/teams", None).await;
        assert_eq!(teams[0]["team_name"], "Assemblers");
        send(&app, Method::GET, "/quotas", None).await;
        assert!(backend.contains_key("quotas:all/teams"));
        assert!(backend.contains_key("quotas:all/quotas"));

        create(&app, json!({ "quota_name": "Q", "target_quantity": 5 })).await;
        assert!(backend.is_empty());
    }
}
