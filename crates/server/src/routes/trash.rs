//! Routes for the recycle bin.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{delete, get, post},
};
use serde::Deserialize;
use services::services::trash::{TrashModule, TrashOverview, TrashPages};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, actor::ActorId, error::ApiError};

pub async fn overview(
    State(state): State<AppState>,
    Query(pages): Query<TrashPages>,
) -> Result<ResponseJson<ApiResponse<TrashOverview>>, ApiError> {
    let overview = state.trash.overview(&state.db.pool, &pages).await?;
    Ok(ResponseJson(ApiResponse::success(overview)))
}

pub async fn restore_asset(
    State(state): State<AppState>,
    ActorId(actor): ActorId,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    state.trash.restore_asset(&state.db.pool, id).await?;
    state
        .audit
        .record(&state.db.pool, actor, "assets", "restore", Some(id), None)
        .await;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn purge_asset(
    State(state): State<AppState>,
    ActorId(actor): ActorId,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    state.trash.purge_asset(&state.db.pool, id).await?;
    state
        .audit
        .record(&state.db.pool, actor, "assets", "purge", Some(id), None)
        .await;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn restore_asset_type(
    State(state): State<AppState>,
    ActorId(actor): ActorId,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    state.trash.restore_asset_type(&state.db.pool, id).await?;
    state
        .audit
        .record(&state.db.pool, actor, "asset_types", "restore", Some(id), None)
        .await;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn purge_asset_type(
    State(state): State<AppState>,
    ActorId(actor): ActorId,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    state.trash.purge_asset_type(&state.db.pool, id).await?;
    state
        .audit
        .record(&state.db.pool, actor, "asset_types", "purge", Some(id), None)
        .await;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn restore_user(
    State(state): State<AppState>,
    ActorId(actor): ActorId,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    state.trash.restore_user(&state.db.pool, id).await?;
    state
        .audit
        .record(&state.db.pool, actor, "users", "restore", Some(id), None)
        .await;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn purge_user(
    State(state): State<AppState>,
    ActorId(actor): ActorId,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    state.trash.purge_user(&state.db.pool, id).await?;
    state
        .audit
        .record(&state.db.pool, actor, "users", "purge", Some(id), None)
        .await;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn restore_maintenance(
    State(state): State<AppState>,
    ActorId(actor): ActorId,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    state.trash.restore_maintenance(&state.db.pool, id).await?;
    state
        .audit
        .record(&state.db.pool, actor, "maintenance", "restore", Some(id), None)
        .await;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn purge_maintenance(
    State(state): State<AppState>,
    ActorId(actor): ActorId,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    state.trash.purge_maintenance(&state.db.pool, id).await?;
    state
        .audit
        .record(&state.db.pool, actor, "maintenance", "purge", Some(id), None)
        .await;
    Ok(ResponseJson(ApiResponse::success(())))
}

#[derive(Debug, Deserialize, TS)]
pub struct BulkIds {
    pub ids: Vec<Uuid>,
}

pub async fn bulk_restore(
    State(state): State<AppState>,
    ActorId(actor): ActorId,
    Path(module): Path<TrashModule>,
    Json(data): Json<BulkIds>,
) -> Result<ResponseJson<ApiResponse<u64>>, ApiError> {
    let restored = state
        .trash
        .restore_bulk(&state.db.pool, module, &data.ids)
        .await?;
    state
        .audit
        .record(
            &state.db.pool,
            actor,
            "trash",
            "bulk_restore",
            None,
            Some(&format!("restored {restored} of {}", data.ids.len())),
        )
        .await;
    Ok(ResponseJson(ApiResponse::success(restored)))
}

pub async fn bulk_purge(
    State(state): State<AppState>,
    ActorId(actor): ActorId,
    Path(module): Path<TrashModule>,
    Json(data): Json<BulkIds>,
) -> Result<ResponseJson<ApiResponse<u64>>, ApiError> {
    let purged = state
        .trash
        .purge_bulk(&state.db.pool, module, &data.ids)
        .await?;
    state
        .audit
        .record(
            &state.db.pool,
            actor,
            "trash",
            "bulk_purge",
            None,
            Some(&format!("purged {purged} of {}", data.ids.len())),
        )
        .await;
    Ok(ResponseJson(ApiResponse::success(purged)))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/trash",
        Router::new()
            .route("/", get(overview))
            .route("/{module}/bulk-restore", post(bulk_restore))
            .route("/{module}/bulk-delete", post(bulk_purge))
            .route("/assets/{id}/restore", post(restore_asset))
            .route("/assets/{id}", delete(purge_asset))
            .route("/asset-types/{id}/restore", post(restore_asset_type))
            .route("/asset-types/{id}", delete(purge_asset_type))
            .route("/users/{id}/restore", post(restore_user))
            .route("/users/{id}", delete(purge_user))
            .route("/maintenance/{id}/restore", post(restore_maintenance))
            .route("/maintenance/{id}", delete(purge_maintenance)),
    )
}
