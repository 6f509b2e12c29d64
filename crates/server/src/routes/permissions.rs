//! Routes for the permission catalog and per-user grants.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{get, put},
};
use db::models::permission::Permission;
use serde::Deserialize;
use services::services::permission::UserGrants;
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, actor::ActorId, error::ApiError};

#[derive(Debug, Deserialize, TS)]
pub struct UpdateGrants {
    pub permission_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, TS)]
pub struct CheckQuery {
    pub module: String,
    pub action: String,
}

pub async fn catalog(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<Permission>>>, ApiError> {
    let permissions = state.permission.catalog(&state.db.pool).await?;
    Ok(ResponseJson(ApiResponse::success(permissions)))
}

pub async fn get_user_grants(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<UserGrants>>, ApiError> {
    let grants = state.permission.grants_for(&state.db.pool, user_id).await?;
    Ok(ResponseJson(ApiResponse::success(grants)))
}

pub async fn update_user_grants(
    State(state): State<AppState>,
    ActorId(actor): ActorId,
    Path(user_id): Path<Uuid>,
    Json(data): Json<UpdateGrants>,
) -> Result<ResponseJson<ApiResponse<UserGrants>>, ApiError> {
    state
        .permission
        .update_grants(&state.db.pool, user_id, &data.permission_ids)
        .await?;
    state
        .audit
        .record(
            &state.db.pool,
            actor,
            "permissions",
            "update",
            Some(user_id),
            Some(&format!("{} grant(s)", data.permission_ids.len())),
        )
        .await;
    let grants = state.permission.grants_for(&state.db.pool, user_id).await?;
    Ok(ResponseJson(ApiResponse::success(grants)))
}

pub async fn check_grant(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<CheckQuery>,
) -> Result<ResponseJson<ApiResponse<bool>>, ApiError> {
    let granted = state
        .permission
        .check(&state.db.pool, user_id, &query.module, &query.action)
        .await?;
    Ok(ResponseJson(ApiResponse::success(granted)))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/permissions",
        Router::new()
            .route("/", get(catalog))
            .route(
                "/users/{user_id}",
                put(update_user_grants).get(get_user_grants),
            )
            .route("/users/{user_id}/check", get(check_grant)),
    )
}
