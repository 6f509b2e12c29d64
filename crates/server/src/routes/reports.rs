//! Routes for dashboards and summary reports.

use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::get,
};
use chrono::Utc;
use db::models::{
    asset::{Asset, TypeValueSummary},
    user::User,
};
use serde::Serialize;
use services::services::stats::{DashboardStats, UserDashboard};
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError};

#[derive(Debug, Serialize, TS)]
pub struct UserAssetCount {
    pub user_id: Uuid,
    pub username: String,
    pub asset_count: i64,
}

pub async fn dashboard(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<DashboardStats>>, ApiError> {
    let stats = state
        .stats
        .dashboard(&state.db.pool, Utc::now().date_naive())
        .await?;
    Ok(ResponseJson(ApiResponse::success(stats)))
}

pub async fn user_dashboard(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<UserDashboard>>, ApiError> {
    User::find_by_id(&state.db.pool, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".into()))?;
    let dashboard = state.stats.user_dashboard(&state.db.pool, user_id).await?;
    Ok(ResponseJson(ApiResponse::success(dashboard)))
}

/// Assets per user for the allocation report.
pub async fn assets_per_user(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<UserAssetCount>>>, ApiError> {
    let rows = User::assigned_asset_counts(&state.db.pool).await?;
    let counts = rows
        .into_iter()
        .map(|(user_id, username, asset_count)| UserAssetCount {
            user_id,
            username,
            asset_count,
        })
        .collect();
    Ok(ResponseJson(ApiResponse::success(counts)))
}

pub async fn value_by_type(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<TypeValueSummary>>>, ApiError> {
    let summary = Asset::value_by_type(&state.db.pool).await?;
    Ok(ResponseJson(ApiResponse::success(summary)))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/reports",
        Router::new()
            .route("/dashboard", get(dashboard))
            .route("/dashboard/{user_id}", get(user_dashboard))
            .route("/assets-per-user", get(assets_per_user))
            .route("/value-by-type", get(value_by_type)),
    )
}
