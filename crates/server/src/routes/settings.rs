//! Routes for system settings (key/value).

use axum::{
    Json, Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::system_setting::SystemSetting;
use serde::Deserialize;
use ts_rs::TS;
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize, TS)]
pub struct UpsertSetting {
    pub value: Option<String>,
    pub description: Option<String>,
}

pub async fn list_settings(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<SystemSetting>>>, ApiError> {
    let settings = SystemSetting::find_all(&state.db.pool).await?;
    Ok(ResponseJson(ApiResponse::success(settings)))
}

pub async fn get_setting(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<ResponseJson<ApiResponse<SystemSetting>>, ApiError> {
    let setting = SystemSetting::get(&state.db.pool, &key)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("setting '{key}' not found")))?;
    Ok(ResponseJson(ApiResponse::success(setting)))
}

pub async fn put_setting(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(data): Json<UpsertSetting>,
) -> Result<ResponseJson<ApiResponse<SystemSetting>>, ApiError> {
    let setting = SystemSetting::set(
        &state.db.pool,
        &key,
        data.value.as_deref(),
        data.description.as_deref(),
    )
    .await?;
    Ok(ResponseJson(ApiResponse::success(setting)))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/settings",
        Router::new()
            .route("/", get(list_settings))
            .route("/{key}", get(get_setting).put(put_setting)),
    )
}
