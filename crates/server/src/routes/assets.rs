//! Routes for the asset register.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{get, put},
};
use chrono::Utc;
use db::models::{
    asset::{Asset, AssetFilter, AssetSuggestion, CreateAsset, WarrantyStatus},
    user::User,
};
use serde::Deserialize;
use ts_rs::TS;
use utils::response::{ApiResponse, PageParams, Paginated};
use uuid::Uuid;

use crate::{AppState, actor::ActorId, error::ApiError};

#[derive(Debug, Deserialize, TS)]
pub struct ListAssetsQuery {
    #[serde(flatten)]
    pub page: PageParams,
    #[serde(flatten)]
    pub filter: AssetFilter,
}

#[derive(Debug, Deserialize, TS)]
pub struct SuggestQuery {
    pub q: String,
}

#[derive(Debug, Deserialize, TS)]
pub struct SetAssignees {
    pub user_ids: Vec<Uuid>,
}

pub async fn list_assets(
    State(state): State<AppState>,
    Query(query): Query<ListAssetsQuery>,
) -> Result<ResponseJson<ApiResponse<Paginated<Asset>>>, ApiError> {
    let (page, per_page, _) = query.page.clamp();
    let assets = Asset::list(&state.db.pool, &query.filter, page, per_page).await?;
    Ok(ResponseJson(ApiResponse::success(assets)))
}

pub async fn get_asset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Asset>>, ApiError> {
    let asset = Asset::find_by_id(&state.db.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("asset not found".into()))?;
    Ok(ResponseJson(ApiResponse::success(asset)))
}

pub async fn create_asset(
    State(state): State<AppState>,
    ActorId(actor): ActorId,
    Json(data): Json<CreateAsset>,
) -> Result<ResponseJson<ApiResponse<Asset>>, ApiError> {
    if data.name.trim().is_empty() {
        return Err(ApiError::BadRequest("asset name is required".into()));
    }
    let asset = Asset::create(&state.db.pool, &data).await?;
    state
        .audit
        .record(
            &state.db.pool,
            actor,
            "assets",
            "create",
            Some(asset.id),
            Some(&asset.name),
        )
        .await;
    Ok(ResponseJson(ApiResponse::success(asset)))
}

pub async fn update_asset(
    State(state): State<AppState>,
    ActorId(actor): ActorId,
    Path(id): Path<Uuid>,
    Json(data): Json<CreateAsset>,
) -> Result<ResponseJson<ApiResponse<Asset>>, ApiError> {
    let asset = Asset::update(&state.db.pool, id, &data)
        .await?
        .ok_or_else(|| ApiError::NotFound("asset not found".into()))?;
    state
        .audit
        .record(
            &state.db.pool,
            actor,
            "assets",
            "update",
            Some(asset.id),
            Some(&asset.name),
        )
        .await;
    Ok(ResponseJson(ApiResponse::success(asset)))
}

pub async fn delete_asset(
    State(state): State<AppState>,
    ActorId(actor): ActorId,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let asset = Asset::find_by_id(&state.db.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("asset not found".into()))?;
    if Asset::soft_delete_cascade(&state.db.pool, id).await? == 0 {
        return Err(ApiError::NotFound("asset not found".into()));
    }
    state
        .audit
        .record(
            &state.db.pool,
            actor,
            "assets",
            "delete",
            Some(id),
            Some(&asset.name),
        )
        .await;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn suggest_assets(
    State(state): State<AppState>,
    Query(query): Query<SuggestQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<AssetSuggestion>>>, ApiError> {
    if query.q.trim().chars().count() < 2 {
        return Ok(ResponseJson(ApiResponse::success(Vec::new())));
    }
    let suggestions = Asset::suggest(&state.db.pool, &query.q, 10).await?;
    Ok(ResponseJson(ApiResponse::success(suggestions)))
}

pub async fn get_warranty(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Option<WarrantyStatus>>>, ApiError> {
    let asset = Asset::find_by_id(&state.db.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("asset not found".into()))?;
    Ok(ResponseJson(ApiResponse::success(
        asset.warranty_status(Utc::now().date_naive()),
    )))
}

pub async fn get_assignees(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<User>>>, ApiError> {
    let users = Asset::find_assignees(&state.db.pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(users)))
}

pub async fn set_assignees(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(data): Json<SetAssignees>,
) -> Result<ResponseJson<ApiResponse<Vec<User>>>, ApiError> {
    Asset::find_by_id(&state.db.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("asset not found".into()))?;
    Asset::set_assignees(&state.db.pool, id, &data.user_ids).await?;
    let users = Asset::find_assignees(&state.db.pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(users)))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/assets",
        Router::new()
            .route("/", get(list_assets).post(create_asset))
            .route("/suggest", get(suggest_assets))
            .route(
                "/{id}",
                get(get_asset).put(update_asset).delete(delete_asset),
            )
            .route("/{id}/warranty", get(get_warranty))
            .route("/{id}/assignees", put(set_assignees).get(get_assignees)),
    )
}
