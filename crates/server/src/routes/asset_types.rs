//! Routes for asset categories.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::asset_type::{AssetType, AssetTypeSuggestion, CreateAssetType};
use serde::Deserialize;
use ts_rs::TS;
use utils::response::{ApiResponse, PageParams, Paginated};
use uuid::Uuid;

use crate::{AppState, actor::ActorId, error::ApiError};

#[derive(Debug, Deserialize, TS)]
pub struct ListAssetTypesQuery {
    #[serde(flatten)]
    pub page: PageParams,
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, TS)]
pub struct SuggestQuery {
    pub q: String,
}

pub async fn list_asset_types(
    State(state): State<AppState>,
    Query(query): Query<ListAssetTypesQuery>,
) -> Result<ResponseJson<ApiResponse<Paginated<AssetType>>>, ApiError> {
    let (page, per_page, _) = query.page.clamp();
    let types = AssetType::list(&state.db.pool, query.search.as_deref(), page, per_page).await?;
    Ok(ResponseJson(ApiResponse::success(types)))
}

pub async fn list_all_active(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<AssetType>>>, ApiError> {
    let types = AssetType::find_all_active(&state.db.pool).await?;
    Ok(ResponseJson(ApiResponse::success(types)))
}

pub async fn get_asset_type(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<AssetType>>, ApiError> {
    let ty = AssetType::find_by_id(&state.db.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("asset type not found".into()))?;
    Ok(ResponseJson(ApiResponse::success(ty)))
}

pub async fn create_asset_type(
    State(state): State<AppState>,
    ActorId(actor): ActorId,
    Json(data): Json<CreateAssetType>,
) -> Result<ResponseJson<ApiResponse<AssetType>>, ApiError> {
    let name = data.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("name is required".into()));
    }
    if AssetType::name_taken(&state.db.pool, name, None).await? {
        return Err(ApiError::Conflict(format!(
            "asset type '{name}' already exists"
        )));
    }
    let ty = AssetType::create(&state.db.pool, &data).await?;
    state
        .audit
        .record(
            &state.db.pool,
            actor,
            "asset_types",
            "create",
            Some(ty.id),
            Some(&ty.name),
        )
        .await;
    Ok(ResponseJson(ApiResponse::success(ty)))
}

pub async fn update_asset_type(
    State(state): State<AppState>,
    ActorId(actor): ActorId,
    Path(id): Path<Uuid>,
    Json(data): Json<CreateAssetType>,
) -> Result<ResponseJson<ApiResponse<AssetType>>, ApiError> {
    let name = data.name.trim();
    if AssetType::name_taken(&state.db.pool, name, Some(id)).await? {
        return Err(ApiError::Conflict(format!(
            "asset type '{name}' already exists"
        )));
    }
    let ty = AssetType::update(&state.db.pool, id, &data)
        .await?
        .ok_or_else(|| ApiError::NotFound("asset type not found".into()))?;
    state
        .audit
        .record(
            &state.db.pool,
            actor,
            "asset_types",
            "update",
            Some(ty.id),
            Some(&ty.name),
        )
        .await;
    Ok(ResponseJson(ApiResponse::success(ty)))
}

/// A type with assets still on the books cannot be trashed.
pub async fn delete_asset_type(
    State(state): State<AppState>,
    ActorId(actor): ActorId,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let ty = AssetType::find_by_id(&state.db.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("asset type not found".into()))?;
    let in_use = AssetType::count_assets_in_use(&state.db.pool, id).await?;
    if in_use > 0 {
        return Err(ApiError::Conflict(format!(
            "{in_use} asset(s) still use this type"
        )));
    }
    if AssetType::soft_delete(&state.db.pool, id).await? == 0 {
        return Err(ApiError::NotFound("asset type not found".into()));
    }
    state
        .audit
        .record(
            &state.db.pool,
            actor,
            "asset_types",
            "delete",
            Some(id),
            Some(&ty.name),
        )
        .await;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn suggest_asset_types(
    State(state): State<AppState>,
    Query(query): Query<SuggestQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<AssetTypeSuggestion>>>, ApiError> {
    if query.q.trim().chars().count() < 2 {
        return Ok(ResponseJson(ApiResponse::success(Vec::new())));
    }
    let suggestions = AssetType::suggest(&state.db.pool, &query.q, 10).await?;
    Ok(ResponseJson(ApiResponse::success(suggestions)))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/asset-types",
        Router::new()
            .route("/", get(list_asset_types).post(create_asset_type))
            .route("/all", get(list_all_active))
            .route("/suggest", get(suggest_asset_types))
            .route(
                "/{id}",
                get(get_asset_type)
                    .put(update_asset_type)
                    .delete(delete_asset_type),
            ),
    )
}
