//! Routes for stocktake campaigns.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{get, post, put},
};
use db::models::inventory::{
    CreateInventory, CreateSurplusAsset, Inventory, InventoryFilter, InventoryResult,
    InventorySurplusAsset, SaveInventoryResult,
};
use serde::Deserialize;
use services::services::inventory::InventorySheet;
use ts_rs::TS;
use utils::response::{ApiResponse, PageParams, Paginated};
use uuid::Uuid;

use crate::{AppState, actor::ActorId, error::ApiError};

#[derive(Debug, Deserialize, TS)]
pub struct ListInventoriesQuery {
    #[serde(flatten)]
    pub page: PageParams,
    #[serde(flatten)]
    pub filter: InventoryFilter,
}

#[derive(Debug, Deserialize, TS)]
pub struct UnlockRequest {
    pub reason: String,
}

pub async fn list_inventories(
    State(state): State<AppState>,
    Query(query): Query<ListInventoriesQuery>,
) -> Result<ResponseJson<ApiResponse<Paginated<Inventory>>>, ApiError> {
    let (page, per_page, _) = query.page.clamp();
    let inventories = state
        .inventory
        .list(&state.db.pool, &query.filter, page, per_page)
        .await?;
    Ok(ResponseJson(ApiResponse::success(inventories)))
}

pub async fn create_inventory(
    State(state): State<AppState>,
    ActorId(actor): ActorId,
    Json(data): Json<CreateInventory>,
) -> Result<ResponseJson<ApiResponse<Inventory>>, ApiError> {
    if data.inventory_name.trim().is_empty() {
        return Err(ApiError::BadRequest("inventory name is required".into()));
    }
    let created_by = actor.ok_or_else(|| {
        ApiError::BadRequest("an actor is required to create an inventory".into())
    })?;
    let inventory = state.inventory.create(&state.db.pool, &data, created_by).await?;
    state
        .audit
        .record(
            &state.db.pool,
            actor,
            "inventory",
            "create",
            Some(inventory.id),
            Some(&inventory.inventory_code),
        )
        .await;
    Ok(ResponseJson(ApiResponse::success(inventory)))
}

pub async fn get_sheet(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<InventorySheet>>, ApiError> {
    let sheet = state.inventory.sheet(&state.db.pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(sheet)))
}

pub async fn update_inventory(
    State(state): State<AppState>,
    ActorId(actor): ActorId,
    Path(id): Path<Uuid>,
    Json(data): Json<CreateInventory>,
) -> Result<ResponseJson<ApiResponse<Inventory>>, ApiError> {
    let inventory = state
        .inventory
        .update_details(&state.db.pool, id, &data)
        .await?;
    state
        .audit
        .record(
            &state.db.pool,
            actor,
            "inventory",
            "update",
            Some(inventory.id),
            Some(&inventory.inventory_code),
        )
        .await;
    Ok(ResponseJson(ApiResponse::success(inventory)))
}

pub async fn delete_inventory(
    State(state): State<AppState>,
    ActorId(actor): ActorId,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    state.inventory.delete(&state.db.pool, id).await?;
    state
        .audit
        .record(
            &state.db.pool,
            actor,
            "inventory",
            "delete",
            Some(id),
            None,
        )
        .await;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn generate_lines(
    State(state): State<AppState>,
    ActorId(actor): ActorId,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<u64>>, ApiError> {
    let inserted = state
        .inventory
        .generate_lines(&state.db.pool, id, actor)
        .await?;
    Ok(ResponseJson(ApiResponse::success(inserted)))
}

pub async fn save_result(
    State(state): State<AppState>,
    ActorId(actor): ActorId,
    Path((id, line_id)): Path<(Uuid, Uuid)>,
    Json(data): Json<SaveInventoryResult>,
) -> Result<ResponseJson<ApiResponse<InventoryResult>>, ApiError> {
    let line = state
        .inventory
        .save_result(&state.db.pool, id, line_id, &data, actor)
        .await?;
    Ok(ResponseJson(ApiResponse::success(line)))
}

pub async fn add_surplus(
    State(state): State<AppState>,
    ActorId(actor): ActorId,
    Path(id): Path<Uuid>,
    Json(data): Json<CreateSurplusAsset>,
) -> Result<ResponseJson<ApiResponse<InventorySurplusAsset>>, ApiError> {
    if data.name.trim().is_empty() {
        return Err(ApiError::BadRequest("surplus asset name is required".into()));
    }
    let surplus = state
        .inventory
        .add_surplus(&state.db.pool, id, &data, actor)
        .await?;
    Ok(ResponseJson(ApiResponse::success(surplus)))
}

pub async fn submit(
    State(state): State<AppState>,
    ActorId(actor): ActorId,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Inventory>>, ApiError> {
    let inventory = state.inventory.submit(&state.db.pool, id, actor).await?;
    state
        .audit
        .record(
            &state.db.pool,
            actor,
            "inventory",
            "submit",
            Some(inventory.id),
            Some(&inventory.inventory_code),
        )
        .await;
    Ok(ResponseJson(ApiResponse::success(inventory)))
}

pub async fn approve_and_lock(
    State(state): State<AppState>,
    ActorId(actor): ActorId,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Inventory>>, ApiError> {
    let inventory = state
        .inventory
        .approve_and_lock(&state.db.pool, id, actor)
        .await?;
    state
        .audit
        .record(
            &state.db.pool,
            actor,
            "inventory",
            "approve_lock",
            Some(inventory.id),
            Some(&inventory.inventory_code),
        )
        .await;
    Ok(ResponseJson(ApiResponse::success(inventory)))
}

pub async fn unlock(
    State(state): State<AppState>,
    ActorId(actor): ActorId,
    Path(id): Path<Uuid>,
    Json(data): Json<UnlockRequest>,
) -> Result<ResponseJson<ApiResponse<Inventory>>, ApiError> {
    let inventory = state
        .inventory
        .unlock(&state.db.pool, id, &data.reason, actor)
        .await?;
    state
        .audit
        .record(
            &state.db.pool,
            actor,
            "inventory",
            "unlock",
            Some(inventory.id),
            Some(&format!("{} unlocked: {}", inventory.inventory_code, data.reason)),
        )
        .await;
    Ok(ResponseJson(ApiResponse::success(inventory)))
}

pub async fn close(
    State(state): State<AppState>,
    ActorId(actor): ActorId,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Inventory>>, ApiError> {
    let inventory = state.inventory.close(&state.db.pool, id, actor).await?;
    state
        .audit
        .record(
            &state.db.pool,
            actor,
            "inventory",
            "close",
            Some(inventory.id),
            Some(&inventory.inventory_code),
        )
        .await;
    Ok(ResponseJson(ApiResponse::success(inventory)))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/inventories",
        Router::new()
            .route("/", get(list_inventories).post(create_inventory))
            .route(
                "/{id}",
                get(get_sheet).put(update_inventory).delete(delete_inventory),
            )
            .route("/{id}/generate-lines", post(generate_lines))
            .route("/{id}/results/{line_id}", put(save_result))
            .route("/{id}/surplus", post(add_surplus))
            .route("/{id}/submit", post(submit))
            .route("/{id}/approve-lock", post(approve_and_lock))
            .route("/{id}/unlock", post(unlock))
            .route("/{id}/close", post(close)),
    )
}
