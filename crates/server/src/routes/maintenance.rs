//! Routes for maintenance and repair records.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::get,
};
use chrono::Utc;
use db::models::maintenance_record::{
    CreateMaintenanceRecord, MaintenanceFilter, MaintenanceRecord,
};
use serde::Deserialize;
use ts_rs::TS;
use utils::response::{ApiResponse, PageParams, Paginated};
use uuid::Uuid;

use crate::{AppState, actor::ActorId, error::ApiError};

#[derive(Debug, Deserialize, TS)]
pub struct ListMaintenanceQuery {
    #[serde(flatten)]
    pub page: PageParams,
    #[serde(flatten)]
    pub filter: MaintenanceFilter,
}

pub async fn list_records(
    State(state): State<AppState>,
    Query(query): Query<ListMaintenanceQuery>,
) -> Result<ResponseJson<ApiResponse<Paginated<MaintenanceRecord>>>, ApiError> {
    let (page, per_page, _) = query.page.clamp();
    let records = MaintenanceRecord::list(&state.db.pool, &query.filter, page, per_page).await?;
    Ok(ResponseJson(ApiResponse::success(records)))
}

pub async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<MaintenanceRecord>>, ApiError> {
    let record = MaintenanceRecord::find_by_id(&state.db.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("maintenance record not found".into()))?;
    Ok(ResponseJson(ApiResponse::success(record)))
}

pub async fn create_record(
    State(state): State<AppState>,
    ActorId(actor): ActorId,
    Json(data): Json<CreateMaintenanceRecord>,
) -> Result<ResponseJson<ApiResponse<MaintenanceRecord>>, ApiError> {
    let record =
        MaintenanceRecord::create(&state.db.pool, &data, Utc::now().date_naive()).await?;
    state
        .audit
        .record(
            &state.db.pool,
            actor,
            "maintenance",
            "create",
            Some(record.id),
            record.maintenance_reason.as_deref(),
        )
        .await;
    Ok(ResponseJson(ApiResponse::success(record)))
}

pub async fn update_record(
    State(state): State<AppState>,
    ActorId(actor): ActorId,
    Path(id): Path<Uuid>,
    Json(data): Json<CreateMaintenanceRecord>,
) -> Result<ResponseJson<ApiResponse<MaintenanceRecord>>, ApiError> {
    let record = MaintenanceRecord::update(&state.db.pool, id, &data, Utc::now().date_naive())
        .await?
        .ok_or_else(|| ApiError::NotFound("maintenance record not found".into()))?;
    state
        .audit
        .record(
            &state.db.pool,
            actor,
            "maintenance",
            "update",
            Some(record.id),
            None,
        )
        .await;
    Ok(ResponseJson(ApiResponse::success(record)))
}

pub async fn delete_record(
    State(state): State<AppState>,
    ActorId(actor): ActorId,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    if MaintenanceRecord::soft_delete(&state.db.pool, id).await? == 0 {
        return Err(ApiError::NotFound("maintenance record not found".into()));
    }
    state
        .audit
        .record(
            &state.db.pool,
            actor,
            "maintenance",
            "delete",
            Some(id),
            None,
        )
        .await;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn list_overdue(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<MaintenanceRecord>>>, ApiError> {
    let records =
        MaintenanceRecord::find_overdue(&state.db.pool, Utc::now().date_naive()).await?;
    Ok(ResponseJson(ApiResponse::success(records)))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/maintenance",
        Router::new()
            .route("/", get(list_records).post(create_record))
            .route("/overdue", get(list_overdue))
            .route(
                "/{id}",
                get(get_record).put(update_record).delete(delete_record),
            ),
    )
}
