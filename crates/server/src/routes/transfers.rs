//! Routes for asset handovers and their confirmation links.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::{delete, get, post},
};
use db::models::asset_transfer::{AssetTransfer, TransferFilter};
use serde::{Deserialize, Serialize};
use services::services::transfer::{ConfirmTransfer, CreateTransfer};
use ts_rs::TS;
use utils::response::{ApiResponse, PageParams, Paginated};
use uuid::Uuid;

use crate::{AppState, actor::ActorId, error::ApiError};

/// Create response: the transfer plus the in-app confirmation path the
/// frontend hands to the recipient. The raw token never serializes on the
/// transfer itself.
#[derive(Debug, Serialize, TS)]
pub struct CreatedTransfer {
    #[serde(flatten)]
    pub transfer: AssetTransfer,
    pub confirm_path: String,
}

#[derive(Debug, Deserialize, TS)]
pub struct ListTransfersQuery {
    #[serde(flatten)]
    pub page: PageParams,
    #[serde(flatten)]
    pub filter: TransferFilter,
}

pub async fn list_transfers(
    State(state): State<AppState>,
    Query(query): Query<ListTransfersQuery>,
) -> Result<ResponseJson<ApiResponse<Paginated<AssetTransfer>>>, ApiError> {
    let (page, per_page, _) = query.page.clamp();
    let transfers = state
        .transfer
        .list(&state.db.pool, &query.filter, page, per_page)
        .await?;
    Ok(ResponseJson(ApiResponse::success(transfers)))
}

pub async fn get_transfer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<AssetTransfer>>, ApiError> {
    let transfer = state.transfer.find_by_id(&state.db.pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(transfer)))
}

pub async fn create_transfer(
    State(state): State<AppState>,
    ActorId(actor): ActorId,
    Json(data): Json<CreateTransfer>,
) -> Result<ResponseJson<ApiResponse<CreatedTransfer>>, ApiError> {
    let transfer = state.transfer.create(&state.db.pool, &data).await?;
    state
        .audit
        .record(
            &state.db.pool,
            actor,
            "transfer",
            "create",
            Some(transfer.id),
            Some(&transfer.transfer_code),
        )
        .await;
    let confirm_path = format!("/transfer/confirm/{}", transfer.confirmation_token);
    Ok(ResponseJson(ApiResponse::success(CreatedTransfer {
        transfer,
        confirm_path,
    })))
}

/// Token-addressed lookup used by the confirmation page.
pub async fn get_by_token(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<ResponseJson<ApiResponse<AssetTransfer>>, ApiError> {
    let transfer = state.transfer.find_by_token(&state.db.pool, &token).await?;
    Ok(ResponseJson(ApiResponse::success(transfer)))
}

pub async fn confirm_transfer(
    State(state): State<AppState>,
    ActorId(actor): ActorId,
    Json(data): Json<ConfirmTransfer>,
) -> Result<ResponseJson<ApiResponse<AssetTransfer>>, ApiError> {
    let transfer = state.transfer.confirm(&state.db.pool, &data).await?;
    state
        .audit
        .record(
            &state.db.pool,
            actor,
            "transfer",
            "confirm",
            Some(transfer.id),
            Some(&format!(
                "{} confirmed {}/{}",
                transfer.transfer_code, transfer.confirmed_quantity, transfer.expected_quantity
            )),
        )
        .await;
    Ok(ResponseJson(ApiResponse::success(transfer)))
}

pub async fn reject_transfer(
    State(state): State<AppState>,
    ActorId(actor): ActorId,
    Path(token): Path<String>,
) -> Result<ResponseJson<ApiResponse<AssetTransfer>>, ApiError> {
    let transfer = state.transfer.reject(&state.db.pool, &token).await?;
    state
        .audit
        .record(
            &state.db.pool,
            actor,
            "transfer",
            "reject",
            Some(transfer.id),
            Some(&transfer.transfer_code),
        )
        .await;
    Ok(ResponseJson(ApiResponse::success(transfer)))
}

pub async fn cancel_transfer(
    State(state): State<AppState>,
    ActorId(actor): ActorId,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<AssetTransfer>>, ApiError> {
    let transfer = state.transfer.cancel(&state.db.pool, id).await?;
    state
        .audit
        .record(
            &state.db.pool,
            actor,
            "transfer",
            "cancel",
            Some(transfer.id),
            Some(&transfer.transfer_code),
        )
        .await;
    Ok(ResponseJson(ApiResponse::success(transfer)))
}

/// Manager tooling: empty the whole handover history.
pub async fn delete_all_transfers(
    State(state): State<AppState>,
    ActorId(actor): ActorId,
) -> Result<ResponseJson<ApiResponse<u64>>, ApiError> {
    let removed = state.transfer.delete_all(&state.db.pool).await?;
    state
        .audit
        .record(
            &state.db.pool,
            actor,
            "transfer",
            "delete_all",
            None,
            Some(&format!("removed {removed} transfer(s)")),
        )
        .await;
    Ok(ResponseJson(ApiResponse::success(removed)))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/transfers",
        Router::new()
            .route("/", get(list_transfers).post(create_transfer))
            .route("/all", delete(delete_all_transfers))
            .route("/confirm", post(confirm_transfer))
            .route("/token/{token}", get(get_by_token))
            .route("/token/{token}/reject", post(reject_transfer))
            .route("/{id}", get(get_transfer))
            .route("/{id}/cancel", post(cancel_transfer)),
    )
}
