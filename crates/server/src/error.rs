use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use services::services::{
    inventory::InventoryError, permission::PermissionError, transfer::TransferError,
    trash::TrashError,
};
use thiserror::Error;
use tracing::error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Transfer(#[from] TransferError),
    #[error(transparent)]
    Trash(#[from] TrashError),
    #[error(transparent)]
    Permission(#[from] PermissionError),
    #[error(transparent)]
    Inventory(#[from] InventoryError),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Conflict(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Transfer(e) => match e {
                TransferError::NotFound | TransferError::AssetNotFound
                | TransferError::UserNotFound => StatusCode::NOT_FOUND,
                TransferError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
                TransferError::TokenExpired => StatusCode::GONE,
                _ => StatusCode::BAD_REQUEST,
            },
            ApiError::Trash(e) => match e {
                TrashError::NotFound => StatusCode::NOT_FOUND,
                TrashError::TypeStillReferenced => StatusCode::CONFLICT,
                TrashError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Permission(e) => match e {
                PermissionError::UserNotFound => StatusCode::NOT_FOUND,
                PermissionError::AdminImmutable => StatusCode::FORBIDDEN,
                PermissionError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Inventory(e) => match e {
                InventoryError::NotFound | InventoryError::LineNotFound => StatusCode::NOT_FOUND,
                InventoryError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
                InventoryError::InvalidTransition { .. }
                | InventoryError::NotEditable(_)
                | InventoryError::NotLocked
                | InventoryError::NotDraft => StatusCode::CONFLICT,
                InventoryError::ReasonRequired => StatusCode::BAD_REQUEST,
            },
            ApiError::Database(sqlx::Error::RowNotFound) => StatusCode::NOT_FOUND,
            ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("internal error: {self}");
        }
        let body: ApiResponse<()> = ApiResponse::error(&self.to_string());
        (status, Json(body)).into_response()
    }
}
