//! Routes for the audit trail.

use axum::{
    Router,
    extract::{Query, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::audit_log::{AuditLog, AuditLogFilter};
use serde::Deserialize;
use ts_rs::TS;
use utils::response::{ApiResponse, PageParams, Paginated};

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize, TS)]
pub struct ListAuditLogsQuery {
    #[serde(flatten)]
    pub page: PageParams,
    #[serde(flatten)]
    pub filter: AuditLogFilter,
}

pub async fn list_audit_logs(
    State(state): State<AppState>,
    Query(query): Query<ListAuditLogsQuery>,
) -> Result<ResponseJson<ApiResponse<Paginated<AuditLog>>>, ApiError> {
    let (page, per_page, _) = query.page.clamp();
    let logs = state
        .audit
        .list(&state.db.pool, &query.filter, page, per_page)
        .await?;
    Ok(ResponseJson(ApiResponse::success(logs)))
}

pub async fn list_modules(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<String>>>, ApiError> {
    let modules = state.audit.modules(&state.db.pool).await?;
    Ok(ResponseJson(ApiResponse::success(modules)))
}

pub fn router() -> Router<AppState> {
    Router::new().nest(
        "/audit-logs",
        Router::new()
            .route("/", get(list_audit_logs))
            .route("/modules", get(list_modules)),
    )
}
