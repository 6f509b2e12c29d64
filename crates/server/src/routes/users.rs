//! Routes for users and roles.

use std::collections::HashMap;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::Json as ResponseJson,
    routing::get,
};
use db::models::{
    asset::Asset,
    role::Role,
    user::{CreateUser, UpdateUser, User, UserFilter, UserSuggestion},
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utils::response::{ApiResponse, PageParams, Paginated};
use uuid::Uuid;

use crate::{AppState, actor::ActorId, error::ApiError};

#[derive(Debug, Deserialize, TS)]
pub struct ListUsersQuery {
    #[serde(flatten)]
    pub page: PageParams,
    #[serde(flatten)]
    pub filter: UserFilter,
}

#[derive(Debug, Deserialize, TS)]
pub struct SuggestQuery {
    pub q: String,
}

/// User row plus how many assets are currently assigned to them.
#[derive(Debug, Serialize, TS)]
pub struct UserListItem {
    #[serde(flatten)]
    pub user: User,
    pub asset_count: i64,
}

pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
) -> Result<ResponseJson<ApiResponse<Paginated<UserListItem>>>, ApiError> {
    let (page, per_page, _) = query.page.clamp();
    let users = User::list(&state.db.pool, &query.filter, page, per_page).await?;
    let counts: HashMap<Uuid, i64> = User::assigned_asset_counts(&state.db.pool)
        .await?
        .into_iter()
        .map(|(id, _, count)| (id, count))
        .collect();
    let users = users.map(|user| {
        let asset_count = counts.get(&user.id).copied().unwrap_or(0);
        UserListItem { user, asset_count }
    });
    Ok(ResponseJson(ApiResponse::success(users)))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    let user = User::find_by_id(&state.db.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".into()))?;
    Ok(ResponseJson(ApiResponse::success(user)))
}

pub async fn create_user(
    State(state): State<AppState>,
    ActorId(actor): ActorId,
    Json(data): Json<CreateUser>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    if data.username.trim().is_empty() || data.password.is_empty() {
        return Err(ApiError::BadRequest(
            "username and password are required".into(),
        ));
    }
    if User::find_by_username(&state.db.pool, data.username.trim())
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict(format!(
            "username '{}' already exists",
            data.username.trim()
        )));
    }
    let user = User::create(&state.db.pool, &data).await?;
    state
        .audit
        .record(
            &state.db.pool,
            actor,
            "users",
            "create",
            Some(user.id),
            Some(&user.username),
        )
        .await;
    Ok(ResponseJson(ApiResponse::success(user)))
}

pub async fn update_user(
    State(state): State<AppState>,
    ActorId(actor): ActorId,
    Path(id): Path<Uuid>,
    Json(data): Json<UpdateUser>,
) -> Result<ResponseJson<ApiResponse<User>>, ApiError> {
    let user = User::update(&state.db.pool, id, &data)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".into()))?;
    state
        .audit
        .record(
            &state.db.pool,
            actor,
            "users",
            "update",
            Some(user.id),
            Some(&user.username),
        )
        .await;
    Ok(ResponseJson(ApiResponse::success(user)))
}

/// Users still holding assets cannot be removed.
pub async fn delete_user(
    State(state): State<AppState>,
    ActorId(actor): ActorId,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let user = User::find_by_id(&state.db.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".into()))?;
    let owned = User::count_owned_assets(&state.db.pool, id).await?;
    if owned > 0 {
        return Err(ApiError::Conflict(format!(
            "user still holds {owned} asset(s)"
        )));
    }
    if User::soft_delete(&state.db.pool, id).await? == 0 {
        return Err(ApiError::NotFound("user not found".into()));
    }
    state
        .audit
        .record(
            &state.db.pool,
            actor,
            "users",
            "delete",
            Some(id),
            Some(&user.username),
        )
        .await;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn suggest_users(
    State(state): State<AppState>,
    Query(query): Query<SuggestQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<UserSuggestion>>>, ApiError> {
    if query.q.trim().chars().count() < 2 {
        return Ok(ResponseJson(ApiResponse::success(Vec::new())));
    }
    let suggestions = User::suggest(&state.db.pool, &query.q, 10).await?;
    Ok(ResponseJson(ApiResponse::success(suggestions)))
}

pub async fn get_user_assets(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<Vec<Asset>>>, ApiError> {
    User::find_by_id(&state.db.pool, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".into()))?;
    let assets = Asset::find_by_owner(&state.db.pool, id).await?;
    Ok(ResponseJson(ApiResponse::success(assets)))
}

pub async fn list_roles(
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<Role>>>, ApiError> {
    let roles = Role::find_all(&state.db.pool).await?;
    Ok(ResponseJson(ApiResponse::success(roles)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .nest(
            "/users",
            Router::new()
                .route("/", get(list_users).post(create_user))
                .route("/suggest", get(suggest_users))
                .route("/{id}", get(get_user).put(update_user).delete(delete_user))
                .route("/{id}/assets", get(get_user_assets)),
        )
        .route("/roles", get(list_roles))
}
