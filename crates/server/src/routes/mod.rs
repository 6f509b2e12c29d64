use axum::Router;

use crate::AppState;

pub mod asset_types;
pub mod assets;
pub mod audit_logs;
pub mod health;
pub mod inventories;
pub mod maintenance;
pub mod permissions;
pub mod reports;
pub mod settings;
pub mod transfers;
pub mod trash;
pub mod users;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(assets::router())
        .merge(asset_types::router())
        .merge(users::router())
        .merge(maintenance::router())
        .merge(transfers::router())
        .merge(audit_logs::router())
        .merge(permissions::router())
        .merge(trash::router())
        .merge(inventories::router())
        .merge(settings::router())
        .merge(reports::router())
}
