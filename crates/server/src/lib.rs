use axum::Router;
use db::DBService;
use services::services::{
    audit::AuditService, inventory::InventoryService, permission::PermissionService,
    stats::StatsService, transfer::TransferService, trash::TrashService,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod actor;
pub mod error;
pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub db: DBService,
    pub audit: AuditService,
    pub transfer: TransferService,
    pub trash: TrashService,
    pub permission: PermissionService,
    pub inventory: InventoryService,
    pub stats: StatsService,
}

impl AppState {
    pub fn new(db: DBService) -> Self {
        Self {
            db,
            audit: AuditService::new(),
            transfer: TransferService::new(),
            trash: TrashService::new(),
            permission: PermissionService::new(),
            inventory: InventoryService::new(),
            stats: StatsService::new(),
        }
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api", routes::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
