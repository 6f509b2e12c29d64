use std::net::SocketAddr;

use db::{
    DBService,
    models::{permission::Permission, role::Role},
};
use server::{AppState, app};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    utils::logging::init("info,sqlx=warn");

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://assets.db".to_string());
    let db = DBService::new(&database_url).await?;

    Role::ensure_defaults(&db.pool).await?;
    Permission::ensure_defaults(&db.pool).await?;

    let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000);
    let addr: SocketAddr = format!("{host}:{port}").parse()?;

    let state = AppState::new(db);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on {addr}");
    axum::serve(listener, app(state)).await?;
    Ok(())
}
