use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_MANAGER: &str = "manager";
pub const ROLE_USER: &str = "user";

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Role>(
            "SELECT id, name, description, created_at, updated_at FROM roles ORDER BY name",
        )
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Role>(
            "SELECT id, name, description, created_at, updated_at FROM roles WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_name(pool: &SqlitePool, name: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Role>(
            "SELECT id, name, description, created_at, updated_at FROM roles WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(pool)
        .await
    }

    /// Seed the built-in roles. Existing rows are left untouched.
    pub async fn ensure_defaults(pool: &SqlitePool) -> Result<(), sqlx::Error> {
        let defaults = [
            (ROLE_ADMIN, "Quản trị viên hệ thống"),
            (ROLE_MANAGER, "Quản lý tài sản"),
            (ROLE_USER, "Người dùng"),
        ];
        for (name, description) in defaults {
            sqlx::query(
                "INSERT INTO roles (id, name, description) VALUES ($1, $2, $3)
                 ON CONFLICT(name) DO NOTHING",
            )
            .bind(Uuid::new_v4())
            .bind(name)
            .bind(description)
            .execute(pool)
            .await?;
        }
        Ok(())
    }
}
