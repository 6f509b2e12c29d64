use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct SystemSetting {
    pub id: Uuid,
    pub key: String,
    pub value: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SystemSetting {
    pub async fn get(pool: &SqlitePool, key: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, SystemSetting>(
            "SELECT id, key, value, description, created_at, updated_at
             FROM system_settings WHERE key = $1",
        )
        .bind(key)
        .fetch_optional(pool)
        .await
    }

    pub async fn set(
        pool: &SqlitePool,
        key: &str,
        value: Option<&str>,
        description: Option<&str>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, SystemSetting>(
            "INSERT INTO system_settings (id, key, value, description)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT (key) DO UPDATE SET
                 value = excluded.value,
                 description = COALESCE(excluded.description, system_settings.description),
                 updated_at = CURRENT_TIMESTAMP
             RETURNING id, key, value, description, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(key)
        .bind(value)
        .bind(description)
        .fetch_one(pool)
        .await
    }

    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, SystemSetting>(
            "SELECT id, key, value, description, created_at, updated_at
             FROM system_settings ORDER BY key",
        )
        .fetch_all(pool)
        .await
    }
}
