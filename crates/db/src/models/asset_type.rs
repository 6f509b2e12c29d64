use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use utils::{response::Paginated, text::contains_pattern};
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct AssetType {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateAssetType {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct AssetTypeSuggestion {
    pub id: Uuid,
    pub label: String,
    pub name: String,
}

const SELECT_COLS: &str = "id, name, description, deleted_at, created_at, updated_at";

impl AssetType {
    pub async fn create(pool: &SqlitePool, data: &CreateAssetType) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, AssetType>(&format!(
            "INSERT INTO asset_types (id, name, description)
             VALUES ($1, $2, $3)
             RETURNING {SELECT_COLS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&data.name)
        .bind(&data.description)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, AssetType>(&format!(
            "SELECT {SELECT_COLS} FROM asset_types WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Whether a non-deleted type with this name already exists. `exclude`
    /// skips the row being edited.
    pub async fn name_taken(
        pool: &SqlitePool,
        name: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM asset_types
             WHERE name = $1 AND deleted_at IS NULL AND ($2 IS NULL OR id != $2)",
        )
        .bind(name)
        .bind(exclude)
        .fetch_one(pool)
        .await?;
        Ok(count > 0)
    }

    pub async fn find_all_active(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, AssetType>(&format!(
            "SELECT {SELECT_COLS} FROM asset_types WHERE deleted_at IS NULL ORDER BY name"
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn list(
        pool: &SqlitePool,
        search: Option<&str>,
        page: i64,
        per_page: i64,
    ) -> Result<Paginated<Self>, sqlx::Error> {
        let offset = (page - 1) * per_page;
        let pattern = search
            .filter(|t| !t.trim().is_empty())
            .map(|t| contains_pattern(t.trim()));

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM asset_types
             WHERE deleted_at IS NULL AND ($1 IS NULL OR lower(name) LIKE $1 ESCAPE '\\')",
        )
        .bind(&pattern)
        .fetch_one(pool)
        .await?;

        let items = sqlx::query_as::<_, AssetType>(&format!(
            "SELECT {SELECT_COLS} FROM asset_types
             WHERE deleted_at IS NULL AND ($1 IS NULL OR lower(name) LIKE $1 ESCAPE '\\')
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3"
        ))
        .bind(&pattern)
        .bind(per_page)
        .bind(offset)
        .fetch_all(pool)
        .await?;

        Ok(Paginated::new(items, page, per_page, total))
    }

    pub async fn suggest(
        pool: &SqlitePool,
        term: &str,
        limit: i64,
    ) -> Result<Vec<AssetTypeSuggestion>, sqlx::Error> {
        let rows = sqlx::query_as::<_, AssetType>(&format!(
            "SELECT {SELECT_COLS} FROM asset_types
             WHERE deleted_at IS NULL AND lower(name) LIKE $1 ESCAPE '\\'
             ORDER BY created_at DESC
             LIMIT $2"
        ))
        .bind(contains_pattern(term))
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|t| AssetTypeSuggestion {
                id: t.id,
                label: t.name.clone(),
                name: t.name,
            })
            .collect())
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &CreateAssetType,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, AssetType>(&format!(
            "UPDATE asset_types
             SET name = $2, description = $3, updated_at = CURRENT_TIMESTAMP
             WHERE id = $1
             RETURNING {SELECT_COLS}"
        ))
        .bind(id)
        .bind(&data.name)
        .bind(&data.description)
        .fetch_optional(pool)
        .await
    }

    /// Non-deleted assets still referencing this type.
    pub async fn count_assets_in_use(pool: &SqlitePool, id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM assets WHERE asset_type_id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_one(pool)
        .await
    }

    /// All referencing assets, trashed ones included. Relevant when the type
    /// row itself is about to go away.
    pub async fn count_assets_total(pool: &SqlitePool, id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM assets WHERE asset_type_id = $1")
            .bind(id)
            .fetch_one(pool)
            .await
    }

    pub async fn soft_delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE asset_types
             SET deleted_at = CURRENT_TIMESTAMP, updated_at = CURRENT_TIMESTAMP
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn restore(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE asset_types
             SET deleted_at = NULL, updated_at = CURRENT_TIMESTAMP
             WHERE id = $1 AND deleted_at IS NOT NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn find_deleted(
        pool: &SqlitePool,
        page: i64,
        per_page: i64,
    ) -> Result<Paginated<Self>, sqlx::Error> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM asset_types WHERE deleted_at IS NOT NULL")
                .fetch_one(pool)
                .await?;
        let items = sqlx::query_as::<_, AssetType>(&format!(
            "SELECT {SELECT_COLS} FROM asset_types
             WHERE deleted_at IS NOT NULL
             ORDER BY deleted_at DESC
             LIMIT $1 OFFSET $2"
        ))
        .bind(per_page)
        .bind((page - 1) * per_page)
        .fetch_all(pool)
        .await?;
        Ok(Paginated::new(items, page, per_page, total))
    }

    /// Permanent removal. Assets still pointing at this type are moved to
    /// `reassign_to` first so the foreign key stays intact.
    pub async fn hard_delete(
        pool: &SqlitePool,
        id: Uuid,
        reassign_to: Option<Uuid>,
    ) -> Result<u64, sqlx::Error> {
        let mut tx = pool.begin().await?;
        if let Some(target) = reassign_to {
            sqlx::query(
                "UPDATE assets SET asset_type_id = $2, updated_at = CURRENT_TIMESTAMP
                 WHERE asset_type_id = $1",
            )
            .bind(id)
            .bind(target)
            .execute(&mut *tx)
            .await?;
        }
        let result = sqlx::query("DELETE FROM asset_types WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected())
    }

    /// First non-deleted type other than `exclude`, used as the reassignment
    /// target when purging a type from the trash.
    pub async fn find_alternative(
        pool: &SqlitePool,
        exclude: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, AssetType>(&format!(
            "SELECT {SELECT_COLS} FROM asset_types
             WHERE id != $1 AND deleted_at IS NULL
             LIMIT 1"
        ))
        .bind(exclude)
        .fetch_optional(pool)
        .await
    }
}
