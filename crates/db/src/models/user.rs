use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use ts_rs::TS;
use utils::{
    response::Paginated,
    text::contains_pattern,
};
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub email: String,
    pub name: Option<String>,
    pub role_id: Uuid,
    pub is_active: bool,
    pub asset_quota: i64,
    pub deleted_at: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateUser {
    pub username: String,
    pub password: String,
    pub email: String,
    pub name: Option<String>,
    pub role_id: Uuid,
    pub asset_quota: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UpdateUser {
    pub email: Option<String>,
    pub name: Option<String>,
    pub role_id: Option<Uuid>,
    pub is_active: Option<bool>,
    pub asset_quota: Option<i64>,
    /// Resets the password when present.
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct UserFilter {
    pub search: Option<String>,
    pub role_id: Option<Uuid>,
}

/// Autocomplete entry for the user pickers.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct UserSuggestion {
    pub id: Uuid,
    pub label: String,
    pub username: String,
    pub email: String,
    pub name: String,
}

const SELECT_COLS: &str = "id, username, password_hash, email, name, role_id, is_active, \
     asset_quota, deleted_at, last_login, created_at, updated_at";

/// Salted SHA-256, stored as `hex(salt)$hex(digest)`.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);
    let digest = Sha256::new()
        .chain_update(salt)
        .chain_update(password.as_bytes())
        .finalize();
    format!("{}${}", hex::encode(salt), hex::encode(digest))
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_hex, digest_hex)) = stored.split_once('$') else {
        return false;
    };
    let Ok(salt) = hex::decode(salt_hex) else {
        return false;
    };
    let digest = Sha256::new()
        .chain_update(&salt)
        .chain_update(password.as_bytes())
        .finalize();
    hex::encode(digest) == digest_hex
}

fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &UserFilter) {
    qb.push(" WHERE deleted_at IS NULL");
    if let Some(term) = filter.search.as_deref().filter(|t| !t.trim().is_empty()) {
        let pattern = contains_pattern(term.trim());
        qb.push(" AND (lower(username) LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR lower(email) LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }
    if let Some(role_id) = filter.role_id {
        qb.push(" AND role_id = ").push_bind(role_id);
    }
}

impl User {
    pub async fn create(pool: &SqlitePool, data: &CreateUser) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (id, username, password_hash, email, name, role_id, asset_quota)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {SELECT_COLS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&data.username)
        .bind(hash_password(&data.password))
        .bind(&data.email)
        .bind(&data.name)
        .bind(data.role_id)
        .bind(data.asset_quota.unwrap_or(0))
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!("SELECT {SELECT_COLS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_username(
        pool: &SqlitePool,
        username: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {SELECT_COLS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(pool)
        .await
    }

    /// Active (non-deleted) users, ordered by username, with search and role
    /// filters.
    pub async fn list(
        pool: &SqlitePool,
        filter: &UserFilter,
        page: i64,
        per_page: i64,
    ) -> Result<Paginated<Self>, sqlx::Error> {
        let offset = (page - 1) * per_page;

        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM users");
        push_filter(&mut count_qb, filter);
        let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

        let mut qb = QueryBuilder::new(format!("SELECT {SELECT_COLS} FROM users"));
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY lower(username) LIMIT ")
            .push_bind(per_page)
            .push(" OFFSET ")
            .push_bind(offset);
        let items = qb.build_query_as::<User>().fetch_all(pool).await?;

        Ok(Paginated::new(items, page, per_page, total))
    }

    pub async fn suggest(
        pool: &SqlitePool,
        term: &str,
        limit: i64,
    ) -> Result<Vec<UserSuggestion>, sqlx::Error> {
        let pattern = contains_pattern(term);
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {SELECT_COLS} FROM users
             WHERE deleted_at IS NULL
               AND (lower(username) LIKE $1 ESCAPE '\\'
                 OR lower(email) LIKE $1 ESCAPE '\\'
                 OR lower(COALESCE(name, '')) LIKE $1 ESCAPE '\\')
             LIMIT $2"
        ))
        .bind(pattern)
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(users
            .into_iter()
            .map(|u| {
                let mut label = u.username.clone();
                if !u.email.is_empty() {
                    label.push_str(&format!(" ({})", u.email));
                }
                if let Some(name) = u.name.as_deref().filter(|n| !n.is_empty()) {
                    label.push_str(&format!(" - {name}"));
                }
                UserSuggestion {
                    id: u.id,
                    label,
                    username: u.username,
                    email: u.email,
                    name: u.name.unwrap_or_default(),
                }
            })
            .collect())
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &UpdateUser,
    ) -> Result<Option<Self>, sqlx::Error> {
        let Some(existing) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };
        let password_hash = match data.password.as_deref() {
            Some(p) => hash_password(p),
            None => existing.password_hash.clone(),
        };
        sqlx::query_as::<_, User>(&format!(
            "UPDATE users
             SET email = $2, name = $3, role_id = $4, is_active = $5, asset_quota = $6,
                 password_hash = $7, updated_at = CURRENT_TIMESTAMP
             WHERE id = $1
             RETURNING {SELECT_COLS}"
        ))
        .bind(id)
        .bind(data.email.as_deref().unwrap_or(&existing.email))
        .bind(data.name.as_ref().or(existing.name.as_ref()))
        .bind(data.role_id.unwrap_or(existing.role_id))
        .bind(data.is_active.unwrap_or(existing.is_active))
        .bind(data.asset_quota.unwrap_or(existing.asset_quota))
        .bind(password_hash)
        .fetch_optional(pool)
        .await
    }

    pub async fn touch_last_login(pool: &SqlitePool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE users SET last_login = CURRENT_TIMESTAMP WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Non-deleted assets still owned by this user.
    pub async fn count_owned_assets(pool: &SqlitePool, id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM assets WHERE user_id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_one(pool)
        .await
    }

    /// Soft delete also deactivates the account.
    pub async fn soft_delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users
             SET deleted_at = CURRENT_TIMESTAMP, is_active = 0, updated_at = CURRENT_TIMESTAMP
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn restore(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users
             SET deleted_at = NULL, is_active = 1, updated_at = CURRENT_TIMESTAMP
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
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE deleted_at IS NOT NULL")
                .fetch_one(pool)
                .await?;
        let items = sqlx::query_as::<_, User>(&format!(
            "SELECT {SELECT_COLS} FROM users
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

    /// Permanent removal. Owned assets are detached, not deleted.
    pub async fn hard_delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let mut tx = pool.begin().await?;
        sqlx::query("UPDATE assets SET user_id = NULL WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM asset_users WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM user_permissions WHERE user_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected())
    }

    /// Assigned-asset counts over the asset/user assignment table, non-deleted
    /// assets only.
    pub async fn assigned_asset_counts(
        pool: &SqlitePool,
    ) -> Result<Vec<(Uuid, String, i64)>, sqlx::Error> {
        sqlx::query_as(
            "SELECT u.id, u.username, COUNT(a.id)
             FROM users u
             LEFT JOIN asset_users au ON au.user_id = u.id
             LEFT JOIN assets a ON a.id = au.asset_id AND a.deleted_at IS NULL
             WHERE u.deleted_at IS NULL
             GROUP BY u.id, u.username
             ORDER BY COUNT(a.id) DESC, lower(u.username)",
        )
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_roundtrip() {
        let stored = hash_password("mật khẩu 123");
        assert!(verify_password("mật khẩu 123", &stored));
        assert!(!verify_password("wrong", &stored));
    }

    #[test]
    fn test_password_salts_differ() {
        assert_ne!(hash_password("abc"), hash_password("abc"));
    }

    #[test]
    fn test_verify_rejects_malformed_hash() {
        assert!(!verify_password("abc", "not-a-hash"));
        assert!(!verify_password("abc", "zz$zz"));
    }
}
