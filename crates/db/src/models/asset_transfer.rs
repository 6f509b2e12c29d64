use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteExecutor, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use utils::response::Paginated;
use uuid::Uuid;

#[derive(
    Debug, Clone, Type, Serialize, Deserialize, PartialEq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "transfer_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TransferStatus {
    #[default]
    Pending,
    Confirmed,
    Rejected,
    Cancelled,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct AssetTransfer {
    pub id: Uuid,
    pub transfer_code: String,
    pub from_user_id: Uuid,
    pub to_user_id: Uuid,
    pub asset_id: Uuid,
    pub quantity: i64,
    pub expected_quantity: i64,
    pub confirmed_quantity: i64,
    pub notes: Option<String>,
    pub status: TransferStatus,
    #[serde(skip_serializing)]
    pub confirmation_token: String,
    pub token_expires_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct TransferFilter {
    pub status: Option<TransferStatus>,
    /// Restrict to transfers this user sent or received.
    pub user_id: Option<Uuid>,
}

const SELECT_COLS: &str = "id, transfer_code, from_user_id, to_user_id, asset_id, quantity, \
     expected_quantity, confirmed_quantity, notes, status, confirmation_token, \
     token_expires_at, confirmed_at, created_at, updated_at";

fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &TransferFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(status) = filter.status.clone() {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(user_id) = filter.user_id {
        qb.push(" AND (from_user_id = ")
            .push_bind(user_id)
            .push(" OR to_user_id = ")
            .push_bind(user_id)
            .push(")");
    }
}

impl AssetTransfer {
    pub fn is_token_valid(&self, now: DateTime<Utc>) -> bool {
        now < self.token_expires_at
    }

    pub fn is_fully_confirmed(&self) -> bool {
        self.confirmed_quantity >= self.expected_quantity
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn insert(
        pool: &SqlitePool,
        transfer_code: &str,
        from_user_id: Uuid,
        to_user_id: Uuid,
        asset_id: Uuid,
        quantity: i64,
        notes: Option<&str>,
        confirmation_token: &str,
        token_expires_at: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, AssetTransfer>(&format!(
            "INSERT INTO asset_transfers (id, transfer_code, from_user_id, to_user_id, asset_id,
                 quantity, expected_quantity, notes, confirmation_token, token_expires_at)
             VALUES ($1, $2, $3, $4, $5, $6, $6, $7, $8, $9)
             RETURNING {SELECT_COLS}"
        ))
        .bind(Uuid::new_v4())
        .bind(transfer_code)
        .bind(from_user_id)
        .bind(to_user_id)
        .bind(asset_id)
        .bind(quantity)
        .bind(notes)
        .bind(confirmation_token)
        .bind(token_expires_at)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, AssetTransfer>(&format!(
            "SELECT {SELECT_COLS} FROM asset_transfers WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_token(
        pool: &SqlitePool,
        token: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, AssetTransfer>(&format!(
            "SELECT {SELECT_COLS} FROM asset_transfers WHERE confirmation_token = $1"
        ))
        .bind(token)
        .fetch_optional(pool)
        .await
    }

    /// Newest first, matching the descending `BG<n>` codes.
    pub async fn list(
        pool: &SqlitePool,
        filter: &TransferFilter,
        page: i64,
        per_page: i64,
    ) -> Result<Paginated<Self>, sqlx::Error> {
        let offset = (page - 1) * per_page;

        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM asset_transfers");
        push_filter(&mut count_qb, filter);
        let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

        let mut qb = QueryBuilder::new(format!("SELECT {SELECT_COLS} FROM asset_transfers"));
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(per_page)
            .push(" OFFSET ")
            .push_bind(offset);
        let items = qb.build_query_as::<AssetTransfer>().fetch_all(pool).await?;

        Ok(Paginated::new(items, page, per_page, total))
    }

    pub async fn find_recent_for_user(
        pool: &SqlitePool,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, AssetTransfer>(&format!(
            "SELECT {SELECT_COLS} FROM asset_transfers
             WHERE from_user_id = $1 OR to_user_id = $1
             ORDER BY created_at DESC
             LIMIT $2"
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// Highest numeric suffix among existing `BG<n>` codes.
    pub async fn max_code_seq(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COALESCE(MAX(CAST(substr(transfer_code, 3) AS INTEGER)), 0)
             FROM asset_transfers",
        )
        .fetch_one(pool)
        .await
    }

    pub async fn update_confirmation(
        executor: impl SqliteExecutor<'_>,
        id: Uuid,
        confirmed_quantity: i64,
        status: TransferStatus,
        confirmed_at: Option<DateTime<Utc>>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE asset_transfers
             SET confirmed_quantity = $2, status = $3, confirmed_at = $4,
                 updated_at = CURRENT_TIMESTAMP
             WHERE id = $1",
        )
        .bind(id)
        .bind(confirmed_quantity)
        .bind(status)
        .bind(confirmed_at)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Manager tooling: wipe the table. Returns the removed row count.
    pub async fn delete_all(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM asset_transfers")
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn count_by_status(
        pool: &SqlitePool,
        status: TransferStatus,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM asset_transfers WHERE status = $1")
            .bind(status)
            .fetch_one(pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn transfer(expected: i64, confirmed: i64, expires_in: Duration) -> AssetTransfer {
        let now = Utc::now();
        AssetTransfer {
            id: Uuid::new_v4(),
            transfer_code: "BG1".into(),
            from_user_id: Uuid::new_v4(),
            to_user_id: Uuid::new_v4(),
            asset_id: Uuid::new_v4(),
            quantity: expected,
            expected_quantity: expected,
            confirmed_quantity: confirmed,
            notes: None,
            status: TransferStatus::Pending,
            confirmation_token: "tok".into(),
            token_expires_at: now + expires_in,
            confirmed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_token_validity() {
        let t = transfer(1, 0, Duration::days(7));
        assert!(t.is_token_valid(Utc::now()));
        let expired = transfer(1, 0, Duration::days(-1));
        assert!(!expired.is_token_valid(Utc::now()));
    }

    #[test]
    fn test_fully_confirmed() {
        assert!(!transfer(3, 2, Duration::days(7)).is_fully_confirmed());
        assert!(transfer(3, 3, Duration::days(7)).is_fully_confirmed());
    }
}
