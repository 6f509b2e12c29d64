use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use utils::response::Paginated;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "inventory_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum InventoryStatus {
    #[default]
    Draft,
    InProgress,
    Submitted,
    ApprovedLocked,
    Closed,
}

impl InventoryStatus {
    /// Allowed forward transitions. Unlock back to in_progress is handled
    /// separately because it requires a reason.
    pub fn can_advance_to(self, next: InventoryStatus) -> bool {
        use InventoryStatus::*;
        matches!(
            (self, next),
            (Draft, InProgress)
                | (InProgress, Submitted)
                | (Submitted, ApprovedLocked)
                | (ApprovedLocked, Closed)
        )
    }

    pub fn is_editable(self) -> bool {
        matches!(self, InventoryStatus::Draft | InventoryStatus::InProgress)
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Inventory {
    pub id: Uuid,
    pub inventory_code: String,
    pub inventory_name: String,
    pub inventory_time: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub inventory_type: Option<String>,
    pub scope_type: Option<String>,
    pub scope: Option<String>,
    pub decision_number: Option<String>,
    pub decision_date: Option<NaiveDate>,
    pub status: InventoryStatus,
    pub locked_at: Option<DateTime<Utc>>,
    pub locked_by_id: Option<Uuid>,
    pub closed_at: Option<DateTime<Utc>>,
    pub closed_by_id: Option<Uuid>,
    pub created_by_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateInventory {
    pub inventory_name: String,
    pub inventory_time: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub inventory_type: Option<String>,
    pub scope_type: Option<String>,
    pub scope: Option<String>,
    pub decision_number: Option<String>,
    pub decision_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct InventoryResult {
    pub id: Uuid,
    pub inventory_id: Uuid,
    pub asset_id: Uuid,
    pub book_quantity: i64,
    pub book_value: f64,
    pub book_asset_type_id: Option<Uuid>,
    pub book_status: Option<String>,
    pub actual_quantity: Option<i64>,
    pub actual_condition: Option<String>,
    pub actual_value: Option<f64>,
    pub actual_serial_plate: Option<String>,
    pub difference: Option<f64>,
    pub notes: Option<String>,
    pub checked_by_id: Option<Uuid>,
    pub checked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct SaveInventoryResult {
    pub actual_quantity: Option<i64>,
    pub actual_condition: Option<String>,
    pub actual_value: Option<f64>,
    pub actual_serial_plate: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct InventorySurplusAsset {
    pub id: Uuid,
    pub inventory_id: Uuid,
    pub name: String,
    pub asset_type_id: Option<Uuid>,
    pub quantity: i64,
    pub estimated_start_year: Option<i64>,
    pub origin: Option<String>,
    pub status: String,
    pub notes: Option<String>,
    pub created_by_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateSurplusAsset {
    pub name: String,
    pub asset_type_id: Option<Uuid>,
    pub quantity: Option<i64>,
    pub estimated_start_year: Option<i64>,
    pub origin: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct InventoryLog {
    pub id: Uuid,
    pub inventory_id: Uuid,
    pub action: String,
    pub from_status: Option<String>,
    pub to_status: Option<String>,
    pub reason: Option<String>,
    pub actor_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct InventoryFilter {
    pub status: Option<InventoryStatus>,
    pub search: Option<String>,
}

const SELECT_COLS: &str = "id, inventory_code, inventory_name, inventory_time, start_date, \
     end_date, inventory_type, scope_type, scope, decision_number, decision_date, status, \
     locked_at, locked_by_id, closed_at, closed_by_id, created_by_id, created_at, updated_at";

const RESULT_COLS: &str = "id, inventory_id, asset_id, book_quantity, book_value, \
     book_asset_type_id, book_status, actual_quantity, actual_condition, actual_value, \
     actual_serial_plate, difference, notes, checked_by_id, checked_at";

fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &InventoryFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(search) = filter.search.as_deref() {
        let pattern = utils::text::contains_pattern(search);
        qb.push(" AND (lower(inventory_name) LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR lower(inventory_code) LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }
}

impl Inventory {
    pub async fn create(
        pool: &SqlitePool,
        inventory_code: &str,
        data: &CreateInventory,
        created_by_id: Uuid,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Inventory>(&format!(
            "INSERT INTO inventories (id, inventory_code, inventory_name, inventory_time,
                 start_date, end_date, inventory_type, scope_type, scope, decision_number,
                 decision_date, created_by_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             RETURNING {SELECT_COLS}"
        ))
        .bind(Uuid::new_v4())
        .bind(inventory_code)
        .bind(&data.inventory_name)
        .bind(&data.inventory_time)
        .bind(data.start_date)
        .bind(data.end_date)
        .bind(&data.inventory_type)
        .bind(&data.scope_type)
        .bind(&data.scope)
        .bind(&data.decision_number)
        .bind(data.decision_date)
        .bind(created_by_id)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Inventory>(&format!(
            "SELECT {SELECT_COLS} FROM inventories WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn list(
        pool: &SqlitePool,
        filter: &InventoryFilter,
        page: i64,
        per_page: i64,
    ) -> Result<Paginated<Self>, sqlx::Error> {
        let offset = (page - 1) * per_page;

        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM inventories");
        push_filter(&mut count_qb, filter);
        let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

        let mut qb = QueryBuilder::new(format!("SELECT {SELECT_COLS} FROM inventories"));
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(per_page)
            .push(" OFFSET ")
            .push_bind(offset);
        let items = qb.build_query_as::<Inventory>().fetch_all(pool).await?;

        Ok(Paginated::new(items, page, per_page, total))
    }

    /// Highest numeric suffix among existing `KK<n>` codes.
    pub async fn max_code_seq(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT COALESCE(MAX(CAST(substr(inventory_code, 3) AS INTEGER)), 0)
             FROM inventories",
        )
        .fetch_one(pool)
        .await
    }

    pub async fn update_details(
        pool: &SqlitePool,
        id: Uuid,
        data: &CreateInventory,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Inventory>(&format!(
            "UPDATE inventories
             SET inventory_name = $2, inventory_time = $3, start_date = $4, end_date = $5,
                 inventory_type = $6, scope_type = $7, scope = $8, decision_number = $9,
                 decision_date = $10, updated_at = CURRENT_TIMESTAMP
             WHERE id = $1
             RETURNING {SELECT_COLS}"
        ))
        .bind(id)
        .bind(&data.inventory_name)
        .bind(&data.inventory_time)
        .bind(data.start_date)
        .bind(data.end_date)
        .bind(&data.inventory_type)
        .bind(&data.scope_type)
        .bind(&data.scope)
        .bind(&data.decision_number)
        .bind(data.decision_date)
        .fetch_optional(pool)
        .await
    }

    pub async fn set_status(
        pool: &SqlitePool,
        id: Uuid,
        status: InventoryStatus,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE inventories SET status = $2, updated_at = CURRENT_TIMESTAMP WHERE id = $1",
        )
        .bind(id)
        .bind(status)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn mark_locked(
        pool: &SqlitePool,
        id: Uuid,
        locked_by_id: Option<Uuid>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE inventories
             SET status = $2, locked_at = $3, locked_by_id = $4, updated_at = CURRENT_TIMESTAMP
             WHERE id = $1",
        )
        .bind(id)
        .bind(InventoryStatus::ApprovedLocked)
        .bind(Utc::now())
        .bind(locked_by_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn mark_closed(
        pool: &SqlitePool,
        id: Uuid,
        closed_by_id: Option<Uuid>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE inventories
             SET status = $2, closed_at = $3, closed_by_id = $4, updated_at = CURRENT_TIMESTAMP
             WHERE id = $1",
        )
        .bind(id)
        .bind(InventoryStatus::Closed)
        .bind(Utc::now())
        .bind(closed_by_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn mark_unlocked(pool: &SqlitePool, id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE inventories
             SET status = $2, locked_at = NULL, locked_by_id = NULL,
                 updated_at = CURRENT_TIMESTAMP
             WHERE id = $1",
        )
        .bind(id)
        .bind(InventoryStatus::InProgress)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM inventories WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

impl InventoryResult {
    /// Snapshot one asset into the count sheet. The unique constraint on
    /// (inventory_id, asset_id) makes repeated generation idempotent.
    pub async fn insert_snapshot(
        pool: &SqlitePool,
        inventory_id: Uuid,
        asset_id: Uuid,
        book_quantity: i64,
        book_value: f64,
        book_asset_type_id: Option<Uuid>,
        book_status: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO inventory_results (id, inventory_id, asset_id, book_quantity,
                 book_value, book_asset_type_id, book_status)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (inventory_id, asset_id) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(inventory_id)
        .bind(asset_id)
        .bind(book_quantity)
        .bind(book_value)
        .bind(book_asset_type_id)
        .bind(book_status)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, InventoryResult>(&format!(
            "SELECT {RESULT_COLS} FROM inventory_results WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_for_inventory(
        pool: &SqlitePool,
        inventory_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, InventoryResult>(&format!(
            "SELECT {RESULT_COLS} FROM inventory_results WHERE inventory_id = $1
             ORDER BY checked_at IS NOT NULL, id"
        ))
        .bind(inventory_id)
        .fetch_all(pool)
        .await
    }

    pub async fn save_actuals(
        pool: &SqlitePool,
        id: Uuid,
        data: &SaveInventoryResult,
        difference: Option<f64>,
        checked_by_id: Option<Uuid>,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, InventoryResult>(&format!(
            "UPDATE inventory_results
             SET actual_quantity = $2, actual_condition = $3, actual_value = $4,
                 actual_serial_plate = $5, notes = $6, difference = $7,
                 checked_by_id = $8, checked_at = $9
             WHERE id = $1
             RETURNING {RESULT_COLS}"
        ))
        .bind(id)
        .bind(data.actual_quantity)
        .bind(&data.actual_condition)
        .bind(data.actual_value)
        .bind(&data.actual_serial_plate)
        .bind(&data.notes)
        .bind(difference)
        .bind(checked_by_id)
        .bind(Utc::now())
        .fetch_optional(pool)
        .await
    }

    pub async fn count_for_inventory(
        pool: &SqlitePool,
        inventory_id: Uuid,
    ) -> Result<(i64, i64), sqlx::Error> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM inventory_results WHERE inventory_id = $1")
                .bind(inventory_id)
                .fetch_one(pool)
                .await?;
        let checked: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM inventory_results
             WHERE inventory_id = $1 AND checked_at IS NOT NULL",
        )
        .bind(inventory_id)
        .fetch_one(pool)
        .await?;
        Ok((total, checked))
    }
}

impl InventorySurplusAsset {
    pub async fn create(
        pool: &SqlitePool,
        inventory_id: Uuid,
        data: &CreateSurplusAsset,
        created_by_id: Option<Uuid>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, InventorySurplusAsset>(
            "INSERT INTO inventory_surplus_assets (id, inventory_id, name, asset_type_id,
                 quantity, estimated_start_year, origin, notes, created_by_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING id, inventory_id, name, asset_type_id, quantity, estimated_start_year,
                 origin, status, notes, created_by_id, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(inventory_id)
        .bind(&data.name)
        .bind(data.asset_type_id)
        .bind(data.quantity.unwrap_or(1))
        .bind(data.estimated_start_year)
        .bind(&data.origin)
        .bind(&data.notes)
        .bind(created_by_id)
        .fetch_one(pool)
        .await
    }

    pub async fn find_for_inventory(
        pool: &SqlitePool,
        inventory_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, InventorySurplusAsset>(
            "SELECT id, inventory_id, name, asset_type_id, quantity, estimated_start_year,
                 origin, status, notes, created_by_id, created_at, updated_at
             FROM inventory_surplus_assets WHERE inventory_id = $1 ORDER BY created_at",
        )
        .bind(inventory_id)
        .fetch_all(pool)
        .await
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM inventory_surplus_assets WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}

impl InventoryLog {
    pub async fn record(
        pool: &SqlitePool,
        inventory_id: Uuid,
        action: &str,
        from_status: Option<InventoryStatus>,
        to_status: Option<InventoryStatus>,
        reason: Option<&str>,
        actor_id: Option<Uuid>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO inventory_logs (id, inventory_id, action, from_status, to_status,
                 reason, actor_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(Uuid::new_v4())
        .bind(inventory_id)
        .bind(action)
        .bind(from_status.map(|s| s.to_string()))
        .bind(to_status.map(|s| s.to_string()))
        .bind(reason)
        .bind(actor_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn find_for_inventory(
        pool: &SqlitePool,
        inventory_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, InventoryLog>(
            "SELECT id, inventory_id, action, from_status, to_status, reason, actor_id, created_at
             FROM inventory_logs WHERE inventory_id = $1 ORDER BY created_at DESC",
        )
        .bind(inventory_id)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        use InventoryStatus::*;
        assert!(Draft.can_advance_to(InProgress));
        assert!(InProgress.can_advance_to(Submitted));
        assert!(Submitted.can_advance_to(ApprovedLocked));
        assert!(ApprovedLocked.can_advance_to(Closed));
        assert!(!Draft.can_advance_to(Submitted));
        assert!(!Closed.can_advance_to(Draft));
        assert!(!ApprovedLocked.can_advance_to(InProgress));
    }

    #[test]
    fn test_editable_states() {
        assert!(InventoryStatus::Draft.is_editable());
        assert!(InventoryStatus::InProgress.is_editable());
        assert!(!InventoryStatus::Submitted.is_editable());
        assert!(!InventoryStatus::ApprovedLocked.is_editable());
        assert!(!InventoryStatus::Closed.is_editable());
    }
}
