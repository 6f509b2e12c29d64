use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use utils::response::Paginated;
use uuid::Uuid;

#[derive(
    Debug, Clone, Type, Serialize, Deserialize, PartialEq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "maintenance_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MaintenanceKind {
    #[default]
    Maintenance,
    Repair,
    Inspection,
}

#[derive(
    Debug, Clone, Type, Serialize, Deserialize, PartialEq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "maintenance_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MaintenanceStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct MaintenanceRecord {
    pub id: Uuid,
    pub asset_id: Uuid,
    pub request_date: NaiveDate,
    pub requested_by_id: Option<Uuid>,
    pub maintenance_reason: Option<String>,
    pub condition_before: Option<String>,
    pub damage_level: Option<String>,
    pub maintenance_date: Option<NaiveDate>,
    pub kind: MaintenanceKind,
    pub description: Option<String>,
    pub vendor: Option<String>,
    pub person_in_charge: Option<String>,
    pub vendor_phone: Option<String>,
    pub estimated_cost: f64,
    pub cost: f64,
    pub next_due_date: Option<NaiveDate>,
    pub status: MaintenanceStatus,
    pub completed_date: Option<NaiveDate>,
    pub replaced_parts: Option<String>,
    pub result_status: Option<String>,
    pub result_notes: Option<String>,
    pub invoice_file: Option<String>,
    pub acceptance_file: Option<String>,
    pub before_image: Option<String>,
    pub after_image: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateMaintenanceRecord {
    pub asset_id: Uuid,
    pub request_date: Option<NaiveDate>,
    pub requested_by_id: Option<Uuid>,
    pub maintenance_reason: Option<String>,
    pub condition_before: Option<String>,
    pub damage_level: Option<String>,
    pub maintenance_date: Option<NaiveDate>,
    pub kind: Option<MaintenanceKind>,
    pub description: Option<String>,
    pub vendor: Option<String>,
    pub person_in_charge: Option<String>,
    pub vendor_phone: Option<String>,
    pub estimated_cost: Option<f64>,
    pub cost: Option<f64>,
    pub next_due_date: Option<NaiveDate>,
    pub status: Option<MaintenanceStatus>,
    pub completed_date: Option<NaiveDate>,
    pub replaced_parts: Option<String>,
    pub result_status: Option<String>,
    pub result_notes: Option<String>,
    pub invoice_file: Option<String>,
    pub acceptance_file: Option<String>,
    pub before_image: Option<String>,
    pub after_image: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct MaintenanceFilter {
    pub asset_id: Option<Uuid>,
    pub status: Option<MaintenanceStatus>,
    pub kind: Option<MaintenanceKind>,
}

const SELECT_COLS: &str = "id, asset_id, request_date, requested_by_id, maintenance_reason, \
     condition_before, damage_level, maintenance_date, kind, description, vendor, \
     person_in_charge, vendor_phone, estimated_cost, cost, next_due_date, status, \
     completed_date, replaced_parts, result_status, result_notes, invoice_file, \
     acceptance_file, before_image, after_image, deleted_at, created_at, updated_at";

fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &MaintenanceFilter) {
    qb.push(" WHERE deleted_at IS NULL");
    if let Some(asset_id) = filter.asset_id {
        qb.push(" AND asset_id = ").push_bind(asset_id);
    }
    if let Some(status) = filter.status.clone() {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(kind) = filter.kind.clone() {
        qb.push(" AND kind = ").push_bind(kind);
    }
}

impl MaintenanceRecord {
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        matches!(
            self.status,
            MaintenanceStatus::Pending | MaintenanceStatus::InProgress | MaintenanceStatus::Failed
        ) && self.next_due_date.is_some_and(|due| due < today)
    }

    pub async fn create(
        pool: &SqlitePool,
        data: &CreateMaintenanceRecord,
        today: NaiveDate,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, MaintenanceRecord>(&format!(
            "INSERT INTO maintenance_records (id, asset_id, request_date, requested_by_id,
                 maintenance_reason, condition_before, damage_level, maintenance_date, kind,
                 description, vendor, person_in_charge, vendor_phone, estimated_cost, cost,
                 next_due_date, status, completed_date, replaced_parts, result_status,
                 result_notes, invoice_file, acceptance_file, before_image, after_image)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                 $18, $19, $20, $21, $22, $23, $24, $25)
             RETURNING {SELECT_COLS}"
        ))
        .bind(Uuid::new_v4())
        .bind(data.asset_id)
        .bind(data.request_date.unwrap_or(today))
        .bind(data.requested_by_id)
        .bind(&data.maintenance_reason)
        .bind(&data.condition_before)
        .bind(&data.damage_level)
        .bind(data.maintenance_date)
        .bind(data.kind.clone().unwrap_or_default())
        .bind(&data.description)
        .bind(&data.vendor)
        .bind(&data.person_in_charge)
        .bind(&data.vendor_phone)
        .bind(data.estimated_cost.unwrap_or(0.0))
        .bind(data.cost.unwrap_or(0.0))
        .bind(data.next_due_date)
        .bind(data.status.clone().unwrap_or_default())
        .bind(data.completed_date)
        .bind(&data.replaced_parts)
        .bind(&data.result_status)
        .bind(&data.result_notes)
        .bind(&data.invoice_file)
        .bind(&data.acceptance_file)
        .bind(&data.before_image)
        .bind(&data.after_image)
        .fetch_one(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, MaintenanceRecord>(&format!(
            "SELECT {SELECT_COLS} FROM maintenance_records WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    pub async fn list(
        pool: &SqlitePool,
        filter: &MaintenanceFilter,
        page: i64,
        per_page: i64,
    ) -> Result<Paginated<Self>, sqlx::Error> {
        let offset = (page - 1) * per_page;

        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM maintenance_records");
        push_filter(&mut count_qb, filter);
        let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

        let mut qb = QueryBuilder::new(format!("SELECT {SELECT_COLS} FROM maintenance_records"));
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY request_date DESC, created_at DESC LIMIT ")
            .push_bind(per_page)
            .push(" OFFSET ")
            .push_bind(offset);
        let items = qb
            .build_query_as::<MaintenanceRecord>()
            .fetch_all(pool)
            .await?;

        Ok(Paginated::new(items, page, per_page, total))
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &CreateMaintenanceRecord,
        today: NaiveDate,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, MaintenanceRecord>(&format!(
            "UPDATE maintenance_records
             SET asset_id = $2, request_date = $3, requested_by_id = $4,
                 maintenance_reason = $5, condition_before = $6, damage_level = $7,
                 maintenance_date = $8, kind = $9, description = $10, vendor = $11,
                 person_in_charge = $12, vendor_phone = $13, estimated_cost = $14, cost = $15,
                 next_due_date = $16, status = $17, completed_date = $18, replaced_parts = $19,
                 result_status = $20, result_notes = $21, invoice_file = $22,
                 acceptance_file = $23, before_image = $24, after_image = $25,
                 updated_at = CURRENT_TIMESTAMP
             WHERE id = $1
             RETURNING {SELECT_COLS}"
        ))
        .bind(id)
        .bind(data.asset_id)
        .bind(data.request_date.unwrap_or(today))
        .bind(data.requested_by_id)
        .bind(&data.maintenance_reason)
        .bind(&data.condition_before)
        .bind(&data.damage_level)
        .bind(data.maintenance_date)
        .bind(data.kind.clone().unwrap_or_default())
        .bind(&data.description)
        .bind(&data.vendor)
        .bind(&data.person_in_charge)
        .bind(&data.vendor_phone)
        .bind(data.estimated_cost.unwrap_or(0.0))
        .bind(data.cost.unwrap_or(0.0))
        .bind(data.next_due_date)
        .bind(data.status.clone().unwrap_or_default())
        .bind(data.completed_date)
        .bind(&data.replaced_parts)
        .bind(&data.result_status)
        .bind(&data.result_notes)
        .bind(&data.invoice_file)
        .bind(&data.acceptance_file)
        .bind(&data.before_image)
        .bind(&data.after_image)
        .fetch_optional(pool)
        .await
    }

    pub async fn soft_delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE maintenance_records
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
            "UPDATE maintenance_records
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
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM maintenance_records WHERE deleted_at IS NOT NULL",
        )
        .fetch_one(pool)
        .await?;
        let items = sqlx::query_as::<_, MaintenanceRecord>(&format!(
            "SELECT {SELECT_COLS} FROM maintenance_records
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

    pub async fn hard_delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM maintenance_records WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Records past their next due date that are not finished yet.
    pub async fn find_overdue(
        pool: &SqlitePool,
        today: NaiveDate,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, MaintenanceRecord>(&format!(
            "SELECT {SELECT_COLS} FROM maintenance_records
             WHERE deleted_at IS NULL
               AND next_due_date IS NOT NULL
               AND next_due_date < $1
               AND status NOT IN ('completed', 'cancelled')
             ORDER BY next_due_date"
        ))
        .bind(today)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_overdue() {
        let mut rec = MaintenanceRecord {
            id: Uuid::new_v4(),
            asset_id: Uuid::new_v4(),
            request_date: "2026-01-01".parse().unwrap(),
            requested_by_id: None,
            maintenance_reason: None,
            condition_before: None,
            damage_level: None,
            maintenance_date: None,
            kind: MaintenanceKind::Maintenance,
            description: None,
            vendor: None,
            person_in_charge: None,
            vendor_phone: None,
            estimated_cost: 0.0,
            cost: 0.0,
            next_due_date: Some("2026-03-01".parse().unwrap()),
            status: MaintenanceStatus::Pending,
            completed_date: None,
            replaced_parts: None,
            result_status: None,
            result_notes: None,
            invoice_file: None,
            acceptance_file: None,
            before_image: None,
            after_image: None,
            deleted_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert!(rec.is_overdue("2026-03-02".parse().unwrap()));
        assert!(!rec.is_overdue("2026-03-01".parse().unwrap()));

        rec.status = MaintenanceStatus::Completed;
        assert!(!rec.is_overdue("2026-03-02".parse().unwrap()));
    }
}
