use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteExecutor, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use utils::{response::Paginated, text::contains_pattern};
use uuid::Uuid;

use super::user::User;

#[derive(
    Debug, Clone, Type, Serialize, Deserialize, PartialEq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "asset_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AssetStatus {
    #[default]
    Active,
    Maintenance,
    // Legacy filters send "other" for this bucket.
    #[serde(alias = "other")]
    #[strum(serialize = "other", to_string = "disposed")]
    Disposed,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Asset {
    pub id: Uuid,
    pub name: String,
    pub price: f64,
    pub quantity: i64,
    pub status: AssetStatus,
    pub purchase_date: Option<NaiveDate>,
    pub device_code: Option<String>,
    pub condition_label: Option<String>,
    pub display_order: Option<i64>,
    pub asset_type_id: Uuid,
    pub user_id: Option<Uuid>,
    pub user_text: Option<String>,
    pub notes: Option<String>,
    pub warranty_contact_name: Option<String>,
    pub warranty_contact_phone: Option<String>,
    pub warranty_contact_email: Option<String>,
    pub warranty_website: Option<String>,
    pub warranty_start_date: Option<NaiveDate>,
    pub warranty_end_date: Option<NaiveDate>,
    pub warranty_period_months: Option<i64>,
    pub invoice_file_path: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct CreateAsset {
    pub name: String,
    pub price: f64,
    pub quantity: Option<i64>,
    pub status: Option<AssetStatus>,
    pub purchase_date: Option<NaiveDate>,
    pub device_code: Option<String>,
    pub condition_label: Option<String>,
    pub display_order: Option<i64>,
    pub asset_type_id: Uuid,
    pub user_id: Option<Uuid>,
    pub user_text: Option<String>,
    pub notes: Option<String>,
    pub warranty_contact_name: Option<String>,
    pub warranty_contact_phone: Option<String>,
    pub warranty_contact_email: Option<String>,
    pub warranty_website: Option<String>,
    pub warranty_start_date: Option<NaiveDate>,
    pub warranty_end_date: Option<NaiveDate>,
    pub warranty_period_months: Option<i64>,
    pub invoice_file_path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct AssetFilter {
    pub search: Option<String>,
    pub type_id: Option<Uuid>,
    pub status: Option<AssetStatus>,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct AssetSuggestion {
    pub id: Uuid,
    pub label: String,
    pub name: String,
    pub device_code: String,
}

/// Per-type value rollup over non-deleted, non-disposed assets.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct TypeValueSummary {
    pub asset_type_id: Uuid,
    pub type_name: String,
    pub total_value: f64,
    pub total_count: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum WarrantyPhase {
    Upcoming,
    Active,
    Expired,
}

/// Warranty state with the day count to/past the end date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
pub struct WarrantyStatus {
    pub phase: WarrantyPhase,
    pub days: i64,
}

const SELECT_COLS: &str = "id, name, price, quantity, status, purchase_date, device_code, \
     condition_label, display_order, asset_type_id, user_id, user_text, notes, \
     warranty_contact_name, warranty_contact_phone, warranty_contact_email, warranty_website, \
     warranty_start_date, warranty_end_date, warranty_period_months, invoice_file_path, \
     deleted_at, created_at, updated_at";

fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &AssetFilter) {
    qb.push(" WHERE deleted_at IS NULL");
    if let Some(term) = filter.search.as_deref().filter(|t| !t.trim().is_empty()) {
        qb.push(" AND lower(name) LIKE ")
            .push_bind(contains_pattern(term.trim()))
            .push(" ESCAPE '\\'");
    }
    if let Some(type_id) = filter.type_id {
        qb.push(" AND asset_type_id = ").push_bind(type_id);
    }
    if let Some(status) = filter.status.clone() {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(user_id) = filter.user_id {
        qb.push(" AND user_id = ").push_bind(user_id);
    }
}

impl Asset {
    pub fn has_warranty(&self) -> bool {
        self.warranty_start_date.is_some() && self.warranty_end_date.is_some()
    }

    /// Derived warranty state at `today`; `None` when no warranty dates are
    /// recorded.
    pub fn warranty_status(&self, today: NaiveDate) -> Option<WarrantyStatus> {
        let start = self.warranty_start_date?;
        let end = self.warranty_end_date?;
        if today < start {
            Some(WarrantyStatus {
                phase: WarrantyPhase::Upcoming,
                days: (end - today).num_days(),
            })
        } else if today <= end {
            Some(WarrantyStatus {
                phase: WarrantyPhase::Active,
                days: (end - today).num_days(),
            })
        } else {
            Some(WarrantyStatus {
                phase: WarrantyPhase::Expired,
                days: (today - end).num_days(),
            })
        }
    }

    pub async fn create(
        executor: impl SqliteExecutor<'_>,
        data: &CreateAsset,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Asset>(&format!(
            "INSERT INTO assets (id, name, price, quantity, status, purchase_date, device_code,
                 condition_label, display_order, asset_type_id, user_id, user_text, notes,
                 warranty_contact_name, warranty_contact_phone, warranty_contact_email,
                 warranty_website, warranty_start_date, warranty_end_date,
                 warranty_period_months, invoice_file_path)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                 $18, $19, $20, $21)
             RETURNING {SELECT_COLS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&data.name)
        .bind(data.price)
        .bind(data.quantity.unwrap_or(1))
        .bind(data.status.clone().unwrap_or_default())
        .bind(data.purchase_date)
        .bind(&data.device_code)
        .bind(&data.condition_label)
        .bind(data.display_order)
        .bind(data.asset_type_id)
        .bind(data.user_id)
        .bind(&data.user_text)
        .bind(&data.notes)
        .bind(&data.warranty_contact_name)
        .bind(&data.warranty_contact_phone)
        .bind(&data.warranty_contact_email)
        .bind(&data.warranty_website)
        .bind(data.warranty_start_date)
        .bind(data.warranty_end_date)
        .bind(data.warranty_period_months)
        .bind(&data.invoice_file_path)
        .fetch_one(executor)
        .await
    }

    pub async fn find_by_id(
        executor: impl SqliteExecutor<'_>,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Asset>(&format!("SELECT {SELECT_COLS} FROM assets WHERE id = $1"))
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Non-deleted assets, newest first, filtered and paginated.
    pub async fn list(
        pool: &SqlitePool,
        filter: &AssetFilter,
        page: i64,
        per_page: i64,
    ) -> Result<Paginated<Self>, sqlx::Error> {
        let offset = (page - 1) * per_page;

        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM assets");
        push_filter(&mut count_qb, filter);
        let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

        let mut qb = QueryBuilder::new(format!("SELECT {SELECT_COLS} FROM assets"));
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(per_page)
            .push(" OFFSET ")
            .push_bind(offset);
        let items = qb.build_query_as::<Asset>().fetch_all(pool).await?;

        Ok(Paginated::new(items, page, per_page, total))
    }

    /// Every non-deleted asset, for snapshot-style consumers.
    pub async fn find_all_live(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Asset>(&format!(
            "SELECT {SELECT_COLS} FROM assets
             WHERE deleted_at IS NULL
             ORDER BY created_at"
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_owner(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Asset>(&format!(
            "SELECT {SELECT_COLS} FROM assets
             WHERE deleted_at IS NULL AND user_id = $1
             ORDER BY name"
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    pub async fn suggest(
        pool: &SqlitePool,
        term: &str,
        limit: i64,
    ) -> Result<Vec<AssetSuggestion>, sqlx::Error> {
        let rows = sqlx::query_as::<_, Asset>(&format!(
            "SELECT {SELECT_COLS} FROM assets
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
            .map(|a| {
                let label = match a.device_code.as_deref() {
                    Some(code) if !code.is_empty() => format!("{} ({code})", a.name),
                    _ => a.name.clone(),
                };
                AssetSuggestion {
                    id: a.id,
                    label,
                    name: a.name,
                    device_code: a.device_code.unwrap_or_default(),
                }
            })
            .collect())
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        data: &CreateAsset,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Asset>(&format!(
            "UPDATE assets
             SET name = $2, price = $3, quantity = $4, status = $5, purchase_date = $6,
                 device_code = $7, condition_label = $8, display_order = $9, asset_type_id = $10,
                 user_id = $11, user_text = $12, notes = $13, warranty_contact_name = $14,
                 warranty_contact_phone = $15, warranty_contact_email = $16,
                 warranty_website = $17, warranty_start_date = $18, warranty_end_date = $19,
                 warranty_period_months = $20, invoice_file_path = $21,
                 updated_at = CURRENT_TIMESTAMP
             WHERE id = $1
             RETURNING {SELECT_COLS}"
        ))
        .bind(id)
        .bind(&data.name)
        .bind(data.price)
        .bind(data.quantity.unwrap_or(1))
        .bind(data.status.clone().unwrap_or_default())
        .bind(data.purchase_date)
        .bind(&data.device_code)
        .bind(&data.condition_label)
        .bind(data.display_order)
        .bind(data.asset_type_id)
        .bind(data.user_id)
        .bind(&data.user_text)
        .bind(&data.notes)
        .bind(&data.warranty_contact_name)
        .bind(&data.warranty_contact_phone)
        .bind(&data.warranty_contact_email)
        .bind(&data.warranty_website)
        .bind(data.warranty_start_date)
        .bind(data.warranty_end_date)
        .bind(data.warranty_period_months)
        .bind(&data.invoice_file_path)
        .fetch_optional(pool)
        .await
    }

    /// Soft delete marks the asset disposed and hides its maintenance records
    /// with it.
    pub async fn soft_delete_cascade(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let result = sqlx::query(
            "UPDATE assets
             SET deleted_at = CURRENT_TIMESTAMP, status = 'disposed',
                 updated_at = CURRENT_TIMESTAMP
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() > 0 {
            sqlx::query(
                "UPDATE maintenance_records
                 SET deleted_at = CURRENT_TIMESTAMP, updated_at = CURRENT_TIMESTAMP
                 WHERE asset_id = $1 AND deleted_at IS NULL",
            )
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(result.rows_affected())
    }

    /// Restore brings a disposed asset back to active and restores the
    /// maintenance records hidden by the cascade.
    pub async fn restore_cascade(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let mut tx = pool.begin().await?;
        let result = sqlx::query(
            "UPDATE assets
             SET deleted_at = NULL,
                 status = CASE WHEN status = 'disposed' THEN 'active' ELSE status END,
                 updated_at = CURRENT_TIMESTAMP
             WHERE id = $1 AND deleted_at IS NOT NULL",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() > 0 {
            sqlx::query(
                "UPDATE maintenance_records
                 SET deleted_at = NULL, updated_at = CURRENT_TIMESTAMP
                 WHERE asset_id = $1 AND deleted_at IS NOT NULL",
            )
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(result.rows_affected())
    }

    pub async fn find_deleted(
        pool: &SqlitePool,
        page: i64,
        per_page: i64,
    ) -> Result<Paginated<Self>, sqlx::Error> {
        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM assets WHERE deleted_at IS NOT NULL")
                .fetch_one(pool)
                .await?;
        let items = sqlx::query_as::<_, Asset>(&format!(
            "SELECT {SELECT_COLS} FROM assets
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

    /// Permanent removal, with the rows that hang off the asset.
    pub async fn hard_delete(pool: &SqlitePool, id: Uuid) -> Result<u64, sqlx::Error> {
        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM maintenance_records WHERE asset_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM asset_users WHERE asset_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM assets WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected())
    }

    pub async fn value_by_type(pool: &SqlitePool) -> Result<Vec<TypeValueSummary>, sqlx::Error> {
        sqlx::query_as::<_, TypeValueSummary>(
            "SELECT t.id AS asset_type_id, t.name AS type_name,
                    COALESCE(SUM(a.price * a.quantity), 0) AS total_value,
                    COALESCE(SUM(a.quantity), 0) AS total_count
             FROM asset_types t
             LEFT JOIN assets a ON a.asset_type_id = t.id
                 AND a.deleted_at IS NULL AND a.status != 'disposed'
             WHERE t.deleted_at IS NULL
             GROUP BY t.id, t.name
             ORDER BY total_value DESC",
        )
        .fetch_all(pool)
        .await
    }

    /// Replace the set of users assigned to this asset.
    pub async fn set_assignees(
        pool: &SqlitePool,
        asset_id: Uuid,
        user_ids: &[Uuid],
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM asset_users WHERE asset_id = $1")
            .bind(asset_id)
            .execute(&mut *tx)
            .await?;
        for user_id in user_ids {
            sqlx::query(
                "INSERT INTO asset_users (asset_id, user_id) VALUES ($1, $2)
                 ON CONFLICT DO NOTHING",
            )
            .bind(asset_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn find_assignees(
        pool: &SqlitePool,
        asset_id: Uuid,
    ) -> Result<Vec<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT u.id, u.username, u.password_hash, u.email, u.name, u.role_id, u.is_active,
                    u.asset_quota, u.deleted_at, u.last_login, u.created_at, u.updated_at
             FROM users u
             JOIN asset_users au ON au.user_id = u.id
             WHERE au.asset_id = $1 AND u.deleted_at IS NULL
             ORDER BY lower(u.username)",
        )
        .bind(asset_id)
        .fetch_all(pool)
        .await
    }

    /// Remove transferred units from the sender's asset. Reaching zero marks
    /// the asset disposed rather than deleting the row.
    pub async fn deduct_quantity(
        executor: impl SqliteExecutor<'_>,
        id: Uuid,
        amount: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE assets
             SET quantity = MAX(quantity - $2, 0),
                 status = CASE WHEN quantity - $2 <= 0 THEN 'disposed' ELSE status END,
                 updated_at = CURRENT_TIMESTAMP
             WHERE id = $1",
        )
        .bind(id)
        .bind(amount)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn add_quantity(
        executor: impl SqliteExecutor<'_>,
        id: Uuid,
        amount: i64,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE assets
             SET quantity = quantity + $2, updated_at = CURRENT_TIMESTAMP
             WHERE id = $1",
        )
        .bind(id)
        .bind(amount)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Matching asset already held by the recipient of a transfer: same name
    /// and type, not deleted.
    pub async fn find_recipient_match(
        executor: impl SqliteExecutor<'_>,
        name: &str,
        owner_id: Uuid,
        asset_type_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Asset>(&format!(
            "SELECT {SELECT_COLS} FROM assets
             WHERE name = $1 AND user_id = $2 AND asset_type_id = $3 AND deleted_at IS NULL
             LIMIT 1"
        ))
        .bind(name)
        .bind(owner_id)
        .bind(asset_type_id)
        .fetch_optional(executor)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset_with_warranty(start: Option<&str>, end: Option<&str>) -> Asset {
        Asset {
            id: Uuid::new_v4(),
            name: "Máy in HP".into(),
            price: 1_500_000.0,
            quantity: 1,
            status: AssetStatus::Active,
            purchase_date: None,
            device_code: None,
            condition_label: None,
            display_order: None,
            asset_type_id: Uuid::new_v4(),
            user_id: None,
            user_text: None,
            notes: None,
            warranty_contact_name: None,
            warranty_contact_phone: None,
            warranty_contact_email: None,
            warranty_website: None,
            warranty_start_date: start.map(|s| s.parse().unwrap()),
            warranty_end_date: end.map(|s| s.parse().unwrap()),
            warranty_period_months: None,
            invoice_file_path: None,
            deleted_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_warranty_none_without_dates() {
        let asset = asset_with_warranty(None, None);
        assert!(!asset.has_warranty());
        assert_eq!(asset.warranty_status("2026-01-01".parse().unwrap()), None);
    }

    #[test]
    fn test_warranty_phases() {
        let asset = asset_with_warranty(Some("2026-02-01"), Some("2026-12-31"));

        let before = asset.warranty_status("2026-01-01".parse().unwrap()).unwrap();
        assert_eq!(before.phase, WarrantyPhase::Upcoming);
        assert_eq!(before.days, 364);

        let during = asset.warranty_status("2026-06-01".parse().unwrap()).unwrap();
        assert_eq!(during.phase, WarrantyPhase::Active);

        let after = asset.warranty_status("2027-01-10".parse().unwrap()).unwrap();
        assert_eq!(after.phase, WarrantyPhase::Expired);
        assert_eq!(after.days, 10);
    }
}
