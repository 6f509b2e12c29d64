//! Dashboard and report numbers.

use chrono::NaiveDate;
use db::models::{
    asset::{Asset, TypeValueSummary},
    asset_transfer::{AssetTransfer, TransferStatus},
    maintenance_record::{MaintenanceRecord, MaintenanceStatus},
};
use serde::Serialize;
use sqlx::SqlitePool;
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Serialize, TS)]
pub struct DashboardStats {
    pub total_assets: i64,
    pub total_value: f64,
    pub active_assets: i64,
    pub maintenance_assets: i64,
    pub disposed_assets: i64,
    pub total_users: i64,
    pub pending_transfers: i64,
    pub pending_maintenance: i64,
    pub in_progress_maintenance: i64,
    pub completed_maintenance: i64,
    pub overdue_maintenance: i64,
    pub value_by_type: Vec<TypeValueSummary>,
}

#[derive(Debug, Serialize, TS)]
pub struct UserDashboard {
    pub owned_assets: Vec<Asset>,
    pub recent_transfers: Vec<AssetTransfer>,
}

#[derive(Clone, Default)]
pub struct StatsService;

async fn count_assets_with_status(
    pool: &SqlitePool,
    status: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM assets WHERE deleted_at IS NULL AND status = $1",
    )
    .bind(status)
    .fetch_one(pool)
    .await
}

async fn count_maintenance_with_status(
    pool: &SqlitePool,
    status: MaintenanceStatus,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM maintenance_records WHERE deleted_at IS NULL AND status = $1",
    )
    .bind(status)
    .fetch_one(pool)
    .await
}

impl StatsService {
    pub fn new() -> Self {
        Self
    }

    pub async fn dashboard(
        &self,
        pool: &SqlitePool,
        today: NaiveDate,
    ) -> Result<DashboardStats, sqlx::Error> {
        let total_assets: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM assets WHERE deleted_at IS NULL")
                .fetch_one(pool)
                .await?;
        let total_value: f64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(price * quantity), 0) FROM assets
             WHERE deleted_at IS NULL AND status != 'disposed'",
        )
        .fetch_one(pool)
        .await?;
        let total_users: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE deleted_at IS NULL")
                .fetch_one(pool)
                .await?;

        Ok(DashboardStats {
            total_assets,
            total_value,
            active_assets: count_assets_with_status(pool, "active").await?,
            maintenance_assets: count_assets_with_status(pool, "maintenance").await?,
            disposed_assets: count_assets_with_status(pool, "disposed").await?,
            total_users,
            pending_transfers: AssetTransfer::count_by_status(pool, TransferStatus::Pending)
                .await?,
            pending_maintenance: count_maintenance_with_status(pool, MaintenanceStatus::Pending)
                .await?,
            in_progress_maintenance: count_maintenance_with_status(
                pool,
                MaintenanceStatus::InProgress,
            )
            .await?,
            completed_maintenance: count_maintenance_with_status(
                pool,
                MaintenanceStatus::Completed,
            )
            .await?,
            overdue_maintenance: MaintenanceRecord::find_overdue(pool, today).await?.len() as i64,
            value_by_type: Asset::value_by_type(pool).await?,
        })
    }

    /// Home screen for a regular user: their assets and latest handovers.
    pub async fn user_dashboard(
        &self,
        pool: &SqlitePool,
        user_id: Uuid,
    ) -> Result<UserDashboard, sqlx::Error> {
        Ok(UserDashboard {
            owned_assets: Asset::find_by_owner(pool, user_id).await?,
            recent_transfers: AssetTransfer::find_recent_for_user(pool, user_id, 10).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use db::{
        DBService,
        models::{
            asset::{AssetStatus, CreateAsset},
            asset_type::{AssetType, CreateAssetType},
        },
    };

    use super::*;

    #[tokio::test]
    async fn test_dashboard_counts() {
        let db = DBService::new_in_memory().await.unwrap();
        let svc = StatsService::new();

        let ty = AssetType::create(
            &db.pool,
            &CreateAssetType {
                name: "Màn hình".into(),
                description: None,
            },
        )
        .await
        .unwrap();
        for (status, qty) in [
            (AssetStatus::Active, 2),
            (AssetStatus::Maintenance, 1),
            (AssetStatus::Disposed, 1),
        ] {
            Asset::create(
                &db.pool,
                &CreateAsset {
                    name: format!("Dell {status}"),
                    price: 3_000_000.0,
                    quantity: Some(qty),
                    status: Some(status),
                    purchase_date: None,
                    device_code: None,
                    condition_label: None,
                    display_order: None,
                    asset_type_id: ty.id,
                    user_id: None,
                    user_text: None,
                    notes: None,
                    warranty_contact_name: None,
                    warranty_contact_phone: None,
                    warranty_contact_email: None,
                    warranty_website: None,
                    warranty_start_date: None,
                    warranty_end_date: None,
                    warranty_period_months: None,
                    invoice_file_path: None,
                },
            )
            .await
            .unwrap();
        }

        let stats = svc.dashboard(&db.pool, Utc::now().date_naive()).await.unwrap();
        assert_eq!(stats.total_assets, 3);
        assert_eq!(stats.active_assets, 1);
        assert_eq!(stats.maintenance_assets, 1);
        assert_eq!(stats.disposed_assets, 1);
        // Disposed stock does not count toward the book value.
        assert_eq!(stats.total_value, 9_000_000.0);
        assert_eq!(stats.value_by_type.len(), 1);
        assert_eq!(stats.value_by_type[0].total_count, 3);
    }

    #[tokio::test]
    async fn test_assigned_asset_counts_follow_assignments_not_ownership() {
        use db::models::{
            role::{ROLE_USER, Role},
            user::{CreateUser, User},
        };

        let db = DBService::new_in_memory().await.unwrap();
        Role::ensure_defaults(&db.pool).await.unwrap();
        let role = Role::find_by_name(&db.pool, ROLE_USER).await.unwrap().unwrap();

        let owner = User::create(
            &db.pool,
            &CreateUser {
                username: "huy".into(),
                password: "secret".into(),
                email: "huy@example.com".into(),
                name: None,
                role_id: role.id,
                asset_quota: None,
            },
        )
        .await
        .unwrap();
        let holder = User::create(
            &db.pool,
            &CreateUser {
                username: "lan".into(),
                password: "secret".into(),
                email: "lan@example.com".into(),
                name: None,
                role_id: role.id,
                asset_quota: None,
            },
        )
        .await
        .unwrap();

        let ty = AssetType::create(
            &db.pool,
            &CreateAssetType {
                name: "Laptop".into(),
                description: None,
            },
        )
        .await
        .unwrap();
        // Owned by one user, handed out to another.
        let asset = Asset::create(
            &db.pool,
            &CreateAsset {
                name: "Dell Latitude".into(),
                price: 20_000_000.0,
                quantity: Some(1),
                status: None,
                purchase_date: None,
                device_code: None,
                condition_label: None,
                display_order: None,
                asset_type_id: ty.id,
                user_id: Some(owner.id),
                user_text: None,
                notes: None,
                warranty_contact_name: None,
                warranty_contact_phone: None,
                warranty_contact_email: None,
                warranty_website: None,
                warranty_start_date: None,
                warranty_end_date: None,
                warranty_period_months: None,
                invoice_file_path: None,
            },
        )
        .await
        .unwrap();
        Asset::set_assignees(&db.pool, asset.id, &[holder.id]).await.unwrap();

        let counts = User::assigned_asset_counts(&db.pool).await.unwrap();
        let count_for = |id| {
            counts
                .iter()
                .find(|(user_id, _, _)| *user_id == id)
                .map(|(_, _, n)| *n)
                .unwrap()
        };
        assert_eq!(count_for(holder.id), 1);
        assert_eq!(count_for(owner.id), 0);

        // Trashed assets drop out of the count.
        Asset::soft_delete_cascade(&db.pool, asset.id).await.unwrap();
        let counts = User::assigned_asset_counts(&db.pool).await.unwrap();
        assert!(counts.iter().all(|(_, _, n)| *n == 0));
    }
}
