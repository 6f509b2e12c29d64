//! Recycle bin over the soft-deleted rows of every module.

use db::models::{
    asset::Asset, asset_type::AssetType, maintenance_record::MaintenanceRecord, user::User,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use ts_rs::TS;
use utils::response::Paginated;
use uuid::Uuid;

pub const TRASH_PER_PAGE: i64 = 10;

#[derive(Debug, Error)]
pub enum TrashError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("item not found in trash")]
    NotFound,
    #[error("cannot purge the last asset type while assets still reference it")]
    TypeStillReferenced,
}

/// The bin keeps its modules on independent pages, 10 rows each.
#[derive(Debug, Clone, Copy, Deserialize, TS)]
pub struct TrashPages {
    #[serde(default = "first_page")]
    pub page_assets: i64,
    #[serde(default = "first_page")]
    pub page_asset_types: i64,
    #[serde(default = "first_page")]
    pub page_users: i64,
    #[serde(default = "first_page")]
    pub page_maintenance: i64,
}

fn first_page() -> i64 {
    1
}

impl Default for TrashPages {
    fn default() -> Self {
        Self {
            page_assets: 1,
            page_asset_types: 1,
            page_users: 1,
            page_maintenance: 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, TS)]
#[serde(rename_all = "kebab-case")]
pub enum TrashModule {
    Assets,
    AssetTypes,
    Users,
    Maintenance,
}

#[derive(Debug, Serialize, TS)]
pub struct TrashOverview {
    pub assets: Paginated<Asset>,
    pub asset_types: Paginated<AssetType>,
    pub users: Paginated<User>,
    pub maintenance_records: Paginated<MaintenanceRecord>,
}

#[derive(Clone, Default)]
pub struct TrashService;

impl TrashService {
    pub fn new() -> Self {
        Self
    }

    pub async fn overview(
        &self,
        pool: &SqlitePool,
        pages: &TrashPages,
    ) -> Result<TrashOverview, TrashError> {
        Ok(TrashOverview {
            assets: Asset::find_deleted(pool, pages.page_assets.max(1), TRASH_PER_PAGE).await?,
            asset_types: AssetType::find_deleted(
                pool,
                pages.page_asset_types.max(1),
                TRASH_PER_PAGE,
            )
            .await?,
            users: User::find_deleted(pool, pages.page_users.max(1), TRASH_PER_PAGE).await?,
            maintenance_records: MaintenanceRecord::find_deleted(
                pool,
                pages.page_maintenance.max(1),
                TRASH_PER_PAGE,
            )
            .await?,
        })
    }

    pub async fn restore_asset(&self, pool: &SqlitePool, id: Uuid) -> Result<(), TrashError> {
        if Asset::restore_cascade(pool, id).await? == 0 {
            return Err(TrashError::NotFound);
        }
        info!(asset_id = %id, "restored asset from trash");
        Ok(())
    }

    pub async fn purge_asset(&self, pool: &SqlitePool, id: Uuid) -> Result<(), TrashError> {
        let asset = Asset::find_by_id(pool, id).await?;
        match asset {
            Some(a) if a.deleted_at.is_some() => {
                Asset::hard_delete(pool, id).await?;
                info!(asset_id = %id, "purged asset");
                Ok(())
            }
            _ => Err(TrashError::NotFound),
        }
    }

    pub async fn restore_asset_type(&self, pool: &SqlitePool, id: Uuid) -> Result<(), TrashError> {
        if AssetType::restore(pool, id).await? == 0 {
            return Err(TrashError::NotFound);
        }
        Ok(())
    }

    /// Purging a type reassigns its remaining assets to another live type.
    pub async fn purge_asset_type(&self, pool: &SqlitePool, id: Uuid) -> Result<(), TrashError> {
        let ty = AssetType::find_by_id(pool, id).await?;
        if !ty.is_some_and(|t| t.deleted_at.is_some()) {
            return Err(TrashError::NotFound);
        }

        let in_use = AssetType::count_assets_total(pool, id).await?;
        let reassign_to = if in_use > 0 {
            let alt = AssetType::find_alternative(pool, id)
                .await?
                .ok_or(TrashError::TypeStillReferenced)?;
            Some(alt.id)
        } else {
            None
        };
        AssetType::hard_delete(pool, id, reassign_to).await?;
        info!(asset_type_id = %id, reassigned = in_use, "purged asset type");
        Ok(())
    }

    pub async fn restore_user(&self, pool: &SqlitePool, id: Uuid) -> Result<(), TrashError> {
        if User::restore(pool, id).await? == 0 {
            return Err(TrashError::NotFound);
        }
        Ok(())
    }

    pub async fn purge_user(&self, pool: &SqlitePool, id: Uuid) -> Result<(), TrashError> {
        let user = User::find_by_id(pool, id).await?;
        match user {
            Some(u) if u.deleted_at.is_some() => {
                User::hard_delete(pool, id).await?;
                info!(user_id = %id, "purged user");
                Ok(())
            }
            _ => Err(TrashError::NotFound),
        }
    }

    pub async fn restore_maintenance(&self, pool: &SqlitePool, id: Uuid) -> Result<(), TrashError> {
        if MaintenanceRecord::restore(pool, id).await? == 0 {
            return Err(TrashError::NotFound);
        }
        Ok(())
    }

    pub async fn purge_maintenance(&self, pool: &SqlitePool, id: Uuid) -> Result<(), TrashError> {
        let record = MaintenanceRecord::find_by_id(pool, id).await?;
        match record {
            Some(r) if r.deleted_at.is_some() => {
                MaintenanceRecord::hard_delete(pool, id).await?;
                Ok(())
            }
            _ => Err(TrashError::NotFound),
        }
    }

    /// Restores every id that is still in the bin; ids no longer there are
    /// skipped. Returns how many rows came back.
    pub async fn restore_bulk(
        &self,
        pool: &SqlitePool,
        module: TrashModule,
        ids: &[Uuid],
    ) -> Result<u64, TrashError> {
        let mut restored = 0;
        for &id in ids {
            let result = match module {
                TrashModule::Assets => self.restore_asset(pool, id).await,
                TrashModule::AssetTypes => self.restore_asset_type(pool, id).await,
                TrashModule::Users => self.restore_user(pool, id).await,
                TrashModule::Maintenance => self.restore_maintenance(pool, id).await,
            };
            match result {
                Ok(()) => restored += 1,
                Err(TrashError::NotFound) => {}
                Err(e) => return Err(e),
            }
        }
        info!(?module, restored, "bulk restore from trash");
        Ok(restored)
    }

    /// Permanently deletes every id that is still in the bin, skipping ids
    /// that are not. A type that cannot be reassigned aborts the batch.
    pub async fn purge_bulk(
        &self,
        pool: &SqlitePool,
        module: TrashModule,
        ids: &[Uuid],
    ) -> Result<u64, TrashError> {
        let mut purged = 0;
        for &id in ids {
            let result = match module {
                TrashModule::Assets => self.purge_asset(pool, id).await,
                TrashModule::AssetTypes => self.purge_asset_type(pool, id).await,
                TrashModule::Users => self.purge_user(pool, id).await,
                TrashModule::Maintenance => self.purge_maintenance(pool, id).await,
            };
            match result {
                Ok(()) => purged += 1,
                Err(TrashError::NotFound) => {}
                Err(e) => return Err(e),
            }
        }
        info!(?module, purged, "bulk permanent delete from trash");
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use db::{
        DBService,
        models::{
            asset::{AssetStatus, CreateAsset},
            asset_type::CreateAssetType,
        },
    };

    use super::*;

    async fn seed_asset(pool: &SqlitePool) -> (AssetType, Asset) {
        let ty = AssetType::create(
            pool,
            &CreateAssetType {
                name: "Máy chiếu".into(),
                description: None,
            },
        )
        .await
        .unwrap();
        let asset = Asset::create(
            pool,
            &CreateAsset {
                name: "Epson EB-X05".into(),
                price: 9_000_000.0,
                quantity: Some(1),
                status: None,
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
        (ty, asset)
    }

    #[tokio::test]
    async fn test_deleted_asset_shows_in_overview_and_restores() {
        let db = DBService::new_in_memory().await.unwrap();
        let svc = TrashService::new();
        let (_, asset) = seed_asset(&db.pool).await;

        Asset::soft_delete_cascade(&db.pool, asset.id).await.unwrap();
        let overview = svc.overview(&db.pool, &TrashPages::default()).await.unwrap();
        assert_eq!(overview.assets.total_items, 1);
        assert_eq!(overview.assets.items[0].status, AssetStatus::Disposed);

        svc.restore_asset(&db.pool, asset.id).await.unwrap();
        let restored = Asset::find_by_id(&db.pool, asset.id).await.unwrap().unwrap();
        assert!(restored.deleted_at.is_none());
        assert_eq!(restored.status, AssetStatus::Active);
        let overview = svc.overview(&db.pool, &TrashPages::default()).await.unwrap();
        assert!(overview.assets.items.is_empty());
    }

    #[tokio::test]
    async fn test_bulk_restore_skips_missing_ids() {
        let db = DBService::new_in_memory().await.unwrap();
        let svc = TrashService::new();
        let (_, asset) = seed_asset(&db.pool).await;

        Asset::soft_delete_cascade(&db.pool, asset.id).await.unwrap();
        let restored = svc
            .restore_bulk(&db.pool, TrashModule::Assets, &[asset.id, Uuid::new_v4()])
            .await
            .unwrap();
        assert_eq!(restored, 1);
        let back = Asset::find_by_id(&db.pool, asset.id).await.unwrap().unwrap();
        assert!(back.deleted_at.is_none());
    }

    #[tokio::test]
    async fn test_purge_asset_requires_soft_delete_first() {
        let db = DBService::new_in_memory().await.unwrap();
        let svc = TrashService::new();
        let (_, asset) = seed_asset(&db.pool).await;

        let err = svc.purge_asset(&db.pool, asset.id).await.unwrap_err();
        assert!(matches!(err, TrashError::NotFound));

        Asset::soft_delete_cascade(&db.pool, asset.id).await.unwrap();
        svc.purge_asset(&db.pool, asset.id).await.unwrap();
        assert!(Asset::find_by_id(&db.pool, asset.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_purge_type_reassigns_assets() {
        let db = DBService::new_in_memory().await.unwrap();
        let svc = TrashService::new();
        let (ty, asset) = seed_asset(&db.pool).await;

        let other = AssetType::create(
            &db.pool,
            &CreateAssetType {
                name: "Khác".into(),
                description: None,
            },
        )
        .await
        .unwrap();

        AssetType::soft_delete(&db.pool, ty.id).await.unwrap();
        svc.purge_asset_type(&db.pool, ty.id).await.unwrap();

        let moved = Asset::find_by_id(&db.pool, asset.id).await.unwrap().unwrap();
        assert_eq!(moved.asset_type_id, other.id);
        assert!(AssetType::find_by_id(&db.pool, ty.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_purge_last_type_with_assets_is_blocked() {
        let db = DBService::new_in_memory().await.unwrap();
        let svc = TrashService::new();
        let (ty, _) = seed_asset(&db.pool).await;

        AssetType::soft_delete(&db.pool, ty.id).await.unwrap();
        let err = svc.purge_asset_type(&db.pool, ty.id).await.unwrap_err();
        assert!(matches!(err, TrashError::TypeStillReferenced));
    }
}
