//! Stocktake campaigns. A count sheet is generated from the live asset book,
//! filled in, then walked through submit, approve-and-lock and close. Every
//! workflow step leaves a row in the inventory log.

use db::models::{
    asset::Asset,
    inventory::{
        CreateInventory, CreateSurplusAsset, Inventory, InventoryFilter, InventoryLog,
        InventoryResult, InventoryStatus, InventorySurplusAsset, SaveInventoryResult,
    },
};
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use ts_rs::TS;
use utils::response::Paginated;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("inventory not found")]
    NotFound,
    #[error("line not found")]
    LineNotFound,
    #[error("cannot move inventory from {from} to {to}")]
    InvalidTransition {
        from: InventoryStatus,
        to: InventoryStatus,
    },
    #[error("inventory is not editable in status {0}")]
    NotEditable(InventoryStatus),
    #[error("a reason is required to unlock an approved inventory")]
    ReasonRequired,
    #[error("only a locked inventory can be unlocked")]
    NotLocked,
    #[error("only a draft inventory can be deleted")]
    NotDraft,
}

/// Count sheet with completion numbers for the detail screen.
#[derive(Debug, Serialize, TS)]
pub struct InventorySheet {
    pub inventory: Inventory,
    pub results: Vec<InventoryResult>,
    pub surplus: Vec<InventorySurplusAsset>,
    pub logs: Vec<InventoryLog>,
    pub total_lines: i64,
    pub checked_lines: i64,
}

#[derive(Clone, Default)]
pub struct InventoryService;

impl InventoryService {
    pub fn new() -> Self {
        Self
    }

    pub async fn create(
        &self,
        pool: &SqlitePool,
        data: &CreateInventory,
        created_by_id: Uuid,
    ) -> Result<Inventory, InventoryError> {
        let seq = Inventory::max_code_seq(pool).await? + 1;
        let code = format!("KK{seq}");
        let inventory = Inventory::create(pool, &code, data, created_by_id).await?;
        InventoryLog::record(
            pool,
            inventory.id,
            "create",
            None,
            Some(InventoryStatus::Draft),
            None,
            Some(created_by_id),
        )
        .await?;
        info!(inventory_code = %inventory.inventory_code, "created inventory");
        Ok(inventory)
    }

    pub async fn find_by_id(
        &self,
        pool: &SqlitePool,
        id: Uuid,
    ) -> Result<Inventory, InventoryError> {
        Inventory::find_by_id(pool, id)
            .await?
            .ok_or(InventoryError::NotFound)
    }

    pub async fn list(
        &self,
        pool: &SqlitePool,
        filter: &InventoryFilter,
        page: i64,
        per_page: i64,
    ) -> Result<Paginated<Inventory>, InventoryError> {
        Ok(Inventory::list(pool, filter, page, per_page).await?)
    }

    pub async fn sheet(&self, pool: &SqlitePool, id: Uuid) -> Result<InventorySheet, InventoryError> {
        let inventory = self.find_by_id(pool, id).await?;
        let results = InventoryResult::find_for_inventory(pool, id).await?;
        let surplus = InventorySurplusAsset::find_for_inventory(pool, id).await?;
        let logs = InventoryLog::find_for_inventory(pool, id).await?;
        let (total_lines, checked_lines) = InventoryResult::count_for_inventory(pool, id).await?;
        Ok(InventorySheet {
            inventory,
            results,
            surplus,
            logs,
            total_lines,
            checked_lines,
        })
    }

    pub async fn update_details(
        &self,
        pool: &SqlitePool,
        id: Uuid,
        data: &CreateInventory,
    ) -> Result<Inventory, InventoryError> {
        let inventory = self.find_by_id(pool, id).await?;
        if !inventory.status.is_editable() {
            return Err(InventoryError::NotEditable(inventory.status));
        }
        Inventory::update_details(pool, id, data)
            .await?
            .ok_or(InventoryError::NotFound)
    }

    /// Snapshot the live asset book into count lines. Assets already on the
    /// sheet are skipped, so generation can be re-run as new assets arrive.
    /// A draft moves to in_progress on first generation.
    pub async fn generate_lines(
        &self,
        pool: &SqlitePool,
        id: Uuid,
        actor_id: Option<Uuid>,
    ) -> Result<u64, InventoryError> {
        let inventory = self.find_by_id(pool, id).await?;
        if !inventory.status.is_editable() {
            return Err(InventoryError::NotEditable(inventory.status));
        }

        let mut inserted = 0u64;
        for asset in Asset::find_all_live(pool).await? {
            let added = InventoryResult::insert_snapshot(
                pool,
                id,
                asset.id,
                asset.quantity,
                asset.price * asset.quantity as f64,
                Some(asset.asset_type_id),
                Some(&asset.status.to_string()),
            )
            .await?;
            if added {
                inserted += 1;
            }
        }

        if inventory.status == InventoryStatus::Draft {
            Inventory::set_status(pool, id, InventoryStatus::InProgress).await?;
            InventoryLog::record(
                pool,
                id,
                "generate_lines",
                Some(InventoryStatus::Draft),
                Some(InventoryStatus::InProgress),
                None,
                actor_id,
            )
            .await?;
        }
        info!(inventory_id = %id, inserted, "generated inventory lines");
        Ok(inserted)
    }

    /// Record the physical count for one line. The difference column keeps
    /// actual minus book quantity.
    pub async fn save_result(
        &self,
        pool: &SqlitePool,
        inventory_id: Uuid,
        line_id: Uuid,
        data: &SaveInventoryResult,
        checked_by_id: Option<Uuid>,
    ) -> Result<InventoryResult, InventoryError> {
        let inventory = self.find_by_id(pool, inventory_id).await?;
        if !inventory.status.is_editable() {
            return Err(InventoryError::NotEditable(inventory.status));
        }
        let line = InventoryResult::find_by_id(pool, line_id)
            .await?
            .filter(|l| l.inventory_id == inventory_id)
            .ok_or(InventoryError::LineNotFound)?;

        let difference = data
            .actual_quantity
            .map(|actual| (actual - line.book_quantity) as f64);
        InventoryResult::save_actuals(pool, line_id, data, difference, checked_by_id)
            .await?
            .ok_or(InventoryError::LineNotFound)
    }

    /// Assets found on the floor with no book entry.
    pub async fn add_surplus(
        &self,
        pool: &SqlitePool,
        inventory_id: Uuid,
        data: &CreateSurplusAsset,
        created_by_id: Option<Uuid>,
    ) -> Result<InventorySurplusAsset, InventoryError> {
        let inventory = self.find_by_id(pool, inventory_id).await?;
        if !inventory.status.is_editable() {
            return Err(InventoryError::NotEditable(inventory.status));
        }
        Ok(InventorySurplusAsset::create(pool, inventory_id, data, created_by_id).await?)
    }

    pub async fn submit(
        &self,
        pool: &SqlitePool,
        id: Uuid,
        actor_id: Option<Uuid>,
    ) -> Result<Inventory, InventoryError> {
        self.advance(pool, id, InventoryStatus::Submitted, "submit", actor_id)
            .await
    }

    pub async fn approve_and_lock(
        &self,
        pool: &SqlitePool,
        id: Uuid,
        actor_id: Option<Uuid>,
    ) -> Result<Inventory, InventoryError> {
        let inventory = self.find_by_id(pool, id).await?;
        let to = InventoryStatus::ApprovedLocked;
        if !inventory.status.can_advance_to(to) {
            return Err(InventoryError::InvalidTransition {
                from: inventory.status,
                to,
            });
        }
        Inventory::mark_locked(pool, id, actor_id).await?;
        InventoryLog::record(
            pool,
            id,
            "approve_lock",
            Some(inventory.status),
            Some(to),
            None,
            actor_id,
        )
        .await?;
        self.find_by_id(pool, id).await
    }

    /// Reopen a locked inventory for corrections. The reason is mandatory and
    /// lands in the log.
    pub async fn unlock(
        &self,
        pool: &SqlitePool,
        id: Uuid,
        reason: &str,
        actor_id: Option<Uuid>,
    ) -> Result<Inventory, InventoryError> {
        if reason.trim().is_empty() {
            return Err(InventoryError::ReasonRequired);
        }
        let inventory = self.find_by_id(pool, id).await?;
        if inventory.status != InventoryStatus::ApprovedLocked {
            return Err(InventoryError::NotLocked);
        }
        Inventory::mark_unlocked(pool, id).await?;
        InventoryLog::record(
            pool,
            id,
            "unlock",
            Some(InventoryStatus::ApprovedLocked),
            Some(InventoryStatus::InProgress),
            Some(reason.trim()),
            actor_id,
        )
        .await?;
        self.find_by_id(pool, id).await
    }

    pub async fn close(
        &self,
        pool: &SqlitePool,
        id: Uuid,
        actor_id: Option<Uuid>,
    ) -> Result<Inventory, InventoryError> {
        let inventory = self.find_by_id(pool, id).await?;
        let to = InventoryStatus::Closed;
        if !inventory.status.can_advance_to(to) {
            return Err(InventoryError::InvalidTransition {
                from: inventory.status,
                to,
            });
        }
        Inventory::mark_closed(pool, id, actor_id).await?;
        InventoryLog::record(pool, id, "close", Some(inventory.status), Some(to), None, actor_id)
            .await?;
        self.find_by_id(pool, id).await
    }

    pub async fn delete(&self, pool: &SqlitePool, id: Uuid) -> Result<(), InventoryError> {
        let inventory = self.find_by_id(pool, id).await?;
        if inventory.status != InventoryStatus::Draft {
            return Err(InventoryError::NotDraft);
        }
        Inventory::delete(pool, id).await?;
        Ok(())
    }

    async fn advance(
        &self,
        pool: &SqlitePool,
        id: Uuid,
        to: InventoryStatus,
        action: &str,
        actor_id: Option<Uuid>,
    ) -> Result<Inventory, InventoryError> {
        let inventory = self.find_by_id(pool, id).await?;
        if !inventory.status.can_advance_to(to) {
            return Err(InventoryError::InvalidTransition {
                from: inventory.status,
                to,
            });
        }
        Inventory::set_status(pool, id, to).await?;
        InventoryLog::record(pool, id, action, Some(inventory.status), Some(to), None, actor_id)
            .await?;
        self.find_by_id(pool, id).await
    }
}

#[cfg(test)]
mod tests {
    use db::{
        DBService,
        models::{
            asset::CreateAsset,
            asset_type::{AssetType, CreateAssetType},
            role::{ROLE_ADMIN, Role},
            user::{CreateUser, User},
        },
    };

    use super::*;

    async fn setup() -> (DBService, User) {
        let db = DBService::new_in_memory().await.unwrap();
        Role::ensure_defaults(&db.pool).await.unwrap();
        let role = Role::find_by_name(&db.pool, ROLE_ADMIN).await.unwrap().unwrap();
        let user = User::create(
            &db.pool,
            &CreateUser {
                username: "admin".into(),
                password: "secret".into(),
                email: "admin@example.com".into(),
                name: None,
                role_id: role.id,
                asset_quota: None,
            },
        )
        .await
        .unwrap();
        (db, user)
    }

    async fn seed_assets(pool: &SqlitePool, count: usize) {
        let ty = AssetType::create(
            pool,
            &CreateAssetType {
                name: "Thiết bị".into(),
                description: None,
            },
        )
        .await
        .unwrap();
        for i in 0..count {
            Asset::create(
                pool,
                &CreateAsset {
                    name: format!("Thiết bị {i}"),
                    price: 1_000_000.0,
                    quantity: Some(2),
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
        }
    }

    fn draft(name: &str) -> CreateInventory {
        CreateInventory {
            inventory_name: name.into(),
            inventory_time: None,
            start_date: None,
            end_date: None,
            inventory_type: None,
            scope_type: None,
            scope: None,
            decision_number: None,
            decision_date: None,
        }
    }

    #[tokio::test]
    async fn test_create_assigns_kk_codes() {
        let (db, user) = setup().await;
        let svc = InventoryService::new();

        let first = svc.create(&db.pool, &draft("Kiểm kê Q1"), user.id).await.unwrap();
        let second = svc.create(&db.pool, &draft("Kiểm kê Q2"), user.id).await.unwrap();
        assert_eq!(first.inventory_code, "KK1");
        assert_eq!(second.inventory_code, "KK2");
        assert_eq!(first.status, InventoryStatus::Draft);
    }

    #[tokio::test]
    async fn test_generate_lines_is_idempotent_and_starts_progress() {
        let (db, user) = setup().await;
        let svc = InventoryService::new();
        seed_assets(&db.pool, 3).await;

        let inv = svc.create(&db.pool, &draft("Kiểm kê"), user.id).await.unwrap();
        let inserted = svc.generate_lines(&db.pool, inv.id, Some(user.id)).await.unwrap();
        assert_eq!(inserted, 3);

        let again = svc.generate_lines(&db.pool, inv.id, Some(user.id)).await.unwrap();
        assert_eq!(again, 0);

        let sheet = svc.sheet(&db.pool, inv.id).await.unwrap();
        assert_eq!(sheet.inventory.status, InventoryStatus::InProgress);
        assert_eq!(sheet.total_lines, 3);
        assert_eq!(sheet.checked_lines, 0);
        assert_eq!(sheet.results[0].book_value, 2_000_000.0);
    }

    #[tokio::test]
    async fn test_save_result_computes_difference() {
        let (db, user) = setup().await;
        let svc = InventoryService::new();
        seed_assets(&db.pool, 1).await;

        let inv = svc.create(&db.pool, &draft("Kiểm kê"), user.id).await.unwrap();
        svc.generate_lines(&db.pool, inv.id, Some(user.id)).await.unwrap();
        let line = svc.sheet(&db.pool, inv.id).await.unwrap().results.remove(0);

        let saved = svc
            .save_result(
                &db.pool,
                inv.id,
                line.id,
                &SaveInventoryResult {
                    actual_quantity: Some(1),
                    actual_condition: Some("Trầy xước nhẹ".into()),
                    actual_value: None,
                    actual_serial_plate: None,
                    notes: None,
                },
                Some(user.id),
            )
            .await
            .unwrap();
        assert_eq!(saved.difference, Some(-1.0));
        assert!(saved.checked_at.is_some());

        let sheet = svc.sheet(&db.pool, inv.id).await.unwrap();
        assert_eq!(sheet.checked_lines, 1);
    }

    #[tokio::test]
    async fn test_workflow_and_unlock_requires_reason() {
        let (db, user) = setup().await;
        let svc = InventoryService::new();
        seed_assets(&db.pool, 1).await;

        let inv = svc.create(&db.pool, &draft("Kiểm kê"), user.id).await.unwrap();
        svc.generate_lines(&db.pool, inv.id, Some(user.id)).await.unwrap();

        // Cannot lock straight from in_progress.
        let err = svc.approve_and_lock(&db.pool, inv.id, Some(user.id)).await.unwrap_err();
        assert!(matches!(err, InventoryError::InvalidTransition { .. }));

        svc.submit(&db.pool, inv.id, Some(user.id)).await.unwrap();
        let locked = svc.approve_and_lock(&db.pool, inv.id, Some(user.id)).await.unwrap();
        assert_eq!(locked.status, InventoryStatus::ApprovedLocked);
        assert!(locked.locked_at.is_some());

        // Editing while locked is refused.
        let line = svc.sheet(&db.pool, inv.id).await.unwrap().results.remove(0);
        let err = svc
            .save_result(
                &db.pool,
                inv.id,
                line.id,
                &SaveInventoryResult {
                    actual_quantity: Some(2),
                    actual_condition: None,
                    actual_value: None,
                    actual_serial_plate: None,
                    notes: None,
                },
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::NotEditable(_)));

        let err = svc.unlock(&db.pool, inv.id, "  ", Some(user.id)).await.unwrap_err();
        assert!(matches!(err, InventoryError::ReasonRequired));

        let reopened = svc
            .unlock(&db.pool, inv.id, "Sai số liệu phòng kế toán", Some(user.id))
            .await
            .unwrap();
        assert_eq!(reopened.status, InventoryStatus::InProgress);
        assert!(reopened.locked_at.is_none());

        svc.submit(&db.pool, inv.id, Some(user.id)).await.unwrap();
        svc.approve_and_lock(&db.pool, inv.id, Some(user.id)).await.unwrap();
        let closed = svc.close(&db.pool, inv.id, Some(user.id)).await.unwrap();
        assert_eq!(closed.status, InventoryStatus::Closed);

        let logs = svc.sheet(&db.pool, inv.id).await.unwrap().logs;
        assert!(logs.iter().any(|l| l.action == "unlock"
            && l.reason.as_deref() == Some("Sai số liệu phòng kế toán")));
    }

    #[tokio::test]
    async fn test_delete_draft_only() {
        let (db, user) = setup().await;
        let svc = InventoryService::new();
        seed_assets(&db.pool, 1).await;

        let inv = svc.create(&db.pool, &draft("Kiểm kê"), user.id).await.unwrap();
        svc.generate_lines(&db.pool, inv.id, Some(user.id)).await.unwrap();
        let err = svc.delete(&db.pool, inv.id).await.unwrap_err();
        assert!(matches!(err, InventoryError::NotDraft));

        let other = svc.create(&db.pool, &draft("Nháp"), user.id).await.unwrap();
        svc.delete(&db.pool, other.id).await.unwrap();
        assert!(matches!(
            svc.find_by_id(&db.pool, other.id).await.unwrap_err(),
            InventoryError::NotFound
        ));
    }
}
