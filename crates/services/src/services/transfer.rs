//! Asset handover between users, confirmed out-of-band via a one-time token.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{Duration, Utc};
use db::models::{
    asset::{Asset, AssetStatus, CreateAsset},
    asset_transfer::{AssetTransfer, TransferFilter, TransferStatus},
    role::{ROLE_ADMIN, Role},
    user::User,
};
use rand::RngCore;
use serde::Deserialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;
use ts_rs::TS;
use utils::response::Paginated;
use uuid::Uuid;

/// Confirmation links stay valid for a week.
const TOKEN_TTL_DAYS: i64 = 7;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("transfer not found")]
    NotFound,
    #[error("asset not found")]
    AssetNotFound,
    #[error("user not found")]
    UserNotFound,
    #[error("quantity must be between 1 and {available}")]
    InvalidQuantity { available: i64 },
    #[error("asset is not available for transfer")]
    AssetUnavailable,
    #[error("sender and recipient must differ")]
    SameUser,
    #[error("regular users may only transfer assets to an administrator")]
    RecipientNotAllowed,
    #[error("confirmation link has expired")]
    TokenExpired,
    #[error("transfer is not pending")]
    NotPending,
    #[error("confirmed quantity cannot decrease below {already}")]
    QuantityBelowConfirmed { already: i64 },
    #[error("confirmed quantity cannot exceed {expected}")]
    QuantityAboveExpected { expected: i64 },
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct CreateTransfer {
    pub from_user_id: Uuid,
    pub to_user_id: Uuid,
    pub asset_id: Uuid,
    pub quantity: i64,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, TS)]
pub struct ConfirmTransfer {
    pub token: String,
    /// Defaults to everything still outstanding.
    pub quantity: Option<i64>,
}

#[derive(Clone, Default)]
pub struct TransferService;

fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

impl TransferService {
    pub fn new() -> Self {
        Self
    }

    pub async fn create(
        &self,
        pool: &SqlitePool,
        data: &CreateTransfer,
    ) -> Result<AssetTransfer, TransferError> {
        if data.from_user_id == data.to_user_id {
            return Err(TransferError::SameUser);
        }

        let asset = Asset::find_by_id(pool, data.asset_id)
            .await?
            .ok_or(TransferError::AssetNotFound)?;
        if asset.deleted_at.is_some() || asset.status == AssetStatus::Disposed {
            return Err(TransferError::AssetUnavailable);
        }
        if data.quantity < 1 || data.quantity > asset.quantity {
            return Err(TransferError::InvalidQuantity {
                available: asset.quantity,
            });
        }

        let from_user = User::find_by_id(pool, data.from_user_id)
            .await?
            .ok_or(TransferError::UserNotFound)?;
        let to_user = User::find_by_id(pool, data.to_user_id)
            .await?
            .ok_or(TransferError::UserNotFound)?;

        // Regular users hand assets back through an administrator only.
        let from_role = Role::find_by_id(pool, from_user.role_id).await?;
        if from_role.is_some_and(|r| r.name == db::models::role::ROLE_USER) {
            let to_role = Role::find_by_id(pool, to_user.role_id).await?;
            if !to_role.is_some_and(|r| r.name == ROLE_ADMIN) {
                return Err(TransferError::RecipientNotAllowed);
            }
        }

        let seq = AssetTransfer::max_code_seq(pool).await? + 1;
        let code = format!("BG{seq}");
        let token = generate_token();
        let expires = Utc::now() + Duration::days(TOKEN_TTL_DAYS);

        let transfer = AssetTransfer::insert(
            pool,
            &code,
            data.from_user_id,
            data.to_user_id,
            data.asset_id,
            data.quantity,
            data.notes.as_deref(),
            &token,
            expires,
        )
        .await?;

        info!(
            transfer_code = %transfer.transfer_code,
            asset = %asset.name,
            "created transfer of {} unit(s)",
            data.quantity
        );
        Ok(transfer)
    }

    pub async fn find_by_token(
        &self,
        pool: &SqlitePool,
        token: &str,
    ) -> Result<AssetTransfer, TransferError> {
        AssetTransfer::find_by_token(pool, token)
            .await?
            .ok_or(TransferError::NotFound)
    }

    /// Confirm receipt for some or all of the outstanding quantity. The
    /// confirmed total only ever grows; once it reaches the expected quantity
    /// the stock moves from the sender's asset into the recipient's.
    pub async fn confirm(
        &self,
        pool: &SqlitePool,
        data: &ConfirmTransfer,
    ) -> Result<AssetTransfer, TransferError> {
        let transfer = self.find_by_token(pool, &data.token).await?;

        if transfer.status != TransferStatus::Pending {
            return Err(TransferError::NotPending);
        }
        if !transfer.is_token_valid(Utc::now()) {
            return Err(TransferError::TokenExpired);
        }

        let new_total = data.quantity.unwrap_or(transfer.expected_quantity);
        if new_total < transfer.confirmed_quantity {
            return Err(TransferError::QuantityBelowConfirmed {
                already: transfer.confirmed_quantity,
            });
        }
        if new_total > transfer.expected_quantity {
            return Err(TransferError::QuantityAboveExpected {
                expected: transfer.expected_quantity,
            });
        }

        let fully_confirmed = new_total >= transfer.expected_quantity;
        let (status, confirmed_at) = if fully_confirmed {
            (TransferStatus::Confirmed, Some(Utc::now()))
        } else {
            (TransferStatus::Pending, None)
        };

        // Status write and stock movement commit together; a failure part-way
        // through must not leave the transfer confirmed with stock unmoved.
        let mut tx = pool.begin().await?;
        AssetTransfer::update_confirmation(&mut *tx, transfer.id, new_total, status, confirmed_at)
            .await?;
        if fully_confirmed {
            self.move_stock(&mut tx, &transfer).await?;
        }
        tx.commit().await?;

        if fully_confirmed {
            info!(transfer_code = %transfer.transfer_code, "transfer fully confirmed");
        }

        AssetTransfer::find_by_id(pool, transfer.id)
            .await?
            .ok_or(TransferError::NotFound)
    }

    pub async fn reject(
        &self,
        pool: &SqlitePool,
        token: &str,
    ) -> Result<AssetTransfer, TransferError> {
        let transfer = self.find_by_token(pool, token).await?;
        if transfer.status != TransferStatus::Pending {
            return Err(TransferError::NotPending);
        }
        AssetTransfer::update_confirmation(
            pool,
            transfer.id,
            transfer.confirmed_quantity,
            TransferStatus::Rejected,
            None,
        )
        .await?;
        AssetTransfer::find_by_id(pool, transfer.id)
            .await?
            .ok_or(TransferError::NotFound)
    }

    pub async fn cancel(&self, pool: &SqlitePool, id: Uuid) -> Result<AssetTransfer, TransferError> {
        let transfer = AssetTransfer::find_by_id(pool, id)
            .await?
            .ok_or(TransferError::NotFound)?;
        if transfer.status != TransferStatus::Pending {
            return Err(TransferError::NotPending);
        }
        AssetTransfer::update_confirmation(
            pool,
            transfer.id,
            transfer.confirmed_quantity,
            TransferStatus::Cancelled,
            None,
        )
        .await?;
        AssetTransfer::find_by_id(pool, transfer.id)
            .await?
            .ok_or(TransferError::NotFound)
    }

    pub async fn find_by_id(
        &self,
        pool: &SqlitePool,
        id: Uuid,
    ) -> Result<AssetTransfer, TransferError> {
        AssetTransfer::find_by_id(pool, id)
            .await?
            .ok_or(TransferError::NotFound)
    }

    pub async fn list(
        &self,
        pool: &SqlitePool,
        filter: &TransferFilter,
        page: i64,
        per_page: i64,
    ) -> Result<Paginated<AssetTransfer>, TransferError> {
        Ok(AssetTransfer::list(pool, filter, page, per_page).await?)
    }

    pub async fn delete_all(&self, pool: &SqlitePool) -> Result<u64, TransferError> {
        Ok(AssetTransfer::delete_all(pool).await?)
    }

    /// Deduct from the sender. The recipient's stock is merged into an asset
    /// of the same name and type if they already hold one, otherwise a new
    /// asset row is created with a note pointing back at the handover.
    async fn move_stock(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        transfer: &AssetTransfer,
    ) -> Result<(), TransferError> {
        let source = Asset::find_by_id(&mut **tx, transfer.asset_id)
            .await?
            .ok_or(TransferError::AssetNotFound)?;

        Asset::deduct_quantity(&mut **tx, source.id, transfer.expected_quantity).await?;

        match Asset::find_recipient_match(
            &mut **tx,
            &source.name,
            transfer.to_user_id,
            source.asset_type_id,
        )
        .await?
        {
            Some(existing) => {
                Asset::add_quantity(&mut **tx, existing.id, transfer.expected_quantity).await?;
            }
            None => {
                let note = format!("Nhận bàn giao {}", transfer.transfer_code);
                Asset::create(
                    &mut **tx,
                    &CreateAsset {
                        name: source.name.clone(),
                        price: source.price,
                        quantity: Some(transfer.expected_quantity),
                        status: Some(AssetStatus::Active),
                        purchase_date: source.purchase_date,
                        device_code: source.device_code.clone(),
                        condition_label: source.condition_label.clone(),
                        display_order: None,
                        asset_type_id: source.asset_type_id,
                        user_id: Some(transfer.to_user_id),
                        user_text: None,
                        notes: Some(note),
                        warranty_contact_name: source.warranty_contact_name.clone(),
                        warranty_contact_phone: source.warranty_contact_phone.clone(),
                        warranty_contact_email: source.warranty_contact_email.clone(),
                        warranty_website: source.warranty_website.clone(),
                        warranty_start_date: source.warranty_start_date,
                        warranty_end_date: source.warranty_end_date,
                        warranty_period_months: source.warranty_period_months,
                        invoice_file_path: None,
                    },
                )
                .await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use db::{
        DBService,
        models::{
            asset_type::{AssetType, CreateAssetType},
            role::{ROLE_MANAGER, ROLE_USER},
            user::CreateUser,
        },
    };

    use super::*;

    struct Fixture {
        db: DBService,
        admin: User,
        user: User,
        asset: Asset,
    }

    async fn fixture() -> Fixture {
        let db = DBService::new_in_memory().await.unwrap();
        Role::ensure_defaults(&db.pool).await.unwrap();

        let admin_role = Role::find_by_name(&db.pool, ROLE_ADMIN).await.unwrap().unwrap();
        let user_role = Role::find_by_name(&db.pool, ROLE_USER).await.unwrap().unwrap();

        let admin = User::create(
            &db.pool,
            &CreateUser {
                username: "admin".into(),
                password: "secret".into(),
                email: "admin@example.com".into(),
                name: None,
                role_id: admin_role.id,
                asset_quota: None,
            },
        )
        .await
        .unwrap();
        let user = User::create(
            &db.pool,
            &CreateUser {
                username: "lan".into(),
                password: "secret".into(),
                email: "lan@example.com".into(),
                name: Some("Lan".into()),
                role_id: user_role.id,
                asset_quota: None,
            },
        )
        .await
        .unwrap();

        let asset_type = AssetType::create(
            &db.pool,
            &CreateAssetType {
                name: "Laptop".into(),
                description: None,
            },
        )
        .await
        .unwrap();
        let asset = Asset::create(
            &db.pool,
            &CreateAsset {
                name: "Dell Latitude".into(),
                price: 20_000_000.0,
                quantity: Some(3),
                status: None,
                purchase_date: None,
                device_code: None,
                condition_label: None,
                display_order: None,
                asset_type_id: asset_type.id,
                user_id: Some(admin.id),
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

        Fixture { db, admin, user, asset }
    }

    #[tokio::test]
    async fn test_create_assigns_sequential_codes() {
        let f = fixture().await;
        let svc = TransferService::new();

        let first = svc
            .create(
                &f.db.pool,
                &CreateTransfer {
                    from_user_id: f.admin.id,
                    to_user_id: f.user.id,
                    asset_id: f.asset.id,
                    quantity: 1,
                    notes: None,
                },
            )
            .await
            .unwrap();
        let second = svc
            .create(
                &f.db.pool,
                &CreateTransfer {
                    from_user_id: f.admin.id,
                    to_user_id: f.user.id,
                    asset_id: f.asset.id,
                    quantity: 1,
                    notes: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(first.transfer_code, "BG1");
        assert_eq!(second.transfer_code, "BG2");
        assert_eq!(first.status, TransferStatus::Pending);
        assert_eq!(first.expected_quantity, 1);
    }

    #[tokio::test]
    async fn test_create_rejects_bad_quantity() {
        let f = fixture().await;
        let svc = TransferService::new();

        let err = svc
            .create(
                &f.db.pool,
                &CreateTransfer {
                    from_user_id: f.admin.id,
                    to_user_id: f.user.id,
                    asset_id: f.asset.id,
                    quantity: 10,
                    notes: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::InvalidQuantity { available: 3 }));
    }

    #[tokio::test]
    async fn test_user_may_only_send_to_admin() {
        let f = fixture().await;
        let svc = TransferService::new();

        let manager_role = Role::find_by_name(&f.db.pool, ROLE_MANAGER)
            .await
            .unwrap()
            .unwrap();
        let manager = User::create(
            &f.db.pool,
            &CreateUser {
                username: "minh".into(),
                password: "secret".into(),
                email: "minh@example.com".into(),
                name: None,
                role_id: manager_role.id,
                asset_quota: None,
            },
        )
        .await
        .unwrap();

        // Hand the asset to the regular user first.
        let user_asset = Asset::create(
            &f.db.pool,
            &CreateAsset {
                name: "Chuột Logitech".into(),
                price: 500_000.0,
                quantity: Some(1),
                status: None,
                purchase_date: None,
                device_code: None,
                condition_label: None,
                display_order: None,
                asset_type_id: f.asset.asset_type_id,
                user_id: Some(f.user.id),
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

        let err = svc
            .create(
                &f.db.pool,
                &CreateTransfer {
                    from_user_id: f.user.id,
                    to_user_id: manager.id,
                    asset_id: user_asset.id,
                    quantity: 1,
                    notes: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::RecipientNotAllowed));

        svc.create(
            &f.db.pool,
            &CreateTransfer {
                from_user_id: f.user.id,
                to_user_id: f.admin.id,
                asset_id: user_asset.id,
                quantity: 1,
                notes: None,
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_partial_then_full_confirmation_moves_stock() {
        let f = fixture().await;
        let svc = TransferService::new();

        let transfer = svc
            .create(
                &f.db.pool,
                &CreateTransfer {
                    from_user_id: f.admin.id,
                    to_user_id: f.user.id,
                    asset_id: f.asset.id,
                    quantity: 2,
                    notes: None,
                },
            )
            .await
            .unwrap();

        let partial = svc
            .confirm(
                &f.db.pool,
                &ConfirmTransfer {
                    token: transfer.confirmation_token.clone(),
                    quantity: Some(1),
                },
            )
            .await
            .unwrap();
        assert_eq!(partial.status, TransferStatus::Pending);
        assert_eq!(partial.confirmed_quantity, 1);

        // Confirmed total cannot back off.
        let err = svc
            .confirm(
                &f.db.pool,
                &ConfirmTransfer {
                    token: transfer.confirmation_token.clone(),
                    quantity: Some(0),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::QuantityBelowConfirmed { already: 1 }));

        let full = svc
            .confirm(
                &f.db.pool,
                &ConfirmTransfer {
                    token: transfer.confirmation_token.clone(),
                    quantity: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(full.status, TransferStatus::Confirmed);
        assert!(full.confirmed_at.is_some());

        let source = Asset::find_by_id(&f.db.pool, f.asset.id).await.unwrap().unwrap();
        assert_eq!(source.quantity, 1);

        let received = Asset::find_by_owner(&f.db.pool, f.user.id).await.unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].quantity, 2);
        assert_eq!(received[0].name, "Dell Latitude");
    }

    #[tokio::test]
    async fn test_full_transfer_disposes_source() {
        let f = fixture().await;
        let svc = TransferService::new();

        let transfer = svc
            .create(
                &f.db.pool,
                &CreateTransfer {
                    from_user_id: f.admin.id,
                    to_user_id: f.user.id,
                    asset_id: f.asset.id,
                    quantity: 3,
                    notes: None,
                },
            )
            .await
            .unwrap();
        svc.confirm(
            &f.db.pool,
            &ConfirmTransfer {
                token: transfer.confirmation_token,
                quantity: None,
            },
        )
        .await
        .unwrap();

        let source = Asset::find_by_id(&f.db.pool, f.asset.id).await.unwrap().unwrap();
        assert_eq!(source.quantity, 0);
        assert_eq!(source.status, AssetStatus::Disposed);
    }

    #[tokio::test]
    async fn test_failed_stock_move_rolls_back_confirmation() {
        let f = fixture().await;
        let svc = TransferService::new();

        let transfer = svc
            .create(
                &f.db.pool,
                &CreateTransfer {
                    from_user_id: f.admin.id,
                    to_user_id: f.user.id,
                    asset_id: f.asset.id,
                    quantity: 2,
                    notes: None,
                },
            )
            .await
            .unwrap();

        // Pull the asset row out from under the pending transfer so the stock
        // movement fails mid-confirmation.
        let mut conn = f.db.pool.acquire().await.unwrap();
        sqlx::query("PRAGMA foreign_keys = OFF")
            .execute(&mut *conn)
            .await
            .unwrap();
        sqlx::query("DELETE FROM assets WHERE id = $1")
            .bind(f.asset.id)
            .execute(&mut *conn)
            .await
            .unwrap();
        drop(conn);

        let err = svc
            .confirm(
                &f.db.pool,
                &ConfirmTransfer {
                    token: transfer.confirmation_token.clone(),
                    quantity: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::AssetNotFound));

        // The transfer must not be left confirmed when no stock moved.
        let after = AssetTransfer::find_by_id(&f.db.pool, transfer.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.status, TransferStatus::Pending);
        assert_eq!(after.confirmed_quantity, 0);
        assert!(after.confirmed_at.is_none());
    }

    #[tokio::test]
    async fn test_confirm_merges_into_existing_recipient_asset() {
        let f = fixture().await;
        let svc = TransferService::new();

        // Recipient already holds two units of the same model.
        Asset::create(
            &f.db.pool,
            &CreateAsset {
                name: "Dell Latitude".into(),
                price: 20_000_000.0,
                quantity: Some(2),
                status: None,
                purchase_date: None,
                device_code: None,
                condition_label: None,
                display_order: None,
                asset_type_id: f.asset.asset_type_id,
                user_id: Some(f.user.id),
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

        let transfer = svc
            .create(
                &f.db.pool,
                &CreateTransfer {
                    from_user_id: f.admin.id,
                    to_user_id: f.user.id,
                    asset_id: f.asset.id,
                    quantity: 1,
                    notes: None,
                },
            )
            .await
            .unwrap();
        svc.confirm(
            &f.db.pool,
            &ConfirmTransfer {
                token: transfer.confirmation_token,
                quantity: None,
            },
        )
        .await
        .unwrap();

        let received = Asset::find_by_owner(&f.db.pool, f.user.id).await.unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].quantity, 3);
    }

    #[tokio::test]
    async fn test_expired_token_is_rejected() {
        let f = fixture().await;
        let svc = TransferService::new();

        let transfer = svc
            .create(
                &f.db.pool,
                &CreateTransfer {
                    from_user_id: f.admin.id,
                    to_user_id: f.user.id,
                    asset_id: f.asset.id,
                    quantity: 1,
                    notes: None,
                },
            )
            .await
            .unwrap();

        sqlx::query("UPDATE asset_transfers SET token_expires_at = $2 WHERE id = $1")
            .bind(transfer.id)
            .bind(Utc::now() - Duration::days(1))
            .execute(&f.db.pool)
            .await
            .unwrap();

        let err = svc
            .confirm(
                &f.db.pool,
                &ConfirmTransfer {
                    token: transfer.confirmation_token,
                    quantity: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::TokenExpired));
    }

    #[tokio::test]
    async fn test_cancel_and_reject() {
        let f = fixture().await;
        let svc = TransferService::new();

        let t1 = svc
            .create(
                &f.db.pool,
                &CreateTransfer {
                    from_user_id: f.admin.id,
                    to_user_id: f.user.id,
                    asset_id: f.asset.id,
                    quantity: 1,
                    notes: None,
                },
            )
            .await
            .unwrap();
        let cancelled = svc.cancel(&f.db.pool, t1.id).await.unwrap();
        assert_eq!(cancelled.status, TransferStatus::Cancelled);

        let t2 = svc
            .create(
                &f.db.pool,
                &CreateTransfer {
                    from_user_id: f.admin.id,
                    to_user_id: f.user.id,
                    asset_id: f.asset.id,
                    quantity: 1,
                    notes: None,
                },
            )
            .await
            .unwrap();
        let rejected = svc.reject(&f.db.pool, &t2.confirmation_token).await.unwrap();
        assert_eq!(rejected.status, TransferStatus::Rejected);

        // Neither flow touched the stock.
        let source = Asset::find_by_id(&f.db.pool, f.asset.id).await.unwrap().unwrap();
        assert_eq!(source.quantity, 3);
    }
}
