//! Fine-grained module/action grants per user. Administrators bypass the
//! grant table entirely and their grant set cannot be edited.

use db::models::{
    permission::{Permission, UserPermission},
    role::{ROLE_ADMIN, Role},
    user::User,
};
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PermissionError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("user not found")]
    UserNotFound,
    #[error("administrator permissions cannot be modified")]
    AdminImmutable,
}

#[derive(Debug, Serialize, TS)]
pub struct UserGrants {
    pub user_id: Uuid,
    pub is_admin: bool,
    pub granted_ids: Vec<Uuid>,
}

#[derive(Clone, Default)]
pub struct PermissionService;

impl PermissionService {
    pub fn new() -> Self {
        Self
    }

    pub async fn catalog(&self, pool: &SqlitePool) -> Result<Vec<Permission>, PermissionError> {
        Ok(Permission::find_all(pool).await?)
    }

    async fn is_admin(&self, pool: &SqlitePool, user: &User) -> Result<bool, PermissionError> {
        let role = Role::find_by_id(pool, user.role_id).await?;
        Ok(role.is_some_and(|r| r.name == ROLE_ADMIN))
    }

    pub async fn grants_for(
        &self,
        pool: &SqlitePool,
        user_id: Uuid,
    ) -> Result<UserGrants, PermissionError> {
        let user = User::find_by_id(pool, user_id)
            .await?
            .ok_or(PermissionError::UserNotFound)?;
        let is_admin = self.is_admin(pool, &user).await?;
        let granted_ids = if is_admin {
            Permission::find_all(pool).await?.into_iter().map(|p| p.id).collect()
        } else {
            UserPermission::granted_ids(pool, user_id).await?
        };
        Ok(UserGrants {
            user_id,
            is_admin,
            granted_ids,
        })
    }

    pub async fn update_grants(
        &self,
        pool: &SqlitePool,
        user_id: Uuid,
        permission_ids: &[Uuid],
    ) -> Result<(), PermissionError> {
        let user = User::find_by_id(pool, user_id)
            .await?
            .ok_or(PermissionError::UserNotFound)?;
        if self.is_admin(pool, &user).await? {
            return Err(PermissionError::AdminImmutable);
        }
        UserPermission::replace_for_user(pool, user_id, permission_ids).await?;
        Ok(())
    }

    /// Effective check used by the API layer. Admin role short-circuits.
    pub async fn check(
        &self,
        pool: &SqlitePool,
        user_id: Uuid,
        module: &str,
        action: &str,
    ) -> Result<bool, PermissionError> {
        let user = User::find_by_id(pool, user_id)
            .await?
            .ok_or(PermissionError::UserNotFound)?;
        if self.is_admin(pool, &user).await? {
            return Ok(true);
        }
        Ok(UserPermission::is_granted(pool, user_id, module, action).await?)
    }
}

#[cfg(test)]
mod tests {
    use db::{
        DBService,
        models::{role::ROLE_USER, user::CreateUser},
    };

    use super::*;

    async fn setup() -> (DBService, User, User) {
        let db = DBService::new_in_memory().await.unwrap();
        Role::ensure_defaults(&db.pool).await.unwrap();
        Permission::ensure_defaults(&db.pool).await.unwrap();

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
        let member = User::create(
            &db.pool,
            &CreateUser {
                username: "hoa".into(),
                password: "secret".into(),
                email: "hoa@example.com".into(),
                name: None,
                role_id: user_role.id,
                asset_quota: None,
            },
        )
        .await
        .unwrap();
        (db, admin, member)
    }

    #[tokio::test]
    async fn test_catalog_is_seeded() {
        let (db, _, _) = setup().await;
        let svc = PermissionService::new();
        let catalog = svc.catalog(&db.pool).await.unwrap();
        assert_eq!(catalog.len(), 30);
        assert!(catalog.iter().any(|p| p.module == "assets" && p.action == "full"));
    }

    #[tokio::test]
    async fn test_admin_has_everything_and_is_immutable() {
        let (db, admin, _) = setup().await;
        let svc = PermissionService::new();

        assert!(svc.check(&db.pool, admin.id, "assets", "delete").await.unwrap());
        let grants = svc.grants_for(&db.pool, admin.id).await.unwrap();
        assert!(grants.is_admin);
        assert_eq!(grants.granted_ids.len(), 30);

        let err = svc.update_grants(&db.pool, admin.id, &[]).await.unwrap_err();
        assert!(matches!(err, PermissionError::AdminImmutable));
    }

    #[tokio::test]
    async fn test_grant_and_full_fallback() {
        let (db, _, member) = setup().await;
        let svc = PermissionService::new();

        assert!(!svc.check(&db.pool, member.id, "assets", "view").await.unwrap());

        let catalog = svc.catalog(&db.pool).await.unwrap();
        let assets_full = catalog
            .iter()
            .find(|p| p.module == "assets" && p.action == "full")
            .unwrap();
        svc.update_grants(&db.pool, member.id, &[assets_full.id]).await.unwrap();

        // `full` implies every action in the module.
        assert!(svc.check(&db.pool, member.id, "assets", "view").await.unwrap());
        assert!(svc.check(&db.pool, member.id, "assets", "delete").await.unwrap());
        assert!(!svc.check(&db.pool, member.id, "users", "view").await.unwrap());

        // Replacing the set drops what is no longer listed.
        svc.update_grants(&db.pool, member.id, &[]).await.unwrap();
        assert!(!svc.check(&db.pool, member.id, "assets", "view").await.unwrap());
    }
}
