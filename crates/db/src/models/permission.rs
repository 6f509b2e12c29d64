use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct Permission {
    pub id: Uuid,
    pub module: String,
    pub action: String,
    pub name: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct UserPermission {
    pub id: Uuid,
    pub user_id: Uuid,
    pub permission_id: Uuid,
    pub granted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Built-in catalog. Display names stay in Vietnamese to match the UI.
const DEFAULT_PERMISSIONS: &[(&str, &str, &str, &str)] = &[
    ("assets", "add", "Thêm tài sản", "Quản lý tài sản"),
    ("assets", "view", "Xem tài sản", "Quản lý tài sản"),
    ("assets", "edit", "Chỉnh sửa tài sản", "Quản lý tài sản"),
    ("assets", "delete", "Xóa tài sản", "Quản lý tài sản"),
    ("assets", "full", "Toàn quyền tài sản", "Quản lý tài sản"),
    ("asset_types", "add", "Thêm loại tài sản", "Quản lý loại tài sản"),
    ("asset_types", "view", "Xem loại tài sản", "Quản lý loại tài sản"),
    ("asset_types", "edit", "Chỉnh sửa loại tài sản", "Quản lý loại tài sản"),
    ("asset_types", "delete", "Xóa loại tài sản", "Quản lý loại tài sản"),
    ("asset_types", "full", "Toàn quyền loại tài sản", "Quản lý loại tài sản"),
    ("users", "add", "Thêm người dùng", "Quản lý người dùng"),
    ("users", "view", "Xem người dùng", "Quản lý người dùng"),
    ("users", "edit", "Chỉnh sửa người dùng", "Quản lý người dùng"),
    ("users", "delete", "Xóa người dùng", "Quản lý người dùng"),
    ("users", "full", "Toàn quyền người dùng", "Quản lý người dùng"),
    ("maintenance", "add", "Thêm bảo trì", "Bảo trì thiết bị"),
    ("maintenance", "view", "Xem bảo trì", "Bảo trì thiết bị"),
    ("maintenance", "edit", "Chỉnh sửa bảo trì", "Bảo trì thiết bị"),
    ("maintenance", "delete", "Xóa bảo trì", "Bảo trì thiết bị"),
    ("maintenance", "full", "Toàn quyền bảo trì", "Bảo trì thiết bị"),
    ("transfer", "add", "Tạo bàn giao", "Bàn giao tài sản"),
    ("transfer", "view", "Xem bàn giao", "Bàn giao tài sản"),
    ("transfer", "edit", "Chỉnh sửa bàn giao", "Bàn giao tài sản"),
    ("transfer", "delete", "Xóa bàn giao", "Bàn giao tài sản"),
    ("transfer", "full", "Toàn quyền bàn giao", "Bàn giao tài sản"),
    ("reports", "view", "Xem báo cáo", "Báo cáo"),
    ("reports", "export", "Xuất báo cáo", "Báo cáo"),
    ("reports", "full", "Toàn quyền báo cáo", "Báo cáo"),
    ("audit_logs", "view", "Xem nhật ký", "Nhật ký hệ thống"),
    ("audit_logs", "full", "Toàn quyền nhật ký", "Nhật ký hệ thống"),
];

const SELECT_COLS: &str = "id, module, action, name, description, category, created_at";

impl Permission {
    /// Idempotent seeding of the built-in catalog.
    pub async fn ensure_defaults(pool: &SqlitePool) -> Result<(), sqlx::Error> {
        for (module, action, name, category) in DEFAULT_PERMISSIONS {
            sqlx::query(
                "INSERT INTO permissions (id, module, action, name, category)
                 VALUES ($1, $2, $3, $4, $5)
                 ON CONFLICT (module, action) DO NOTHING",
            )
            .bind(Uuid::new_v4())
            .bind(module)
            .bind(action)
            .bind(name)
            .bind(category)
            .execute(pool)
            .await?;
        }
        Ok(())
    }

    pub async fn find_all(pool: &SqlitePool) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Permission>(&format!(
            "SELECT {SELECT_COLS} FROM permissions ORDER BY category, module, action"
        ))
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Permission>(&format!(
            "SELECT {SELECT_COLS} FROM permissions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }
}

impl UserPermission {
    /// Ids of permissions currently granted to the user.
    pub async fn granted_ids(pool: &SqlitePool, user_id: Uuid) -> Result<Vec<Uuid>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT permission_id FROM user_permissions WHERE user_id = $1 AND granted = 1",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Replace the user's grant set wholesale inside one transaction.
    pub async fn replace_for_user(
        pool: &SqlitePool,
        user_id: Uuid,
        permission_ids: &[Uuid],
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;
        sqlx::query("DELETE FROM user_permissions WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        for permission_id in permission_ids {
            sqlx::query(
                "INSERT INTO user_permissions (id, user_id, permission_id, granted)
                 VALUES ($1, $2, $3, 1)",
            )
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(permission_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Whether the user holds `module.action` or the module-wide `full` grant.
    pub async fn is_granted(
        pool: &SqlitePool,
        user_id: Uuid,
        module: &str,
        action: &str,
    ) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*)
             FROM user_permissions up
             JOIN permissions p ON p.id = up.permission_id
             WHERE up.user_id = $1 AND up.granted = 1
               AND p.module = $2 AND p.action IN ($3, 'full')",
        )
        .bind(user_id)
        .bind(module)
        .bind(action)
        .fetch_one(pool)
        .await?;
        Ok(count > 0)
    }

    pub async fn delete_for_user(pool: &SqlitePool, user_id: Uuid) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM user_permissions WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
