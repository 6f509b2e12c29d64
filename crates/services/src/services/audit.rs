//! Activity trail writer. Logging must never take a business operation down
//! with it, so failures are traced and swallowed.

use db::models::audit_log::{AuditLog, AuditLogFilter};
use sqlx::SqlitePool;
use tracing::error;
use utils::response::Paginated;
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct AuditService;

impl AuditService {
    pub fn new() -> Self {
        Self
    }

    pub async fn record(
        &self,
        pool: &SqlitePool,
        actor_id: Option<Uuid>,
        module: &str,
        action: &str,
        entity_id: Option<Uuid>,
        details: Option<&str>,
    ) {
        if let Err(e) = AuditLog::create(pool, actor_id, module, action, entity_id, details).await {
            error!("failed to write audit log for {module}.{action}: {e}");
        }
    }

    pub async fn list(
        &self,
        pool: &SqlitePool,
        filter: &AuditLogFilter,
        page: i64,
        per_page: i64,
    ) -> Result<Paginated<AuditLog>, sqlx::Error> {
        AuditLog::list(pool, filter, page, per_page).await
    }

    pub async fn modules(&self, pool: &SqlitePool) -> Result<Vec<String>, sqlx::Error> {
        AuditLog::modules(pool).await
    }
}

#[cfg(test)]
mod tests {
    use db::DBService;

    use super::*;

    #[tokio::test]
    async fn test_record_and_list() {
        let db = DBService::new_in_memory().await.unwrap();
        let audit = AuditService::new();

        let entity = Uuid::new_v4();
        audit
            .record(
                &db.pool,
                None,
                "assets",
                "create",
                Some(entity),
                Some("Máy in HP"),
            )
            .await;
        audit
            .record(&db.pool, None, "users", "delete", None, None)
            .await;

        let page = audit
            .list(&db.pool, &AuditLogFilter::default(), 1, 10)
            .await
            .unwrap();
        assert_eq!(page.total_items, 2);

        let filtered = audit
            .list(
                &db.pool,
                &AuditLogFilter {
                    module: Some("assets".into()),
                    ..Default::default()
                },
                1,
                10,
            )
            .await
            .unwrap();
        assert_eq!(filtered.total_items, 1);
        assert_eq!(filtered.items[0].action, "create");
        assert_eq!(filtered.items[0].entity_id, Some(entity));
        assert_eq!(filtered.items[0].details.as_deref(), Some("Máy in HP"));

        let modules = audit.modules(&db.pool).await.unwrap();
        assert_eq!(modules, vec!["assets".to_string(), "users".to_string()]);
    }
}
