use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use ts_rs::TS;
use utils::response::Paginated;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
pub struct AuditLog {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub module: String,
    pub action: String,
    pub entity_id: Option<Uuid>,
    pub details: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct AuditLogFilter {
    pub user_id: Option<Uuid>,
    pub module: Option<String>,
    pub action: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

const SELECT_COLS: &str = "id, user_id, module, action, entity_id, details, created_at";

fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &AuditLogFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(user_id) = filter.user_id {
        qb.push(" AND user_id = ").push_bind(user_id);
    }
    if let Some(module) = filter.module.clone() {
        qb.push(" AND module = ").push_bind(module);
    }
    if let Some(action) = filter.action.clone() {
        qb.push(" AND action = ").push_bind(action);
    }
    if let Some(from) = filter.date_from {
        qb.push(" AND date(created_at) >= ")
            .push_bind(from.to_string());
    }
    if let Some(to) = filter.date_to {
        qb.push(" AND date(created_at) <= ").push_bind(to.to_string());
    }
}

impl AuditLog {
    pub async fn create(
        pool: &SqlitePool,
        user_id: Option<Uuid>,
        module: &str,
        action: &str,
        entity_id: Option<Uuid>,
        details: Option<&str>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, AuditLog>(&format!(
            "INSERT INTO audit_logs (id, user_id, module, action, entity_id, details)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {SELECT_COLS}"
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(module)
        .bind(action)
        .bind(entity_id)
        .bind(details)
        .fetch_one(pool)
        .await
    }

    pub async fn list(
        pool: &SqlitePool,
        filter: &AuditLogFilter,
        page: i64,
        per_page: i64,
    ) -> Result<Paginated<Self>, sqlx::Error> {
        let offset = (page - 1) * per_page;

        let mut count_qb = QueryBuilder::new("SELECT COUNT(*) FROM audit_logs");
        push_filter(&mut count_qb, filter);
        let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

        let mut qb = QueryBuilder::new(format!("SELECT {SELECT_COLS} FROM audit_logs"));
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(per_page)
            .push(" OFFSET ")
            .push_bind(offset);
        let items = qb.build_query_as::<AuditLog>().fetch_all(pool).await?;

        Ok(Paginated::new(items, page, per_page, total))
    }

    /// Distinct module names, for the log filter dropdown.
    pub async fn modules(pool: &SqlitePool) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT DISTINCT module FROM audit_logs ORDER BY module")
            .fetch_all(pool)
            .await
    }
}
