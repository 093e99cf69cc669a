use serde_json::Value;
use uuid::Uuid;

use crate::db::DbPool;

/// Append to `audit_logs`. The trail is best effort: a failed insert is
/// logged and never fails the action being audited.
pub async fn record(pool: &DbPool, user_id: Uuid, action: &str, resource: &str, metadata: Value) {
    let result = sqlx::query(
        r#"
        INSERT INTO audit_logs (id, user_id, action, resource, metadata)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(action)
    .bind(resource)
    .bind(metadata)
    .execute(pool)
    .await;

    match result {
        Ok(_) => tracing::debug!(%user_id, action, resource, "audit entry written"),
        Err(err) => tracing::warn!(error = %err, %user_id, action, "audit log failed"),
    }
}
