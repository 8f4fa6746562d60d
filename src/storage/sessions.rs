use sqlx::SqliteExecutor;

use crate::api_service::models::SessionRecord;

pub async fn insert(ex: impl SqliteExecutor<'_>, session: &SessionRecord) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO sessions (id, user_id, jwt_id, expires_at, revoked_at, created_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&session.id)
    .bind(&session.user_id)
    .bind(&session.jwt_id)
    .bind(session.expires_at)
    .bind(session.revoked_at)
    .bind(session.created_at)
    .execute(ex)
    .await?;

    Ok(())
}

pub async fn find_by_jwt_id(
    ex: impl SqliteExecutor<'_>,
    jwt_id: &str,
) -> sqlx::Result<Option<SessionRecord>> {
    sqlx::query_as::<_, SessionRecord>(
        "SELECT id, user_id, jwt_id, expires_at, revoked_at, created_at \
         FROM sessions WHERE jwt_id = ?",
    )
    .bind(jwt_id)
    .fetch_optional(ex)
    .await
}

/// Revoke a session. Idempotent: an already-revoked session keeps its
/// original revocation time.
pub async fn revoke_by_jwt_id(
    ex: impl SqliteExecutor<'_>,
    jwt_id: &str,
    revoked_at: i64,
) -> sqlx::Result<()> {
    sqlx::query("UPDATE sessions SET revoked_at = ? WHERE jwt_id = ? AND revoked_at IS NULL")
        .bind(revoked_at)
        .bind(jwt_id)
        .execute(ex)
        .await?;

    Ok(())
}

/// Extend the validity window; used by refresh.
pub async fn update_expiration(
    ex: impl SqliteExecutor<'_>,
    jwt_id: &str,
    expires_at: i64,
) -> sqlx::Result<()> {
    sqlx::query("UPDATE sessions SET expires_at = ? WHERE jwt_id = ?")
        .bind(expires_at)
        .bind(jwt_id)
        .execute(ex)
        .await?;

    Ok(())
}

/// Physically delete rows that expired before the given instant.
pub async fn delete_expired(ex: impl SqliteExecutor<'_>, before: i64) -> sqlx::Result<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
        .bind(before)
        .execute(ex)
        .await?;

    Ok(result.rows_affected())
}
