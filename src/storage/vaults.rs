use sqlx::SqliteExecutor;

use crate::api_service::models::VaultRecord;

pub async fn insert(ex: impl SqliteExecutor<'_>, vault: &VaultRecord) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO vaults (id, user_id, version, bytes_total, updated_at) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&vault.id)
    .bind(&vault.user_id)
    .bind(vault.version)
    .bind(vault.bytes_total)
    .bind(vault.updated_at)
    .execute(ex)
    .await?;

    Ok(())
}

pub async fn find_by_user(
    ex: impl SqliteExecutor<'_>,
    user_id: &str,
) -> sqlx::Result<Option<VaultRecord>> {
    sqlx::query_as::<_, VaultRecord>(
        "SELECT id, user_id, version, bytes_total, updated_at FROM vaults WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(ex)
    .await
}

/// Advance the vault head after a manifest commit; version and manifest
/// version move in lockstep. The WHERE clause carries the expected current
/// version, so of two racing writers exactly one sees a row change and the
/// other reports a conflict. Returns the number of rows updated (0 or 1).
pub async fn advance_version_guarded(
    ex: impl SqliteExecutor<'_>,
    vault_id: &str,
    new_version: i64,
    bytes_total: i64,
    updated_at: i64,
) -> sqlx::Result<u64> {
    let result = sqlx::query(
        "UPDATE vaults SET version = ?, bytes_total = ?, updated_at = ? \
         WHERE id = ? AND version = ?",
    )
    .bind(new_version)
    .bind(bytes_total)
    .bind(updated_at)
    .bind(vault_id)
    .bind(new_version - 1)
    .execute(ex)
    .await?;

    Ok(result.rows_affected())
}
