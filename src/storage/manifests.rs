use sqlx::{Row, SqliteExecutor};

use crate::api_service::models::ManifestRecord;

pub async fn find(
    ex: impl SqliteExecutor<'_>,
    vault_id: &str,
) -> sqlx::Result<Option<ManifestRecord>> {
    sqlx::query_as::<_, ManifestRecord>(
        "SELECT vault_id, version, etag, nonce, ciphertext, size, updated_at \
         FROM manifests WHERE vault_id = ?",
    )
    .bind(vault_id)
    .fetch_optional(ex)
    .await
}

/// Version and etag only, for HEAD polling; the blob never leaves the store.
pub async fn head(
    ex: impl SqliteExecutor<'_>,
    vault_id: &str,
) -> sqlx::Result<Option<(i64, String)>> {
    let row = sqlx::query("SELECT version, etag FROM manifests WHERE vault_id = ?")
        .bind(vault_id)
        .fetch_optional(ex)
        .await?;

    Ok(row.map(|r| (r.get("version"), r.get("etag"))))
}

/// Insert or replace the manifest in place; there is at most one per vault.
pub async fn upsert(ex: impl SqliteExecutor<'_>, manifest: &ManifestRecord) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO manifests (vault_id, version, etag, nonce, ciphertext, size, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT(vault_id) DO UPDATE SET \
         version = excluded.version, etag = excluded.etag, nonce = excluded.nonce, \
         ciphertext = excluded.ciphertext, size = excluded.size, updated_at = excluded.updated_at",
    )
    .bind(&manifest.vault_id)
    .bind(manifest.version)
    .bind(&manifest.etag)
    .bind(&manifest.nonce)
    .bind(&manifest.ciphertext)
    .bind(manifest.size)
    .bind(manifest.updated_at)
    .execute(ex)
    .await?;

    Ok(())
}
