use sqlx::SqliteExecutor;

use crate::api_service::models::BookmarkRecord;

const COLUMNS: &str = "vault_id, item_id, nonce_content, ciphertext_content, nonce_wrap, \
     dek_wrapped, etag, version, size, created_at, updated_at, deleted_at";

pub async fn insert(ex: impl SqliteExecutor<'_>, row: &BookmarkRecord) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO bookmarks (vault_id, item_id, nonce_content, ciphertext_content, \
         nonce_wrap, dek_wrapped, etag, version, size, created_at, updated_at, deleted_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&row.vault_id)
    .bind(&row.item_id)
    .bind(&row.nonce_content)
    .bind(&row.ciphertext_content)
    .bind(&row.nonce_wrap)
    .bind(&row.dek_wrapped)
    .bind(&row.etag)
    .bind(row.version)
    .bind(row.size)
    .bind(row.created_at)
    .bind(row.updated_at)
    .bind(row.deleted_at)
    .execute(ex)
    .await?;

    Ok(())
}

pub async fn find(
    ex: impl SqliteExecutor<'_>,
    vault_id: &str,
    item_id: &str,
) -> sqlx::Result<Option<BookmarkRecord>> {
    sqlx::query_as::<_, BookmarkRecord>(&format!(
        "SELECT {} FROM bookmarks WHERE vault_id = ? AND item_id = ?",
        COLUMNS
    ))
    .bind(vault_id)
    .bind(item_id)
    .fetch_optional(ex)
    .await
}

/// Replace the payload of a live row. The WHERE clause carries the expected
/// current version, so of two racing writers exactly one sees a row change.
/// Returns the number of rows updated (0 or 1).
pub async fn update_guarded(ex: impl SqliteExecutor<'_>, row: &BookmarkRecord) -> sqlx::Result<u64> {
    let result = sqlx::query(
        "UPDATE bookmarks SET nonce_content = ?, ciphertext_content = ?, nonce_wrap = ?, \
         dek_wrapped = ?, etag = ?, version = ?, size = ?, updated_at = ? \
         WHERE vault_id = ? AND item_id = ? AND version = ? AND deleted_at IS NULL",
    )
    .bind(&row.nonce_content)
    .bind(&row.ciphertext_content)
    .bind(&row.nonce_wrap)
    .bind(&row.dek_wrapped)
    .bind(&row.etag)
    .bind(row.version)
    .bind(row.size)
    .bind(row.updated_at)
    .bind(&row.vault_id)
    .bind(&row.item_id)
    .bind(row.version - 1)
    .execute(ex)
    .await?;

    Ok(result.rows_affected())
}

/// Tombstone a live row. The blobs stay in place; updated_at tracks
/// deleted_at. Same version guard as update_guarded.
pub async fn mark_deleted_guarded(
    ex: impl SqliteExecutor<'_>,
    vault_id: &str,
    item_id: &str,
    etag: &str,
    version: i64,
    deleted_at: i64,
) -> sqlx::Result<u64> {
    let result = sqlx::query(
        "UPDATE bookmarks SET etag = ?, version = ?, deleted_at = ?, updated_at = ? \
         WHERE vault_id = ? AND item_id = ? AND version = ? AND deleted_at IS NULL",
    )
    .bind(etag)
    .bind(version)
    .bind(deleted_at)
    .bind(deleted_at)
    .bind(vault_id)
    .bind(item_id)
    .bind(version - 1)
    .execute(ex)
    .await?;

    Ok(result.rows_affected())
}

/// Page scan in ascending item_id order. The caller passes `limit + 1` to
/// probe for a further page.
pub async fn list(
    ex: impl SqliteExecutor<'_>,
    vault_id: &str,
    after_id: Option<&str>,
    include_deleted: bool,
    updated_after: Option<i64>,
    limit: i64,
) -> sqlx::Result<Vec<BookmarkRecord>> {
    let mut sql = format!("SELECT {} FROM bookmarks WHERE vault_id = ?", COLUMNS);
    if after_id.is_some() {
        sql.push_str(" AND item_id > ?");
    }
    if !include_deleted {
        sql.push_str(" AND deleted_at IS NULL");
    }
    if updated_after.is_some() {
        sql.push_str(" AND updated_at > ?");
    }
    sql.push_str(" ORDER BY item_id ASC LIMIT ?");

    let mut query = sqlx::query_as::<_, BookmarkRecord>(&sql).bind(vault_id);
    if let Some(id) = after_id {
        query = query.bind(id);
    }
    if let Some(after) = updated_after {
        query = query.bind(after);
    }

    query.bind(limit).fetch_all(ex).await
}
