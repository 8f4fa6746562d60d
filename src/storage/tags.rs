use sqlx::SqliteExecutor;

use crate::api_service::models::TagRecord;

const COLUMNS: &str = "vault_id, tag_id, nonce_content, ciphertext_content, tag_token, \
     etag, version, size, created_at, updated_at, deleted_at";

/// Blind-index filter for listings. `Null` matches rows without a token;
/// `Equals` matches on the stored token column.
#[derive(Debug, Clone)]
pub enum TokenFilter {
    Null,
    Equals(String),
}

pub async fn insert(ex: impl SqliteExecutor<'_>, row: &TagRecord) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO tags (vault_id, tag_id, nonce_content, ciphertext_content, tag_token, \
         etag, version, size, created_at, updated_at, deleted_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&row.vault_id)
    .bind(&row.tag_id)
    .bind(&row.nonce_content)
    .bind(&row.ciphertext_content)
    .bind(&row.tag_token)
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
    tag_id: &str,
) -> sqlx::Result<Option<TagRecord>> {
    sqlx::query_as::<_, TagRecord>(&format!(
        "SELECT {} FROM tags WHERE vault_id = ? AND tag_id = ?",
        COLUMNS
    ))
    .bind(vault_id)
    .bind(tag_id)
    .fetch_optional(ex)
    .await
}

/// Replace the payload of a live row; the WHERE clause carries the expected
/// current version. Returns the number of rows updated (0 or 1).
pub async fn update_guarded(ex: impl SqliteExecutor<'_>, row: &TagRecord) -> sqlx::Result<u64> {
    let result = sqlx::query(
        "UPDATE tags SET nonce_content = ?, ciphertext_content = ?, tag_token = ?, \
         etag = ?, version = ?, size = ?, updated_at = ? \
         WHERE vault_id = ? AND tag_id = ? AND version = ? AND deleted_at IS NULL",
    )
    .bind(&row.nonce_content)
    .bind(&row.ciphertext_content)
    .bind(&row.tag_token)
    .bind(&row.etag)
    .bind(row.version)
    .bind(row.size)
    .bind(row.updated_at)
    .bind(&row.vault_id)
    .bind(&row.tag_id)
    .bind(row.version - 1)
    .execute(ex)
    .await?;

    Ok(result.rows_affected())
}

pub async fn mark_deleted_guarded(
    ex: impl SqliteExecutor<'_>,
    vault_id: &str,
    tag_id: &str,
    etag: &str,
    version: i64,
    deleted_at: i64,
) -> sqlx::Result<u64> {
    let result = sqlx::query(
        "UPDATE tags SET etag = ?, version = ?, deleted_at = ?, updated_at = ? \
         WHERE vault_id = ? AND tag_id = ? AND version = ? AND deleted_at IS NULL",
    )
    .bind(etag)
    .bind(version)
    .bind(deleted_at)
    .bind(deleted_at)
    .bind(vault_id)
    .bind(tag_id)
    .bind(version - 1)
    .execute(ex)
    .await?;

    Ok(result.rows_affected())
}

/// Page scan in ascending tag_id order; `limit` includes the probe row.
pub async fn list(
    ex: impl SqliteExecutor<'_>,
    vault_id: &str,
    after_id: Option<&str>,
    include_deleted: bool,
    updated_after: Option<i64>,
    token_filter: Option<&TokenFilter>,
    limit: i64,
) -> sqlx::Result<Vec<TagRecord>> {
    let mut sql = format!("SELECT {} FROM tags WHERE vault_id = ?", COLUMNS);
    if after_id.is_some() {
        sql.push_str(" AND tag_id > ?");
    }
    if !include_deleted {
        sql.push_str(" AND deleted_at IS NULL");
    }
    if updated_after.is_some() {
        sql.push_str(" AND updated_at > ?");
    }
    match token_filter {
        Some(TokenFilter::Null) => sql.push_str(" AND tag_token IS NULL"),
        Some(TokenFilter::Equals(_)) => sql.push_str(" AND tag_token = ?"),
        None => {}
    }
    sql.push_str(" ORDER BY tag_id ASC LIMIT ?");

    let mut query = sqlx::query_as::<_, TagRecord>(&sql).bind(vault_id);
    if let Some(id) = after_id {
        query = query.bind(id);
    }
    if let Some(after) = updated_after {
        query = query.bind(after);
    }
    if let Some(TokenFilter::Equals(token)) = token_filter {
        query = query.bind(token);
    }

    query.bind(limit).fetch_all(ex).await
}
