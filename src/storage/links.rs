use sqlx::{Row, SqliteExecutor};

/// Idempotent link insert; returns true when a row was actually created.
pub async fn insert_ignore(
    ex: impl SqliteExecutor<'_>,
    vault_id: &str,
    item_id: &str,
    tag_id: &str,
    created_at: i64,
) -> sqlx::Result<bool> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO bookmark_tags (vault_id, item_id, tag_id, created_at) \
         VALUES (?, ?, ?, ?)",
    )
    .bind(vault_id)
    .bind(item_id)
    .bind(tag_id)
    .bind(created_at)
    .execute(ex)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Returns true when a row was actually removed.
pub async fn delete(
    ex: impl SqliteExecutor<'_>,
    vault_id: &str,
    item_id: &str,
    tag_id: &str,
) -> sqlx::Result<bool> {
    let result =
        sqlx::query("DELETE FROM bookmark_tags WHERE vault_id = ? AND item_id = ? AND tag_id = ?")
            .bind(vault_id)
            .bind(item_id)
            .bind(tag_id)
            .execute(ex)
            .await?;

    Ok(result.rows_affected() > 0)
}

/// Tag ids linked to a bookmark, skipping links whose tag is tombstoned.
pub async fn tag_ids_for_bookmark(
    ex: impl SqliteExecutor<'_>,
    vault_id: &str,
    item_id: &str,
) -> sqlx::Result<Vec<String>> {
    let rows = sqlx::query(
        "SELECT bt.tag_id FROM bookmark_tags bt \
         JOIN tags t ON t.vault_id = bt.vault_id AND t.tag_id = bt.tag_id \
         WHERE bt.vault_id = ? AND bt.item_id = ? AND t.deleted_at IS NULL \
         ORDER BY bt.tag_id ASC",
    )
    .bind(vault_id)
    .bind(item_id)
    .fetch_all(ex)
    .await?;

    Ok(rows.into_iter().map(|r| r.get("tag_id")).collect())
}
