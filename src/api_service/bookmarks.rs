/**
 * Bookmark Engine
 *
 * Per-item CRUD over opaque encrypted bookmark records: create at version 1,
 * guarded update, soft delete, and cursor-paginated listing. The engine
 * never interprets the blobs it stores.
 */
use sqlx::SqlitePool;

use super::error::{ApiError, ApiResult};
use super::items;
use super::models::{BookmarkRecord, BookmarkUpdate, ItemDelete, ListOptions, NewBookmark, Page};
use crate::api::security;
use crate::storage;

pub const LIST_DEFAULT_LIMIT: i64 = 50;
pub const LIST_MAX_LIMIT: i64 = 200;

pub struct BookmarkService {
    pool: SqlitePool,
}

impl BookmarkService {
    pub fn new(pool: SqlitePool) -> Self {
        tracing::debug!("Initializing BookmarkService");
        Self { pool }
    }

    pub async fn create(&self, user_id: &str, input: NewBookmark) -> ApiResult<BookmarkRecord> {
        let vault = items::require_vault(&self.pool, user_id).await?;

        let nonce_content = items::decode_blob_field("nonce_content", &input.nonce_content)?;
        let ciphertext_content =
            items::decode_blob_field("ciphertext_content", &input.ciphertext_content)?;
        let nonce_wrap = items::decode_blob_field("nonce_wrap", &input.nonce_wrap)?;
        let dek_wrapped = items::decode_blob_field("dek_wrapped", &input.dek_wrapped)?;

        let size = (nonce_content.len()
            + ciphertext_content.len()
            + nonce_wrap.len()
            + dek_wrapped.len()) as i64;
        items::check_item_size("bookmark", &input.item_id, input.size, size)?;

        let etag = security::compute_etag(
            &vault.id,
            1,
            &[&nonce_content, &ciphertext_content, &nonce_wrap, &dek_wrapped],
        );

        let row = BookmarkRecord {
            vault_id: vault.id,
            item_id: input.item_id,
            nonce_content,
            ciphertext_content,
            nonce_wrap,
            dek_wrapped,
            etag,
            version: 1,
            size,
            created_at: input.created_at,
            updated_at: input.updated_at,
            deleted_at: None,
        };

        if let Err(err) = storage::bookmarks::insert(&self.pool, &row).await {
            if storage::is_unique_violation(&err) {
                return Err(ApiError::Conflict {
                    message: format!("Bookmark '{}' already exists", row.item_id),
                });
            }
            return Err(err.into());
        }

        tracing::info!("Created bookmark {} in vault {}", row.item_id, row.vault_id);
        Ok(row)
    }

    /// Full record including the tombstone marker, if any.
    pub async fn get(&self, user_id: &str, item_id: &str) -> ApiResult<BookmarkRecord> {
        let vault = items::require_vault(&self.pool, user_id).await?;

        storage::bookmarks::find(&self.pool, &vault.id, item_id)
            .await?
            .ok_or_else(|| not_found(item_id))
    }

    pub async fn update(
        &self,
        user_id: &str,
        item_id: &str,
        input: BookmarkUpdate,
        if_match: Option<&str>,
    ) -> ApiResult<BookmarkRecord> {
        let vault = items::require_vault(&self.pool, user_id).await?;

        let current = storage::bookmarks::find(&self.pool, &vault.id, item_id)
            .await?
            .ok_or_else(|| not_found(item_id))?;
        if !current.is_live() {
            // Tombstones are terminal for writes
            return Err(not_found(item_id));
        }

        items::check_write_guard(
            &format!("bookmark '{}'", item_id),
            if_match,
            &current.etag,
            input.version,
            current.version,
        )?;

        let nonce_content = items::decode_blob_field("nonce_content", &input.nonce_content)?;
        let ciphertext_content =
            items::decode_blob_field("ciphertext_content", &input.ciphertext_content)?;
        let nonce_wrap = items::decode_blob_field("nonce_wrap", &input.nonce_wrap)?;
        let dek_wrapped = items::decode_blob_field("dek_wrapped", &input.dek_wrapped)?;

        let size = (nonce_content.len()
            + ciphertext_content.len()
            + nonce_wrap.len()
            + dek_wrapped.len()) as i64;
        items::check_item_size("bookmark", item_id, input.size, size)?;

        let etag = security::compute_etag(
            &vault.id,
            input.version,
            &[&nonce_content, &ciphertext_content, &nonce_wrap, &dek_wrapped],
        );

        let row = BookmarkRecord {
            vault_id: vault.id,
            item_id: item_id.to_string(),
            nonce_content,
            ciphertext_content,
            nonce_wrap,
            dek_wrapped,
            etag,
            version: input.version,
            size,
            created_at: current.created_at,
            updated_at: input.updated_at,
            deleted_at: None,
        };

        // The statement re-checks version and liveness; a concurrent writer
        // that committed after our read loses here.
        let updated = storage::bookmarks::update_guarded(&self.pool, &row).await?;
        if updated == 0 {
            return Err(concurrent_conflict(item_id));
        }

        Ok(row)
    }

    /// Tombstone a live bookmark. The new ETag covers the unchanged blobs at
    /// the new version, so it differs from the pre-delete tag.
    pub async fn soft_delete(
        &self,
        user_id: &str,
        item_id: &str,
        input: ItemDelete,
        if_match: Option<&str>,
    ) -> ApiResult<BookmarkRecord> {
        let vault = items::require_vault(&self.pool, user_id).await?;

        let current = storage::bookmarks::find(&self.pool, &vault.id, item_id)
            .await?
            .ok_or_else(|| not_found(item_id))?;
        if !current.is_live() {
            // A second delete is not idempotent success
            return Err(not_found(item_id));
        }

        items::check_write_guard(
            &format!("bookmark '{}'", item_id),
            if_match,
            &current.etag,
            input.version,
            current.version,
        )?;

        let etag = security::compute_etag(
            &vault.id,
            input.version,
            &[
                &current.nonce_content,
                &current.ciphertext_content,
                &current.nonce_wrap,
                &current.dek_wrapped,
            ],
        );

        let updated = storage::bookmarks::mark_deleted_guarded(
            &self.pool,
            &vault.id,
            item_id,
            &etag,
            input.version,
            input.deleted_at,
        )
        .await?;
        if updated == 0 {
            return Err(concurrent_conflict(item_id));
        }

        tracing::info!("Tombstoned bookmark {} in vault {}", item_id, vault.id);

        Ok(BookmarkRecord {
            etag,
            version: input.version,
            updated_at: input.deleted_at,
            deleted_at: Some(input.deleted_at),
            ..current
        })
    }

    /// Cursor-paginated listing in ascending item-id order.
    pub async fn list(
        &self,
        user_id: &str,
        options: ListOptions,
    ) -> ApiResult<Page<BookmarkRecord>> {
        let limit = items::clamp_limit(options.limit, LIST_DEFAULT_LIMIT, LIST_MAX_LIMIT)?;
        let after_id = items::decode_cursor_opt(options.cursor.as_deref())?;

        // Reading before the vault was ever touched is an empty sync, not
        // an error.
        let vault = match storage::vaults::find_by_user(&self.pool, user_id).await? {
            Some(vault) => vault,
            None => {
                return Ok(Page {
                    items: vec![],
                    next_cursor: None,
                })
            }
        };

        let rows = storage::bookmarks::list(
            &self.pool,
            &vault.id,
            after_id.as_deref(),
            options.include_deleted,
            options.updated_after,
            limit + 1,
        )
        .await?;

        Ok(items::build_page(rows, limit, |row| row.item_id.as_str()))
    }
}

fn not_found(item_id: &str) -> ApiError {
    ApiError::NotFound {
        resource: format!("bookmark '{}'", item_id),
    }
}

fn concurrent_conflict(item_id: &str) -> ApiError {
    ApiError::Conflict {
        message: format!("Bookmark '{}' was modified concurrently", item_id),
    }
}
