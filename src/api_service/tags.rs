/**
 * Tag Engine
 *
 * Same state machine as bookmarks over a two-blob payload plus an optional
 * blind-index token: the client supplies a deterministic derivative of the
 * plaintext label, the server can answer equality lookups without ever
 * learning the label itself.
 */
use sqlx::SqlitePool;

use super::error::{ApiError, ApiResult};
use super::items;
use super::models::{ItemDelete, NewTag, Page, TagListOptions, TagRecord, TagUpdate};
use crate::api::security;
use crate::storage::{self, tags::TokenFilter};

pub const LIST_DEFAULT_LIMIT: i64 = 100;
pub const LIST_MAX_LIMIT: i64 = 500;

pub struct TagService {
    pool: SqlitePool,
}

impl TagService {
    pub fn new(pool: SqlitePool) -> Self {
        tracing::debug!("Initializing TagService");
        Self { pool }
    }

    pub async fn create(&self, user_id: &str, input: NewTag) -> ApiResult<TagRecord> {
        let vault = items::require_vault(&self.pool, user_id).await?;

        let nonce_content = items::decode_blob_field("nonce_content", &input.nonce_content)?;
        let ciphertext_content =
            items::decode_blob_field("ciphertext_content", &input.ciphertext_content)?;

        let size = (nonce_content.len() + ciphertext_content.len()) as i64;
        items::check_item_size("tag", &input.tag_id, input.size, size)?;

        // The tag ETag covers the two content blobs only; there are no wrap
        // fields to account for.
        let etag =
            security::compute_etag(&vault.id, 1, &[&nonce_content, &ciphertext_content]);

        let row = TagRecord {
            vault_id: vault.id,
            tag_id: input.tag_id,
            nonce_content,
            ciphertext_content,
            tag_token: input.tag_token,
            etag,
            version: 1,
            size,
            created_at: input.created_at,
            updated_at: input.updated_at,
            deleted_at: None,
        };

        if let Err(err) = storage::tags::insert(&self.pool, &row).await {
            if storage::is_unique_violation(&err) {
                return Err(ApiError::Conflict {
                    message: format!("Tag '{}' already exists", row.tag_id),
                });
            }
            return Err(err.into());
        }

        tracing::info!("Created tag {} in vault {}", row.tag_id, row.vault_id);
        Ok(row)
    }

    pub async fn get(&self, user_id: &str, tag_id: &str) -> ApiResult<TagRecord> {
        let vault = items::require_vault(&self.pool, user_id).await?;

        storage::tags::find(&self.pool, &vault.id, tag_id)
            .await?
            .ok_or_else(|| not_found(tag_id))
    }

    pub async fn update(
        &self,
        user_id: &str,
        tag_id: &str,
        input: TagUpdate,
        if_match: Option<&str>,
    ) -> ApiResult<TagRecord> {
        let vault = items::require_vault(&self.pool, user_id).await?;

        let current = storage::tags::find(&self.pool, &vault.id, tag_id)
            .await?
            .ok_or_else(|| not_found(tag_id))?;
        if !current.is_live() {
            return Err(not_found(tag_id));
        }

        items::check_write_guard(
            &format!("tag '{}'", tag_id),
            if_match,
            &current.etag,
            input.version,
            current.version,
        )?;

        let nonce_content = items::decode_blob_field("nonce_content", &input.nonce_content)?;
        let ciphertext_content =
            items::decode_blob_field("ciphertext_content", &input.ciphertext_content)?;

        let size = (nonce_content.len() + ciphertext_content.len()) as i64;
        items::check_item_size("tag", tag_id, input.size, size)?;

        let etag = security::compute_etag(
            &vault.id,
            input.version,
            &[&nonce_content, &ciphertext_content],
        );

        let row = TagRecord {
            vault_id: vault.id,
            tag_id: tag_id.to_string(),
            nonce_content,
            ciphertext_content,
            tag_token: input.tag_token,
            etag,
            version: input.version,
            size,
            created_at: current.created_at,
            updated_at: input.updated_at,
            deleted_at: None,
        };

        let updated = storage::tags::update_guarded(&self.pool, &row).await?;
        if updated == 0 {
            return Err(concurrent_conflict(tag_id));
        }

        Ok(row)
    }

    pub async fn soft_delete(
        &self,
        user_id: &str,
        tag_id: &str,
        input: ItemDelete,
        if_match: Option<&str>,
    ) -> ApiResult<TagRecord> {
        let vault = items::require_vault(&self.pool, user_id).await?;

        let current = storage::tags::find(&self.pool, &vault.id, tag_id)
            .await?
            .ok_or_else(|| not_found(tag_id))?;
        if !current.is_live() {
            return Err(not_found(tag_id));
        }

        items::check_write_guard(
            &format!("tag '{}'", tag_id),
            if_match,
            &current.etag,
            input.version,
            current.version,
        )?;

        let etag = security::compute_etag(
            &vault.id,
            input.version,
            &[&current.nonce_content, &current.ciphertext_content],
        );

        let updated = storage::tags::mark_deleted_guarded(
            &self.pool,
            &vault.id,
            tag_id,
            &etag,
            input.version,
            input.deleted_at,
        )
        .await?;
        if updated == 0 {
            return Err(concurrent_conflict(tag_id));
        }

        tracing::info!("Tombstoned tag {} in vault {}", tag_id, vault.id);

        Ok(TagRecord {
            etag,
            version: input.version,
            updated_at: input.deleted_at,
            deleted_at: Some(input.deleted_at),
            ..current
        })
    }

    /// Cursor-paginated listing in ascending tag-id order. `by_token` is the
    /// blind-index lookup: an empty string explicitly selects rows without a
    /// token, any other value selects equality on the stored token.
    pub async fn list(&self, user_id: &str, options: TagListOptions) -> ApiResult<Page<TagRecord>> {
        let limit =
            items::clamp_limit(options.base.limit, LIST_DEFAULT_LIMIT, LIST_MAX_LIMIT)?;
        let after_id = items::decode_cursor_opt(options.base.cursor.as_deref())?;

        let token_filter = options.by_token.map(|token| {
            if token.is_empty() {
                TokenFilter::Null
            } else {
                TokenFilter::Equals(token)
            }
        });

        let vault = match storage::vaults::find_by_user(&self.pool, user_id).await? {
            Some(vault) => vault,
            None => {
                return Ok(Page {
                    items: vec![],
                    next_cursor: None,
                })
            }
        };

        let rows = storage::tags::list(
            &self.pool,
            &vault.id,
            after_id.as_deref(),
            options.base.include_deleted,
            options.base.updated_after,
            token_filter.as_ref(),
            limit + 1,
        )
        .await?;

        Ok(items::build_page(rows, limit, |row| row.tag_id.as_str()))
    }
}

fn not_found(tag_id: &str) -> ApiError {
    ApiError::NotFound {
        resource: format!("tag '{}'", tag_id),
    }
}

fn concurrent_conflict(tag_id: &str) -> ApiError {
    ApiError::Conflict {
        message: format!("Tag '{}' was modified concurrently", tag_id),
    }
}
