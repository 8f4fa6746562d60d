/**
 * Link Engine
 *
 * Many-to-many bookmark-tag association under vault-scoped referential
 * integrity. Link and unlink are idempotent; both endpoints must exist and
 * be live in the caller's vault.
 */
use sqlx::SqlitePool;

use super::error::{ApiError, ApiResult};
use super::items;
use super::models::LinkOutcome;
use super::now_ms;
use crate::storage;

pub struct LinkService {
    pool: SqlitePool,
}

impl LinkService {
    pub fn new(pool: SqlitePool) -> Self {
        tracing::debug!("Initializing LinkService");
        Self { pool }
    }

    /// Associate a bookmark with a tag. Repeating the call is success
    /// without a duplicate row.
    pub async fn link(
        &self,
        user_id: &str,
        item_id: &str,
        tag_id: &str,
        created_at: Option<i64>,
    ) -> ApiResult<LinkOutcome> {
        let vault = items::require_vault(&self.pool, user_id).await?;
        self.require_live_endpoints(&vault.id, item_id, tag_id).await?;

        let created_at = created_at.unwrap_or_else(now_ms);
        let inserted =
            storage::links::insert_ignore(&self.pool, &vault.id, item_id, tag_id, created_at)
                .await?;

        if inserted {
            tracing::info!(
                "Linked bookmark {} to tag {} in vault {}",
                item_id,
                tag_id,
                vault.id
            );
        }

        Ok(LinkOutcome {
            linked: true,
            newly_created: inserted,
        })
    }

    /// Remove an association. Absent rows are success, not an error.
    pub async fn unlink(
        &self,
        user_id: &str,
        item_id: &str,
        tag_id: &str,
    ) -> ApiResult<LinkOutcome> {
        let vault = items::require_vault(&self.pool, user_id).await?;
        // Symmetric with link: unlinking against a tombstoned endpoint is
        // not found, not a silent success.
        self.require_live_endpoints(&vault.id, item_id, tag_id).await?;

        let removed = storage::links::delete(&self.pool, &vault.id, item_id, tag_id).await?;
        if removed {
            tracing::info!(
                "Unlinked bookmark {} from tag {} in vault {}",
                item_id,
                tag_id,
                vault.id
            );
        }

        Ok(LinkOutcome {
            linked: false,
            newly_created: false,
        })
    }

    /// Tag ids currently linked to a live bookmark, excluding tombstoned
    /// tags.
    pub async fn tags_of(&self, user_id: &str, item_id: &str) -> ApiResult<Vec<String>> {
        let vault = items::require_vault(&self.pool, user_id).await?;

        let bookmark = storage::bookmarks::find(&self.pool, &vault.id, item_id)
            .await?
            .filter(|row| row.is_live())
            .ok_or_else(|| ApiError::NotFound {
                resource: format!("bookmark '{}'", item_id),
            })?;

        Ok(storage::links::tag_ids_for_bookmark(&self.pool, &vault.id, &bookmark.item_id).await?)
    }

    async fn require_live_endpoints(
        &self,
        vault_id: &str,
        item_id: &str,
        tag_id: &str,
    ) -> ApiResult<()> {
        let bookmark = storage::bookmarks::find(&self.pool, vault_id, item_id).await?;
        if !bookmark.map(|row| row.is_live()).unwrap_or(false) {
            return Err(ApiError::NotFound {
                resource: format!("bookmark '{}'", item_id),
            });
        }

        let tag = storage::tags::find(&self.pool, vault_id, tag_id).await?;
        if !tag.map(|row| row.is_live()).unwrap_or(false) {
            return Err(ApiError::NotFound {
                resource: format!("tag '{}'", tag_id),
            });
        }

        Ok(())
    }
}
