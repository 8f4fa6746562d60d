/**
 * Item Write Guards
 *
 * Validation and concurrency checks shared by the bookmark and tag engines:
 * blob decoding, size accounting, version/If-Match guards, and cursor
 * pagination plumbing.
 */
use sqlx::SqlitePool;

use super::error::{ApiError, ApiResult};
use super::models::{Page, VaultRecord};
use crate::api::security;
use crate::storage;

/// Maximum persisted size of a single item (sum of its decoded blobs).
pub const ITEM_MAX_BYTES: i64 = 65_536;

/// Decode a required base64 blob, naming the offending field on failure.
pub fn decode_blob_field(field: &str, value: &str) -> ApiResult<Vec<u8>> {
    security::decode_canonical(value).map_err(|_| ApiError::Validation {
        message: format!("Field '{}' is not canonical base64", field),
    })
}

/// Enforce the item size cap on the recomputed size; a client-declared size
/// that disagrees is logged and ignored, never fatal.
pub fn check_item_size(kind: &str, id: &str, declared: i64, actual: i64) -> ApiResult<()> {
    if actual > ITEM_MAX_BYTES {
        return Err(ApiError::PayloadTooLarge {
            message: format!("{} '{}' is {} bytes, max {}", kind, id, actual, ITEM_MAX_BYTES),
        });
    }

    if declared != actual {
        tracing::warn!(
            "Size mismatch on {} '{}': client declared {}, recomputed {}",
            kind,
            id,
            declared,
            actual
        );
    }

    Ok(())
}

/// Version and If-Match guard for updates and soft deletes. Version is
/// checked first, then the header; both failures are conflicts.
pub fn check_write_guard(
    resource: &str,
    if_match: Option<&str>,
    current_etag: &str,
    input_version: i64,
    current_version: i64,
) -> ApiResult<()> {
    if input_version != current_version + 1 {
        return Err(ApiError::Conflict {
            message: format!(
                "Version {} is not current + 1 for {} (current {})",
                input_version, resource, current_version
            ),
        });
    }

    match if_match {
        None => Err(ApiError::Conflict {
            message: format!("If-Match header is required to modify {}", resource),
        }),
        Some(provided) if !security::etags_match(provided, current_etag) => {
            Err(ApiError::Conflict {
                message: format!("If-Match does not match the current ETag of {}", resource),
            })
        }
        Some(_) => Ok(()),
    }
}

/// Resolve the caller's vault for a write; items cannot be created into a
/// vault that was never materialized.
pub async fn require_vault(pool: &SqlitePool, user_id: &str) -> ApiResult<VaultRecord> {
    storage::vaults::find_by_user(pool, user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound {
            resource: "vault (initialize the vault first)".to_string(),
        })
}

/// Clamp a requested page size into [1, max], falling back to the default.
pub fn clamp_limit(requested: Option<i64>, default: i64, max: i64) -> ApiResult<i64> {
    match requested {
        None => Ok(default),
        Some(limit) if limit < 1 => Err(ApiError::Validation {
            message: "limit must be a positive integer".to_string(),
        }),
        Some(limit) => Ok(limit.min(max)),
    }
}

/// Decode an optional opaque cursor into the id it bounds.
pub fn decode_cursor_opt(cursor: Option<&str>) -> ApiResult<Option<String>> {
    match cursor {
        None => Ok(None),
        Some(raw) => Ok(Some(security::decode_cursor(raw)?)),
    }
}

/// Shape `limit + 1` probe rows into a page: the extra row only signals that
/// another page exists, and the cursor points at the last row kept.
pub fn build_page<T>(mut rows: Vec<T>, limit: i64, id_of: impl Fn(&T) -> &str) -> Page<T> {
    let has_more = rows.len() as i64 > limit;
    if has_more {
        rows.truncate(limit as usize);
    }

    let next_cursor = if has_more {
        rows.last().map(|row| security::encode_cursor(id_of(row)))
    } else {
        None
    };

    Page {
        items: rows,
        next_cursor,
    }
}
