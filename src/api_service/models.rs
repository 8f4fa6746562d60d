/**
 * API Service Models
 *
 * Domain records and service inputs/outputs for the vault engine.
 * These are framework-agnostic and can be serialized for any transport.
 */
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub use super::error::{ApiError, ApiResult};
pub use crate::api::security::{KdfParams, WMK_NONCE_LENGTH};

// ===== Identity =====

/// Request-scoped authenticated identity, attached by the transport layer
/// after token verification and carried explicitly into service calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: String,
    pub jwt_id: String,
}

/// Encrypted master-key material stored on behalf of the client. The server
/// persists it opaquely; only the client can decrypt it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WrappedKey {
    pub nonce: Vec<u8>,
    pub ciphertext: Vec<u8>,
}

// ===== Persistent records =====

#[derive(Debug, Clone, FromRow)]
pub struct UserRecord {
    pub id: String,
    pub login: String,
    pub password_hash: String,
    pub kdf_algorithm: String,
    pub kdf_salt: Vec<u8>,
    pub kdf_memory_cost: i64,
    pub kdf_time_cost: i64,
    pub kdf_parallelism: i64,
    pub kdf_hkdf_salt: Vec<u8>,
    pub wmk_nonce: Option<Vec<u8>>,
    pub wmk_ciphertext: Option<Vec<u8>>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl UserRecord {
    /// The KDF parameters committed at registration, returned verbatim on
    /// every login.
    pub fn kdf_params(&self) -> KdfParams {
        KdfParams {
            algorithm: self.kdf_algorithm.clone(),
            salt: self.kdf_salt.clone(),
            memory_cost: self.kdf_memory_cost as u32,
            time_cost: self.kdf_time_cost as u32,
            parallelism: self.kdf_parallelism as u32,
            hkdf_salt: self.kdf_hkdf_salt.clone(),
        }
    }

    pub fn wrapped_key(&self) -> Option<WrappedKey> {
        match (&self.wmk_nonce, &self.wmk_ciphertext) {
            (Some(nonce), Some(ciphertext)) => Some(WrappedKey {
                nonce: nonce.clone(),
                ciphertext: ciphertext.clone(),
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct SessionRecord {
    pub id: String,
    pub user_id: String,
    pub jwt_id: String,
    pub expires_at: i64,
    pub revoked_at: Option<i64>,
    pub created_at: i64,
}

impl SessionRecord {
    /// A session is active iff it exists, is not revoked, and has not
    /// expired. All three predicates are evaluated against one row read.
    pub fn is_active(&self, now_ms: i64) -> bool {
        self.revoked_at.is_none() && self.expires_at > now_ms
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct VaultRecord {
    pub id: String,
    pub user_id: String,
    pub version: i64,
    pub bytes_total: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct ManifestRecord {
    pub vault_id: String,
    pub version: i64,
    pub etag: String,
    pub nonce: Vec<u8>,
    pub ciphertext: Vec<u8>,
    pub size: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct BookmarkRecord {
    pub vault_id: String,
    pub item_id: String,
    pub nonce_content: Vec<u8>,
    pub ciphertext_content: Vec<u8>,
    pub nonce_wrap: Vec<u8>,
    pub dek_wrapped: Vec<u8>,
    pub etag: String,
    pub version: i64,
    pub size: i64,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

impl BookmarkRecord {
    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct TagRecord {
    pub vault_id: String,
    pub tag_id: String,
    pub nonce_content: Vec<u8>,
    pub ciphertext_content: Vec<u8>,
    pub tag_token: Option<String>,
    pub etag: String,
    pub version: i64,
    pub size: i64,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

impl TagRecord {
    pub fn is_live(&self) -> bool {
        self.deleted_at.is_none()
    }
}

// ===== Service inputs =====

#[derive(Debug, Clone, Deserialize)]
pub struct ManifestUpload {
    pub version: i64,
    pub nonce: String,
    pub ciphertext: String,
    pub size: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewBookmark {
    pub item_id: String,
    pub nonce_content: String,
    pub ciphertext_content: String,
    pub nonce_wrap: String,
    pub dek_wrapped: String,
    pub size: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookmarkUpdate {
    pub version: i64,
    pub nonce_content: String,
    pub ciphertext_content: String,
    pub nonce_wrap: String,
    pub dek_wrapped: String,
    pub size: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTag {
    pub tag_id: String,
    pub nonce_content: String,
    pub ciphertext_content: String,
    pub tag_token: Option<String>,
    pub size: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TagUpdate {
    pub version: i64,
    pub nonce_content: String,
    pub ciphertext_content: String,
    pub tag_token: Option<String>,
    pub size: i64,
    pub updated_at: i64,
}

/// Soft-delete input shared by bookmarks and tags.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemDelete {
    pub version: i64,
    pub deleted_at: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WmkUpload {
    pub nonce: String,
    pub ciphertext: String,
}

/// Common listing options; ids are the sole sort key, ascending.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub limit: Option<i64>,
    pub cursor: Option<String>,
    pub include_deleted: bool,
    pub updated_after: Option<i64>,
}

/// Tag listing adds the blind-index filter: an empty `by_token` string
/// explicitly matches rows whose tag_token is null.
#[derive(Debug, Clone, Default)]
pub struct TagListOptions {
    pub base: ListOptions,
    pub by_token: Option<String>,
}

// ===== Service outputs =====

#[derive(Debug, Clone)]
pub struct RegisterOutcome {
    pub user_id: String,
    pub kdf: KdfParams,
}

#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub user_id: String,
    pub token: String,
    pub expires_at: i64,
    pub kdf: KdfParams,
    pub wrapped_mk: Option<WrappedKey>,
}

#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub token: String,
    pub expires_at: i64,
}

#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub user_id: String,
    pub expires_at: i64,
}

#[derive(Debug, Clone)]
pub struct VaultSummary {
    pub vault_id: String,
    pub version: i64,
    pub bytes_total: i64,
    pub has_manifest: bool,
    pub updated_at: i64,
}

#[derive(Debug, Clone)]
pub struct ManifestCommit {
    pub vault_id: String,
    pub version: i64,
    pub etag: String,
    pub updated_at: i64,
    /// True on the 0 -> 1 transition; the endpoint answers 201 instead of 200.
    pub created: bool,
}

#[derive(Debug, Clone)]
pub struct LinkOutcome {
    pub linked: bool,
    /// True when the call inserted the row (as opposed to an idempotent hit).
    pub newly_created: bool,
}

/// One page of a cursor-paginated listing.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}
