/**
 * API Models
 *
 * Request and response models for the REST API. Opaque bytes cross the wire
 * as canonical base64; ETags and cursors as base64url without padding.
 */
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::security::{self, KdfParams};
use crate::api_service::models::{
    BookmarkRecord, LoginOutcome, ManifestCommit, ManifestRecord, Page, RegisterOutcome,
    SessionInfo, TagRecord, VaultSummary, WrappedKey,
};
use crate::api_service::ApiError;

// ===== Error Responses =====

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
            },
        }
    }
}

/// Exhaustive mapping from service error tags to HTTP statuses.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        // Internal details go to the log, never to the caller
        let message = match &self {
            ApiError::Internal { message } => {
                tracing::error!("Internal error surfaced to transport: {}", message);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(ErrorResponse::new(self.code(), message));

        match self {
            ApiError::RateLimited { retry_after_secs } => (
                status,
                [(header::RETRY_AFTER, retry_after_secs.to_string())],
                body,
            )
                .into_response(),
            _ => (status, body).into_response(),
        }
    }
}

// ===== Auth =====

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct KdfResponse {
    pub algorithm: String,
    pub salt: String,
    pub memory_cost: u32,
    pub time_cost: u32,
    pub parallelism: u32,
    pub hkdf_salt: String,
}

impl From<KdfParams> for KdfResponse {
    fn from(kdf: KdfParams) -> Self {
        Self {
            algorithm: kdf.algorithm,
            salt: security::encode_blob(&kdf.salt),
            memory_cost: kdf.memory_cost,
            time_cost: kdf.time_cost,
            parallelism: kdf.parallelism,
            hkdf_salt: security::encode_blob(&kdf.hkdf_salt),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WrappedKeyResponse {
    pub nonce: String,
    pub ciphertext: String,
}

impl From<WrappedKey> for WrappedKeyResponse {
    fn from(wmk: WrappedKey) -> Self {
        Self {
            nonce: security::encode_blob(&wmk.nonce),
            ciphertext: security::encode_blob(&wmk.ciphertext),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterResponse {
    pub user_id: String,
    pub kdf: KdfResponse,
}

impl From<RegisterOutcome> for RegisterResponse {
    fn from(outcome: RegisterOutcome) -> Self {
        Self {
            user_id: outcome.user_id,
            kdf: outcome.kdf.into(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub user_id: String,
    pub token: String,
    pub expires_at: i64,
    pub kdf: KdfResponse,
    pub wrapped_mk: Option<WrappedKeyResponse>,
}

impl From<LoginOutcome> for LoginResponse {
    fn from(outcome: LoginOutcome) -> Self {
        Self {
            user_id: outcome.user_id,
            token: outcome.token,
            expires_at: outcome.expires_at,
            kdf: outcome.kdf.into(),
            wrapped_mk: outcome.wrapped_mk.map(Into::into),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OkResponse {
    pub ok: bool,
}

impl OkResponse {
    pub fn new() -> Self {
        Self { ok: true }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub user_id: String,
    pub valid: bool,
    pub expires_at: i64,
}

impl From<SessionInfo> for SessionResponse {
    fn from(info: SessionInfo) -> Self {
        Self {
            user_id: info.user_id,
            valid: true,
            expires_at: info.expires_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RefreshResponse {
    pub token: String,
    pub expires_at: i64,
}

// ===== Vault + Manifest =====

#[derive(Debug, Serialize, ToSchema)]
pub struct VaultResponse {
    pub vault_id: String,
    pub version: i64,
    pub bytes_total: i64,
    pub has_manifest: bool,
    pub updated_at: i64,
}

impl From<VaultSummary> for VaultResponse {
    fn from(summary: VaultSummary) -> Self {
        Self {
            vault_id: summary.vault_id,
            version: summary.version,
            bytes_total: summary.bytes_total,
            has_manifest: summary.has_manifest,
            updated_at: summary.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ManifestResponse {
    pub vault_id: String,
    pub version: i64,
    pub etag: String,
    pub nonce: String,
    pub ciphertext: String,
    pub size: i64,
    pub updated_at: i64,
}

impl From<ManifestRecord> for ManifestResponse {
    fn from(record: ManifestRecord) -> Self {
        Self {
            vault_id: record.vault_id,
            version: record.version,
            etag: record.etag,
            nonce: security::encode_blob(&record.nonce),
            ciphertext: security::encode_blob(&record.ciphertext),
            size: record.size,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ManifestPutResponse {
    pub vault_id: String,
    pub version: i64,
    pub etag: String,
    pub updated_at: i64,
}

impl From<&ManifestCommit> for ManifestPutResponse {
    fn from(commit: &ManifestCommit) -> Self {
        Self {
            vault_id: commit.vault_id.clone(),
            version: commit.version,
            etag: commit.etag.clone(),
            updated_at: commit.updated_at,
        }
    }
}

// ===== Bookmarks =====

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct BookmarkListQuery {
    pub limit: Option<i64>,
    pub cursor: Option<String>,
    pub include_deleted: Option<bool>,
    pub updated_after: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BookmarkResponse {
    pub item_id: String,
    pub nonce_content: String,
    pub ciphertext_content: String,
    pub nonce_wrap: String,
    pub dek_wrapped: String,
    pub etag: String,
    pub version: i64,
    pub size: i64,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

impl From<BookmarkRecord> for BookmarkResponse {
    fn from(record: BookmarkRecord) -> Self {
        Self {
            item_id: record.item_id,
            nonce_content: security::encode_blob(&record.nonce_content),
            ciphertext_content: security::encode_blob(&record.ciphertext_content),
            nonce_wrap: security::encode_blob(&record.nonce_wrap),
            dek_wrapped: security::encode_blob(&record.dek_wrapped),
            etag: record.etag,
            version: record.version,
            size: record.size,
            created_at: record.created_at,
            updated_at: record.updated_at,
            deleted_at: record.deleted_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BookmarksListResponse {
    pub items: Vec<BookmarkResponse>,
    pub next_cursor: Option<String>,
}

impl From<Page<BookmarkRecord>> for BookmarksListResponse {
    fn from(page: Page<BookmarkRecord>) -> Self {
        Self {
            items: page.items.into_iter().map(Into::into).collect(),
            next_cursor: page.next_cursor,
        }
    }
}

// ===== Tags =====

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct TagListQuery {
    pub limit: Option<i64>,
    pub cursor: Option<String>,
    pub include_deleted: Option<bool>,
    pub updated_after: Option<i64>,
    pub by_token: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TagResponse {
    pub tag_id: String,
    pub nonce_content: String,
    pub ciphertext_content: String,
    pub tag_token: Option<String>,
    pub etag: String,
    pub version: i64,
    pub size: i64,
    pub created_at: i64,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

impl From<TagRecord> for TagResponse {
    fn from(record: TagRecord) -> Self {
        Self {
            tag_id: record.tag_id,
            nonce_content: security::encode_blob(&record.nonce_content),
            ciphertext_content: security::encode_blob(&record.ciphertext_content),
            tag_token: record.tag_token,
            etag: record.etag,
            version: record.version,
            size: record.size,
            created_at: record.created_at,
            updated_at: record.updated_at,
            deleted_at: record.deleted_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TagsListResponse {
    pub items: Vec<TagResponse>,
    pub next_cursor: Option<String>,
}

impl From<Page<TagRecord>> for TagsListResponse {
    fn from(page: Page<TagRecord>) -> Self {
        Self {
            items: page.items.into_iter().map(Into::into).collect(),
            next_cursor: page.next_cursor,
        }
    }
}

// ===== Links =====

#[derive(Debug, Deserialize, ToSchema)]
pub struct LinkRequest {
    pub item_id: String,
    pub tag_id: String,
    pub created_at: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UnlinkRequest {
    pub item_id: String,
    pub tag_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LinkResponse {
    pub linked: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TagIdsResponse {
    pub tag_ids: Vec<String>,
}
