/**
 * Vault + Manifest Handlers
 */
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::{Extension, Json};
use std::sync::Arc;

use super::{if_match, ETAG_HEADER};
use crate::api_server::models::*;
use crate::api_server::state::AppState;
use crate::api_service::models::{AuthUser, ManifestUpload};
use crate::api_service::ApiError;

pub const VAULT_VERSION_HEADER: &str = "x-vault-version";

#[utoipa::path(
    get,
    path = "/vault",
    responses(
        (status = 200, description = "Vault summary, created on first touch", body = VaultResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
    ),
    tag = "vault"
)]
pub async fn get_vault(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = state.api.vault.summary(&auth.user_id).await?;
    Ok(Json(VaultResponse::from(summary)))
}

pub async fn get_manifest(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let manifest = state.api.vault.manifest(&auth.user_id).await?;

    Ok((
        [
            (ETAG_HEADER, manifest.etag.clone()),
            (VAULT_VERSION_HEADER, manifest.version.to_string()),
        ],
        Json(ManifestResponse::from(manifest)),
    ))
}

/// Headers-only variant for cheap polling; the blob never leaves the store.
pub async fn head_manifest(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<impl IntoResponse, ApiError> {
    let (version, etag) = state.api.vault.manifest_head(&auth.user_id).await?;

    Ok((
        StatusCode::OK,
        [
            (ETAG_HEADER, etag),
            (VAULT_VERSION_HEADER, version.to_string()),
        ],
    ))
}

#[utoipa::path(
    put,
    path = "/vault/manifest",
    responses(
        (status = 201, description = "First manifest committed", body = ManifestPutResponse),
        (status = 200, description = "Manifest replaced", body = ManifestPutResponse),
        (status = 400, description = "Invalid payload", body = ErrorResponse),
        (status = 409, description = "Version or If-Match conflict", body = ErrorResponse),
        (status = 413, description = "Manifest too large", body = ErrorResponse),
    ),
    tag = "vault"
)]
pub async fn put_manifest(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
    headers: HeaderMap,
    Json(req): Json<ManifestUpload>,
) -> Result<impl IntoResponse, ApiError> {
    let guard = if_match(&headers);
    let commit = state
        .api
        .vault
        .put_manifest(&auth.user_id, req, guard.as_deref())
        .await?;

    let status = if commit.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };

    Ok((
        status,
        [
            (ETAG_HEADER, commit.etag.clone()),
            (VAULT_VERSION_HEADER, commit.version.to_string()),
        ],
        Json(ManifestPutResponse::from(&commit)),
    ))
}
