/**
 * Vault + Manifest Engine
 *
 * Lazily materializes the per-user vault and guards the manifest behind
 * version sequencing plus If-Match ETag checks. The manifest and vault
 * versions are the same integer; version 0 means "no manifest yet".
 */
use sqlx::SqlitePool;

use super::error::{ApiError, ApiResult};
use super::models::{ManifestCommit, ManifestRecord, ManifestUpload, VaultRecord, VaultSummary};
use super::now_ms;
use crate::api::security;
use crate::storage;

/// Maximum manifest ciphertext size in bytes.
pub const MANIFEST_MAX_BYTES: i64 = 5_000_000;

pub struct VaultService {
    pool: SqlitePool,
}

impl VaultService {
    pub fn new(pool: SqlitePool) -> Self {
        tracing::debug!("Initializing VaultService");
        Self { pool }
    }

    /// Fetch the caller's vault, creating it on first touch. One vault per
    /// user, enforced by the unique index on user_id.
    pub async fn get_or_create(&self, user_id: &str) -> ApiResult<VaultRecord> {
        if let Some(vault) = storage::vaults::find_by_user(&self.pool, user_id).await? {
            return Ok(vault);
        }

        let vault = VaultRecord {
            id: security::new_vault_id(),
            user_id: user_id.to_string(),
            version: 0,
            bytes_total: 0,
            updated_at: now_ms(),
        };

        match storage::vaults::insert(&self.pool, &vault).await {
            Ok(()) => {
                tracing::info!("Created vault {} for user {}", vault.id, user_id);
                Ok(vault)
            }
            // Two first touches can race; the loser reads the winner's row.
            Err(err) if storage::is_unique_violation(&err) => {
                storage::vaults::find_by_user(&self.pool, user_id)
                    .await?
                    .ok_or_else(|| ApiError::Internal {
                        message: "Vault vanished after insert conflict".to_string(),
                    })
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn summary(&self, user_id: &str) -> ApiResult<VaultSummary> {
        let vault = self.get_or_create(user_id).await?;
        let has_manifest = storage::manifests::head(&self.pool, &vault.id).await?.is_some();

        Ok(VaultSummary {
            vault_id: vault.id,
            version: vault.version,
            bytes_total: vault.bytes_total,
            has_manifest,
            updated_at: vault.updated_at,
        })
    }

    pub async fn manifest(&self, user_id: &str) -> ApiResult<ManifestRecord> {
        let vault = self.get_or_create(user_id).await?;

        storage::manifests::find(&self.pool, &vault.id)
            .await?
            .ok_or_else(|| ApiError::NotFound {
                resource: "manifest".to_string(),
            })
    }

    /// Version and etag without the blob, for cheap client polling.
    pub async fn manifest_head(&self, user_id: &str) -> ApiResult<(i64, String)> {
        let vault = self.get_or_create(user_id).await?;

        storage::manifests::head(&self.pool, &vault.id)
            .await?
            .ok_or_else(|| ApiError::NotFound {
                resource: "manifest".to_string(),
            })
    }

    /// Replace the manifest under optimistic concurrency control.
    ///
    /// Validation order: canonical base64, size cap, version sequencing,
    /// then the If-Match guard (required from the second write onward). The
    /// vault-version advance is the first write of the transaction and
    /// carries the expected current version in its WHERE clause, so a racing
    /// writer loses there and the whole transaction rolls back.
    pub async fn put_manifest(
        &self,
        user_id: &str,
        upload: ManifestUpload,
        if_match: Option<&str>,
    ) -> ApiResult<ManifestCommit> {
        let nonce = security::decode_canonical(&upload.nonce).map_err(|_| {
            ApiError::Validation {
                message: "Field 'nonce' is not canonical base64".to_string(),
            }
        })?;
        let ciphertext = security::decode_canonical(&upload.ciphertext).map_err(|_| {
            ApiError::Validation {
                message: "Field 'ciphertext' is not canonical base64".to_string(),
            }
        })?;

        let size = ciphertext.len() as i64;
        if size > MANIFEST_MAX_BYTES {
            return Err(ApiError::PayloadTooLarge {
                message: format!("Manifest is {} bytes, max {}", size, MANIFEST_MAX_BYTES),
            });
        }
        if let Some(declared) = upload.size {
            if declared != size {
                tracing::warn!(
                    "Manifest size mismatch: client declared {}, recomputed {}",
                    declared,
                    size
                );
            }
        }
        if upload.version < 1 {
            return Err(ApiError::Validation {
                message: "Manifest version must be a positive integer".to_string(),
            });
        }

        let vault = self.get_or_create(user_id).await?;
        let now = now_ms();

        let mut tx = self.pool.begin().await?;

        let advanced = storage::vaults::advance_version_guarded(
            &mut *tx,
            &vault.id,
            upload.version,
            size,
            now,
        )
        .await?;
        if advanced == 0 {
            drop(tx);
            let current = storage::vaults::find_by_user(&self.pool, user_id)
                .await?
                .map(|v| v.version)
                .unwrap_or(0);
            return Err(ApiError::Conflict {
                message: format!(
                    "Version {} is not current + 1 for the manifest (current {})",
                    upload.version, current
                ),
            });
        }

        // From the second write onward the caller must prove it saw the
        // current manifest; the first write has nothing to match against.
        if upload.version > 1 {
            let current = storage::manifests::find(&mut *tx, &vault.id)
                .await?
                .ok_or_else(|| ApiError::Internal {
                    message: "Vault version and manifest are out of lockstep".to_string(),
                })?;

            match if_match {
                None => {
                    return Err(ApiError::Conflict {
                        message: "If-Match header is required to replace the manifest"
                            .to_string(),
                    });
                }
                Some(provided) if !security::etags_match(provided, &current.etag) => {
                    return Err(ApiError::Conflict {
                        message: "If-Match does not match the current manifest ETag".to_string(),
                    });
                }
                Some(_) => {}
            }
        }

        let etag = security::compute_etag(&vault.id, upload.version, &[&nonce, &ciphertext]);

        let manifest = ManifestRecord {
            vault_id: vault.id.clone(),
            version: upload.version,
            etag: etag.clone(),
            nonce,
            ciphertext,
            size,
            updated_at: now,
        };
        storage::manifests::upsert(&mut *tx, &manifest).await?;

        tx.commit().await?;

        tracing::info!(
            "Manifest for vault {} advanced to version {}",
            vault.id,
            upload.version
        );

        Ok(ManifestCommit {
            vault_id: vault.id,
            version: upload.version,
            etag,
            updated_at: now,
            created: upload.version == 1,
        })
    }
}
