/**
 * Auth Service
 *
 * Registration, login, session lifecycle, and wrapped-master-key custody on
 * top of the crypto primitives and the session store.
 */
use sqlx::SqlitePool;
use zeroize::Zeroizing;

use super::error::{ApiError, ApiResult};
use super::models::{
    AuthUser, LoginOutcome, RefreshOutcome, RegisterOutcome, SessionInfo, SessionRecord,
    UserRecord, WmkUpload,
};
use super::now_ms;
use crate::api::security::{self, HashingParams, TokenKeys, WMK_NONCE_LENGTH};
use crate::storage;

const LOGIN_MIN_CHARS: usize = 3;
const LOGIN_MAX_CHARS: usize = 255;
const PASSWORD_MIN_CHARS: usize = 8;
const PASSWORD_MAX_CHARS: usize = 128;

/// The password hashed once at startup so login can verify against
/// something even when the user row is absent.
const BENCHMARK_PASSWORD: &str = "benchmark-password-for-absent-users";

pub struct AuthService {
    pool: SqlitePool,
    keys: TokenKeys,
    hashing: HashingParams,
    token_ttl_ms: i64,
    benchmark_hash: String,
}

impl AuthService {
    pub fn new(
        pool: SqlitePool,
        jwt_secret: &str,
        token_ttl_secs: i64,
        hashing: HashingParams,
    ) -> ApiResult<Self> {
        tracing::debug!("Initializing AuthService");

        // Computed once; login verifies absent users against this hash so
        // "no such login" and "wrong password" cost the same.
        let benchmark_hash = security::hash_password(BENCHMARK_PASSWORD, &hashing)
            .map_err(ApiError::from)?;

        Ok(Self {
            pool,
            keys: TokenKeys::new(jwt_secret),
            hashing,
            token_ttl_ms: token_ttl_secs * 1000,
            benchmark_hash,
        })
    }

    // ==================== REGISTRATION ====================

    pub async fn register(&self, login: &str, password: &str) -> ApiResult<RegisterOutcome> {
        validate_login(login)?;
        validate_password(password)?;

        if storage::users::find_by_login(&self.pool, login).await?.is_some() {
            return Err(ApiError::Conflict {
                message: "Login is already taken".to_string(),
            });
        }

        let password_hash = self.hash_password_blocking(password).await?;
        let kdf = security::generate_kdf_params();
        let now = now_ms();

        let user = UserRecord {
            id: security::new_user_id(),
            login: login.to_string(),
            password_hash,
            kdf_algorithm: kdf.algorithm.clone(),
            kdf_salt: kdf.salt.clone(),
            kdf_memory_cost: kdf.memory_cost as i64,
            kdf_time_cost: kdf.time_cost as i64,
            kdf_parallelism: kdf.parallelism as i64,
            kdf_hkdf_salt: kdf.hkdf_salt.clone(),
            wmk_nonce: None,
            wmk_ciphertext: None,
            created_at: now,
            updated_at: now,
        };

        if let Err(err) = storage::users::insert(&self.pool, &user).await {
            // A concurrent register can slip between the lookup and the
            // insert; the unique index is the arbiter.
            if storage::is_unique_violation(&err) {
                return Err(ApiError::Conflict {
                    message: "Login is already taken".to_string(),
                });
            }
            return Err(err.into());
        }

        tracing::info!("Registered user {}", user.id);

        Ok(RegisterOutcome {
            user_id: user.id,
            kdf,
        })
    }

    // ==================== LOGIN ====================

    pub async fn login(&self, login: &str, password: &str) -> ApiResult<LoginOutcome> {
        let now = now_ms();

        // Opportunistic garbage collection of long-expired sessions
        let swept = storage::sessions::delete_expired(&self.pool, now).await?;
        if swept > 0 {
            tracing::debug!("Swept {} expired sessions", swept);
        }

        let user = storage::users::find_by_login(&self.pool, login).await?;

        let verified = match &user {
            Some(user) => {
                self.verify_password_blocking(password, &user.password_hash)
                    .await?
            }
            None => {
                // Burn a verification against the benchmark hash so an
                // absent login is indistinguishable from a wrong password.
                self.verify_password_blocking(password, &self.benchmark_hash)
                    .await?;
                false
            }
        };

        let user = match (user, verified) {
            (Some(user), true) => user,
            _ => return Err(ApiError::Unauthorized),
        };

        let jwt_id = security::new_jwt_id();
        let expires_at = now + self.token_ttl_ms;
        let token = self.keys.sign(&user.id, &jwt_id, now, expires_at)?;

        let session = SessionRecord {
            id: security::new_session_id(),
            user_id: user.id.clone(),
            jwt_id,
            expires_at,
            revoked_at: None,
            created_at: now,
        };
        storage::sessions::insert(&self.pool, &session).await?;

        tracing::info!("User {} logged in, session {}", user.id, session.id);

        Ok(LoginOutcome {
            user_id: user.id.clone(),
            token,
            expires_at,
            kdf: user.kdf_params(),
            wrapped_mk: user.wrapped_key(),
        })
    }

    // ==================== TOKEN VERIFICATION ====================

    /// Resolve a bearer token into an authenticated identity. The token
    /// signature, the session row, its revocation, and its expiry are all
    /// evaluated against one row read.
    pub async fn authenticate(&self, token: &str) -> ApiResult<AuthUser> {
        let claims = self.keys.verify(token)?;

        let session = storage::sessions::find_by_jwt_id(&self.pool, &claims.jti)
            .await?
            .ok_or(ApiError::Unauthorized)?;

        if !session.is_active(now_ms()) || session.user_id != claims.sub {
            return Err(ApiError::Unauthorized);
        }

        Ok(AuthUser {
            user_id: session.user_id,
            jwt_id: session.jwt_id,
        })
    }

    // ==================== SESSION LIFECYCLE ====================

    /// Revoke the caller's session. Idempotent.
    pub async fn logout(&self, auth: &AuthUser) -> ApiResult<()> {
        let now = now_ms();
        storage::sessions::revoke_by_jwt_id(&self.pool, &auth.jwt_id, now).await?;
        storage::sessions::delete_expired(&self.pool, now).await?;

        tracing::info!("User {} logged out", auth.user_id);
        Ok(())
    }

    pub async fn introspect(&self, auth: &AuthUser) -> ApiResult<SessionInfo> {
        let session = storage::sessions::find_by_jwt_id(&self.pool, &auth.jwt_id)
            .await?
            .ok_or(ApiError::Unauthorized)?;

        Ok(SessionInfo {
            user_id: session.user_id,
            expires_at: session.expires_at,
        })
    }

    /// Mint a new token for the same session identity. Reusing the jwt id
    /// keeps one session one identity across its refresh chain, so a single
    /// revocation kills the whole chain.
    pub async fn refresh(&self, auth: &AuthUser) -> ApiResult<RefreshOutcome> {
        let now = now_ms();
        let expires_at = now + self.token_ttl_ms;

        let token = self
            .keys
            .sign(&auth.user_id, &auth.jwt_id, now, expires_at)?;
        storage::sessions::update_expiration(&self.pool, &auth.jwt_id, expires_at).await?;

        Ok(RefreshOutcome { token, expires_at })
    }

    // ==================== WRAPPED MASTER KEY ====================

    /// Store the client's wrapped master key. The KDF parameters on the user
    /// row are never touched; the client's derived key is committed to them.
    pub async fn upload_wrapped_key(&self, auth: &AuthUser, upload: WmkUpload) -> ApiResult<()> {
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

        if nonce.len() != WMK_NONCE_LENGTH {
            return Err(ApiError::Validation {
                message: format!("Wrapped-key nonce must be {} bytes", WMK_NONCE_LENGTH),
            });
        }
        if ciphertext.is_empty() {
            return Err(ApiError::Validation {
                message: "Wrapped-key ciphertext must not be empty".to_string(),
            });
        }

        let updated = storage::users::set_wrapped_key(
            &self.pool,
            &auth.user_id,
            &nonce,
            &ciphertext,
            now_ms(),
        )
        .await?;

        if updated == 0 {
            return Err(ApiError::NotFound {
                resource: format!("user '{}'", auth.user_id),
            });
        }

        tracing::info!("Stored wrapped master key for user {}", auth.user_id);
        Ok(())
    }

    // ==================== BLOCKING HELPERS ====================

    // Argon2id is deliberately slow; both paths hop to the blocking pool so
    // the request executor keeps breathing.

    async fn hash_password_blocking(&self, password: &str) -> ApiResult<String> {
        let password = Zeroizing::new(password.to_string());
        let params = self.hashing;

        tokio::task::spawn_blocking(move || security::hash_password(&password, &params))
            .await
            .map_err(|e| ApiError::Internal {
                message: format!("Hashing task failed: {}", e),
            })?
            .map_err(ApiError::from)
    }

    async fn verify_password_blocking(&self, password: &str, phc: &str) -> ApiResult<bool> {
        let password = Zeroizing::new(password.to_string());
        let phc = phc.to_string();

        tokio::task::spawn_blocking(move || security::verify_password(&password, &phc))
            .await
            .map_err(|e| ApiError::Internal {
                message: format!("Verification task failed: {}", e),
            })?
            .map_err(ApiError::from)
    }
}

fn validate_login(login: &str) -> ApiResult<()> {
    let chars = login.chars().count();
    if chars < LOGIN_MIN_CHARS || chars > LOGIN_MAX_CHARS {
        return Err(ApiError::Validation {
            message: format!(
                "Login must be between {} and {} characters",
                LOGIN_MIN_CHARS, LOGIN_MAX_CHARS
            ),
        });
    }
    Ok(())
}

fn validate_password(password: &str) -> ApiResult<()> {
    let chars = password.chars().count();
    if chars < PASSWORD_MIN_CHARS || chars > PASSWORD_MAX_CHARS {
        return Err(ApiError::Validation {
            message: format!(
                "Password must be between {} and {} characters",
                PASSWORD_MIN_CHARS, PASSWORD_MAX_CHARS
            ),
        });
    }
    Ok(())
}
