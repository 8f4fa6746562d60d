use argon2::password_hash::{rand_core::OsRng as HashOsRng, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use once_cell::sync::Lazy;
use base64::{
    engine::general_purpose::{STANDARD as BASE64, URL_SAFE_NO_PAD as BASE64_URL},
    Engine as _,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::{rngs::OsRng, Rng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use super::security_error::{SecurityError, SecurityResult};

// Argon2id constants for server-side password verification
const ARGON_M_COST: u32 = 524288; // 512 MB
const ARGON_M_COST_FAST: u32 = 65536; // 64 MB, test profile
const ARGON_T_COST: u32 = 2; // 2 iterations
const ARGON_P_COST: u32 = 1; // 1 thread (parallelism)
const ARGON_OUTPUT_LEN: usize = 32;

// Client-side KDF parameters, committed to the user row at registration
const CLIENT_KDF_ALGORITHM: &str = "argon2id";
const CLIENT_KDF_M_COST: u32 = 65536; // 64 MB
const CLIENT_KDF_T_COST: u32 = 3;
const CLIENT_KDF_P_COST: u32 = 1;

pub const KDF_SALT_LENGTH: usize = 32; // Argon2 salt handed to the client
pub const HKDF_SALT_LENGTH: usize = 16;
pub const WMK_NONCE_LENGTH: usize = 24; // XChaCha-sized nonce on the wrapped master key

/// Argon2id cost profile used for server-side password verification.
///
/// The deployment profile is deliberately heavy; tests construct the fast
/// profile explicitly so the suite stays responsive. These costs are a local
/// implementation choice: verification reads its parameters back out of the
/// stored PHC string, never out of this struct.
#[derive(Debug, Clone, Copy)]
pub struct HashingParams {
    pub m_cost: u32,
    pub t_cost: u32,
    pub p_cost: u32,
}

impl Default for HashingParams {
    fn default() -> Self {
        Self {
            m_cost: ARGON_M_COST,
            t_cost: ARGON_T_COST,
            p_cost: ARGON_P_COST,
        }
    }
}

impl HashingParams {
    /// Reduced-memory profile for tests.
    pub fn fast() -> Self {
        Self {
            m_cost: ARGON_M_COST_FAST,
            t_cost: ARGON_T_COST,
            p_cost: ARGON_P_COST,
        }
    }
}

/// KDF parameters generated at registration and returned verbatim on every
/// login. The client's derived encryption key is a pure function of these, so
/// they are immutable once persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KdfParams {
    pub algorithm: String,
    pub salt: Vec<u8>,
    pub memory_cost: u32,
    pub time_cost: u32,
    pub parallelism: u32,
    pub hkdf_salt: Vec<u8>,
}

// ==================== PASSWORD HASHING ====================

/// Hash a password into a PHC-encoded Argon2id string.
pub fn hash_password(password: &str, params: &HashingParams) -> SecurityResult<String> {
    let params = Params::new(
        params.m_cost,
        params.t_cost,
        params.p_cost,
        Some(ARGON_OUTPUT_LEN),
    )
    .map_err(|e| SecurityError::HashingFailed(format!("Argon2 params error: {}", e)))?;

    let argon = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    let salt = SaltString::generate(&mut HashOsRng);

    let hash = argon
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| SecurityError::HashingFailed(format!("Hashing failed: {}", e)))?;

    Ok(hash.to_string())
}

/// Shared verification context; the cost parameters come out of each PHC
/// string, not out of this instance.
static VERIFIER: Lazy<Argon2<'static>> = Lazy::new(Argon2::default);

/// Verify a password against a PHC string. The parameters embedded in the
/// string drive verification, so old hashes keep working across cost bumps.
pub fn verify_password(password: &str, phc: &str) -> SecurityResult<bool> {
    let parsed = PasswordHash::new(phc).map_err(|_| SecurityError::MalformedHash)?;

    Ok(VERIFIER
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

// ==================== KDF PARAMETERS ====================

/// Generate fresh client-side KDF parameters for a new user.
pub fn generate_kdf_params() -> KdfParams {
    let mut salt = vec![0u8; KDF_SALT_LENGTH];
    OsRng.fill(&mut salt[..]);

    let mut hkdf_salt = vec![0u8; HKDF_SALT_LENGTH];
    OsRng.fill(&mut hkdf_salt[..]);

    KdfParams {
        algorithm: CLIENT_KDF_ALGORITHM.to_string(),
        salt,
        memory_cost: CLIENT_KDF_M_COST,
        time_cost: CLIENT_KDF_T_COST,
        parallelism: CLIENT_KDF_P_COST,
        hkdf_salt,
    }
}

// ==================== ETAG COMPUTATION ====================

/// Compute the ETag for a committed record: base64url (no padding) of
/// SHA-256 over `utf8(vault_id) || utf8(decimal(version)) || parts...`.
///
/// The tag is a pure function of committed state; any two servers given the
/// same inputs produce the same string, so clients compare ETags textually.
pub fn compute_etag(vault_id: &str, version: i64, parts: &[&[u8]]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(vault_id.as_bytes());
    hasher.update(version.to_string().as_bytes());
    for part in parts {
        hasher.update(part);
    }

    BASE64_URL.encode(hasher.finalize())
}

/// Constant-time ETag comparison for If-Match guards.
pub fn etags_match(provided: &str, current: &str) -> bool {
    provided.len() == current.len() && bool::from(provided.as_bytes().ct_eq(current.as_bytes()))
}

// ==================== BASE64 ====================

/// Decode canonical RFC 4648 base64. The decode must round-trip: re-encoding
/// the bytes has to reproduce the input exactly, which rejects permissive
/// variants (missing padding, non-zero trailing bits, url-safe alphabet).
pub fn decode_canonical(value: &str) -> SecurityResult<Vec<u8>> {
    let bytes = BASE64.decode(value)?;

    if BASE64.encode(&bytes) != value {
        return Err(SecurityError::NonCanonicalBase64);
    }

    Ok(bytes)
}

/// Encode raw bytes as canonical base64 for the wire.
pub fn encode_blob(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

// ==================== PAGINATION CURSORS ====================

/// Cursors are the base64url (no padding) encoding of the last returned id.
pub fn encode_cursor(id: &str) -> String {
    BASE64_URL.encode(id.as_bytes())
}

pub fn decode_cursor(cursor: &str) -> SecurityResult<String> {
    let bytes = BASE64_URL
        .decode(cursor)
        .map_err(|_| SecurityError::InvalidCursor)?;

    String::from_utf8(bytes).map_err(|_| SecurityError::InvalidCursor)
}

// ==================== BEARER TOKENS ====================

/// Claims carried by a signed bearer token. `jti` binds the token to its
/// server-side session row; `sub` is the user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

/// HMAC-SHA256 signing and verification keys derived from `JWT_SECRET`.
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Sign a token for the given user/session identity. Timestamps come in
    /// as engine-wide milliseconds and land in the token as whole seconds.
    pub fn sign(
        &self,
        user_id: &str,
        jwt_id: &str,
        issued_at_ms: i64,
        expires_at_ms: i64,
    ) -> SecurityResult<String> {
        let claims = Claims {
            sub: user_id.to_string(),
            jti: jwt_id.to_string(),
            iat: issued_at_ms / 1000,
            exp: expires_at_ms / 1000,
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| SecurityError::TokenSigning(e.to_string()))
    }

    /// Verify signature and expiry, returning the claims. Session liveness
    /// (revocation, server-side expiry) is checked separately against the
    /// session store.
    pub fn verify(&self, token: &str) -> SecurityResult<Claims> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())
            .map_err(|_| SecurityError::TokenRejected)?;

        Ok(data.claims)
    }
}

// ==================== IDENTIFIERS ====================

pub fn new_user_id() -> String {
    format!("u_{}", Uuid::new_v4().simple())
}

pub fn new_vault_id() -> String {
    format!("vlt_{}", Uuid::new_v4().simple())
}

pub fn new_session_id() -> String {
    format!("sess_{}", Uuid::new_v4().simple())
}

pub fn new_jwt_id() -> String {
    Uuid::new_v4().to_string()
}
