//! Shared fixtures for the integration suites: a fresh engine over a
//! temp-file SQLite database with the fast hashing profile.

use markvault::api::security::{self, HashingParams};
use markvault::api_service::models::{AuthUser, NewBookmark, NewTag};
use markvault::api_service::Api;
use markvault::storage;
use tempfile::TempDir;

pub const TEST_SECRET: &str = "integration-test-secret-0123456789abcdef";
pub const TOKEN_TTL_SECS: i64 = 3600;

pub struct TestEngine {
    pub api: Api,
    // Held so the database file outlives the test
    _dir: TempDir,
}

pub async fn engine() -> TestEngine {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let url = format!("sqlite://{}", dir.path().join("engine.db").display());
    let pool = storage::connect(&url).await.expect("Failed to connect");

    let api = Api::new(pool, TEST_SECRET, TOKEN_TTL_SECS, HashingParams::fast())
        .expect("Failed to build Api");

    TestEngine { api, _dir: dir }
}

pub fn b64(bytes: &[u8]) -> String {
    security::encode_blob(bytes)
}

/// Register a user, log in, and resolve the token into an identity.
pub async fn signed_up(api: &Api, login: &str) -> (String, AuthUser) {
    api.auth
        .register(login, "correct horse battery staple")
        .await
        .expect("Failed to register");

    let outcome = api
        .auth
        .login(login, "correct horse battery staple")
        .await
        .expect("Failed to login");

    let auth = api
        .auth
        .authenticate(&outcome.token)
        .await
        .expect("Failed to authenticate");

    (outcome.user_id, auth)
}

/// Register, log in, and materialize the user's vault.
pub async fn signed_up_with_vault(api: &Api, login: &str) -> (String, AuthUser) {
    let (user_id, auth) = signed_up(api, login).await;
    api.vault
        .get_or_create(&user_id)
        .await
        .expect("Failed to create vault");
    (user_id, auth)
}

pub fn new_bookmark(item_id: &str) -> NewBookmark {
    let nonce = vec![0u8; 24];
    let body = b"opaque bookmark ciphertext";
    let wrap_nonce = vec![1u8; 24];
    let dek = vec![2u8; 48];
    let size = (nonce.len() + body.len() + wrap_nonce.len() + dek.len()) as i64;

    NewBookmark {
        item_id: item_id.to_string(),
        nonce_content: b64(&nonce),
        ciphertext_content: b64(body),
        nonce_wrap: b64(&wrap_nonce),
        dek_wrapped: b64(&dek),
        size,
        created_at: 1,
        updated_at: 1,
    }
}

pub fn new_tag(tag_id: &str, token: Option<&str>) -> NewTag {
    let nonce = vec![3u8; 24];
    let body = b"opaque tag ciphertext";
    let size = (nonce.len() + body.len()) as i64;

    NewTag {
        tag_id: tag_id.to_string(),
        nonce_content: b64(&nonce),
        ciphertext_content: b64(body),
        tag_token: token.map(str::to_string),
        size,
        created_at: 1,
        updated_at: 1,
    }
}
