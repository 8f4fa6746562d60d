//! End-to-end scenarios exercised through the real router with oneshot
//! requests: status codes, concurrency headers, and rate-limit behavior.

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, IF_MATCH};
use axum::http::{HeaderMap, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use markvault::api::security::HashingParams;
use markvault::api_server::{create_router, AppState};
use markvault::api_service::Api;
use markvault::storage;

const TEST_SECRET: &str = "integration-test-secret-0123456789abcdef";

struct TestServer {
    app: Router,
    state: Arc<AppState>,
    _dir: TempDir,
}

async fn server() -> TestServer {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let url = format!("sqlite://{}", dir.path().join("engine.db").display());
    let pool = storage::connect(&url).await.expect("Failed to connect");

    let api =
        Api::new(pool, TEST_SECRET, 3600, HashingParams::fast()).expect("Failed to build Api");
    let state = Arc::new(AppState::new(api));
    let app = create_router(state.clone());

    TestServer {
        app,
        state,
        _dir: dir,
    }
}

fn request(method: Method, uri: &str) -> axum::http::request::Builder {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value, HeaderMap) {
    let response = app.clone().oneshot(req).await.expect("request failed");
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body collect failed")
        .to_bytes();

    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, body, headers)
}

async fn send_json(app: &Router, method: Method, uri: &str, body: Value) -> (StatusCode, Value, HeaderMap) {
    let req = request(method, uri)
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, req).await
}

async fn register_and_login(server: &TestServer, login: &str) -> String {
    let (status, _, _) = send_json(
        &server.app,
        Method::POST,
        "/auth/register",
        json!({"login": login, "password": "correct horse battery staple"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body, _) = send_json(
        &server.app,
        Method::POST,
        "/auth/login",
        json!({"login": login, "password": "correct horse battery staple"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Registration and login attempts share windows with the rest of the
    // test; start each scenario from a clean slate.
    server.state.api.rate.clear();

    body["token"].as_str().expect("token in body").to_string()
}

fn b64(bytes: &[u8]) -> String {
    markvault::api::security::encode_blob(bytes)
}

#[tokio::test]
async fn test_register_conflict_and_validation() {
    let server = server().await;

    let (status, body, _) = send_json(
        &server.app,
        Method::POST,
        "/auth/register",
        json!({"login": "alice", "password": "correct horse battery staple"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["user_id"].as_str().unwrap().starts_with("u_"));
    assert_eq!(body["kdf"]["algorithm"], "argon2id");

    // Same request again: conflict
    let (status, body, _) = send_json(
        &server.app,
        Method::POST,
        "/auth/register",
        json!({"login": "alice", "password": "correct horse battery staple"}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    // Short login: validation error
    let (status, body, _) = send_json(
        &server.app,
        Method::POST,
        "/auth/register",
        json!({"login": "ab", "password": "correct horse battery staple"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let server = server().await;

    let (status, body, _) = send(
        &server.app,
        request(Method::GET, "/vault").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, _, _) = send(
        &server.app,
        request(Method::GET, "/vault")
            .header(AUTHORIZATION, "Bearer garbage-token")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_vault_and_manifest_flow() {
    let server = server().await;
    let token = register_and_login(&server, "alice").await;
    let bearer = format!("Bearer {}", token);

    // Fresh vault
    let (status, body, _) = send(
        &server.app,
        request(Method::GET, "/vault")
            .header(AUTHORIZATION, &bearer)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], 0);
    assert_eq!(body["bytes_total"], 0);
    assert_eq!(body["has_manifest"], false);

    // No manifest yet
    let (status, _, _) = send(
        &server.app,
        request(Method::GET, "/vault/manifest")
            .header(AUTHORIZATION, &bearer)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // First PUT without If-Match: created
    let manifest = json!({"version": 1, "nonce": b64(&[0u8; 24]), "ciphertext": b64(b"hello")});
    let (status, body, headers) = send(
        &server.app,
        request(Method::PUT, "/vault/manifest")
            .header(AUTHORIZATION, &bearer)
            .body(Body::from(manifest.to_string()))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let etag = body["etag"].as_str().unwrap().to_string();
    assert_eq!(headers.get("etag").unwrap().to_str().unwrap(), etag);
    assert_eq!(headers.get("x-vault-version").unwrap(), "1");

    // Identical PUT: version conflict
    let manifest = json!({"version": 1, "nonce": b64(&[0u8; 24]), "ciphertext": b64(b"hello")});
    let (status, _, _) = send(
        &server.app,
        request(Method::PUT, "/vault/manifest")
            .header(AUTHORIZATION, &bearer)
            .body(Body::from(manifest.to_string()))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Version 2 without If-Match: conflict
    let manifest = json!({"version": 2, "nonce": b64(&[0u8; 24]), "ciphertext": b64(b"hello2")});
    let (status, _, _) = send(
        &server.app,
        request(Method::PUT, "/vault/manifest")
            .header(AUTHORIZATION, &bearer)
            .body(Body::from(manifest.to_string()))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Version 2 with the current tag: replaced
    let manifest = json!({"version": 2, "nonce": b64(&[0u8; 24]), "ciphertext": b64(b"hello2")});
    let (status, body, _) = send(
        &server.app,
        request(Method::PUT, "/vault/manifest")
            .header(AUTHORIZATION, &bearer)
            .header(IF_MATCH, &etag)
            .body(Body::from(manifest.to_string()))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], 2);

    // HEAD returns the concurrency headers without a body
    let (status, body, headers) = send(
        &server.app,
        request(Method::HEAD, "/vault/manifest")
            .header(AUTHORIZATION, &bearer)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Null);
    assert_eq!(headers.get("x-vault-version").unwrap(), "2");
    assert!(headers.get("etag").is_some());

    // Bad base64 is a validation error
    let manifest = json!({"version": 3, "nonce": "aGVsbG8", "ciphertext": b64(b"x")});
    let (status, body, _) = send(
        &server.app,
        request(Method::PUT, "/vault/manifest")
            .header(AUTHORIZATION, &bearer)
            .header(IF_MATCH, body["etag"].as_str().unwrap_or(""))
            .body(Body::from(manifest.to_string()))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_bookmark_flow_over_http() {
    let server = server().await;
    let token = register_and_login(&server, "alice").await;
    let bearer = format!("Bearer {}", token);

    // Touch the vault first
    let (status, _, _) = send(
        &server.app,
        request(Method::GET, "/vault")
            .header(AUTHORIZATION, &bearer)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // Create
    let bookmark = json!({
        "item_id": "bm_a",
        "nonce_content": b64(&[0u8; 24]),
        "ciphertext_content": b64(b"bookmark body"),
        "nonce_wrap": b64(&[1u8; 24]),
        "dek_wrapped": b64(&[2u8; 48]),
        "size": 96,
        "created_at": 1,
        "updated_at": 1
    });
    let (status, body, headers) = send(
        &server.app,
        request(Method::POST, "/bookmarks")
            .header(AUTHORIZATION, &bearer)
            .body(Body::from(bookmark.to_string()))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let etag = body["etag"].as_str().unwrap().to_string();
    assert_eq!(headers.get("etag").unwrap().to_str().unwrap(), etag);

    // Read, deleted_at null
    let (status, body, _) = send(
        &server.app,
        request(Method::GET, "/bookmarks/bm_a")
            .header(AUTHORIZATION, &bearer)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted_at"], Value::Null);

    // Soft delete with If-Match
    let (status, body, _) = send(
        &server.app,
        request(Method::DELETE, "/bookmarks/bm_a")
            .header(AUTHORIZATION, &bearer)
            .header(IF_MATCH, &etag)
            .body(Body::from(json!({"version": 2, "deleted_at": 500}).to_string()))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted_at"], 500);

    // Repeat delete: not found
    let (status, _, _) = send(
        &server.app,
        request(Method::DELETE, "/bookmarks/bm_a")
            .header(AUTHORIZATION, &bearer)
            .header(IF_MATCH, body["etag"].as_str().unwrap())
            .body(Body::from(json!({"version": 3, "deleted_at": 501}).to_string()))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Oversized tag: payload too large
    let tag = json!({
        "tag_id": "t_big",
        "nonce_content": b64(&[0u8; 24]),
        "ciphertext_content": b64(&vec![0u8; 70_000]),
        "size": 70_024,
        "created_at": 1,
        "updated_at": 1
    });
    let (status, body, _) = send(
        &server.app,
        request(Method::POST, "/tags")
            .header(AUTHORIZATION, &bearer)
            .body(Body::from(tag.to_string()))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"]["code"], "PAYLOAD_TOO_LARGE");

    // A small tag is fine
    let tag = json!({
        "tag_id": "t_ok",
        "nonce_content": b64(&[0u8; 24]),
        "ciphertext_content": b64(&vec![0u8; 100]),
        "size": 124,
        "created_at": 1,
        "updated_at": 1
    });
    let (status, _, _) = send(
        &server.app,
        request(Method::POST, "/tags")
            .header(AUTHORIZATION, &bearer)
            .body(Body::from(tag.to_string()))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_link_flow_over_http() {
    let server = server().await;
    let token = register_and_login(&server, "alice").await;
    let bearer = format!("Bearer {}", token);

    send(
        &server.app,
        request(Method::GET, "/vault")
            .header(AUTHORIZATION, &bearer)
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    let bookmark = json!({
        "item_id": "bm_a",
        "nonce_content": b64(&[0u8; 24]),
        "ciphertext_content": b64(b"bookmark body"),
        "nonce_wrap": b64(&[1u8; 24]),
        "dek_wrapped": b64(&[2u8; 48]),
        "size": 109,
        "created_at": 1,
        "updated_at": 1
    });
    send(
        &server.app,
        request(Method::POST, "/bookmarks")
            .header(AUTHORIZATION, &bearer)
            .body(Body::from(bookmark.to_string()))
            .unwrap(),
    )
    .await;

    let tag = json!({
        "tag_id": "t_a",
        "nonce_content": b64(&[0u8; 24]),
        "ciphertext_content": b64(b"tag body"),
        "size": 32,
        "created_at": 1,
        "updated_at": 1
    });
    send(
        &server.app,
        request(Method::POST, "/tags")
            .header(AUTHORIZATION, &bearer)
            .body(Body::from(tag.to_string()))
            .unwrap(),
    )
    .await;

    // Link twice: 201 then 200, linked in both
    let link = json!({"item_id": "bm_a", "tag_id": "t_a", "created_at": 1});
    let (status, body, _) = send(
        &server.app,
        request(Method::POST, "/bookmark-tags")
            .header(AUTHORIZATION, &bearer)
            .body(Body::from(link.to_string()))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["linked"], true);

    let link = json!({"item_id": "bm_a", "tag_id": "t_a", "created_at": 2});
    let (status, body, _) = send(
        &server.app,
        request(Method::POST, "/bookmark-tags")
            .header(AUTHORIZATION, &bearer)
            .body(Body::from(link.to_string()))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["linked"], true);

    // Listed under the bookmark
    let (status, body, _) = send(
        &server.app,
        request(Method::GET, "/bookmarks/bm_a/tags")
            .header(AUTHORIZATION, &bearer)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tag_ids"], json!(["t_a"]));

    // Unlink twice: both succeed with linked false
    let unlink = json!({"item_id": "bm_a", "tag_id": "t_a"});
    let (status, body, _) = send(
        &server.app,
        request(Method::DELETE, "/bookmark-tags")
            .header(AUTHORIZATION, &bearer)
            .body(Body::from(unlink.to_string()))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["linked"], false);

    let unlink = json!({"item_id": "bm_a", "tag_id": "t_a"});
    let (status, body, _) = send(
        &server.app,
        request(Method::DELETE, "/bookmark-tags")
            .header(AUTHORIZATION, &bearer)
            .body(Body::from(unlink.to_string()))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["linked"], false);
}

#[tokio::test]
async fn test_logout_invalidates_token_everywhere() {
    let server = server().await;
    let token = register_and_login(&server, "alice").await;
    let bearer = format!("Bearer {}", token);

    let (status, body, _) = send(
        &server.app,
        request(Method::GET, "/auth/session")
            .header(AUTHORIZATION, &bearer)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);

    let (status, body, _) = send(
        &server.app,
        request(Method::POST, "/auth/logout")
            .header(AUTHORIZATION, &bearer)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);

    // Every authenticated endpoint rejects the revoked token
    for (method, uri) in [
        (Method::GET, "/auth/session"),
        (Method::GET, "/vault"),
        (Method::GET, "/bookmarks"),
        (Method::POST, "/auth/refresh"),
    ] {
        let (status, _, _) = send(
            &server.app,
            request(method, uri)
                .header(AUTHORIZATION, &bearer)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "expected 401 on {}", uri);
    }
}

#[tokio::test]
async fn test_refresh_issues_usable_token() {
    let server = server().await;
    let token = register_and_login(&server, "alice").await;
    let bearer = format!("Bearer {}", token);

    let (status, body, _) = send(
        &server.app,
        request(Method::POST, "/auth/refresh")
            .header(AUTHORIZATION, &bearer)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let refreshed = format!("Bearer {}", body["token"].as_str().unwrap());
    let (status, _, _) = send(
        &server.app,
        request(Method::GET, "/vault")
            .header(AUTHORIZATION, &refreshed)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_login_rate_limit_with_retry_after() {
    let server = server().await;

    let (status, _, _) = send_json(
        &server.app,
        Method::POST,
        "/auth/register",
        json!({"login": "alice", "password": "correct horse battery staple"}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    // Start the window fresh after registration
    server.state.api.rate.clear();

    // 5 attempts pass through the limiter
    for _ in 0..5 {
        let req = request(Method::POST, "/auth/login")
            .header("x-forwarded-for", "203.0.113.50")
            .body(Body::from(
                json!({"login": "alice", "password": "definitely wrong"}).to_string(),
            ))
            .unwrap();
        let (status, _, _) = send(&server.app, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    // The 6th is rate limited with a positive retry hint
    let req = request(Method::POST, "/auth/login")
        .header("x-forwarded-for", "203.0.113.50")
        .body(Body::from(
            json!({"login": "alice", "password": "definitely wrong"}).to_string(),
        ))
        .unwrap();
    let (status, body, headers) = send(&server.app, req).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"]["code"], "RATE_LIMITED");

    let retry_after: u64 = headers
        .get("retry-after")
        .expect("retry-after header")
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after > 0);
}
