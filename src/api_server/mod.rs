/**
 * REST API Server Module
 *
 * HTTP transport for the vault storage engine: router assembly, CORS,
 * bearer-token middleware, and OpenAPI documentation.
 */
pub mod auth;
pub mod handlers;
pub mod models;
pub mod state;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderName};
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use state::AppState;

use crate::api::security::HashingParams;
use crate::api_service::Api;
use crate::config::AppConfig;
use crate::storage;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::register,
        handlers::auth::login,
        handlers::vault::get_vault,
        handlers::vault::put_manifest,
        handlers::bookmarks::list_bookmarks,
        handlers::links::link,
    ),
    components(
        schemas(
            models::ErrorResponse,
            models::ErrorDetail,
            models::RegisterRequest,
            models::LoginRequest,
            models::RegisterResponse,
            models::LoginResponse,
            models::KdfResponse,
            models::WrappedKeyResponse,
            models::VaultResponse,
            models::ManifestPutResponse,
            models::BookmarkResponse,
            models::BookmarksListResponse,
            models::LinkRequest,
            models::LinkResponse,
        )
    ),
    tags(
        (name = "auth", description = "Registration and sessions"),
        (name = "vault", description = "Vault and manifest"),
        (name = "bookmarks", description = "Encrypted bookmark records"),
        (name = "tags", description = "Encrypted tag records"),
        (name = "links", description = "Bookmark-tag associations"),
    )
)]
struct ApiDoc;

/// Request bodies above this are rejected at the transport; sized so a
/// maximum manifest still fits after base64 expansion.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Create API router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    // Credential endpoints stay outside the token middleware
    let public_routes = Router::new()
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login));

    let protected_routes = Router::new()
        // Session lifecycle
        .route("/auth/logout", post(handlers::auth::logout))
        .route("/auth/session", get(handlers::auth::session))
        .route("/auth/refresh", post(handlers::auth::refresh))
        .route("/user/wmk", post(handlers::auth::upload_wmk))
        // Vault + manifest
        .route("/vault", get(handlers::vault::get_vault))
        .route(
            "/vault/manifest",
            get(handlers::vault::get_manifest)
                .head(handlers::vault::head_manifest)
                .put(handlers::vault::put_manifest),
        )
        // Bookmarks
        .route(
            "/bookmarks",
            get(handlers::bookmarks::list_bookmarks).post(handlers::bookmarks::create_bookmark),
        )
        .route(
            "/bookmarks/:id",
            get(handlers::bookmarks::get_bookmark)
                .put(handlers::bookmarks::update_bookmark)
                .delete(handlers::bookmarks::delete_bookmark),
        )
        .route("/bookmarks/:id/tags", get(handlers::links::bookmark_tags))
        // Tags
        .route(
            "/tags",
            get(handlers::tags::list_tags).post(handlers::tags::create_tag),
        )
        .route(
            "/tags/:id",
            get(handlers::tags::get_tag)
                .put(handlers::tags::update_tag)
                .delete(handlers::tags::delete_tag),
        )
        // Links
        .route(
            "/bookmark-tags",
            post(handlers::links::link).delete(handlers::links::unlink),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                // The manifest cap is 5 MB of ciphertext; base64 plus the
                // JSON envelope pushes the wire size past axum's default
                // body limit.
                .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any)
                        // Clients must be able to read the concurrency headers
                        .expose_headers([
                            header::ETAG,
                            HeaderName::from_static(handlers::vault::VAULT_VERSION_HEADER),
                        ]),
                ),
        )
}

/// Start the API server
pub async fn start_server(config: AppConfig) -> anyhow::Result<()> {
    let pool = storage::connect(&config.database_url).await?;
    let api = Api::new(
        pool,
        &config.jwt_secret,
        config.token_ttl_secs,
        HashingParams::default(),
    )?;

    let state = Arc::new(AppState::new(api));
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("markvault API server starting on http://{}", addr);
    tracing::info!("API documentation at http://{}/swagger-ui/", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
