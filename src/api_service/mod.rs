/**
 * Vault Engine Service Layer
 *
 * Business logic for the storage engine, framework-agnostic: the HTTP
 * transport, tests, and any future embedding all call through the same
 * facade.
 *
 * # Architecture
 *
 * ```text
 * Transport (axum) → API Service → Persistent Store (sqlx/SQLite)
 * ```
 */
pub mod auth;
pub mod bookmarks;
pub mod error;
pub mod items;
pub mod links;
pub mod models;
pub mod rate_limit;
pub mod tags;
pub mod vault;

pub use auth::AuthService;
pub use bookmarks::BookmarkService;
pub use error::{ApiError, ApiResult};
pub use links::LinkService;
pub use rate_limit::{RateLimiter, RateScope};
pub use tags::TagService;
pub use vault::VaultService;

use crate::api::security::HashingParams;
use sqlx::SqlitePool;

/// Milliseconds since the Unix epoch; every timestamp in the engine uses
/// this clock.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Main API facade that groups all services
pub struct Api {
    pub auth: AuthService,
    pub vault: VaultService,
    pub bookmarks: BookmarkService,
    pub tags: TagService,
    pub links: LinkService,
    pub rate: RateLimiter,
}

impl Api {
    /// Wire the services over a shared pool. Computing the auth benchmark
    /// hash makes this a deliberate startup cost.
    pub fn new(
        pool: SqlitePool,
        jwt_secret: &str,
        token_ttl_secs: i64,
        hashing: HashingParams,
    ) -> ApiResult<Self> {
        Ok(Self {
            auth: AuthService::new(pool.clone(), jwt_secret, token_ttl_secs, hashing)?,
            vault: VaultService::new(pool.clone()),
            bookmarks: BookmarkService::new(pool.clone()),
            tags: TagService::new(pool.clone()),
            links: LinkService::new(pool),
            rate: RateLimiter::new(),
        })
    }
}
