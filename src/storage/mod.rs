/**
 * Persistent Store
 *
 * SQLite-backed persistence for the vault engine. One schema, seven tables;
 * parameterized queries only. The schema is ensured at startup so services
 * and integration tests always see a consistent database.
 */
pub mod bookmarks;
pub mod links;
pub mod manifests;
pub mod sessions;
pub mod tags;
pub mod users;
pub mod vaults;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use tracing::debug;

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        login TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        kdf_algorithm TEXT NOT NULL,
        kdf_salt BLOB NOT NULL,
        kdf_memory_cost INTEGER NOT NULL,
        kdf_time_cost INTEGER NOT NULL,
        kdf_parallelism INTEGER NOT NULL,
        kdf_hkdf_salt BLOB NOT NULL,
        wmk_nonce BLOB,
        wmk_ciphertext BLOB,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS sessions (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL REFERENCES users(id),
        jwt_id TEXT NOT NULL UNIQUE,
        expires_at INTEGER NOT NULL,
        revoked_at INTEGER,
        created_at INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at)",
    "CREATE TABLE IF NOT EXISTS vaults (
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL UNIQUE REFERENCES users(id),
        version INTEGER NOT NULL DEFAULT 0,
        bytes_total INTEGER NOT NULL DEFAULT 0,
        updated_at INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS manifests (
        vault_id TEXT PRIMARY KEY REFERENCES vaults(id) ON DELETE CASCADE,
        version INTEGER NOT NULL,
        etag TEXT NOT NULL,
        nonce BLOB NOT NULL,
        ciphertext BLOB NOT NULL,
        size INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS bookmarks (
        vault_id TEXT NOT NULL REFERENCES vaults(id) ON DELETE CASCADE,
        item_id TEXT NOT NULL,
        nonce_content BLOB NOT NULL,
        ciphertext_content BLOB NOT NULL,
        nonce_wrap BLOB NOT NULL,
        dek_wrapped BLOB NOT NULL,
        etag TEXT NOT NULL,
        version INTEGER NOT NULL,
        size INTEGER NOT NULL,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        deleted_at INTEGER,
        PRIMARY KEY (vault_id, item_id)
    )",
    "CREATE INDEX IF NOT EXISTS idx_bookmarks_updated_at ON bookmarks(vault_id, updated_at)",
    "CREATE TABLE IF NOT EXISTS tags (
        vault_id TEXT NOT NULL REFERENCES vaults(id) ON DELETE CASCADE,
        tag_id TEXT NOT NULL,
        nonce_content BLOB NOT NULL,
        ciphertext_content BLOB NOT NULL,
        tag_token TEXT,
        etag TEXT NOT NULL,
        version INTEGER NOT NULL,
        size INTEGER NOT NULL,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        deleted_at INTEGER,
        PRIMARY KEY (vault_id, tag_id)
    )",
    "CREATE INDEX IF NOT EXISTS idx_tags_updated_at ON tags(vault_id, updated_at)",
    "CREATE INDEX IF NOT EXISTS idx_tags_token ON tags(vault_id, tag_token)",
    "CREATE TABLE IF NOT EXISTS bookmark_tags (
        vault_id TEXT NOT NULL,
        item_id TEXT NOT NULL,
        tag_id TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        PRIMARY KEY (vault_id, item_id, tag_id),
        FOREIGN KEY (vault_id, item_id) REFERENCES bookmarks(vault_id, item_id) ON DELETE CASCADE,
        FOREIGN KEY (vault_id, tag_id) REFERENCES tags(vault_id, tag_id) ON DELETE CASCADE
    )",
];

/// Connect to the database, creating the file and schema if missing.
/// Foreign keys are switched on per connection; SQLite defaults them off.
pub async fn connect(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    ensure_schema(&pool).await?;

    Ok(pool)
}

/// Whether an error is a UNIQUE constraint violation, which services map to
/// conflicts (duplicate login, duplicate item id).
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.message().contains("UNIQUE constraint failed"))
}

/// Apply the schema. Every statement is idempotent.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    debug!("Ensuring database schema is up to date");

    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_creates_schema() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("engine.db").display());

        let pool = connect(&url).await.unwrap();

        let tables: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN \
             ('users','sessions','vaults','manifests','bookmarks','tags','bookmark_tags')",
        )
        .fetch_one(&pool)
        .await
        .unwrap();

        assert_eq!(tables, 7);
    }

    #[tokio::test]
    async fn test_ensure_schema_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("engine.db").display());

        let pool = connect(&url).await.unwrap();
        ensure_schema(&pool).await.unwrap();
        ensure_schema(&pool).await.unwrap();
    }
}
