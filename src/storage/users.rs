use sqlx::SqliteExecutor;

use crate::api_service::models::UserRecord;

const COLUMNS: &str = "id, login, password_hash, kdf_algorithm, kdf_salt, kdf_memory_cost, \
     kdf_time_cost, kdf_parallelism, kdf_hkdf_salt, wmk_nonce, wmk_ciphertext, \
     created_at, updated_at";

pub async fn insert(ex: impl SqliteExecutor<'_>, user: &UserRecord) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO users (id, login, password_hash, kdf_algorithm, kdf_salt, \
         kdf_memory_cost, kdf_time_cost, kdf_parallelism, kdf_hkdf_salt, \
         wmk_nonce, wmk_ciphertext, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&user.id)
    .bind(&user.login)
    .bind(&user.password_hash)
    .bind(&user.kdf_algorithm)
    .bind(&user.kdf_salt)
    .bind(user.kdf_memory_cost)
    .bind(user.kdf_time_cost)
    .bind(user.kdf_parallelism)
    .bind(&user.kdf_hkdf_salt)
    .bind(&user.wmk_nonce)
    .bind(&user.wmk_ciphertext)
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(ex)
    .await?;

    Ok(())
}

pub async fn find_by_login(
    ex: impl SqliteExecutor<'_>,
    login: &str,
) -> sqlx::Result<Option<UserRecord>> {
    sqlx::query_as::<_, UserRecord>(&format!(
        "SELECT {} FROM users WHERE login = ?",
        COLUMNS
    ))
    .bind(login)
    .fetch_optional(ex)
    .await
}

pub async fn find_by_id(
    ex: impl SqliteExecutor<'_>,
    user_id: &str,
) -> sqlx::Result<Option<UserRecord>> {
    sqlx::query_as::<_, UserRecord>(&format!("SELECT {} FROM users WHERE id = ?", COLUMNS))
        .bind(user_id)
        .fetch_optional(ex)
        .await
}

/// Store the wrapped master key. KDF columns are never touched here; they
/// are committed to the client's derived key.
pub async fn set_wrapped_key(
    ex: impl SqliteExecutor<'_>,
    user_id: &str,
    nonce: &[u8],
    ciphertext: &[u8],
    updated_at: i64,
) -> sqlx::Result<u64> {
    let result = sqlx::query(
        "UPDATE users SET wmk_nonce = ?, wmk_ciphertext = ?, updated_at = ? WHERE id = ?",
    )
    .bind(nonce)
    .bind(ciphertext)
    .bind(updated_at)
    .bind(user_id)
    .execute(ex)
    .await?;

    Ok(result.rows_affected())
}
