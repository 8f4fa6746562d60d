use std::env;
use std::fs;
use std::path::PathBuf;

/// Default bearer-token lifetime in seconds (1 hour).
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;

/// Runtime configuration resolved from the environment.
///
/// `JWT_SECRET` is mandatory: tokens signed with an empty or ephemeral key
/// would silently invalidate every session on restart, so startup refuses
/// to proceed without it.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub token_ttl_secs: i64,
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// * `HOST` - bind address, default `127.0.0.1`
    /// * `PORT` - bind port, default `3000`
    /// * `DATABASE_URL` - SQLite URL, default under the platform data dir
    /// * `JWT_SECRET` - required, non-empty
    /// * `TOKEN_TTL_SECS` - optional token lifetime override
    pub fn from_env() -> Result<Self, String> {
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = match env::var("PORT") {
            Ok(raw) => raw
                .parse::<u16>()
                .map_err(|_| format!("Invalid PORT value: {}", raw))?,
            Err(_) => 3000,
        };

        let database_url = match env::var("DATABASE_URL") {
            Ok(url) if !url.is_empty() => url,
            _ => Self::default_database_url()?,
        };

        let jwt_secret = env::var("JWT_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "JWT_SECRET is not set; refusing to start".to_string())?;

        let token_ttl_secs = match env::var("TOKEN_TTL_SECS") {
            Ok(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|ttl| *ttl > 0)
                .ok_or_else(|| format!("Invalid TOKEN_TTL_SECS value: {}", raw))?,
            Err(_) => DEFAULT_TOKEN_TTL_SECS,
        };

        Ok(Self {
            host,
            port,
            database_url,
            jwt_secret,
            token_ttl_secs,
        })
    }

    /// Default SQLite database location under the platform-local data dir.
    pub fn default_database_url() -> Result<String, String> {
        let data_dir = dirs::data_local_dir()
            .ok_or_else(|| "Could not determine local data directory".to_string())?;

        let db_dir = data_dir.join("markvault");

        if !db_dir.exists() {
            fs::create_dir_all(&db_dir).map_err(|e| {
                tracing::error!("Failed to create data directory at {:?}: {}", db_dir, e);
                format!("Failed to create data directory: {}", e)
            })?;

            tracing::info!("Created data directory at {:?}", db_dir);
        }

        Ok(format!("sqlite://{}", db_dir.join("markvault.db").display()))
    }

    /// Resolve the database file path from a `sqlite://` URL, if it has one.
    pub fn database_path(&self) -> Option<PathBuf> {
        self.database_url
            .strip_prefix("sqlite://")
            .map(PathBuf::from)
    }
}
