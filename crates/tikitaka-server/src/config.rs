use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use tikitaka_api::token::{DEFAULT_TOKEN_TTL, parse_ttl};
use tikitaka_db::PoolSettings;
use tikitaka_db::pool::{DEFAULT_ACQUIRE_TIMEOUT, DEFAULT_MAX_CONNECTIONS};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "your-secret-key",
    "your_jwt_secret",
    "secret",
];

const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://10.0.2.2:3000";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database: PoolSettings,
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub upload_dir: PathBuf,
    pub cors_origins: Vec<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key/value source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let jwt_secret = get("JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("JWT_SECRET is unset or still a placeholder; set it in .env and restart");
        }

        let port = match get("PORT") {
            Some(raw) => raw.parse().with_context(|| format!("invalid PORT '{raw}'"))?,
            None => 3000,
        };

        let token_ttl = match get("JWT_EXPIRES_IN") {
            Some(raw) => parse_ttl(&raw).with_context(|| format!("invalid JWT_EXPIRES_IN '{raw}'"))?,
            None => DEFAULT_TOKEN_TTL,
        };

        let url = get("DATABASE_URL").unwrap_or_else(|| {
            let name = get("DB_NAME").unwrap_or_else(|| "tikitaka_db".into());
            format!("sqlite://{name}.db")
        });
        let database = PoolSettings {
            url,
            max_connections: get("DB_MAX_CONNECTIONS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_CONNECTIONS),
            acquire_timeout: get("DB_ACQUIRE_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_ACQUIRE_TIMEOUT),
        };

        let cors_origins = get("CORS_ORIGINS")
            .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.into())
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            database,
            jwt_secret,
            token_ttl,
            upload_dir: get("UPLOAD_DIR").unwrap_or_else(|| "./uploads".into()).into(),
            cors_origins,
        })
    }
}
