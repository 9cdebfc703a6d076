//! Configuration management for Playback Access Service
//!
//! Loads settings from environment variables, with a `.env` file picked up
//! for local development. Loaded once at startup; clients built from it are
//! shared by every request.

use anyhow::{bail, Context, Result};
use std::env;
use std::fmt;
use std::time::Duration;

/// Reference validity of an issued share link (4 hours)
pub const DEFAULT_LINK_TTL_SECS: u64 = 4 * 60 * 60;

#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppConfig,
    pub cors: CorsConfig,
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub link: LinkConfig,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub env: String,
    pub json_logs: bool,
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.env.eq_ignore_ascii_case("production")
    }
}

#[derive(Clone, Debug)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &"[REDACTED]")
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .field("max_lifetime_secs", &self.max_lifetime_secs)
            .finish()
    }
}

#[derive(Clone)]
pub struct CacheConfig {
    pub redis_url: String,
    pub op_timeout: Duration,
}

impl fmt::Debug for CacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheConfig")
            .field("redis_url", &"[REDACTED]")
            .field("op_timeout", &self.op_timeout)
            .finish()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkMode {
    /// HMAC-signed, expiring gateway links
    Signed,
    /// Unsigned links for local development
    Static,
}

impl LinkMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "signed" => Some(Self::Signed),
            "static" => Some(Self::Static),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct LinkConfig {
    pub mode: LinkMode,
    pub bucket: String,
    pub base_url: String,
    pub secret: Option<String>,
    pub valid_for: Duration,
}

impl fmt::Debug for LinkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkConfig")
            .field("mode", &self.mode)
            .field("bucket", &self.bucket)
            .field("base_url", &self.base_url)
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .field("valid_for", &self.valid_for)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Config {
            app: AppConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_or("PORT", 8080)?,
                env: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
                json_logs: env::var("LOG_FORMAT")
                    .map(|v| v.eq_ignore_ascii_case("json"))
                    .unwrap_or(false),
            },
            cors: CorsConfig {
                allowed_origins: parse_list(
                    &env::var("CORS_ALLOWED_ORIGINS").unwrap_or_else(|_| "*".to_string()),
                ),
            },
            database: DatabaseConfig {
                url: normalize_database_url(
                    &env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
                ),
                max_connections: parse_or("DB_MAX_CONNECTIONS", 25)?,
                min_connections: parse_or("DB_MIN_CONNECTIONS", 5)?,
                acquire_timeout_secs: parse_or("DB_ACQUIRE_TIMEOUT_SECS", 5)?,
                max_lifetime_secs: parse_or("DB_MAX_LIFETIME_SECS", 300)?,
            },
            cache: CacheConfig {
                redis_url: env::var("REDIS_URL").context("REDIS_URL must be set")?,
                op_timeout: Duration::from_millis(parse_or("REDIS_OP_TIMEOUT_MS", 3000)?),
            },
            link: LinkConfig::from_env()?,
        })
    }
}

impl LinkConfig {
    fn from_env() -> Result<Self> {
        let raw_mode = env::var("LINK_SHARE_MODE").unwrap_or_else(|_| "signed".to_string());
        let mode = LinkMode::parse(&raw_mode)
            .with_context(|| format!("Invalid LINK_SHARE_MODE: {raw_mode}"))?;

        let secret = env::var("LINK_SHARE_SECRET").ok().filter(|s| !s.is_empty());
        if mode == LinkMode::Signed && secret.is_none() {
            bail!("LINK_SHARE_SECRET must be set when LINK_SHARE_MODE=signed");
        }

        Ok(Self {
            mode,
            bucket: env::var("S3_VIDEO_BUCKET").context("S3_VIDEO_BUCKET must be set")?,
            base_url: env::var("LINK_SHARE_BASE_URL")
                .unwrap_or_else(|_| "https://link.storjshare.io".to_string()),
            secret,
            valid_for: Duration::from_secs(parse_or("LINK_SHARE_TTL_SECS", DEFAULT_LINK_TTL_SECS)?),
        })
    }
}

fn parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {name}")),
        _ => Ok(default),
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Local PostgreSQL instances usually run without TLS.
pub fn normalize_database_url(url: &str) -> String {
    let is_local = url.contains("localhost") || url.contains("127.0.0.1");
    if !is_local || url.contains("sslmode=") {
        return url.to_string();
    }

    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}sslmode=disable")
}
