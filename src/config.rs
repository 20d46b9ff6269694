//! Configuration module for environment variables and application settings
//!
//! Everything the server needs is read once at startup into [`Config`] and then
//! passed by reference into the services that need it.

use std::env;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};

/// Default session lifetime in the cache: 7 days.
pub const DEFAULT_SESSION_TTL_SECS: u64 = 604_800;
/// Default token lifetime when `JWT_EXPIRES_IN` is unset.
pub const DEFAULT_TOKEN_TTL: &str = "24h";

#[derive(Debug, Clone)]
pub struct Config {
    /// Token signing configuration
    pub jwt: JwtConfig,

    /// Session cache configuration
    pub session: SessionConfig,

    /// Password hashing cost parameters
    pub password: PasswordConfig,

    /// PostgreSQL connection string; `None` selects the in-memory credential store
    pub database_url: Option<String>,

    /// Upper bound for the PostgreSQL connection pool
    pub database_max_connections: usize,

    /// Server configuration
    pub server: ServerConfig,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl: Duration,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Validated `redis://` or `rediss://` URL. `None` disables session caching.
    pub redis_url: Option<String>,
    pub ttl_secs: u64,
    /// Bound on connecting to and talking with the cache.
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct PasswordConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
}

impl Default for PasswordConfig {
    /// argon2id defaults recommended by OWASP (19 MiB, 2 passes, 1 lane).
    fn default() -> Self {
        Self {
            memory_kib: 19_456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup("JWT_SECRET")
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| anyhow!("JWT_SECRET environment variable is required"))?;

        let ttl_raw = lookup("JWT_EXPIRES_IN").unwrap_or_else(|| DEFAULT_TOKEN_TTL.to_string());
        let ttl = parse_duration(&ttl_raw)
            .with_context(|| format!("Invalid JWT_EXPIRES_IN value: {ttl_raw}"))?;

        let session = SessionConfig {
            redis_url: lookup("REDIS_URL").and_then(|url| validate_redis_url(&url)),
            ttl_secs: parse_or("SESSION_EXPIRE_SECONDS", &lookup, DEFAULT_SESSION_TTL_SECS)?,
            timeout: Duration::from_millis(parse_or("REDIS_CONNECT_TIMEOUT_MS", &lookup, 5_000)?),
        };

        let defaults = PasswordConfig::default();
        let password = PasswordConfig {
            memory_kib: parse_or("PASSWORD_HASH_MEMORY_KIB", &lookup, defaults.memory_kib)?,
            iterations: parse_or("PASSWORD_HASH_ITERATIONS", &lookup, defaults.iterations)?,
            parallelism: parse_or("PASSWORD_HASH_PARALLELISM", &lookup, defaults.parallelism)?,
        };

        let port: u16 = match lookup("PORT") {
            Some(port) => port.parse().context("PORT must be a valid port number")?,
            None => parse_or("SERVER_PORT", &lookup, 3000)?,
        };

        let server = ServerConfig {
            host: lookup("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            allowed_origins: lookup("CORS_ALLOWED_ORIGINS")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|o| !o.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_else(|| vec!["http://localhost:3001".to_string()]),
        };

        Ok(Self {
            jwt: JwtConfig { secret, ttl },
            session,
            password,
            database_url: lookup("DATABASE_URL").filter(|u| !u.trim().is_empty()),
            database_max_connections: parse_or("DATABASE_MAX_CONNECTIONS", &lookup, 16)?,
            server,
        })
    }
}

fn parse_or<T, F>(key: &str, lookup: &F, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {key}: {raw}")),
        None => Ok(default),
    }
}

/// Accepts plain seconds (`3600`) or a single unit suffix: `s`, `m`, `h`, `d`.
pub fn parse_duration(raw: &str) -> Result<Duration> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);
    if digits.is_empty() {
        bail!("missing numeric value");
    }
    let value: u64 = digits.parse().context("duration out of range")?;
    let multiplier = match unit {
        "" | "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        other => bail!("unknown duration unit `{other}`"),
    };
    if value == 0 {
        bail!("duration must be positive");
    }
    // Token expiry is stored as signed seconds.
    let seconds = value
        .checked_mul(multiplier)
        .filter(|secs| i64::try_from(*secs).is_ok())
        .context("duration out of range")?;
    Ok(Duration::from_secs(seconds))
}

/// Returns the URL if it can be used for a Redis client, `None` otherwise.
fn validate_redis_url(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match url::Url::parse(raw) {
        Ok(parsed) if matches!(parsed.scheme(), "redis" | "rediss") => Some(raw.to_string()),
        Ok(parsed) => {
            tracing::warn!(
                "Invalid Redis URL scheme `{}`, session caching will be disabled",
                parsed.scheme()
            );
            None
        }
        Err(e) => {
            tracing::warn!("Invalid Redis URL ({e}), session caching will be disabled");
            None
        }
    }
}
