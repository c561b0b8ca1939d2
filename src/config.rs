use std::str::FromStr;

use anyhow::{bail, Context};
use serde::Deserialize;

const DEV_JWT_SECRET: &str = "super-secret-change-me";
const DEFAULT_TTL_MINUTES: i64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

impl FromStr for Environment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "dev" | "development" => Ok(Self::Development),
            "prod" | "production" => Ok(Self::Production),
            other => bail!("unknown APP_ENV value: {other}"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_minutes: i64,
}

/// Argon2id work factor.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct HashConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub jwt: JwtConfig,
    pub hash: HashConfig,
    pub request_timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let environment = match get("APP_ENV") {
            Some(v) => v.parse::<Environment>()?,
            None => Environment::Development,
        };

        let secret = match get("JWT_SECRET") {
            Some(s) => s,
            None if environment == Environment::Production => {
                bail!("JWT_SECRET must be set when APP_ENV=production")
            }
            None => {
                tracing::warn!("JWT_SECRET not set; using the development fallback secret");
                DEV_JWT_SECRET.to_string()
            }
        };

        let ttl_minutes = parse_or(
            get("JWT_EXPIRE_MINUTES"),
            "JWT_EXPIRE_MINUTES",
            DEFAULT_TTL_MINUTES,
        )?;
        let ttl_minutes = if ttl_minutes <= 0 {
            DEFAULT_TTL_MINUTES
        } else {
            ttl_minutes
        };
        if ttl_minutes.checked_mul(60).is_none() {
            bail!("JWT_EXPIRE_MINUTES is too large: {ttl_minutes}");
        }

        let database_url = get("DATABASE_URL");
        if database_url.is_none() && environment == Environment::Production {
            bail!("DATABASE_URL must be set when APP_ENV=production");
        }

        let defaults = HashConfig::default();
        let hash = HashConfig {
            memory_kib: parse_or(get("HASH_MEMORY_KIB"), "HASH_MEMORY_KIB", defaults.memory_kib)?,
            iterations: parse_or(get("HASH_ITERATIONS"), "HASH_ITERATIONS", defaults.iterations)?,
            parallelism: parse_or(
                get("HASH_PARALLELISM"),
                "HASH_PARALLELISM",
                defaults.parallelism,
            )?,
        };

        Ok(Self {
            environment,
            host: get("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(get("APP_PORT"), "APP_PORT", 8080)?,
            database_url,
            jwt: JwtConfig {
                secret,
                ttl_minutes,
            },
            hash,
            request_timeout_secs: parse_or(
                get("REQUEST_TIMEOUT_SECS"),
                "REQUEST_TIMEOUT_SECS",
                30,
            )?,
        })
    }
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(v) => v
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value: {v}")),
        None => Ok(default),
    }
}
