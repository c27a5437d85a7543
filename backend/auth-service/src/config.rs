//! Configuration management for the auth service
//!
//! Loads settings from environment variables, with a `.env` file picked up
//! in debug builds.
//!
//! # Example
//!
//! ```no_run
//! use auth_service::config::Settings;
//!
//! fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     println!("JWKS endpoint: {}", settings.identity_provider.jwks_url);
//!     Ok(())
//! }
//! ```

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub redis: RedisSettings,
    pub email: EmailSettings,
    pub identity_provider: IdentityProviderSettings,
    pub provisioning: ProvisioningSettings,
    pub codes: VerificationCodeSettings,
}

impl Settings {
    /// Load settings from the environment, reading `.env` first in debug builds.
    pub fn load() -> Result<Self> {
        if cfg!(debug_assertions) {
            dotenvy::dotenv().ok();
            info!("Loaded .env file for development");
        }
        Self::from_env()
    }

    pub fn from_env() -> Result<Self> {
        Ok(Settings {
            database: DatabaseSettings::from_env()?,
            redis: RedisSettings::from_env()?,
            email: EmailSettings::from_env()?,
            identity_provider: IdentityProviderSettings::from_env()?,
            provisioning: ProvisioningSettings::from_env()?,
            codes: VerificationCodeSettings::from_env()?,
        })
    }
}

fn parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {}", name)),
        Err(_) => Ok(default),
    }
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Database connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout: u64,
}

impl DatabaseSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            max_connections: parse_or("DATABASE_MAX_CONNECTIONS", 10)?,
            acquire_timeout: parse_or("DATABASE_ACQUIRE_TIMEOUT", 5)?,
        })
    }
}

/// Redis code store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisSettings {
    pub url: String,
    pub code_prefix: String,
}

impl RedisSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            url: env::var("REDIS_URL").context("REDIS_URL must be set")?,
            code_prefix: env::var("REDIS_CODE_PREFIX")
                .unwrap_or_else(|_| "verification_code:".to_string()),
        })
    }
}

/// SMTP settings. An empty host puts the email service in no-op mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailSettings {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from: String,
    pub use_starttls: bool,
}

impl EmailSettings {
    fn from_env() -> Result<Self> {
        Ok(Self {
            smtp_host: env::var("SMTP_HOST").unwrap_or_default(),
            smtp_port: parse_or("SMTP_PORT", 587)?,
            smtp_username: optional("SMTP_USERNAME"),
            smtp_password: optional("SMTP_PASSWORD"),
            smtp_from: env::var("SMTP_FROM").context("SMTP_FROM must be set")?,
            use_starttls: parse_or("SMTP_STARTTLS", true)?,
        })
    }
}

/// Identity provider key set and claim settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityProviderSettings {
    pub jwks_url: String,
    pub issuer: Option<String>,
    pub audience: Option<String>,
    pub groups_claim: String,
    pub username_claim: String,
    pub jwks_timeout_secs: u64,
}

impl IdentityProviderSettings {
    fn from_env() -> Result<Self> {
        let pool = match (optional("IDP_REGION"), optional("IDP_USER_POOL_ID")) {
            (Some(region), Some(pool_id)) => Some(format!(
                "https://cognito-idp.{}.amazonaws.com/{}",
                region, pool_id
            )),
            _ => None,
        };

        let jwks_url = match (optional("IDP_JWKS_URL"), &pool) {
            (Some(url), _) => url,
            (None, Some(base)) => format!("{}/.well-known/jwks.json", base),
            (None, None) => {
                bail!("IDP_JWKS_URL or IDP_REGION and IDP_USER_POOL_ID must be set")
            }
        };

        Ok(Self {
            jwks_url,
            issuer: optional("IDP_ISSUER").or(pool),
            audience: optional("IDP_AUDIENCE"),
            groups_claim: env::var("IDP_GROUPS_CLAIM")
                .unwrap_or_else(|_| "cognito:groups".to_string()),
            username_claim: env::var("IDP_USERNAME_CLAIM")
                .unwrap_or_else(|_| "cognito:username".to_string()),
            jwks_timeout_secs: parse_or("IDP_JWKS_TIMEOUT_SECS", 5)?,
        })
    }

    pub fn jwks_timeout(&self) -> Duration {
        Duration::from_secs(self.jwks_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisioningSettings {
    pub call_timeout_secs: u64,
}

impl ProvisioningSettings {
    fn from_env() -> Result<Self> {
        let call_timeout_secs = parse_or("PROVISIONING_CALL_TIMEOUT_SECS", 20)?;
        if !(1..=120).contains(&call_timeout_secs) {
            bail!("PROVISIONING_CALL_TIMEOUT_SECS must be between 1 and 120");
        }
        Ok(Self { call_timeout_secs })
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}

/// One day
pub const MAX_CODE_TTL_SECS: u64 = 86_400;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationCodeSettings {
    pub ttl_secs: u64,
    pub length: usize,
    /// How long an expired code is kept so it reports as expired rather than missing
    pub retention_secs: u64,
}

impl VerificationCodeSettings {
    fn from_env() -> Result<Self> {
        let settings = Self {
            ttl_secs: parse_or("CODE_TTL_SECS", 600)?,
            length: parse_or("CODE_LENGTH", 6)?,
            retention_secs: parse_or("CODE_RETENTION_SECS", 3600)?,
        };
        if !(1..=MAX_CODE_TTL_SECS).contains(&settings.ttl_secs) {
            bail!("CODE_TTL_SECS must be between 1 and {}", MAX_CODE_TTL_SECS);
        }
        if !(1..=64).contains(&settings.length) {
            bail!("CODE_LENGTH must be between 1 and 64");
        }
        Ok(settings)
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }
}
