//! Service configuration.
//!
//! Values come from a [`ServiceConfig`] built in code or from the
//! environment:
//!
//! | Variable | Meaning | Default |
//! |---|---|---|
//! | `CERTMINT_BASE_URL` | base of verification links | required |
//! | `CERTMINT_ENV` | `test` or `production` | `test` |
//! | `CERTMINT_LOG_LEVEL` | `DEBUG`, `INFO` or `WARNING` | `INFO` |
//! | `CERTMINT_MAX_CODE_ATTEMPTS` | draws per issuance before giving up | `5` |
//! | `CERTMINT_SIGNING_KEY` | Ed25519 seed, hex or PKCS#8 PEM | none |
//! | `CERTMINT_VERIFYING_KEY` | Ed25519 public key, hex or SPKI PEM | derived |

use std::fmt;
use std::str::FromStr;

use tracing::Level;

use crate::error::{Result, ServiceError};

pub const ENV_BASE_URL: &str = "CERTMINT_BASE_URL";
pub const ENV_ENVIRONMENT: &str = "CERTMINT_ENV";
pub const ENV_LOG_LEVEL: &str = "CERTMINT_LOG_LEVEL";
pub const ENV_MAX_CODE_ATTEMPTS: &str = "CERTMINT_MAX_CODE_ATTEMPTS";
pub const ENV_SIGNING_KEY: &str = "CERTMINT_SIGNING_KEY";
pub const ENV_VERIFYING_KEY: &str = "CERTMINT_VERIFYING_KEY";

/// Default number of codes drawn per issuance.
pub const DEFAULT_MAX_CODE_ATTEMPTS: u32 = 5;

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    #[default]
    Test,
    Production,
}

impl FromStr for Environment {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "test" | "teste" => Ok(Environment::Test),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(ServiceError::Config(format!(
                "unknown environment {:?}, expected test or production",
                other
            ))),
        }
    }
}

/// Parse a log level name. `WARNING` is accepted as an alias of `WARN`.
pub fn parse_log_level(s: &str) -> Result<Level> {
    let s = s.trim();
    if s.eq_ignore_ascii_case("warning") {
        return Ok(Level::WARN);
    }
    s.parse::<Level>()
        .map_err(|_| ServiceError::Config(format!("unknown log level {:?}", s)))
}

/// Configuration for the certificate service.
#[derive(Clone)]
pub struct ServiceConfig {
    /// Base URL that verification links are built on.
    pub base_url: String,
    pub environment: Environment,
    pub log_level: Level,
    /// How many codes to draw before reporting a collision.
    pub max_code_attempts: u32,
    /// Signing key material; required for issuing tokens.
    pub signing_key: Option<String>,
    /// Verifying key material; derived from the signing key when absent.
    pub verifying_key: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/".to_string(),
            environment: Environment::default(),
            log_level: Level::INFO,
            max_code_attempts: DEFAULT_MAX_CODE_ATTEMPTS,
            signing_key: None,
            verifying_key: None,
        }
    }
}

impl ServiceConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through `lookup`, which maps a variable name to
    /// its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let base_url = non_empty(ENV_BASE_URL)
            .ok_or_else(|| ServiceError::Config(format!("{} is required", ENV_BASE_URL)))?;

        let environment = match non_empty(ENV_ENVIRONMENT) {
            Some(v) => v.parse()?,
            None => defaults.environment,
        };

        let log_level = match non_empty(ENV_LOG_LEVEL) {
            Some(v) => parse_log_level(&v)?,
            None => defaults.log_level,
        };

        let max_code_attempts = match non_empty(ENV_MAX_CODE_ATTEMPTS) {
            Some(v) => v.trim().parse::<u32>().map_err(|e| {
                ServiceError::Config(format!("{}: {}", ENV_MAX_CODE_ATTEMPTS, e))
            })?,
            None => defaults.max_code_attempts,
        };

        let config = Self {
            base_url,
            environment,
            log_level,
            max_code_attempts,
            signing_key: non_empty(ENV_SIGNING_KEY),
            verifying_key: non_empty(ENV_VERIFYING_KEY),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check values that do not depend on parsing key material.
    pub fn validate(&self) -> Result<()> {
        if self.max_code_attempts == 0 {
            return Err(ServiceError::Config(
                "max_code_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("base_url", &self.base_url)
            .field("environment", &self.environment)
            .field("log_level", &self.log_level)
            .field("max_code_attempts", &self.max_code_attempts)
            .field("signing_key", &self.signing_key.as_ref().map(|_| "<redacted>"))
            .field("verifying_key", &self.verifying_key)
            .finish()
    }
}
