//! Configuration loaded from the process environment.

use thiserror::Error;
use tracing::warn;

use warden_core::UserId;

pub const DATABASE_URL: &str = "DATABASE_URL";
pub const MAX_CONNECTIONS: &str = "WARDEN_DB_MAX_CONNECTIONS";
pub const BOOTSTRAP_ADMIN: &str = "WARDEN_BOOTSTRAP_ADMIN";

const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },
}

/// Database connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl DatabaseConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let url = lookup(DATABASE_URL)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing(DATABASE_URL))?;

        let max_connections = match lookup(MAX_CONNECTIONS) {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                Ok(_) => {
                    return Err(ConfigError::Invalid {
                        var: MAX_CONNECTIONS,
                        reason: "must be greater than zero".into(),
                    });
                }
                Err(e) => {
                    return Err(ConfigError::Invalid {
                        var: MAX_CONNECTIONS,
                        reason: e.to_string(),
                    });
                }
            },
            None => {
                warn!("{MAX_CONNECTIONS} not set; using {DEFAULT_MAX_CONNECTIONS}");
                DEFAULT_MAX_CONNECTIONS
            }
        };

        Ok(Self { url, max_connections })
    }
}

/// Settings for the seeding entrypoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedConfig {
    /// User that receives the `admin` role after seeding.
    pub bootstrap_admin: Option<UserId>,
}

impl SeedConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bootstrap_admin = lookup(BOOTSTRAP_ADMIN)
            .filter(|v| !v.trim().is_empty())
            .map(|raw| {
                raw.trim().parse::<UserId>().map_err(|e| ConfigError::Invalid {
                    var: BOOTSTRAP_ADMIN,
                    reason: e.to_string(),
                })
            })
            .transpose()?;
        Ok(Self { bootstrap_admin })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn database_url_is_required() {
        assert_eq!(
            DatabaseConfig::from_lookup(env(&[])),
            Err(ConfigError::Missing(DATABASE_URL))
        );
    }

    #[test]
    fn max_connections_defaults_and_validates() {
        let cfg = DatabaseConfig::from_lookup(env(&[(DATABASE_URL, "postgres://localhost/warden")])).unwrap();
        assert_eq!(cfg.max_connections, 5);

        let cfg = DatabaseConfig::from_lookup(env(&[
            (DATABASE_URL, "postgres://localhost/warden"),
            (MAX_CONNECTIONS, "12"),
        ]))
        .unwrap();
        assert_eq!(cfg.max_connections, 12);

        assert!(matches!(
            DatabaseConfig::from_lookup(env(&[
                (DATABASE_URL, "postgres://localhost/warden"),
                (MAX_CONNECTIONS, "0"),
            ])),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn bootstrap_admin_must_be_a_uuid() {
        assert_eq!(SeedConfig::from_lookup(env(&[])).unwrap(), SeedConfig::default());

        let id = UserId::new();
        let raw = id.to_string();
        let cfg = SeedConfig::from_lookup(env(&[(BOOTSTRAP_ADMIN, raw.as_str())])).unwrap();
        assert_eq!(cfg.bootstrap_admin, Some(id));

        assert!(SeedConfig::from_lookup(env(&[(BOOTSTRAP_ADMIN, "admin@example.com")])).is_err());
    }
}
