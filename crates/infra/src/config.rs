//! Process configuration loaded from the environment.

use std::env;
use std::net::SocketAddr;

use chrono::Duration;
use thiserror::Error;
use tracing::warn;

use penboard_observability::LogFormat;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_JWT_SECRET: &str = "dev-secret";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_ACCESS_TOKEN_TTL_SECS: i64 = 300;
pub const DEFAULT_REFRESH_TOKEN_TTL_SECS: i64 = 86_400;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: `{value}` ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// `None` selects the in-memory store.
    pub database: Option<DatabaseConfig>,
    pub jwt_secret: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub log_format: LogFormat,
}

impl core::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind_addr", &self.bind_addr)
            .field("database", &self.database.as_ref().map(|_| "<configured>"))
            .field("jwt_secret", &"<redacted>")
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl AppConfig {
    /// Load from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Parse configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr = parse_or("BIND_ADDR", get("BIND_ADDR"), DEFAULT_BIND_ADDR.parse().ok())?;

        let database = match get("DATABASE_URL") {
            Some(url) => Some(DatabaseConfig {
                url,
                max_connections: parse_or(
                    "DATABASE_MAX_CONNECTIONS",
                    get("DATABASE_MAX_CONNECTIONS"),
                    Some(DEFAULT_MAX_CONNECTIONS),
                )?,
            }),
            None => None,
        };

        let jwt_secret = get("JWT_SECRET").unwrap_or_else(|| DEFAULT_JWT_SECRET.to_string());

        let access_secs: i64 = parse_or(
            "ACCESS_TOKEN_TTL_SECS",
            get("ACCESS_TOKEN_TTL_SECS"),
            Some(DEFAULT_ACCESS_TOKEN_TTL_SECS),
        )?;
        let refresh_secs: i64 = parse_or(
            "REFRESH_TOKEN_TTL_SECS",
            get("REFRESH_TOKEN_TTL_SECS"),
            Some(DEFAULT_REFRESH_TOKEN_TTL_SECS),
        )?;
        for (key, secs) in [("ACCESS_TOKEN_TTL_SECS", access_secs), ("REFRESH_TOKEN_TTL_SECS", refresh_secs)] {
            if secs <= 0 {
                return Err(ConfigError::Invalid {
                    key,
                    value: secs.to_string(),
                    reason: "must be positive".to_string(),
                });
            }
        }

        let log_format = parse_or("LOG_FORMAT", get("LOG_FORMAT"), Some(LogFormat::default()))?;

        Ok(Self {
            bind_addr,
            database,
            jwt_secret,
            access_token_ttl: Duration::seconds(access_secs),
            refresh_token_ttl: Duration::seconds(refresh_secs),
            log_format,
        })
    }

    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }

    /// Emit warnings for development fallbacks. Call after tracing is set up.
    pub fn warn_on_fallbacks(&self) {
        if self.uses_default_secret() {
            warn!("JWT_SECRET not set; using insecure development secret");
        }
        if self.database.is_none() {
            warn!("DATABASE_URL not set; using in-memory store (data is lost on restart)");
        }
    }
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: Option<T>) -> Result<T, ConfigError>
where
    T: core::str::FromStr,
    T::Err: core::fmt::Display,
{
    match raw {
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
        None => default.ok_or_else(|| ConfigError::Invalid {
            key,
            value: String::new(),
            reason: "missing".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = load(&[]).unwrap();
        assert_eq!(cfg.bind_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(cfg.database, None);
        assert!(cfg.uses_default_secret());
        assert_eq!(cfg.access_token_ttl, Duration::seconds(300));
        assert_eq!(cfg.refresh_token_ttl, Duration::days(1));
        assert_eq!(cfg.log_format, LogFormat::Json);
    }

    #[test]
    fn reads_database_and_overrides() {
        let cfg = load(&[
            ("BIND_ADDR", "127.0.0.1:3000"),
            ("DATABASE_URL", "postgres://blog@localhost/blog"),
            ("DATABASE_MAX_CONNECTIONS", "4"),
            ("JWT_SECRET", "s3cret"),
            ("ACCESS_TOKEN_TTL_SECS", "60"),
            ("LOG_FORMAT", "pretty"),
        ])
        .unwrap();

        assert_eq!(cfg.bind_addr.port(), 3000);
        assert_eq!(
            cfg.database,
            Some(DatabaseConfig {
                url: "postgres://blog@localhost/blog".into(),
                max_connections: 4,
            })
        );
        assert!(!cfg.uses_default_secret());
        assert_eq!(cfg.access_token_ttl, Duration::seconds(60));
        assert_eq!(cfg.log_format, LogFormat::Pretty);
    }

    #[test]
    fn blank_values_count_as_unset() {
        let cfg = load(&[("DATABASE_URL", "  "), ("JWT_SECRET", "")]).unwrap();
        assert_eq!(cfg.database, None);
        assert!(cfg.uses_default_secret());
    }

    #[test]
    fn invalid_values_are_reported_by_key() {
        let err = load(&[("BIND_ADDR", "not-an-addr")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "BIND_ADDR", .. }));

        let err = load(&[("REFRESH_TOKEN_TTL_SECS", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "REFRESH_TOKEN_TTL_SECS", .. }));

        let err = load(&[("LOG_FORMAT", "xml")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "LOG_FORMAT", .. }));
    }

    #[test]
    fn debug_output_hides_secrets() {
        let cfg = load(&[("JWT_SECRET", "s3cret"), ("DATABASE_URL", "postgres://u:pw@h/db")]).unwrap();
        let debug = format!("{cfg:?}");
        assert!(!debug.contains("s3cret"));
        assert!(!debug.contains("pw@"));
    }
}
