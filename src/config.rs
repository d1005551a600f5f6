use std::{collections::HashSet, fmt::Display, net::SocketAddr, ops::RangeInclusive};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable is not set")]
    Missing(&'static str),

    #[error("JWT_SECRET value is too weak; provide at least 32 random characters")]
    WeakJwtSecret,

    #[error("failed to parse {field}={value}: {source}")]
    Parse {
        field: &'static str,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("{field}={value} is out of range; expected {min}..={max}")]
    OutOfRange {
        field: &'static str,
        value: String,
        min: String,
        max: String,
    },
}

/// Longest session lifetime accepted, one year.
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365;

/// Runtime settings for the server, read from the environment.
#[derive(Clone)]
pub struct Config {
    /// PostgreSQL connection string. Without it notebooks live in memory.
    pub database_url: Option<String>,
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub db_pool_max_size: u32,
    /// Prefix for client bundles referenced from rendered pages.
    pub static_url: String,
    pub app_version: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &self.database_url.as_ref().map(|_| "<set>"))
            .field("bind_addr", &self.bind_addr)
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl_hours", &self.token_ttl_hours)
            .field("db_pool_max_size", &self.db_pool_max_size)
            .field("static_url", &self.static_url)
            .field("app_version", &self.app_version)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        ensure_secret_strength(&jwt_secret)?;

        let mut static_url = lookup("STATIC_URL").unwrap_or_else(|| "/static/".to_string());
        if !static_url.ends_with('/') {
            static_url.push('/');
        }

        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            bind_addr: parse_var(&lookup, "BIND_ADDR", "0.0.0.0:3000")?,
            jwt_secret,
            token_ttl_hours: parse_bounded(
                &lookup,
                "TOKEN_TTL_HOURS",
                "24",
                1..=MAX_TOKEN_TTL_HOURS,
            )?,
            db_pool_max_size: parse_bounded(&lookup, "DB_POOL_MAX_SIZE", "16", 1..=1024)?,
            static_url,
            app_version: lookup("APP_VERSION_STRING").unwrap_or_else(|| "dev".to_string()),
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = lookup(key).unwrap_or_else(|| default.to_string());
    value.trim().parse().map_err(|err| ConfigError::Parse {
        field: key,
        value,
        source: Box::new(err),
    })
}

fn parse_bounded<F, T>(
    lookup: &F,
    key: &'static str,
    default: &str,
    range: RangeInclusive<T>,
) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + PartialOrd + Display,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value: T = parse_var(lookup, key, default)?;
    if !range.contains(&value) {
        return Err(ConfigError::OutOfRange {
            field: key,
            value: value.to_string(),
            min: range.start().to_string(),
            max: range.end().to_string(),
        });
    }
    Ok(value)
}

fn ensure_secret_strength(secret: &str) -> Result<(), ConfigError> {
    let trimmed = secret.trim();
    if trimmed.len() < 32 {
        return Err(ConfigError::WeakJwtSecret);
    }

    let unique_chars = trimmed.chars().collect::<HashSet<_>>();
    if unique_chars.len() < 8 {
        return Err(ConfigError::WeakJwtSecret);
    }

    Ok(())
}

#[cfg(test)]
pub(crate) const TEST_SECRET: &str = "k3y-f0r-t3sts-0nly-aBcDeFgHiJkLmNoP";

#[cfg(test)]
impl Config {
    pub(crate) fn for_tests() -> Self {
        Self::from_lookup(|key| match key {
            "JWT_SECRET" => Some(TEST_SECRET.to_string()),
            _ => None,
        })
        .expect("test configuration is valid")
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_lookup(lookup_from(&[("JWT_SECRET", TEST_SECRET)])).unwrap();
        assert!(config.database_url.is_none());
        assert_eq!(config.bind_addr, "0.0.0.0:3000".parse().unwrap());
        assert_eq!(config.token_ttl_hours, 24);
        assert_eq!(config.db_pool_max_size, 16);
        assert_eq!(config.static_url, "/static/");
        assert_eq!(config.app_version, "dev");
    }

    #[test]
    fn test_missing_secret_rejected() {
        let result = Config::from_lookup(lookup_from(&[]));
        assert!(matches!(result, Err(ConfigError::Missing("JWT_SECRET"))));
    }

    #[test]
    fn test_weak_secret_rejected() {
        let short = Config::from_lookup(lookup_from(&[("JWT_SECRET", "short")]));
        assert!(matches!(short, Err(ConfigError::WeakJwtSecret)));

        let repetitive = "a".repeat(40);
        let low_entropy = Config::from_lookup(lookup_from(&[("JWT_SECRET", &repetitive)]));
        assert!(matches!(low_entropy, Err(ConfigError::WeakJwtSecret)));
    }

    #[test]
    fn test_invalid_number_reports_field() {
        let result = Config::from_lookup(lookup_from(&[
            ("JWT_SECRET", TEST_SECRET),
            ("TOKEN_TTL_HOURS", "soon"),
        ]));
        match result {
            Err(ConfigError::Parse { field, value, .. }) => {
                assert_eq!(field, "TOKEN_TTL_HOURS");
                assert_eq!(value, "soon");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_token_ttl_out_of_range_rejected() {
        for ttl in ["0", "-3", "1000000000000"] {
            let result = Config::from_lookup(lookup_from(&[
                ("JWT_SECRET", TEST_SECRET),
                ("TOKEN_TTL_HOURS", ttl),
            ]));
            match result {
                Err(ConfigError::OutOfRange { field, value, .. }) => {
                    assert_eq!(field, "TOKEN_TTL_HOURS");
                    assert_eq!(value, ttl);
                }
                other => panic!("ttl={ttl} unexpectedly gave {other:?}"),
            }
        }

        let longest = MAX_TOKEN_TTL_HOURS.to_string();
        let config = Config::from_lookup(lookup_from(&[
            ("JWT_SECRET", TEST_SECRET),
            ("TOKEN_TTL_HOURS", longest.as_str()),
        ]))
        .unwrap();
        assert_eq!(config.token_ttl_hours, MAX_TOKEN_TTL_HOURS);
    }

    #[test]
    fn test_empty_pool_rejected() {
        let result = Config::from_lookup(lookup_from(&[
            ("JWT_SECRET", TEST_SECRET),
            ("DB_POOL_MAX_SIZE", "0"),
        ]));
        assert!(matches!(
            result,
            Err(ConfigError::OutOfRange {
                field: "DB_POOL_MAX_SIZE",
                ..
            })
        ));
    }

    #[test]
    fn test_static_url_gets_trailing_slash() {
        let config = Config::from_lookup(lookup_from(&[
            ("JWT_SECRET", TEST_SECRET),
            ("STATIC_URL", "https://cdn.example.com/assets"),
            ("DATABASE_URL", "  "),
        ]))
        .unwrap();
        assert_eq!(config.static_url, "https://cdn.example.com/assets/");
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = Config::for_tests();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains(TEST_SECRET));
    }
}
