use std::time::Duration;

use serde::Deserialize;

/// Upper bound for `JWT_TTL_MINUTES`: one year.
pub const MAX_TTL_MINUTES: i64 = 60 * 24 * 365;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Connection pool sizing. Fixed for the life of the process.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub idle_timeout_secs: u64,
    pub acquire_timeout_secs: u64,
}

impl PoolConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 20,
            idle_timeout_secs: 30,
            acquire_timeout_secs: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub pool: PoolConfig,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow::anyhow!("missing required environment variable {key}"))
        };

        let database_url = required("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: required("JWT_SECRET")?,
            issuer: lookup("JWT_ISSUER").unwrap_or_else(|| "eventplanner".into()),
            audience: lookup("JWT_AUDIENCE").unwrap_or_else(|| "eventplanner-users".into()),
            // 24h
            ttl_minutes: parse_or(&lookup, "JWT_TTL_MINUTES", 60 * 24),
        };

        if !(1..=MAX_TTL_MINUTES).contains(&jwt.ttl_minutes) {
            anyhow::bail!(
                "JWT_TTL_MINUTES must be between 1 and {MAX_TTL_MINUTES}, got {}",
                jwt.ttl_minutes
            );
        }

        let defaults = PoolConfig::default();
        let pool = PoolConfig {
            max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", defaults.max_connections),
            idle_timeout_secs: parse_or(&lookup, "DB_IDLE_TIMEOUT_SECS", defaults.idle_timeout_secs),
            acquire_timeout_secs: parse_or(
                &lookup,
                "DB_ACQUIRE_TIMEOUT_SECS",
                defaults.acquire_timeout_secs,
            ),
        };

        Ok(Self {
            database_url,
            jwt,
            pool,
            host: lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&lookup, "APP_PORT", 8080),
        })
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn applies_defaults_when_only_required_vars_set() {
        let cfg = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/events"),
            ("JWT_SECRET", "s3cret"),
        ]))
        .expect("config should load");

        assert_eq!(cfg.database_url, "postgres://localhost/events");
        assert_eq!(cfg.jwt.secret, "s3cret");
        assert_eq!(cfg.jwt.issuer, "eventplanner");
        assert_eq!(cfg.jwt.audience, "eventplanner-users");
        assert_eq!(cfg.jwt.ttl_minutes, 1440);
        assert_eq!(cfg.pool.max_connections, 20);
        assert_eq!(cfg.pool.idle_timeout(), Duration::from_secs(30));
        assert_eq!(cfg.pool.acquire_timeout(), Duration::from_secs(2));
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.port, 8080);
    }

    #[test]
    fn missing_secret_is_an_error() {
        let err = AppConfig::from_lookup(lookup_from(&[(
            "DATABASE_URL",
            "postgres://localhost/events",
        )]))
        .unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn blank_database_url_is_an_error() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "  "),
            ("JWT_SECRET", "s3cret"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn overrides_and_bad_numbers() {
        let cfg = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://db/events"),
            ("JWT_SECRET", "s3cret"),
            ("JWT_TTL_MINUTES", "15"),
            ("DB_MAX_CONNECTIONS", "5"),
            ("DB_ACQUIRE_TIMEOUT_SECS", "not-a-number"),
            ("APP_PORT", "3001"),
        ]))
        .expect("config should load");

        assert_eq!(cfg.jwt.ttl_minutes, 15);
        assert_eq!(cfg.pool.max_connections, 5);
        assert_eq!(cfg.pool.acquire_timeout_secs, 2);
        assert_eq!(cfg.port, 3001);
    }

    #[test]
    fn out_of_range_ttl_is_an_error() {
        for ttl in ["0", "-5", "9223372036854775807"] {
            let err = AppConfig::from_lookup(lookup_from(&[
                ("DATABASE_URL", "postgres://db/events"),
                ("JWT_SECRET", "s3cret"),
                ("JWT_TTL_MINUTES", ttl),
            ]))
            .unwrap_err();
            assert!(err.to_string().contains("JWT_TTL_MINUTES"), "ttl {ttl}");
        }
    }
}
