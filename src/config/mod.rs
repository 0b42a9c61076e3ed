use std::env;
use std::time::Duration;

use thiserror::Error;

const DEFAULT_JWT_EXPIRATION_SECS: u64 = 30 * 60;
const MAX_JWT_EXPIRATION_SECS: u64 = 30 * 24 * 3600;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub jwt_secret: String,
    pub jwt_expiration_secs: u64,
    pub bcrypt_cost: u32,
    pub rate_limit_window_secs: u64,
    pub rate_limit_requests: u32,
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("jwt_secret", &"[REDACTED]")
            .field("jwt_expiration_secs", &self.jwt_expiration_secs)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("rate_limit_window_secs", &self.rate_limit_window_secs)
            .field("rate_limit_requests", &self.rate_limit_requests)
            .field("server_host", &self.server_host)
            .field("server_port", &self.server_port)
            .field("api_base_uri", &self.api_base_uri)
            .finish_non_exhaustive()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_vars(|name| env::var(name).ok())
    }

    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |var: &'static str| lookup(var).ok_or(ConfigError::Missing(var));

        let jwt_secret = required("JWT_SECRET")?;
        if jwt_secret.trim().is_empty() {
            return Err(ConfigError::Invalid {
                var: "JWT_SECRET",
                value: String::new(),
            });
        }
        if jwt_secret.len() < 32 {
            tracing::warn!("JWT_SECRET is shorter than 32 bytes");
        }

        let jwt_expiration_secs = match lookup("JWT_EXPIRATION") {
            Some(value) => parse_duration_secs(&value)
                .filter(|secs| (1..=MAX_JWT_EXPIRATION_SECS).contains(secs))
                .ok_or(ConfigError::Invalid {
                    var: "JWT_EXPIRATION",
                    value,
                })?,
            None => DEFAULT_JWT_EXPIRATION_SECS,
        };

        let bcrypt_cost = parse_or("BCRYPT_COST", &lookup, bcrypt::DEFAULT_COST)?;
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(ConfigError::Invalid {
                var: "BCRYPT_COST",
                value: bcrypt_cost.to_string(),
            });
        }

        Ok(Config {
            database_url: required("DATABASE_URL")?,
            redis_url: required("REDIS_URL")?,
            jwt_secret,
            jwt_expiration_secs,
            bcrypt_cost,
            rate_limit_window_secs: parse_or("RATE_LIMIT_WINDOW", &lookup, 60)?,
            rate_limit_requests: parse_or("RATE_LIMIT_REQUESTS", &lookup, 20)?,
            server_host: lookup("SERVER_HOST").unwrap_or_else(|| "::".into()),
            server_port: parse_or("SERVER_PORT", &lookup, 3000)?,
            api_base_uri: lookup("API_BASE_URI").unwrap_or_else(|| "/api".into()),
        })
    }

    pub fn jwt_expiration(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.jwt_expiration_secs as i64)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }
}

fn parse_or<T, F>(var: &'static str, lookup: &F, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(var) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        None => Ok(default),
    }
}

/// 支持 `90`、`90s`、`30m`、`24h`、`7d`
fn parse_duration_secs(value: &str) -> Option<u64> {
    let value = value.trim();
    let (number, unit) = match value.char_indices().last()? {
        (i, c) if c.is_ascii_alphabetic() => (&value[..i], c),
        _ => (value, 's'),
    };
    let number: u64 = number.parse().ok()?;
    let multiplier = match unit {
        's' => 1,
        'm' => 60,
        'h' => 3600,
        'd' => 86400,
        _ => return None,
    };
    number.checked_mul(multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    const BASE: &[(&str, &str)] = &[
        ("DATABASE_URL", "postgres://localhost/chat"),
        ("REDIS_URL", "redis://localhost"),
        ("JWT_SECRET", "0123456789abcdef0123456789abcdef"),
    ];

    #[test]
    fn defaults_are_applied() {
        let config = Config::from_vars(vars(BASE)).unwrap();
        assert_eq!(config.jwt_expiration_secs, 30 * 60);
        assert_eq!(config.bcrypt_cost, bcrypt::DEFAULT_COST);
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.api_base_uri, "/api");
        assert_eq!(config.rate_limit_window(), Duration::from_secs(60));
    }

    #[test]
    fn secret_is_required() {
        let err = Config::from_vars(vars(&BASE[..2])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("JWT_SECRET")));

        let mut blank = BASE.to_vec();
        blank[2] = ("JWT_SECRET", "   ");
        assert!(Config::from_vars(vars(&blank)).is_err());
    }

    #[test]
    fn expiration_accepts_units() {
        for (raw, secs) in [("3600", 3600), ("45s", 45), ("30m", 1800), ("2h", 7200), ("1d", 86400)] {
            let mut pairs = BASE.to_vec();
            pairs.push(("JWT_EXPIRATION", raw));
            let config = Config::from_vars(vars(&pairs)).unwrap();
            assert_eq!(config.jwt_expiration_secs, secs, "{raw}");
        }
    }

    #[test]
    fn bad_values_are_reported() {
        for (var, raw) in [
            ("JWT_EXPIRATION", "0"),
            ("JWT_EXPIRATION", "soon"),
            ("JWT_EXPIRATION", "10w"),
            ("BCRYPT_COST", "2"),
            ("SERVER_PORT", "http"),
        ] {
            let mut pairs = BASE.to_vec();
            pairs.push((var, raw));
            let err = Config::from_vars(vars(&pairs)).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid { .. }), "{var}={raw}");
        }
    }

    #[test]
    fn debug_hides_secret() {
        let config = Config::from_vars(vars(BASE)).unwrap();
        assert!(!format!("{config:?}").contains("0123456789abcdef"));
    }
}
