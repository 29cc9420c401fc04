//! Server configuration read from the environment.

use chrono::Duration;

use itrack_core::defaults::{
    BCRYPT_COST, CLIENT_URL, DB_MAX_CONNECTIONS, JWT_EXPIRES_IN, SERVER_HOST, SERVER_PORT,
};
use itrack_core::{Error, Result};

/// Default database URL for local development.
pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost/itrack";

/// Runtime configuration for the API server.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    /// HS256 signing secret.
    pub jwt_secret: String,
    /// Token lifetime.
    pub jwt_expires_in: Duration,
    /// Allowed CORS origin.
    pub client_url: String,
    pub bcrypt_cost: u32,
    pub db_max_connections: u32,
}

impl ApiConfig {
    /// Read configuration from the process environment.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `DATABASE_URL` | `postgres://localhost/itrack` |
    /// | `HOST` | `0.0.0.0` |
    /// | `PORT` | `5000` |
    /// | `JWT_SECRET` | required |
    /// | `JWT_EXPIRES_IN` | `7d` |
    /// | `CLIENT_URL` | `http://localhost:5173` |
    /// | `BCRYPT_COST` | `10` |
    /// | `DB_MAX_CONNECTIONS` | `10` |
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let jwt_secret = get("JWT_SECRET")
            .ok_or_else(|| Error::Config("JWT_SECRET must be set".to_string()))?;

        let port = match get("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| Error::Config(format!("PORT is not a valid port: {}", raw)))?,
            None => SERVER_PORT,
        };

        let expires_raw = get("JWT_EXPIRES_IN").unwrap_or_else(|| JWT_EXPIRES_IN.to_string());
        let jwt_expires_in = parse_lifetime(&expires_raw)?;

        let bcrypt_cost = match get("BCRYPT_COST") {
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|c| (4..=31).contains(c))
                .ok_or_else(|| Error::Config(format!("BCRYPT_COST must be 4-31: {}", raw)))?,
            None => BCRYPT_COST,
        };

        let db_max_connections = get("DB_MAX_CONNECTIONS")
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(DB_MAX_CONNECTIONS)
            .max(1);

        Ok(Self {
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            host: get("HOST").unwrap_or_else(|| SERVER_HOST.to_string()),
            port,
            jwt_secret,
            jwt_expires_in,
            client_url: get("CLIENT_URL").unwrap_or_else(|| CLIENT_URL.to_string()),
            bcrypt_cost,
            db_max_connections,
        })
    }
}

/// Parse a token lifetime such as `7d`, `12h`, `30m`, `45s`, or a bare
/// number of seconds.
pub fn parse_lifetime(raw: &str) -> Result<Duration> {
    let raw = raw.trim();
    let invalid = || Error::Config(format!("JWT_EXPIRES_IN is not a valid duration: {}", raw));

    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);
    let n: i64 = digits.parse().map_err(|_| invalid())?;
    if n <= 0 {
        return Err(invalid());
    }

    let duration = match unit {
        "" | "s" => Duration::try_seconds(n),
        "m" => Duration::try_minutes(n),
        "h" => Duration::try_hours(n),
        "d" => Duration::try_days(n),
        _ => None,
    };
    duration.ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_apply() {
        let config = ApiConfig::from_lookup(lookup(&[("JWT_SECRET", "s3cret")])).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.client_url, "http://localhost:5173");
        assert_eq!(config.bcrypt_cost, 10);
        assert_eq!(config.jwt_expires_in, Duration::days(7));
        assert_eq!(config.db_max_connections, 10);
    }

    #[test]
    fn test_missing_secret_is_config_error() {
        let err = ApiConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        let err = ApiConfig::from_lookup(lookup(&[("JWT_SECRET", "  ")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_overrides() {
        let config = ApiConfig::from_lookup(lookup(&[
            ("JWT_SECRET", "s3cret"),
            ("PORT", "8080"),
            ("JWT_EXPIRES_IN", "12h"),
            ("BCRYPT_COST", "4"),
            ("CLIENT_URL", "https://tracker.example.com"),
        ]))
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.jwt_expires_in, Duration::hours(12));
        assert_eq!(config.bcrypt_cost, 4);
        assert_eq!(config.client_url, "https://tracker.example.com");
    }

    #[test]
    fn test_bad_port_and_cost_rejected() {
        assert!(ApiConfig::from_lookup(lookup(&[("JWT_SECRET", "x"), ("PORT", "http")])).is_err());
        assert!(
            ApiConfig::from_lookup(lookup(&[("JWT_SECRET", "x"), ("BCRYPT_COST", "99")])).is_err()
        );
    }

    #[test]
    fn test_parse_lifetime_units() {
        assert_eq!(parse_lifetime("45").unwrap(), Duration::seconds(45));
        assert_eq!(parse_lifetime("45s").unwrap(), Duration::seconds(45));
        assert_eq!(parse_lifetime("30m").unwrap(), Duration::minutes(30));
        assert_eq!(parse_lifetime("2h").unwrap(), Duration::hours(2));
        assert_eq!(parse_lifetime("7d").unwrap(), Duration::days(7));
        assert!(parse_lifetime("7w").is_err());
        assert!(parse_lifetime("d").is_err());
        assert!(parse_lifetime("0d").is_err());
        assert!(parse_lifetime("").is_err());
    }
}
