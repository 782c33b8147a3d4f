use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = lookup("DATABASE_URL").context("DATABASE_URL not configured")?;
        Ok(Self {
            database_url,
            db_max_connections: lookup("DB_MAX_CONNECTIONS")
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(10),
            host: lookup("APP_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: lookup("APP_PORT")
                .and_then(|v| v.parse::<u16>().ok())
                .unwrap_or(8080),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_in(vars: HashMap<&'static str, &'static str>) -> impl Fn(&str) -> Option<String> {
        move |key| vars.get(key).map(|v| v.to_string())
    }

    #[test]
    fn missing_database_url_is_fatal() {
        let err = AppConfig::from_lookup(lookup_in(HashMap::new())).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn defaults_apply_when_optional_vars_absent() {
        let cfg = AppConfig::from_lookup(lookup_in(HashMap::from([(
            "DATABASE_URL",
            "postgres://localhost/diary",
        )])))
        .unwrap();
        assert_eq!(cfg.database_url, "postgres://localhost/diary");
        assert_eq!(cfg.db_max_connections, 10);
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.port, 8080);
    }

    #[test]
    fn unparsable_numbers_fall_back_to_defaults() {
        let cfg = AppConfig::from_lookup(lookup_in(HashMap::from([
            ("DATABASE_URL", "postgres://localhost/diary"),
            ("DB_MAX_CONNECTIONS", "many"),
            ("APP_PORT", "9090"),
        ])))
        .unwrap();
        assert_eq!(cfg.db_max_connections, 10);
        assert_eq!(cfg.port, 9090);
    }
}
