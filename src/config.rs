// Copyright: Kyler Chin <kyler@catenarymaps.org>
// Catenary Transit Initiatives
// Removal of the attribution is not allowed, as covered under the AGPL license

//! Runtime settings read from the environment.

use std::collections::HashMap;
use thiserror::Error;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_POOL_SIZE: u32 = 16;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("DATABASE_URL is not set and {0} is missing to build one from DB_* variables")]
    MissingDatabase(&'static str),
    #[error("Environment variable {name} has invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
    pub pool_size: u32,
}

impl Settings {
    /// Reads the process environment. The binaries load `.env` before calling this.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars().collect())
    }

    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_url = match vars.get("DATABASE_URL") {
            Some(url) => url.clone(),
            None => database_url_from_parts(&vars)?,
        };

        Ok(Settings {
            database_url,
            host: vars
                .get("HOST")
                .cloned()
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: parse_var(&vars, "PORT")?.unwrap_or(DEFAULT_PORT),
            workers: parse_var(&vars, "WORKERS")?,
            pool_size: parse_var(&vars, "DB_POOL_SIZE")?.unwrap_or(DEFAULT_POOL_SIZE),
        })
    }
}

fn database_url_from_parts(vars: &HashMap<String, String>) -> Result<String, ConfigError> {
    let require = |name: &'static str| {
        vars.get(name)
            .cloned()
            .ok_or(ConfigError::MissingDatabase(name))
    };

    let host = require("DB_HOST")?;
    let user = require("DB_USER")?;
    let password = require("DB_PASSWORD")?;
    let database = require("DB_DATABASE_NAME")?;
    let port: u16 = parse_var(vars, "DB_PORT")?.unwrap_or(5432);

    Ok(format!(
        "postgres://{}:{}@{}:{}/{}",
        user, password, host, port, database
    ))
}

fn parse_var<T: std::str::FromStr>(
    vars: &HashMap<String, String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError> {
    match vars.get(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::Invalid {
                name,
                value: value.clone(),
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults_apply_when_only_database_url_is_set() {
        let settings =
            Settings::from_vars(vars(&[("DATABASE_URL", "postgres://localhost/citybike")]))
                .unwrap();

        assert_eq!(settings.database_url, "postgres://localhost/citybike");
        assert_eq!(settings.host, DEFAULT_HOST);
        assert_eq!(settings.port, DEFAULT_PORT);
        assert_eq!(settings.workers, None);
        assert_eq!(settings.pool_size, DEFAULT_POOL_SIZE);
    }

    #[test]
    fn database_url_is_composed_from_parts() {
        let settings = Settings::from_vars(vars(&[
            ("DB_HOST", "db"),
            ("DB_PORT", "5433"),
            ("DB_USER", "bike"),
            ("DB_PASSWORD", "secret"),
            ("DB_DATABASE_NAME", "journeys"),
            ("PORT", "9000"),
            ("WORKERS", "4"),
        ]))
        .unwrap();

        assert_eq!(settings.database_url, "postgres://bike:secret@db:5433/journeys");
        assert_eq!(settings.port, 9000);
        assert_eq!(settings.workers, Some(4));
    }

    #[test]
    fn missing_database_part_is_reported() {
        let err = Settings::from_vars(vars(&[("DB_HOST", "db")])).unwrap_err();
        assert_eq!(err, ConfigError::MissingDatabase("DB_USER"));
    }

    #[test]
    fn invalid_port_is_rejected() {
        let err = Settings::from_vars(vars(&[
            ("DATABASE_URL", "postgres://localhost/citybike"),
            ("PORT", "eighty"),
        ]))
        .unwrap_err();

        assert_eq!(
            err,
            ConfigError::Invalid {
                name: "PORT",
                value: "eighty".to_string()
            }
        );
    }
}
