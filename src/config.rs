// ============================================================================
// CONFIGURATION
// ============================================================================
//
// Description:
//   Lecture de la configuration du processus depuis l'environnement
//   (.env chargé par dotenv dans main).
//
// Variables:
//   - STORE_BACKEND : "postgres" (défaut) ou "memory"
//   - DATABASE_URL  : requis si STORE_BACKEND=postgres
//   - JWT_SECRET    : requis
//   - JWT_TTL_HOURS : durée de vie des tokens (défaut 24)
//   - HOST / PORT   : adresse d'écoute (défaut 127.0.0.1:8080)
//
// ============================================================================

use std::env;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set in .env file")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub host: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let store_backend = match env::var("STORE_BACKEND").ok().as_deref() {
            None | Some("postgres") => StoreBackend::Postgres,
            Some("memory") => StoreBackend::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "STORE_BACKEND",
                    value: other.to_string(),
                });
            }
        };

        let database_url = env::var("DATABASE_URL").ok();
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let jwt_secret = env::var("JWT_SECRET").map_err(|_| ConfigError::Missing("JWT_SECRET"))?;

        Ok(Self {
            store_backend,
            database_url,
            jwt_secret,
            jwt_ttl_hours: parse_var("JWT_TTL_HOURS", 24)?,
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: parse_var("PORT", 8080)?,
        })
    }

    /// Configuration utilisée par les tests (store mémoire, secret fixe)
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            store_backend: StoreBackend::Memory,
            database_url: None,
            jwt_secret: "test-secret".to_string(),
            jwt_ttl_hours: 1,
            host: "127.0.0.1".to_string(),
            port: 0,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}
