//! Environment-driven configuration.

use crate::error::ConfigError;
use crate::sql::Dialect;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_BODY_LIMIT: usize = 1_024_000;

#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub database_url: String,
    /// Shown on the admin index.
    pub title: String,
    pub upload_root: PathBuf,
    pub body_limit: usize,
    pub max_connections: u32,
    pub bind: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            database_url: "sqlite::memory:".into(),
            title: "Admin".into(),
            upload_root: PathBuf::from("."),
            body_limit: DEFAULT_BODY_LIMIT,
            max_connections: 5,
            bind: "127.0.0.1:8000".into(),
        }
    }
}

impl Settings {
    /// Read settings from the environment, loading `.env` first if present. Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| dotenvy::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut s = Settings::default();
        if let Some(v) = lookup("DATABASE_URL") {
            s.database_url = v;
        }
        if let Some(v) = lookup("ADMIN_TITLE") {
            s.title = v;
        }
        if let Some(v) = lookup("ADMIN_UPLOAD_ROOT") {
            s.upload_root = PathBuf::from(v);
        }
        if let Some(v) = lookup("ADMIN_BODY_LIMIT") {
            s.body_limit = parse_var("ADMIN_BODY_LIMIT", &v)?;
        }
        if let Some(v) = lookup("ADMIN_MAX_CONNECTIONS") {
            s.max_connections = parse_var("ADMIN_MAX_CONNECTIONS", &v)?;
        }
        if let Some(v) = lookup("ADMIN_BIND") {
            s.bind = v;
        }
        Ok(s)
    }

    pub fn dialect(&self) -> Dialect {
        Dialect::from_url(&self.database_url)
    }
}

fn parse_var<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| ConfigError::Load(format!("{}={:?}: {}", key, value, e)))
}
