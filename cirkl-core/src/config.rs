use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::error::CirklError;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_SERVICE_NAME: &str = "Cirkl Graphiti Memory";

#[derive(Debug, Deserialize, Clone)]
pub struct CirklConfig {
    pub service: ServiceConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    pub name: String,
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

impl HttpConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl CirklConfig {
    /// Load from defaults, an optional TOML file, `CIRKL__*` variables and
    /// finally the `PORT` variable.
    pub fn load(path: &str) -> Result<Self, CirklError> {
        let port = port_from_env(std::env::var("PORT").ok())?;
        Ok(Self::build(path, port)?)
    }

    /// Same layering as [`CirklConfig::load`] with the port override passed
    /// explicitly instead of read from `PORT`.
    pub fn build(path: &str, port_override: Option<u16>) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("service.name", DEFAULT_SERVICE_NAME)?
            .set_default("service.log_level", "info")?
            .set_default("http.host", DEFAULT_HOST)?
            .set_default("http.port", i64::from(DEFAULT_PORT))?
            .add_source(File::with_name(path).required(false))
            .add_source(Environment::with_prefix("CIRKL").separator("__"))
            .set_override_option("http.port", port_override.map(i64::from))?
            .build()?;
        s.try_deserialize()
    }
}

/// Parse the raw `PORT` value. Blank counts as unset.
pub fn port_from_env(raw: Option<String>) -> Result<Option<u16>, ConfigError> {
    match raw {
        Some(v) if !v.trim().is_empty() => v
            .trim()
            .parse::<u16>()
            .map(Some)
            .map_err(|e| ConfigError::Message(format!("invalid PORT {:?}: {}", v, e))),
        _ => Ok(None),
    }
}
