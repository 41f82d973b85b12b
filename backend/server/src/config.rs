use std::{env, fmt::Display, fs::read_to_string, str::FromStr, time::Duration};

use tracing::{info, warn};

use crate::error::ConfigError;

pub struct Config {
    pub port: u16,
    pub redis_url: String,
    pub auth_url: String,
    pub storage_url: String,
    pub service_key: String,
    pub allowed_origin: String,
    pub sweep_interval: Duration,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let sweep_secs: u64 = try_load("SWEEP_INTERVAL_SECS", "300")?;

        Ok(Self {
            port: try_load("RUST_PORT", "8080")?,
            redis_url: try_load("REDIS_URL", "redis://redis:6379")?,
            auth_url: try_load("AUTH_URL", "http://auth:9999")?,
            storage_url: try_load("STORAGE_URL", "http://storage:5000")?,
            service_key: read_secret("SERVICE_KEY")?,
            allowed_origin: try_load("ALLOWED_ORIGIN", "http://localhost:5173")?,
            sweep_interval: Duration::from_secs(sweep_secs.max(1)),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            redis_url: "redis://127.0.0.1:6379".to_string(),
            auth_url: "http://127.0.0.1:9999".to_string(),
            storage_url: "http://127.0.0.1:5000".to_string(),
            service_key: String::new(),
            allowed_origin: "http://localhost:5173".to_string(),
            sweep_interval: Duration::from_secs(300),
        }
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");
            ConfigError::Invalid {
                key,
                message: e.to_string(),
            }
        })
}

/// Docker secrets first, then a plain environment variable for local runs.
fn read_secret(secret_name: &'static str) -> Result<String, ConfigError> {
    let path = format!("/run/secrets/{secret_name}");

    match read_to_string(&path) {
        Ok(s) => Ok(s.trim().to_string()),
        Err(e) => {
            warn!("Failed to read {secret_name} from file: {e}");
            var(secret_name)
                .map(|s| s.trim().to_string())
                .ok_or(ConfigError::MissingSecret(secret_name))
        }
    }
}
