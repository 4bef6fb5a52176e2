use crate::adapters::outbound::{InfluxSettings, DEFAULT_MAX_ATTEMPTS, DEFAULT_TIMEOUT_MS};
use crate::application::DEFAULT_MAX_POINTS;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_METRICS_CMD: &str = "sudo occtl -s /run/ocserv/occtl.socket -j show users";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    // InfluxDB destination
    pub influx_url: String,
    pub influx_db: String,
    pub influx_user: Option<String>,
    pub influx_pass: Option<String>,
    pub influx_timeout_ms: u64,
    pub influx_retries: u32,

    // Collection
    pub metrics_delay_secs: u64,
    pub metrics_cmd: String,
    pub max_points: usize,

    pub dry_run: bool,
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            influx_url: "http://localhost:8086".to_string(),
            influx_db: "openconnect".to_string(),
            influx_user: None,
            influx_pass: None,
            influx_timeout_ms: DEFAULT_TIMEOUT_MS,
            influx_retries: DEFAULT_MAX_ATTEMPTS,
            metrics_delay_secs: 2,
            metrics_cmd: DEFAULT_METRICS_CMD.to_string(),
            max_points: DEFAULT_MAX_POINTS,
            dry_run: false,
            debug: false,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{key} is invalid: {reason}")]
    Invalid {
        key: &'static str,
        reason: &'static str,
    },
}

impl Config {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.influx_url.trim().is_empty() {
            return Err(ConfigError::Missing("OCSERV_TELEMETRY_INFLUX_URL"));
        }
        if self.influx_db.trim().is_empty() {
            return Err(ConfigError::Missing("OCSERV_TELEMETRY_INFLUX_DB"));
        }
        if self.metrics_cmd.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "OCSERV_TELEMETRY_METRICS_CMD",
                reason: "command is empty",
            });
        }
        if self.metrics_delay_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "OCSERV_TELEMETRY_METRICS_DELAY_SECS",
                reason: "must be at least 1",
            });
        }
        if self.max_points == 0 {
            return Err(ConfigError::Invalid {
                key: "OCSERV_TELEMETRY_MAX_POINTS",
                reason: "must be at least 1",
            });
        }
        Ok(())
    }

    pub fn metrics_delay(&self) -> Duration {
        Duration::from_secs(self.metrics_delay_secs)
    }

    /// Settings for the InfluxDB writer.
    pub fn influx_settings(&self) -> InfluxSettings {
        InfluxSettings {
            url: self.influx_url.clone(),
            database: self.influx_db.clone(),
            username: self.influx_user.clone(),
            password: self.influx_pass.clone(),
            timeout: Duration::from_millis(self.influx_timeout_ms),
            max_attempts: self.influx_retries,
            dry_run: self.dry_run,
        }
    }
}

pub fn load_config() -> Result<Config, ConfigError> {
    load_from(|key| std::env::var(key).ok())
}

/// Build the configuration from a variable lookup. Unparseable numbers
/// fall back to their defaults.
pub fn load_from<F>(var: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = Config::default();
    let flag = |key: &str| {
        var(key)
            .map(|v| v == "1" || v.to_lowercase() == "true")
            .unwrap_or(false)
    };

    let influx_url = var("OCSERV_TELEMETRY_INFLUX_URL")
        .ok_or(ConfigError::Missing("OCSERV_TELEMETRY_INFLUX_URL"))?;

    let influx_db = var("OCSERV_TELEMETRY_INFLUX_DB")
        .ok_or(ConfigError::Missing("OCSERV_TELEMETRY_INFLUX_DB"))?;

    let influx_user = var("OCSERV_TELEMETRY_INFLUX_USER").filter(|v| !v.is_empty());
    let influx_pass = var("OCSERV_TELEMETRY_INFLUX_PASS");

    let influx_timeout_ms = var("OCSERV_TELEMETRY_INFLUX_TIMEOUT_MS")
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults.influx_timeout_ms);

    let influx_retries = var("OCSERV_TELEMETRY_INFLUX_RETRIES")
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults.influx_retries);

    let metrics_delay_secs = var("OCSERV_TELEMETRY_METRICS_DELAY_SECS")
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults.metrics_delay_secs);

    let metrics_cmd = var("OCSERV_TELEMETRY_METRICS_CMD").unwrap_or(defaults.metrics_cmd);

    let max_points = var("OCSERV_TELEMETRY_MAX_POINTS")
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults.max_points);

    let dry_run = flag("OCSERV_TELEMETRY_DRY_RUN");
    let debug = flag("OCSERV_TELEMETRY_DEBUG") || var("DEBUG").is_some();

    Ok(Config {
        influx_url,
        influx_db,
        influx_user,
        influx_pass,
        influx_timeout_ms,
        influx_retries,
        metrics_delay_secs,
        metrics_cmd,
        max_points,
        dry_run,
        debug,
    })
}
