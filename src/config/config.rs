// SPDX-License-Identifier: GPL-3.0-only
use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address the API listens on as `host:port` (e.g., "0.0.0.0:50051" or "localhost:50051")
    pub listen_addr: String,

    /// Idle monitor sampling interval in milliseconds
    pub sample_interval_ms: u64,

    /// Consecutive empty intervals before the service shuts itself down
    pub idle_threshold: u32,

    /// Per-request deadline in seconds
    pub request_timeout_secs: u64,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Log line format
    pub log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => bail!("unknown log format: {} (expected text or json)", other),
        }
    }
}

impl Config {
    /// Load configuration from TOML file with environment variable overrides
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::load`], reading variables through `env`
    pub fn load_from<F>(env: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config_path = env("LOGISTICS_CONFIG").unwrap_or_else(|| "config.toml".to_string());

        let mut config: Config = if Path::new(&config_path).exists() {
            let contents = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read {}", config_path))?;
            toml::from_str(&contents).with_context(|| format!("Invalid config file {}", config_path))?
        } else {
            Config::default()
        };

        // Apply environment variable overrides
        if let Some(addr) = server_host_port(&env)? {
            config.listen_addr = addr;
        }
        if let Some(val) = env("LOGISTICS_LISTEN_ADDR") {
            config.listen_addr = val;
        }
        if let Some(val) = env("LOGISTICS_SAMPLE_INTERVAL_MS") {
            config.sample_interval_ms = val.parse().context("Invalid LOGISTICS_SAMPLE_INTERVAL_MS")?;
        }
        if let Some(val) = env("LOGISTICS_IDLE_THRESHOLD") {
            config.idle_threshold = val.parse().context("Invalid LOGISTICS_IDLE_THRESHOLD")?;
        }
        if let Some(val) = env("LOGISTICS_REQUEST_TIMEOUT_SECS") {
            config.request_timeout_secs = val.parse().context("Invalid LOGISTICS_REQUEST_TIMEOUT_SECS")?;
        }
        if let Some(val) = env("LOGISTICS_LOG_LEVEL") {
            config.log_level = val;
        }
        if let Some(val) = env("LOGISTICS_LOG_FORMAT") {
            config.log_format = val.parse()?;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        validate_listen_addr(&self.listen_addr)?;
        if self.sample_interval_ms == 0 {
            bail!("sample_interval_ms must be greater than zero");
        }
        if self.idle_threshold == 0 {
            bail!("idle_threshold must be greater than zero");
        }
        if self.request_timeout_secs == 0 {
            bail!("request_timeout_secs must be greater than zero");
        }
        Ok(())
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// `SERVER_HOST` and `SERVER_TCP_PORT` only count as a pair
fn server_host_port<F>(env: &F) -> anyhow::Result<Option<String>>
where
    F: Fn(&str) -> Option<String>,
{
    let host = env("SERVER_HOST").filter(|v| !v.is_empty());
    let port = env("SERVER_TCP_PORT").filter(|v| !v.is_empty());
    match (host, port) {
        (None, None) => Ok(None),
        (Some(host), Some(port)) => Ok(Some(format!("{}:{}", host, port))),
        _ => bail!("configuration required: both SERVER_HOST and SERVER_TCP_PORT must be set"),
    }
}

/// Hostnames are resolved at bind time; only the `host:port` shape is checked here
fn validate_listen_addr(addr: &str) -> anyhow::Result<()> {
    let (host, port) = addr
        .rsplit_once(':')
        .with_context(|| format!("Invalid listen address {}: expected host:port", addr))?;
    if host.is_empty() {
        bail!("Invalid listen address {}: missing host", addr);
    }
    port.parse::<u16>()
        .with_context(|| format!("Invalid listen address {}: bad port", addr))?;
    Ok(())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: String::from("0.0.0.0:50051"),
            sample_interval_ms: 1000,
            idle_threshold: 5,
            request_timeout_secs: 5,
            log_level: String::from("info"),
            log_format: LogFormat::Text,
        }
    }
}
