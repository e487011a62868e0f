/// Process configuration loaded from environment variables.
///
/// The configuration is read once in `main` and handed by reference to the
/// components that need it. Nothing reads the environment after start-up.
///
/// Environment Variables:
/// - SERVER_NAME: Name of the server (default: "homegenie-mcp")
/// - SERVER_VERSION: Version string (default: crate version)
/// - MCP_TRANSPORT_MODE: "stdio", "http", or "both" (default: "stdio")
/// - HOST: Bind address for HTTP mode (default: "127.0.0.1")
/// - PORT: Port number for HTTP mode (default: 8000)
/// - WORKER_THREADS: HTTP worker count (default: CPU count, max 16)
/// - WEATHER_API_KEY / ENERGY_API_KEY: upstream credentials (unset = demo data)
/// - WEATHER_API_URL / ENERGY_API_URL: upstream endpoints
/// - HTTP_TIMEOUT_SECS: upstream request timeout (default: 5)
/// - LOG_FORMAT: "text" or "json" (default: "text")

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::core::error::ConfigError;

pub const DEFAULT_WEATHER_API_URL: &str = "https://api.openweathermap.org/data/2.5/weather";
pub const DEFAULT_ENERGY_API_URL: &str = "https://api.energy-prices.example/v1/prices";

/// Transport used to serve MCP requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMode {
    Stdio,
    Http,
    Both,
}

impl FromStr for TransportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stdio" => Ok(TransportMode::Stdio),
            "http" => Ok(TransportMode::Http),
            "both" => Ok(TransportMode::Both),
            _ => Err("must be 'stdio', 'http', or 'both'".to_string()),
        }
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransportMode::Stdio => "stdio",
            TransportMode::Http => "http",
            TransportMode::Both => "both",
        })
    }
}

/// Credentials and endpoint for one upstream API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamConfig {
    /// API key; `None` means the component always serves demo data
    pub api_key: Option<String>,
    pub base_url: String,
}

impl UpstreamConfig {
    pub fn is_live(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Immutable server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub server_name: String,
    pub server_version: String,
    pub transport: TransportMode,
    pub host: String,
    pub port: u16,
    pub workers: usize,
    pub weather: UpstreamConfig,
    pub energy: UpstreamConfig,
    pub http_timeout: Duration,
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_name: "homegenie-mcp".to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            transport: TransportMode::Stdio,
            host: "127.0.0.1".to_string(),
            port: 8000,
            workers: default_workers(),
            weather: UpstreamConfig {
                api_key: None,
                base_url: DEFAULT_WEATHER_API_URL.to_string(),
            },
            energy: UpstreamConfig {
                api_key: None,
                base_url: DEFAULT_ENERGY_API_URL.to_string(),
            },
            http_timeout: Duration::from_secs(5),
            log_json: false,
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Unset and empty values fall back to the defaults. Numeric values and the
    /// transport mode are validated.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Config::default();

        let transport = match get("MCP_TRANSPORT_MODE") {
            Some(raw) => raw
                .parse::<TransportMode>()
                .map_err(|reason| invalid("MCP_TRANSPORT_MODE", &raw, reason))?,
            None => defaults.transport,
        };

        let port = parse_or("PORT", get("PORT"), defaults.port)?;
        let workers = match get("WORKER_THREADS") {
            Some(raw) => match raw.parse::<usize>() {
                Ok(n) if n > 0 => n,
                Ok(_) => return Err(invalid("WORKER_THREADS", &raw, "must be at least 1".into())),
                Err(e) => return Err(invalid("WORKER_THREADS", &raw, e.to_string())),
            },
            None => defaults.workers,
        };
        let timeout_secs = parse_or(
            "HTTP_TIMEOUT_SECS",
            get("HTTP_TIMEOUT_SECS"),
            defaults.http_timeout.as_secs(),
        )?;

        let log_json = match get("LOG_FORMAT") {
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "json" => true,
                "text" => false,
                _ => return Err(invalid("LOG_FORMAT", &raw, "must be 'text' or 'json'".into())),
            },
            None => defaults.log_json,
        };

        Ok(Self {
            server_name: get("SERVER_NAME").unwrap_or(defaults.server_name),
            server_version: get("SERVER_VERSION").unwrap_or(defaults.server_version),
            transport,
            host: get("HOST").unwrap_or(defaults.host),
            port,
            workers,
            weather: UpstreamConfig {
                api_key: get("WEATHER_API_KEY"),
                base_url: get("WEATHER_API_URL").unwrap_or(defaults.weather.base_url),
            },
            energy: UpstreamConfig {
                api_key: get("ENERGY_API_KEY"),
                base_url: get("ENERGY_API_URL").unwrap_or(defaults.energy.base_url),
            },
            http_timeout: Duration::from_secs(timeout_secs),
            log_json,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Defaults to CPU count but capped at 16 to avoid excessive context switching.
fn default_workers() -> usize {
    num_cpus::get().clamp(1, 16)
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match raw {
        Some(raw) => raw.parse::<T>().map_err(|e| invalid(key, &raw, e.to_string())),
        None => Ok(default),
    }
}

fn invalid(key: &'static str, value: &str, reason: String) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        value: value.to_string(),
        reason,
    }
}
