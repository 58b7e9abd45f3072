use std::env;
use std::net::{AddrParseError, IpAddr, Ipv4Addr, SocketAddr};

use crate::workflows::applications::AcceptanceMode;

const ENV_KEY: &str = "APP_ENV";
const HOST_KEY: &str = "APP_HOST";
const PORT_KEY: &str = "APP_PORT";
const LOG_LEVEL_KEY: &str = "APP_LOG_LEVEL";
const ACCEPTANCE_MODE_KEY: &str = "APP_ACCEPTANCE_MODE";

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_LOG_LEVEL: &str = "info";

/// Deployment stage the hub runs in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AppEnvironment {
    #[default]
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    /// Unrecognised stage names fall back to development.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Runtime settings for the API binary, read from `APP_*` variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub intake: IntakeConfig,
}

impl AppConfig {
    /// Reads `.env` when present, then the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let setting = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let environment = setting(ENV_KEY)
            .map(|value| AppEnvironment::parse(&value))
            .unwrap_or_default();

        let port = match setting(PORT_KEY) {
            Some(value) => value
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort { value })?,
            None => DEFAULT_PORT,
        };

        let acceptance_mode = match setting(ACCEPTANCE_MODE_KEY) {
            Some(value) => AcceptanceMode::parse(&value)
                .ok_or(ConfigError::InvalidAcceptanceMode { value })?,
            None => AcceptanceMode::default(),
        };

        Ok(Self {
            environment,
            server: ServerConfig {
                host: setting(HOST_KEY).unwrap_or_else(|| DEFAULT_HOST.to_string()),
                port,
            },
            telemetry: TelemetryConfig {
                log_level: setting(LOG_LEVEL_KEY).unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            },
            intake: IntakeConfig { acceptance_mode },
        })
    }
}

/// Listener address for the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip = if self.host.eq_ignore_ascii_case("localhost") {
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        } else {
            self.host
                .parse::<IpAddr>()
                .map_err(|source| ConfigError::InvalidHost {
                    value: self.host.clone(),
                    source,
                })?
        };
        Ok(SocketAddr::new(ip, self.port))
    }
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// How applications are admitted.
#[derive(Debug, Clone, Default)]
pub struct IntakeConfig {
    pub acceptance_mode: AcceptanceMode,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("APP_PORT must be a port number between 0 and 65535 (found '{value}')")]
    InvalidPort { value: String },
    #[error("APP_HOST must be 'localhost' or an IP address (found '{value}')")]
    InvalidHost {
        value: String,
        #[source]
        source: AddrParseError,
    },
    #[error("APP_ACCEPTANCE_MODE must be 'atomic' or 'read_then_write' (found '{value}')")]
    InvalidAcceptanceMode { value: String },
}
