//! Configuration management for the FHIR session gateway.

use serde::Deserialize;
use std::net::SocketAddr;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub solid: SolidConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            solid: SolidConfig::default(),
            session: SessionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
        }
    }
}

/// Configuration for the pod-synchronization engine (§4.5).
#[derive(Debug, Clone, Deserialize)]
pub struct SolidConfig {
    /// When false, all pod operations are no-ops and hydration falls back to
    /// embedded dev test data (§4.5 "Disabled mode").
    #[serde(default)]
    pub enabled: bool,
    /// FHIR container path under the pod base, e.g. `/weare/fhir`.
    #[serde(default = "default_fhir_container_path")]
    pub fhir_container_path: String,
    /// Connection/request timeout for pod HTTP calls, in seconds.
    #[serde(default = "default_pod_timeout_seconds")]
    pub http_timeout_seconds: u64,
}

impl Default for SolidConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            fhir_container_path: default_fhir_container_path(),
            http_timeout_seconds: default_pod_timeout_seconds(),
        }
    }
}

/// Configuration for the session store and its sweeper (§4.1, §5).
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// How often the background sweep runs, in seconds.
    #[serde(default = "default_sweep_interval_seconds")]
    pub sweep_interval_seconds: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sweep_interval_seconds: default_sweep_interval_seconds(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_fhir_container_path() -> String {
    "/weare/fhir".to_string()
}

fn default_pod_timeout_seconds() -> u64 {
    30
}

fn default_sweep_interval_seconds() -> u64 {
    300
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from environment and config files.
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .set_default("server.host", default_host())?
            .set_default("server.port", default_port())?
            .set_default("server.cors_origins", default_cors_origins())?
            .set_default("solid.enabled", false)?
            .set_default("solid.fhir_container_path", default_fhir_container_path())?
            .set_default(
                "solid.http_timeout_seconds",
                default_pod_timeout_seconds() as i64,
            )?
            .set_default(
                "session.sweep_interval_seconds",
                default_sweep_interval_seconds() as i64,
            )?
            .set_default("logging.level", default_log_level())?
            .set_default("logging.json", false)?
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("FHIR")
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.cors_origins")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = config.try_deserialize()?;
        Ok(config)
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let addr = format!("{}:{}", self.server.host, self.server.port);
        Ok(addr.parse()?)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.session.sweep_interval_seconds == 0 {
            return Err("session.sweep_interval_seconds must be > 0".to_string());
        }
        if self.solid.http_timeout_seconds == 0 {
            return Err("solid.http_timeout_seconds must be > 0".to_string());
        }
        if self.solid.fhir_container_path.is_empty()
            || !self.solid.fhir_container_path.starts_with('/')
        {
            return Err("solid.fhir_container_path must be an absolute path".to_string());
        }
        Ok(())
    }
}
