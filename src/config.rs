//! Configuration loading with layered overrides.
//!
//! Config is loaded in order (each layer overrides the previous):
//! 1. Default values
//! 2. Config file (TOML)
//! 3. Environment variables
//! 4. CLI arguments

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: Server,
    #[serde(default)]
    pub routing: Routing,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Largest accepted request body in bytes.
    #[serde(default = "default_max_body_size")]
    pub max_body_size: usize,
    /// Connections served at once; extra connections get a 503.
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_size: default_max_body_size(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_body_size() -> usize {
    1_048_576
}

fn default_max_connections() -> usize {
    128
}

/// Router settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Routing {
    /// Treat `/a/b/` and `/a/b` as different routes.
    #[serde(default)]
    pub keep_trailing_slashes: bool,
}

/// Builder for loading configuration with customizable options.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Environment variable prefix (e.g., "MYAPP" -> MYAPP_HOST, MYAPP_PORT)
    pub env_prefix: String,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self {
            env_prefix: "WAYPOINT".to_string(),
        }
    }
}

impl ConfigLoader {
    /// Create a new config loader with the given environment prefix.
    pub fn new(env_prefix: impl Into<String>) -> Self {
        Self {
            env_prefix: env_prefix.into(),
        }
    }

    /// Load configuration from file, environment, and CLI arguments.
    ///
    /// # Arguments
    /// * `config_path` - Optional path to TOML config file
    /// * `cli_host` - CLI override for host
    /// * `cli_port` - CLI override for port
    /// * `cli_keep_trailing_slashes` - CLI override for the trailing-slash policy
    pub fn load(
        &self,
        config_path: Option<&Path>,
        cli_host: Option<&str>,
        cli_port: Option<u16>,
        cli_keep_trailing_slashes: Option<bool>,
    ) -> crate::Result<Config> {
        let mut config: Config = if let Some(path) = config_path {
            let content = std::fs::read_to_string(path)
                .map_err(|e| Error::Config(format!("Failed to read config file: {e}")))?;
            toml::from_str(&content)
                .map_err(|e| Error::Config(format!("Failed to parse config: {e}")))?
        } else {
            Config::default()
        };

        let prefix = &self.env_prefix;

        if let Ok(host) = std::env::var(format!("{prefix}_HOST")) {
            config.server.host = host;
        }
        if let Ok(port) = std::env::var(format!("{prefix}_PORT")) {
            config.server.port = port
                .parse()
                .map_err(|e| Error::Config(format!("{prefix}_PORT is not a port: {e}")))?;
        }
        if let Ok(keep) = std::env::var(format!("{prefix}_KEEP_TRAILING_SLASHES")) {
            config.routing.keep_trailing_slashes = parse_flag(&keep).ok_or_else(|| {
                Error::Config(format!(
                    "{prefix}_KEEP_TRAILING_SLASHES must be true or false, got `{keep}`"
                ))
            })?;
        }

        if let Some(host) = cli_host {
            config.server.host = host.to_string();
        }
        if let Some(port) = cli_port {
            config.server.port = port;
        }
        if let Some(keep) = cli_keep_trailing_slashes {
            config.routing.keep_trailing_slashes = keep;
        }

        if config.server.max_connections == 0 {
            return Err(Error::Config(
                "server.max_connections must be at least 1".to_string(),
            ));
        }

        Ok(config)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
