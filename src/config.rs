//! Connection settings for one management endpoint
//!
//! Settings come from environment variables (after `dotenvy` has loaded an
//! optional `.env`) or from a JSON file whose string values may reference
//! environment variables as `${NAME}`.
//!
//! Environment Variables:
//! - MGMT_HOST (optional): defaults to "localhost"
//! - MGMT_PORT (optional): defaults to 9990
//! - MGMT_SECURE (optional): talk https instead of http
//! - MGMT_USER / MGMT_PASSWORD (optional): basic-auth credentials
//! - MGMT_TIMEOUT_SECS (optional): connect/read timeout, defaults to 30
//! - MGMT_VERBOSE (optional): log request and reply bodies at debug level

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::discovery::HostPort;
use crate::error::{ProbeError, Result};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_MGMT_PORT: u16 = 9990;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionSettings {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Use https for the management endpoint
    #[serde(default)]
    pub secure: bool,

    #[serde(default)]
    pub user: String,

    /// Never absent: an unset password is the empty string
    #[serde(default)]
    pub password: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub verbose: bool,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_MGMT_PORT
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            secure: false,
            user: String::new(),
            password: String::new(),
            timeout_secs: default_timeout(),
            verbose: false,
        }
    }
}

impl ConnectionSettings {
    pub fn new(host: &str, port: u16, user: &str, password: Option<&str>) -> Self {
        Self {
            host: host.to_string(),
            port,
            user: user.to_string(),
            password: password.unwrap_or_default().to_string(),
            ..Self::default()
        }
    }

    /// Settings for a discovered management interface; the scheme follows
    /// whether the interface is secure
    pub fn from_host_port(host_port: &HostPort, user: &str, password: Option<&str>) -> Self {
        Self {
            secure: host_port.is_secure,
            ..Self::new(&host_port.host, host_port.port, user, password)
        }
    }

    /// Load settings from the environment
    ///
    /// # Errors
    /// - MGMT_PORT or MGMT_TIMEOUT_SECS is not a number
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut settings = Self::default();
        if let Ok(host) = std::env::var("MGMT_HOST") {
            settings.host = host;
        }
        if let Ok(port) = std::env::var("MGMT_PORT") {
            settings.port = port
                .parse()
                .map_err(|_| ProbeError::Config(format!("MGMT_PORT is not a port: {}", port)))?;
        }
        settings.secure = env_flag("MGMT_SECURE");
        settings.user = std::env::var("MGMT_USER").unwrap_or_default();
        settings.password = std::env::var("MGMT_PASSWORD").unwrap_or_default();
        if let Ok(secs) = std::env::var("MGMT_TIMEOUT_SECS") {
            settings.timeout_secs = secs.parse().map_err(|_| {
                ProbeError::Config(format!("MGMT_TIMEOUT_SECS is not a number: {}", secs))
            })?;
        }
        settings.verbose = env_flag("MGMT_VERBOSE");

        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from a JSON file, resolving `${VAR}` references
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut settings: ConnectionSettings = serde_json::from_str(&content)?;
        settings.host = resolve_env_var(&settings.host)?;
        settings.user = resolve_env_var(&settings.user)?;
        settings.password = resolve_env_var(&settings.password)?;
        settings.validate()?;
        Ok(settings)
    }

    /// `<config dir>/mgmt-probe/connection.json`, if a config dir exists
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("mgmt-probe").join("connection.json"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(ProbeError::Config("host must not be empty".to_string()));
        }
        if self.port == 0 {
            return Err(ProbeError::Config("port must not be 0".to_string()));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn scheme(&self) -> &'static str {
        if self.secure {
            "https"
        } else {
            "http"
        }
    }

    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme(), self.host, self.port)
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Resolve a `${NAME}` reference to the environment variable's value;
/// other strings are returned as-is
pub fn resolve_env_var(value: &str) -> Result<String> {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name)
            .map_err(|_| ProbeError::Config(format!("Environment variable not found: {}", var_name)))
    } else {
        Ok(value.to_string())
    }
}
