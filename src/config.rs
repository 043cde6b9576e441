//! Client configuration.
//!
//! Looked up in order:
//! 1. `chwire.toml` in the working directory
//! 2. `<config dir>/chwire/config.toml` (e.g. `~/.config/chwire/config.toml`)
//! 3. built-in defaults
//!
//! ```toml
//! client_name = "my-service"
//! compress = false
//! hostname = "worker-1"
//! timezone = "UTC"
//! ```

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{WireError, WireResult};
use crate::protocol::client_info::{ClientInfo, DEFAULT_CLIENT_NAME};
use crate::protocol::consts::DBMS_TCP_PROTOCOL_VERSION;
use crate::types::{set_default_timezone, Timezone, TypeError};

pub const CONFIG_FILE: &str = "chwire.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub client_name: String,
    pub version_major: u64,
    pub version_minor: u64,
    /// Client protocol revision announced in ClientInfo.
    pub revision: u64,
    /// Ask the server for compressed blocks (needs a `BlockCompressor`).
    pub compress: bool,
    /// Overrides the local host name sent with every query.
    pub hostname: Option<String>,
    /// Process default timezone for date/time columns.
    pub timezone: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let info = ClientInfo::default();
        Self {
            client_name: DEFAULT_CLIENT_NAME.to_string(),
            version_major: info.version_major,
            version_minor: info.version_minor,
            revision: DBMS_TCP_PROTOCOL_VERSION,
            compress: false,
            hostname: None,
            timezone: None,
        }
    }
}

impl ClientConfig {
    pub fn from_toml(content: &str) -> WireResult<Self> {
        toml::from_str(content).map_err(|e| WireError::config(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> WireResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "loading client config");
        Self::from_toml(&content)
    }

    /// Load from the first config file found, or defaults.
    pub fn load() -> WireResult<Self> {
        match Self::search_paths().into_iter().find(|p| p.exists()) {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("chwire").join("config.toml"));
        }
        paths
    }

    pub fn client_info(&self) -> ClientInfo {
        ClientInfo {
            name: self.client_name.clone(),
            version_major: self.version_major,
            version_minor: self.version_minor,
            revision: self.revision,
        }
    }

    /// Host name sent as client and originating host.
    pub fn hostname(&self) -> String {
        self.hostname.clone().unwrap_or_else(local_hostname)
    }

    pub fn timezone(&self) -> WireResult<Option<Timezone>> {
        self.timezone
            .as_deref()
            .map(|name| Timezone::parse(name).ok_or_else(|| TypeError::UnsupportedTimezone(name.to_string())))
            .transpose()
            .map_err(WireError::from)
    }

    /// Install the configured timezone as the process default. Has to run
    /// before any date/time codec is resolved.
    pub fn apply_default_timezone(&self) -> WireResult<()> {
        if let Some(tz) = self.timezone()? {
            set_default_timezone(tz)
                .map_err(|_| WireError::config("default timezone already in use"))?;
        }
        Ok(())
    }
}

/// Local host name from `$HOSTNAME` or `/etc/hostname`, `localhost` when
/// unknown. Only Linux-like hosts provide either; elsewhere set
/// `hostname` in the config.
pub fn local_hostname() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .filter(|h| !h.is_empty())
        .or_else(|| {
            fs::read_to_string("/etc/hostname")
                .ok()
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty())
        })
        .unwrap_or_else(|| "localhost".to_string())
}
