//! Configuration for the `AssetKit` daemon.
//!
//! Layered: built-in defaults, then the global TOML file, then environment
//! overrides (read by the accessors), then CLI flags applied by the caller.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Local HTTP surface served to the GUI add-on.
    pub daemon: DaemonConfig,

    /// Remote marketplace API.
    pub remote: RemoteConfig,
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// A missing file is not an error; defaults apply.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read or parsed.
    pub fn load() -> anyhow::Result<Self> {
        Self::from_path(&Self::config_path()?)
    }

    /// Load configuration from an explicit path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Ok(toml::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Get the configuration file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined.
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("daemon.toml"))
    }

    /// Get the config directory path (`~/.config/assetkit/`).
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined.
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
            return Ok(PathBuf::from(xdg_config_home).join("assetkit"));
        }

        if cfg!(target_os = "macos") {
            if let Ok(home) = std::env::var("HOME") {
                return Ok(PathBuf::from(home).join(".config").join("assetkit"));
            }
        }

        let base = directories::BaseDirs::new()
            .ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?;

        Ok(base.config_dir().join("assetkit"))
    }

    /// Render the effective configuration as TOML (for `config show`).
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn show(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// Local HTTP surface configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Host to bind to. Loopback only by default; the daemon trusts its
    /// callers.
    pub host: String,

    /// Port to bind to. Can also be set via `ASSETKIT_DAEMON_PORT`.
    pub port: u16,

    /// Seconds without a `/report` poll before the daemon shuts itself
    /// down. `0` disables the idle watchdog.
    pub idle_timeout_secs: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 62485,
            idle_timeout_secs: 180,
        }
    }
}

impl DaemonConfig {
    /// Get the port, preferring the `ASSETKIT_DAEMON_PORT` env var over the
    /// config file.
    #[must_use]
    pub fn port(&self) -> u16 {
        std::env::var("ASSETKIT_DAEMON_PORT")
            .ok()
            .and_then(|value| value.parse().ok())
            .unwrap_or(self.port)
    }

    /// Idle watchdog window, `None` when disabled.
    #[must_use]
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }
}

/// Remote marketplace API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the marketplace. Can also be set via `ASSETKIT_SERVER`.
    pub server: String,

    /// Total per-request timeout for outbound calls, in seconds.
    pub request_timeout_secs: u64,

    /// Connect timeout for outbound calls, in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            server: "https://www.assetkit.io".to_string(),
            request_timeout_secs: 60,
            connect_timeout_secs: 15,
        }
    }
}

impl RemoteConfig {
    /// Get the marketplace base URL, preferring the `ASSETKIT_SERVER` env
    /// var over the config file.
    #[must_use]
    pub fn server(&self) -> String {
        std::env::var("ASSETKIT_SERVER")
            .ok()
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| self.server.clone())
    }

    /// Total per-request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Connect timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}
