//! Daemon configuration loaded from TOML.

use std::path::PathBuf;

use loopsink_types::{
    DEFAULT_CARD_LABEL, DEFAULT_IDLE_TIMEOUT_SECS, DEFAULT_MODULE_NAME, WELL_KNOWN_NAME,
};
use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub module: ModuleConfig,
    #[serde(default)]
    pub bus: BusConfig,
}

/// Daemon lifecycle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Seconds of inactivity before the daemon exits on its own.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// Disable the idle auto-exit entirely.
    #[serde(default)]
    pub no_timeout: bool,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: default_idle_timeout_secs(),
            no_timeout: false,
            log_level: default_log_level(),
        }
    }
}

/// The managed kernel module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleConfig {
    #[serde(default = "default_module_name")]
    pub name: String,
    /// Device label embedded in the module's parameter string.
    #[serde(default = "default_card_label")]
    pub card_label: String,
}

impl Default for ModuleConfig {
    fn default() -> Self {
        Self {
            name: default_module_name(),
            card_label: default_card_label(),
        }
    }
}

/// Bus identity settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusConfig {
    /// Well-known name the daemon owns on the bus.
    #[serde(default = "default_bus_name")]
    pub name: String,
    /// Directory for the bus socket; defaults to the runtime dir.
    #[serde(default)]
    pub socket_dir: Option<PathBuf>,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            name: default_bus_name(),
            socket_dir: None,
        }
    }
}

fn default_idle_timeout_secs() -> u64 {
    DEFAULT_IDLE_TIMEOUT_SECS
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_module_name() -> String {
    DEFAULT_MODULE_NAME.to_string()
}

fn default_card_label() -> String {
    DEFAULT_CARD_LABEL.to_string()
}

fn default_bus_name() -> String {
    WELL_KNOWN_NAME.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("idle_timeout_secs = 30"));
        assert!(toml_str.contains("name = \"v4l2loopback\""));
    }

    #[test]
    fn parse_example_config() {
        let toml_str = r#"
[daemon]
idle_timeout_secs = 60
no_timeout = true
log_level = "debug"

[module]
name = "v4l2loopback"
card_label = "Studio Camera"

[bus]
name = "com.obsproject.v4l2sink"
socket_dir = "/run/loopsink"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.daemon.idle_timeout_secs, 60);
        assert!(config.daemon.no_timeout);
        assert_eq!(config.module.card_label, "Studio Camera");
        assert_eq!(
            config.bus.socket_dir,
            Some(PathBuf::from("/run/loopsink"))
        );
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.daemon.idle_timeout_secs, 30);
        assert!(!config.daemon.no_timeout);
        assert_eq!(config.module.name, "v4l2loopback");
        assert_eq!(config.module.card_label, "OBS-Camera");
        assert_eq!(config.bus.name, "com.obsproject.v4l2sink");
        assert_eq!(config.bus.socket_dir, None);
    }
}
