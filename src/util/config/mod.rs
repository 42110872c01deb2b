//! embedrt configuration
//!
//! Hardening settings can be overridden by an optional TOML file. Every key
//! is optional; missing keys keep their defaults.
//!
//! # Lookup order
//!
//! ```text
//! 1. $EMBEDRT_CONFIG
//! 2. $XDG_CONFIG_HOME/embedrt/config.toml
//! 3. ~/.config/embedrt/config.toml
//! 4. Default values
//! ```
//!
//! # Example
//!
//! ```toml
//! gc_percent = 20
//! max_procs = 1
//! signals = ["SIGPIPE", "SIGBUS"]
//! redirect_streams = false
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::hardening::RuntimeHardening;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "EMBEDRT_CONFIG";

/// Get the user config directory
pub fn get_config_dir() -> Option<PathBuf> {
    // Try XDG config directory first
    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        return Some(PathBuf::from(xdg_config).join("embedrt"));
    }

    // Fallback to ~/.config/embedrt
    if let Ok(home) = std::env::var("HOME") {
        return Some(PathBuf::from(home).join(".config").join("embedrt"));
    }

    None
}

/// Get the config file path, honouring `$EMBEDRT_CONFIG`
pub fn get_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    get_config_dir().map(|dir| dir.join("config.toml"))
}

/// Check if a config file exists
pub fn config_exists() -> bool {
    get_config_path().map(|p| p.exists()).unwrap_or(false)
}

/// Parse hardening settings from TOML text
pub fn parse_hardening_config(content: &str) -> Result<RuntimeHardening, ConfigError> {
    toml::from_str(content).map_err(ConfigError::ParseError)
}

/// Load hardening settings from a specific file
pub fn load_hardening_config_from(path: &Path) -> Result<RuntimeHardening, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::IoError)?;
    debug!("hardening config from {}", path.display());
    parse_hardening_config(&content)
}

/// Load hardening settings
/// Returns default settings if no config file exists
pub fn load_hardening_config() -> Result<RuntimeHardening, ConfigError> {
    // An explicit path must exist
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return load_hardening_config_from(Path::new(&path));
    }

    let path = match get_config_path() {
        Some(p) => p,
        None => return Ok(RuntimeHardening::default()),
    };

    if !path.exists() {
        return Ok(RuntimeHardening::default());
    }

    load_hardening_config_from(&path)
}

/// Render hardening settings as TOML
pub fn render_hardening_config(config: &RuntimeHardening) -> Result<String, ConfigError> {
    toml::to_string_pretty(config).map_err(ConfigError::SerializeError)
}

/// Write hardening settings to `path`, creating its directory
pub fn save_hardening_config_to(
    config: &RuntimeHardening,
    path: &Path,
) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            fs::create_dir_all(dir).map_err(ConfigError::IoError)?;
        }
    }
    let content = render_hardening_config(config)?;
    fs::write(path, content).map_err(ConfigError::IoError)?;
    debug!("hardening config saved to {}", path.display());
    Ok(())
}

/// Save hardening settings where [`load_hardening_config`] looks first
pub fn save_hardening_config(config: &RuntimeHardening) -> Result<PathBuf, ConfigError> {
    let path = get_config_path().ok_or(ConfigError::NoConfigDir)?;
    save_hardening_config_to(config, &path)?;
    Ok(path)
}

/// Configuration errors
#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    ParseError(toml::de::Error),
    SerializeError(toml::ser::Error),
    NoConfigDir,
}

impl std::fmt::Display for ConfigError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::ParseError(e) => write!(f, "Config parse error: {}", e),
            ConfigError::SerializeError(e) => write!(f, "Config serialize error: {}", e),
            ConfigError::NoConfigDir => write!(f, "Cannot determine config directory"),
        }
    }
}

impl std::error::Error for ConfigError {}
