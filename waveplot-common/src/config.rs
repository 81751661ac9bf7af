//! Configuration file loading
//!
//! Settings sources, highest priority first:
//! 1. Command-line arguments / environment variables (resolved by the tool)
//! 2. TOML configuration file
//! 3. Compiled defaults
//!
//! A missing config file is not an error; a malformed one is.

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default WavePlot server
pub const DEFAULT_SERVER_URL: &str = "http://waveplot.net";

/// Default shared library name for the native analysis engine
pub const DEFAULT_ENGINE_LIBRARY: &str = "libwaveplot.so.1.0";

/// Default number of parallel analysis workers
pub const DEFAULT_ANALYSIS_WORKERS: usize = 4;

/// Default idle timeout (seconds) after which a worker treats its queue as finished
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 10;

/// Default capacity of the analysis → upload queue
pub const DEFAULT_RESULT_CAPACITY: usize = 64;

/// Recognised audio extensions (case-sensitive, leading dot included)
pub const DEFAULT_EXTENSIONS: &[&str] = &[".mp3", ".flac"];

/// Configuration loaded from TOML file
///
/// Every field is optional; unset fields fall back to compiled defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Base URL of the WavePlot server
    #[serde(default)]
    pub server_url: Option<String>,

    /// Editor key used for uploads
    #[serde(default)]
    pub editor_key: Option<String>,

    /// Path or name of the native engine library
    #[serde(default)]
    pub engine_library: Option<String>,

    /// Number of analysis workers
    #[serde(default)]
    pub analysis_workers: Option<usize>,

    /// Idle timeout in seconds
    #[serde(default)]
    pub idle_timeout_secs: Option<u64>,

    /// Capacity of the result queue
    #[serde(default)]
    pub result_capacity: Option<usize>,

    /// Recognised file extensions, e.g. `[".mp3", ".flac"]`
    #[serde(default)]
    pub extensions: Option<Vec<String>>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Load configuration from an explicit file path
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        let config = Self::from_toml_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from an explicit path, or from the first default
    /// location that exists. Returns defaults when no file is found.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        match default_config_path() {
            Some(path) => Self::load(&path),
            None => {
                debug!("No config file found, using compiled defaults");
                Ok(Self::default())
            }
        }
    }
}

/// Locate the config file for this platform
///
/// Tries `<config_dir>/waveplot/config.toml` first, then `/etc/waveplot/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("waveplot").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(unix) {
        let system_config = PathBuf::from("/etc/waveplot/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Validate a credential (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Pick the first valid value from an ordered list of sources
///
/// Each source is `(name, value)`; the name is only used for logging.
pub fn first_valid<'a>(sources: &[(&str, Option<&'a str>)]) -> Option<&'a str> {
    for (name, value) in sources {
        if let Some(value) = value {
            if is_valid_key(value) {
                debug!("Setting resolved from {}", name);
                return Some(value);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert!(config.server_url.is_none());
        assert!(config.editor_key.is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_full_toml() {
        let config = TomlConfig::from_toml_str(
            r#"
            server_url = "http://localhost:8080"
            editor_key = "abc"
            analysis_workers = 8
            idle_timeout_secs = 3
            extensions = [".mp3", ".ogg"]

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.server_url.as_deref(), Some("http://localhost:8080"));
        assert_eq!(config.analysis_workers, Some(8));
        assert_eq!(config.idle_timeout_secs, Some(3));
        assert_eq!(
            config.extensions,
            Some(vec![".mp3".to_string(), ".ogg".to_string()])
        );
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_malformed_toml_is_error() {
        let result = TomlConfig::from_toml_str("analysis_workers = \"many\"");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_is_valid_key() {
        assert!(is_valid_key("key"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("   "));
    }

    #[test]
    fn test_first_valid_respects_order() {
        let picked = first_valid(&[
            ("cli", None),
            ("env", Some("  ")),
            ("toml", Some("from-toml")),
        ]);
        assert_eq!(picked, Some("from-toml"));

        let picked = first_valid(&[("cli", Some("from-cli")), ("toml", Some("from-toml"))]);
        assert_eq!(picked, Some("from-cli"));

        assert_eq!(first_valid(&[("cli", None)]), None);
    }
}
