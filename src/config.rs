use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use crate::error::{Result, MuxkitError};
use crate::media::ToolLayout;

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "muxkit.toml";

fn default_library_dir() -> String {
    "library".to_string()
}

fn default_log_directory() -> PathBuf {
    PathBuf::from(".muxkit/log")
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Directory the bundled library lives under; defaults to the executable's directory
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_dir: Option<PathBuf>,
    /// Bundled tools directory, relative to the base directory
    #[serde(default = "default_library_dir")]
    pub library_dir: String,
    /// Lookup strategy: Auto, Distribution or SystemPath
    #[serde(default)]
    pub layout: ToolLayout,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Maximum concurrent tool processes (0 = number of CPU cores)
    #[serde(default)]
    pub workers: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory for the daily rolling log file
    #[serde(default = "default_log_directory")]
    pub directory: PathBuf,
    /// Write logs to a file in addition to the console
    #[serde(default = "default_true")]
    pub file: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            base_dir: None,
            library_dir: default_library_dir(),
            layout: ToolLayout::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_log_directory(),
            file: true,
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MuxkitError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| MuxkitError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| MuxkitError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| MuxkitError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Explicit path, else `./muxkit.toml` if present, else defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => Self::from_file(DEFAULT_CONFIG_FILE),
            None => Ok(Self::default()),
        }
    }
}
