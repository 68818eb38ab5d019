// Configuration File Support
//
// TOML configuration for the execguard CLI with environment variable overrides.
// The file is looked up in the platform config directory, e.g.
// ~/.config/execguard/config.toml on Linux.

use crate::encoding::TextEncoding;
use crate::logging::{self, LogFormat, LogLevel};
use crate::process::{ExecutorConfig, DEFAULT_LAST_RESORT_ENCODING};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// Subprocess execution defaults
    pub execution: ExecutionConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (plain, compact, json)
    pub format: String,

    /// Include source file and line in log lines
    pub file_and_line: bool,

    /// Log file path; stderr when unset
    pub file_path: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "compact".to_string(),
            file_and_line: false,
            file_path: None,
        }
    }
}

/// Subprocess execution defaults
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Timeout applied when a run does not specify one
    pub default_timeout_secs: Option<u64>,

    /// Silence the warning for runs without any timeout
    pub suppress_missing_timeout_warning: bool,

    /// Encoding used when no lookup yields an answer
    pub last_resort_encoding: String,

    /// Explicit encoding of child output
    pub io_encoding: Option<String>,

    /// Working directory for child processes
    pub working_dir: Option<PathBuf>,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: None,
            suppress_missing_timeout_warning: false,
            last_resort_encoding: DEFAULT_LAST_RESORT_ENCODING.to_string(),
            io_encoding: None,
            working_dir: None,
        }
    }
}

impl ExecutionConfig {
    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout_secs.map(Duration::from_secs)
    }

    /// Executor settings derived from this section
    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            working_dir: self.working_dir.clone(),
            io_encoding: self.io_encoding.clone(),
            last_resort_encoding: self.last_resort_encoding.clone(),
            ..Default::default()
        }
    }
}

impl Config {
    /// Load configuration from the default config directory
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    /// If the config file does not exist, returns default configuration.
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed, or
    /// if the resulting configuration is invalid.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let config = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file from {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file from {:?}", path))?
        } else {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            Self::default()
        };

        let config = config.apply_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path
    pub fn config_path() -> PathBuf {
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "execguard") {
            proj_dirs.config_dir().join("config.toml")
        } else {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".config").join("execguard").join("config.toml")
        }
    }

    /// Apply environment variable overrides to the configuration
    ///
    /// Environment variables take precedence over config file values:
    /// - EXECGUARD_LOG_LEVEL
    /// - EXECGUARD_LOG_FORMAT
    /// - EXECGUARD_LOG_FILE
    /// - EXECGUARD_TIMEOUT_SECS
    /// - EXECGUARD_IO_ENCODING
    fn apply_overrides<F>(mut self, var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(level) = var("EXECGUARD_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("EXECGUARD_LOG_FORMAT") {
            self.logging.format = format;
        }
        if let Some(path) = var("EXECGUARD_LOG_FILE") {
            self.logging.file_path = Some(PathBuf::from(path));
        }
        if let Some(secs) = var("EXECGUARD_TIMEOUT_SECS") {
            match secs.trim().parse::<u64>() {
                Ok(secs) => self.execution.default_timeout_secs = Some(secs),
                Err(_) => tracing::warn!("Ignoring EXECGUARD_TIMEOUT_SECS={:?}: not a number", secs),
            }
        }
        if let Some(encoding) = var("EXECGUARD_IO_ENCODING") {
            self.execution.io_encoding = Some(encoding);
        }
        self
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        self.log_level()?;
        self.log_format()?;

        if self.execution.default_timeout_secs == Some(0) {
            anyhow::bail!("Default timeout must be > 0 seconds");
        }
        if TextEncoding::for_label(&self.execution.last_resort_encoding).is_none() {
            anyhow::bail!(
                "Unknown last resort encoding: {}",
                self.execution.last_resort_encoding
            );
        }
        if let Some(ref encoding) = self.execution.io_encoding {
            if TextEncoding::for_label(encoding).is_none() {
                anyhow::bail!("Unknown IO encoding: {}", encoding);
            }
        }
        if let Some(ref dir) = self.execution.working_dir {
            if !dir.is_dir() {
                anyhow::bail!("Working directory {:?} is not a directory", dir);
            }
        }

        Ok(())
    }

    pub fn log_level(&self) -> Result<LogLevel> {
        self.logging.level.parse().map_err(|e: String| {
            anyhow::anyhow!("{}. Must be one of: trace, debug, info, warn, error", e)
        })
    }

    pub fn log_format(&self) -> Result<LogFormat> {
        self.logging
            .format
            .parse()
            .map_err(|e: String| anyhow::anyhow!("{}. Must be one of: plain, compact, json", e))
    }

    /// Subscriber settings for this configuration
    pub fn logging_config(&self) -> Result<logging::LoggingConfig> {
        Ok(logging::LoggingConfig {
            level: self.log_level()?,
            format: self.log_format()?,
            file_and_line: self.logging.file_and_line,
            file_path: self.logging.file_path.clone(),
        })
    }
}
