//! Logging Configuration
//!
//! Structured logging through `tracing`, written to stderr (or a file) so a
//! command's results on stdout stay machine-readable.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Mutex;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::{
    fmt::{self, writer::BoxMakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Log format configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable plain text format
    Plain,
    /// Single-line abbreviated format
    #[default]
    Compact,
    /// JSON structured format
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "plain" | "pretty" => Ok(Self::Plain),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid log format: {}", s)),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::Compact => write!(f, "compact"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Log level configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(format!("Invalid log level: {}", s)),
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Trace => write!(f, "trace"),
            Self::Debug => write!(f, "debug"),
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Subscriber settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub format: LogFormat,
    /// Include file and line number in logs
    pub file_and_line: bool,
    /// Append to this file instead of writing to stderr
    pub file_path: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Warn,
            format: LogFormat::Compact,
            file_and_line: false,
            file_path: None,
        }
    }
}

impl LoggingConfig {
    /// Create a new logging config with custom level
    pub fn with_level(level: LogLevel) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// Initialize the global subscriber
    ///
    /// `RUST_LOG` takes precedence over the configured level when set.
    pub fn init(&self) -> Result<()> {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level.to_string()));

        let (writer, ansi) = match self.file_path {
            Some(ref path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .with_context(|| format!("Failed to open log file {:?}", path))?;
                (BoxMakeWriter::new(Mutex::new(file)), false)
            }
            None => (BoxMakeWriter::new(std::io::stderr), std::io::stderr().is_terminal()),
        };

        let layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(ansi)
            .with_file(self.file_and_line)
            .with_line_number(self.file_and_line)
            .with_target(true);

        match self.format {
            LogFormat::Plain => {
                tracing_subscriber::registry().with(layer.with_filter(filter)).try_init()?;
            }
            LogFormat::Compact => {
                tracing_subscriber::registry()
                    .with(layer.compact().with_filter(filter))
                    .try_init()?;
            }
            LogFormat::Json => {
                tracing_subscriber::registry()
                    .with(layer.json().with_filter(filter))
                    .try_init()?;
            }
        }

        tracing::debug!("Logging initialized: level={}, format={}", self.level, self.format);
        Ok(())
    }
}

/// Start and finish log lines around one CLI invocation
#[derive(Debug)]
pub struct Session {
    command: String,
    started_at: DateTime<Local>,
    started: Instant,
}

impl Session {
    /// Log who is running what, and where the standard streams point
    pub fn begin(command: impl Into<String>) -> Self {
        let session = Self {
            command: command.into(),
            started_at: Local::now(),
            started: Instant::now(),
        };

        info!(
            command = %session.command,
            user = %current_user(),
            privileged = is_privileged(),
            started_at = %session.started_at.to_rfc3339(),
            stdin_tty = std::io::stdin().is_terminal(),
            stdout_tty = std::io::stdout().is_terminal(),
            stderr_tty = std::io::stderr().is_terminal(),
            "Session started"
        );
        session
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    pub fn finish(self, exit_code: i32) {
        info!(
            command = %self.command,
            exit_code,
            runtime_ms = self.started.elapsed().as_millis() as u64,
            "Session finished"
        );
    }
}

/// Name of the invoking user, from the environment
pub fn current_user() -> String {
    ["USER", "USERNAME"]
        .iter()
        .find_map(|var| std::env::var(var).ok().filter(|v| !v.is_empty()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Whether we run with superuser rights
#[cfg(unix)]
pub fn is_privileged() -> bool {
    nix::unistd::geteuid().is_root()
}

/// Whether we run with superuser rights
#[cfg(not(unix))]
pub fn is_privileged() -> bool {
    false
}
