//! Execution outcomes
//!
//! Exactly one variant per run. Timeouts and nonzero exits are ordinary
//! results the caller branches on.

use serde::Serialize;
use std::time::Duration;

/// A child that ran to completion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletedProcess {
    /// The argument vector that was executed
    pub args: Vec<String>,

    /// Exit code; `-N` when the child was terminated by signal `N`
    pub exit_code: i32,

    /// Decoded standard output
    pub stdout: String,

    /// Decoded standard error
    pub stderr: String,

    /// Wall-clock time from spawn to exit
    pub elapsed: Duration,
}

/// A child that was killed because it outlived its timeout
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeoutExpired {
    /// The argument vector that was executed
    pub args: Vec<String>,

    /// The timeout that expired
    pub timeout: Duration,

    /// Wall-clock time from spawn until the child was killed
    pub elapsed: Duration,

    /// Whatever the child wrote to stdout before it was killed
    pub stdout: String,

    /// Whatever the child wrote to stderr before it was killed
    pub stderr: String,
}

/// Result of running one command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    Success(CompletedProcess),
    TimedOut(TimeoutExpired),
    Failed(CompletedProcess),
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, Self::TimedOut(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn args(&self) -> &[String] {
        match self {
            Self::Success(p) | Self::Failed(p) => &p.args,
            Self::TimedOut(t) => &t.args,
        }
    }

    /// Exit code of a completed child, `None` after a timeout
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Success(p) | Self::Failed(p) => Some(p.exit_code),
            Self::TimedOut(_) => None,
        }
    }

    pub fn stdout(&self) -> &str {
        match self {
            Self::Success(p) | Self::Failed(p) => &p.stdout,
            Self::TimedOut(t) => &t.stdout,
        }
    }

    pub fn stderr(&self) -> &str {
        match self {
            Self::Success(p) | Self::Failed(p) => &p.stderr,
            Self::TimedOut(t) => &t.stderr,
        }
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            Self::Success(p) | Self::Failed(p) => p.elapsed,
            Self::TimedOut(t) => t.elapsed,
        }
    }

    /// Get a human-readable summary
    pub fn summary(&self) -> String {
        match self {
            Self::Success(p) => format!(
                "Success (exit code: {}, {:.0}ms, {} bytes output)",
                p.exit_code,
                p.elapsed.as_secs_f64() * 1000.0,
                p.stdout.len()
            ),
            Self::Failed(p) => format!(
                "Failed (exit code: {}, {:.0}ms, {} bytes output)",
                p.exit_code,
                p.elapsed.as_secs_f64() * 1000.0,
                p.stdout.len() + p.stderr.len()
            ),
            Self::TimedOut(t) => format!(
                "Timeout after {:.0}ms (limit {:?}): {:?}",
                t.elapsed.as_secs_f64() * 1000.0,
                t.timeout,
                t.args
            ),
        }
    }
}
